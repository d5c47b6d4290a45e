//! Core application logic for JNLP Fetcher
//!
//! Stages, leaf first: descriptor parsing and extraction, candidate
//! resolution, destination setup and the fetch driver, tied together by
//! [`Pipeline`] over an [`HttpSession`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use jnlp_fetcher::app::{ClientConfig, DescriptorParser, ParserMode, Pipeline, SessionClient};
//! use jnlp_fetcher::auth::AuthMode;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionClient::new(&ClientConfig::default(), AuthMode::None)?;
//! let pipeline = Pipeline::new(&session, DescriptorParser::new(ParserMode::Tolerant), ".");
//!
//! let url = Url::parse("https://www.example.com/java/jnlp/sample.jnlp")?;
//! let report = pipeline.run(&url, &mut |event| println!("{:?}", event)).await?;
//! println!("Saved {} of {}", report.saved(), report.total());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod descriptor;
pub mod destination;
pub mod fetch;
pub mod pipeline;
pub mod plan;

// Re-export main public API
pub use client::{ClientConfig, FetchResponse, HttpSession, SessionClient};
pub use descriptor::{
    extract, DescriptorParser, Document, Element, Extraction, ParserMode, RejectedEntry,
    RejectionReason, ResourceKind, ResourceReference,
};
pub use destination::Destination;
pub use fetch::{fetch_descriptor, DownloadOutcome, FetchDriver, FetchEvent};
pub use pipeline::{Pipeline, RunEvent, RunReport};
pub use plan::{resolve, resolve_all, Attempt, AttemptKind, AttemptPlan};
