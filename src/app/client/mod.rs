//! HTTP session used for the descriptor and every resource attempt
//!
//! The fetch stages only see the [`HttpSession`] trait, so they can be
//! driven by [`SessionClient`] in production and by an in-memory session
//! in tests.
//!
//! The module is organized into:
//! - `config`: HTTP client configuration and building
//! - `http`: GET with cookie, Basic, Digest and NTLM handling

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::StatusCode;
use url::Url;

use crate::auth::AuthMode;
use crate::errors::TransportResult;

pub mod config;
pub mod http;

pub use config::ClientConfig;

use http::HttpHandler;

/// Outcome of one GET: the status, and the body when the status is 200
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: StatusCode,
    /// Empty unless `status` is 200
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// A session able to issue authenticated GET requests
#[async_trait]
pub trait HttpSession: Send + Sync {
    /// Issues one GET
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when no HTTP status was obtained at all
    async fn get(&self, url: &Url) -> TransportResult<FetchResponse>;
}

/// reqwest-backed session shared by every request of a run
#[derive(Debug)]
pub struct SessionClient {
    http_handler: HttpHandler,
}

impl SessionClient {
    /// Builds the client and wires in the authentication mode
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration settings
    /// * `auth` - How requests authenticate
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if HTTP client creation fails
    pub fn new(config: &ClientConfig, auth: AuthMode) -> TransportResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = config.build_http_client(Arc::clone(&jar))?;

        tracing::info!("Created HTTP session (auth: {})", auth.scheme());

        Ok(Self {
            http_handler: HttpHandler::new(client, auth, jar),
        })
    }
}

#[async_trait]
impl HttpSession for SessionClient {
    async fn get(&self, url: &Url) -> TransportResult<FetchResponse> {
        let response = self.http_handler.get(url).await?;
        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("{} answered {}", url, status);
            return Ok(FetchResponse::with_status(status));
        }

        let body = response.bytes().await?;
        tracing::debug!("{} answered 200 with {} bytes", url, body.len());
        Ok(FetchResponse::ok(body.to_vec()))
    }
}
