//! One complete run: descriptor in, files out
//!
//! The descriptor is fetched, parsed and reduced to attempt plans before the
//! destination directory is created, so a fatal descriptor problem leaves
//! nothing behind on disk.

use std::path::{Path, PathBuf};

use url::Url;

use crate::app::client::HttpSession;
use crate::app::descriptor::{extract, DescriptorParser, RejectedEntry};
use crate::app::destination;
use crate::app::fetch::{fetch_descriptor, DownloadOutcome, FetchDriver, FetchEvent};
use crate::app::plan::resolve_all;
use crate::constants::output;
use crate::errors::{FilesystemError, Result};

/// Progress of a run, reported to the caller as it happens
#[derive(Debug)]
pub enum RunEvent {
    /// Descriptor entry that was skipped
    Rejected(RejectedEntry),
    /// Attempt plans are ready
    Planned { resources: usize },
    /// Destination chosen; `fallback` says why the random directory was not used
    Destination {
        path: PathBuf,
        label: String,
        fallback: Option<FilesystemError>,
    },
    Fetch(FetchEvent),
}

/// Summary of a finished run
#[derive(Debug)]
pub struct RunReport {
    pub base_url: String,
    pub destination: PathBuf,
    /// Directory name used in status lines
    pub label: String,
    pub rejected: usize,
    pub outcomes: Vec<DownloadOutcome>,
}

impl RunReport {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Runs descriptor fetch, parsing, resolution and downloads against one session
pub struct Pipeline<'a, S: HttpSession + ?Sized> {
    session: &'a S,
    parser: DescriptorParser,
    output_root: PathBuf,
    dir_name_len: usize,
    dir_name: Option<String>,
}

impl<'a, S: HttpSession + ?Sized> Pipeline<'a, S> {
    /// Creates a pipeline writing below `output_root`
    pub fn new(session: &'a S, parser: DescriptorParser, output_root: impl AsRef<Path>) -> Self {
        Self {
            session,
            parser,
            output_root: output_root.as_ref().to_path_buf(),
            dir_name_len: output::RANDOM_DIR_LEN,
            dir_name: None,
        }
    }

    /// Length of the random directory name
    pub fn with_dir_name_len(mut self, len: usize) -> Self {
        self.dir_name_len = len;
        self
    }

    /// Uses a fixed directory name instead of a random one
    pub fn with_dir_name(mut self, name: impl Into<String>) -> Self {
        self.dir_name = Some(name.into());
        self
    }

    pub fn parser(&self) -> &DescriptorParser {
        &self.parser
    }

    /// Executes the run
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the descriptor cannot be fetched, cannot be
    /// parsed, or has no usable codebase. Resource failures are never
    /// errors; they show up in the report's outcomes.
    pub async fn run<F>(&self, url: &Url, observer: &mut F) -> Result<RunReport>
    where
        F: FnMut(RunEvent),
    {
        let body = fetch_descriptor(self.session, url).await?;
        tracing::debug!("Descriptor is {} bytes, parsing in {} mode", body.len(), self.parser.mode());

        let document = self.parser.parse(&body)?;
        let extraction = extract(&document)?;
        drop(document);
        tracing::info!(
            "Codebase {} lists {} resources",
            extraction.base_url,
            extraction.resources.len()
        );

        let rejected = extraction.rejected.len();
        for entry in extraction.rejected {
            tracing::warn!(
                "Skipping <{}> entry {:?}: {}",
                entry.kind,
                entry.href.as_deref().unwrap_or_default(),
                entry.reason
            );
            observer(RunEvent::Rejected(entry));
        }

        let plans = resolve_all(&extraction.resources);
        observer(RunEvent::Planned {
            resources: plans.len(),
        });

        let destination = match &self.dir_name {
            Some(name) => destination::prepare_named(&self.output_root, name).await,
            None => destination::prepare(&self.output_root, self.dir_name_len).await,
        };
        let path = destination.path.clone();
        let label = destination.label.clone();
        observer(RunEvent::Destination {
            path: destination.path,
            label: destination.label,
            fallback: destination.fallback,
        });

        let driver = FetchDriver::new(self.session, &path);
        let outcomes = driver
            .run(&extraction.base_url, &plans, &mut |event| {
                observer(RunEvent::Fetch(event))
            })
            .await;

        Ok(RunReport {
            base_url: extraction.base_url,
            destination: path,
            label,
            rejected,
            outcomes,
        })
    }
}
