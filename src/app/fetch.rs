//! Fetch driver: walks attempt plans against an HTTP session
//!
//! Resources are processed one at a time and attempts in plan order. The
//! first 200 for a resource is written to disk and ends that resource; any
//! other status, transport failure or unusable URL moves on to the next
//! attempt. Nothing here is fatal to the run except the descriptor fetch.

use std::path::{Path, PathBuf};

use url::Url;

use crate::app::client::HttpSession;
use crate::app::plan::{Attempt, AttemptKind, AttemptPlan};
use crate::errors::{TransportError, TransportResult};

/// Progress of the driver, reported to the caller as it happens
#[derive(Debug)]
pub enum FetchEvent {
    /// A GET is about to be issued
    Attempting { url: String, kind: AttemptKind },
    /// An attempt did not produce a file
    Rejected { url: String, error: TransportError },
    /// A body was written
    Saved {
        local_name: String,
        path: PathBuf,
        bytes: usize,
    },
    /// A 200 was received but the file could not be written
    WriteFailed {
        local_name: String,
        path: PathBuf,
        error: std::io::Error,
    },
    /// Every attempt for a resource failed
    Exhausted { href: String, attempted: usize },
}

/// Final state of one resource
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved {
        local_name: String,
        path: PathBuf,
        uri: String,
    },
    NotFound {
        /// URLs tried, in order
        attempted: Vec<String>,
    },
    Unwritable {
        local_name: String,
        error: std::io::Error,
    },
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, DownloadOutcome::Saved { .. })
    }
}

/// Sequential downloader bound to one session and one destination directory
pub struct FetchDriver<'a, S: HttpSession + ?Sized> {
    session: &'a S,
    destination: &'a Path,
}

impl<'a, S: HttpSession + ?Sized> FetchDriver<'a, S> {
    pub fn new(session: &'a S, destination: &'a Path) -> Self {
        Self {
            session,
            destination,
        }
    }

    /// Fetches every plan in order, one outcome per plan
    ///
    /// # Arguments
    ///
    /// * `base_url` - Codebase with its trailing `/`
    /// * `plans` - Attempt plans in download order
    /// * `observer` - Receives every [`FetchEvent`]
    pub async fn run<F>(
        &self,
        base_url: &str,
        plans: &[AttemptPlan],
        observer: &mut F,
    ) -> Vec<DownloadOutcome>
    where
        F: FnMut(FetchEvent),
    {
        let mut outcomes = Vec::with_capacity(plans.len());
        for plan in plans {
            outcomes.push(self.fetch_resource(base_url, plan, observer).await);
        }

        let saved = outcomes.iter().filter(|o| o.is_saved()).count();
        tracing::info!("Saved {} of {} resources", saved, plans.len());
        outcomes
    }

    /// Tries the attempts of one plan until one is saved
    pub async fn fetch_resource<F>(
        &self,
        base_url: &str,
        plan: &AttemptPlan,
        observer: &mut F,
    ) -> DownloadOutcome
    where
        F: FnMut(FetchEvent),
    {
        let mut attempted = Vec::with_capacity(plan.attempts.len());

        for attempt in &plan.attempts {
            let url = format!("{}{}", base_url, attempt.remote);
            attempted.push(url.clone());
            observer(FetchEvent::Attempting {
                url: url.clone(),
                kind: attempt.kind,
            });

            let body = match self.try_attempt(&url).await {
                Ok(body) => body,
                Err(error) => {
                    tracing::debug!("{} attempt failed for {}: {}", attempt.kind, url, error);
                    observer(FetchEvent::Rejected { url, error });
                    continue;
                }
            };

            return self.save(attempt, url, body, observer).await;
        }

        tracing::warn!(
            "No candidate for {} could be downloaded ({} tried)",
            plan.resource.href,
            attempted.len()
        );
        observer(FetchEvent::Exhausted {
            href: plan.resource.href.clone(),
            attempted: attempted.len(),
        });
        DownloadOutcome::NotFound { attempted }
    }

    async fn try_attempt(&self, url: &str) -> TransportResult<Vec<u8>> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })?;
        let response = self.session.get(&url).await?;
        if !response.is_ok() {
            return Err(TransportError::Status {
                status: response.status,
            });
        }
        Ok(response.body)
    }

    async fn save<F>(
        &self,
        attempt: &Attempt,
        uri: String,
        body: Vec<u8>,
        observer: &mut F,
    ) -> DownloadOutcome
    where
        F: FnMut(FetchEvent),
    {
        let path = self.destination.join(&attempt.local_name);
        let bytes = body.len();

        match tokio::fs::write(&path, body).await {
            Ok(()) => {
                tracing::debug!("Wrote {} bytes to {}", bytes, path.display());
                observer(FetchEvent::Saved {
                    local_name: attempt.local_name.clone(),
                    path: path.clone(),
                    bytes,
                });
                DownloadOutcome::Saved {
                    local_name: attempt.local_name.clone(),
                    path,
                    uri,
                }
            }
            Err(error) => {
                tracing::warn!("Failed to write {}: {}", path.display(), error);
                let outcome_error = std::io::Error::new(error.kind(), error.to_string());
                observer(FetchEvent::WriteFailed {
                    local_name: attempt.local_name.clone(),
                    path,
                    error,
                });
                DownloadOutcome::Unwritable {
                    local_name: attempt.local_name.clone(),
                    error: outcome_error,
                }
            }
        }
    }
}

/// Downloads the descriptor itself
///
/// # Errors
///
/// Returns `TransportError::Status` for any status other than 200, or the
/// underlying transport error.
pub async fn fetch_descriptor<S: HttpSession + ?Sized>(
    session: &S,
    url: &Url,
) -> TransportResult<Vec<u8>> {
    tracing::info!("Fetching descriptor {}", url);
    let response = session.get(url).await?;
    if !response.is_ok() {
        return Err(TransportError::Status {
            status: response.status,
        });
    }
    Ok(response.body)
}
