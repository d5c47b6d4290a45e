//! HTTP client configuration and building logic
//!
//! One client serves the whole run: descriptor fetch and every resource
//! attempt share its cookie jar, TLS settings and connection pool.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::TransportResult;

/// Configuration for the session's HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Whole-request timeout; `None` keeps the client default (no timeout)
    pub request_timeout: Option<Duration>,
    /// Connect timeout; `None` keeps the client default
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
    /// Accept any TLS certificate
    pub insecure: bool,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            connect_timeout: None,
            user_agent: http::USER_AGENT.to_string(),
            insecure: false,
            pool_max_per_host: http::POOL_MAX_PER_HOST,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client around the given cookie jar
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the TLS backend cannot be initialised
    pub fn build_http_client(&self, jar: Arc<Jar>) -> TransportResult<Client> {
        let mut client_builder = Client::builder()
            .cookie_provider(jar)
            .user_agent(self.user_agent.as_str())
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(timeout) = self.request_timeout {
            client_builder = client_builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            client_builder = client_builder.connect_timeout(timeout);
        }

        if self.insecure {
            tracing::warn!("TLS certificate validation is disabled for this run");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        Ok(client_builder.build()?)
    }
}
