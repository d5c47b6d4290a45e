//! Core HTTP operations with per-scheme authentication
//!
//! Every GET of a run goes through [`HttpHandler::get`], which attaches
//! session cookies and answers Digest or NTLM challenges. Requests are
//! never retried for transport reasons; the only repeat is the single
//! re-send an authentication challenge calls for.

use std::sync::{Arc, Mutex};

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use url::{Position, Url};

use crate::auth::credentials::{AuthMode, Credentials};
use crate::auth::digest::{DigestChallenge, DigestState};
use crate::auth::ntlm::{self, ChallengeMessage, NtlmAccount};
use crate::errors::{AuthError, TransportResult};

const DIGEST_SCHEME: &str = "Digest";
const NTLM_SCHEME: &str = "NTLM";

/// HTTP operations handler carrying the run's authentication state
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    auth: AuthMode,
    jar: Arc<Jar>,
    /// Last Digest challenge, reused preemptively
    digest: Mutex<Option<DigestState>>,
}

impl HttpHandler {
    /// Creates a handler around a client built with `jar` as its cookie provider
    pub fn new(client: Client, auth: AuthMode, jar: Arc<Jar>) -> Self {
        Self {
            client,
            auth,
            jar,
            digest: Mutex::new(None),
        }
    }

    /// Sends a GET, authenticating as the configured mode requires
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request cannot be sent or a challenge
    /// cannot be answered. Non-success statuses are returned as responses.
    pub async fn get(&self, url: &Url) -> TransportResult<Response> {
        tracing::debug!("GET {} (auth: {})", url, self.auth.scheme());

        match &self.auth {
            AuthMode::None => Ok(self.client.get(url.clone()).send().await?),
            AuthMode::Cookie(cookies) => {
                for cookie in cookies.set_cookie_strings() {
                    self.jar.add_cookie_str(&cookie, url);
                }
                Ok(self.client.get(url.clone()).send().await?)
            }
            AuthMode::Basic(creds) => Ok(self
                .client
                .get(url.clone())
                .basic_auth(&creds.username, Some(&creds.password))
                .send()
                .await?),
            AuthMode::Digest(creds) => self.get_digest(url, creds).await,
            AuthMode::Ntlm(creds) => self.get_ntlm(url, creds).await,
        }
    }

    async fn get_digest(&self, url: &Url, creds: &Credentials) -> TransportResult<Response> {
        let uri = &url[Position::BeforePath..Position::AfterQuery];

        let mut request = self.client.get(url.clone());
        if let Some(header) = self.next_digest_header(creds, uri) {
            request = request.header(AUTHORIZATION, header_value(&header)?);
        }
        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = challenge_header(response.headers(), DIGEST_SCHEME)
            .map(DigestChallenge::parse)
            .transpose()?;
        let Some(challenge) = challenge else {
            return Ok(response);
        };
        drain(response).await;

        let header = {
            let mut state = DigestState::new(challenge);
            let header = state.authorization(&creds.username, &creds.password, "GET", uri);
            *self.digest.lock().unwrap_or_else(|p| p.into_inner()) = Some(state);
            header
        };
        tracing::debug!("Answering Digest challenge for {}", url);
        self.send_authorized(url, &header).await
    }

    fn next_digest_header(&self, creds: &Credentials, uri: &str) -> Option<String> {
        let mut guard = self.digest.lock().unwrap_or_else(|p| p.into_inner());
        guard
            .as_mut()
            .map(|state| state.authorization(&creds.username, &creds.password, "GET", uri))
    }

    async fn get_ntlm(&self, url: &Url, creds: &Credentials) -> TransportResult<Response> {
        let response = self.client.get(url.clone()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED
            || !offers_scheme(response.headers(), NTLM_SCHEME)
        {
            return Ok(response);
        }
        drain(response).await;

        tracing::debug!("Starting NTLM handshake for {}", url);
        let negotiate = ntlm::header_value(&ntlm::negotiate_message());
        let response = self.send_authorized(url, &negotiate).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let payload = challenge_header(response.headers(), NTLM_SCHEME)
            .and_then(ntlm::challenge_payload)
            .map(str::to_string)
            .ok_or(AuthError::NtlmNoChallenge)?;
        let challenge = ChallengeMessage::from_base64(&payload)?;
        drain(response).await;

        let account = NtlmAccount::new(&creds.username, &creds.password);
        let authenticate = ntlm::authenticate_message(&account, &challenge)?;
        self.send_authorized(url, &ntlm::header_value(&authenticate))
            .await
    }

    async fn send_authorized(&self, url: &Url, authorization: &str) -> TransportResult<Response> {
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, header_value(authorization)?)
            .send()
            .await?;
        Ok(response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    Ok(HeaderValue::from_str(value)?)
}

/// Reads and discards a body so the connection can be reused
async fn drain(response: Response) {
    if let Err(e) = response.bytes().await {
        tracing::debug!("Discarding challenge body failed: {}", e);
    }
}

fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or_default()
}

/// First `WWW-Authenticate` value whose scheme is `scheme`
fn challenge_header<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| first_token(value).eq_ignore_ascii_case(scheme))
}

/// Whether any challenge, including comma-joined ones, names `scheme`
fn offers_scheme(headers: &HeaderMap, scheme: &str) -> bool {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|challenge| first_token(challenge).eq_ignore_ascii_case(scheme))
}
