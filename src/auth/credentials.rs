//! Credential resolution for the HTTP session
//!
//! A user flag without its password flag falls back to the
//! `JNLP_FETCHER_PASSWORD` environment variable (which `.env` may supply),
//! then to an interactive prompt.

use std::env;
use std::fmt;
use std::io;

use crate::auth::cookie::CookieSet;
use crate::constants::auth;
use crate::errors::{AuthError, AuthResult};

/// Username and password pair; the password never appears in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How requests of a run authenticate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    None,
    Basic(Credentials),
    Digest(Credentials),
    /// Username given as `DOMAIN\user`
    Ntlm(Credentials),
    Cookie(CookieSet),
}

impl AuthMode {
    /// Short scheme name for logging
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Basic(_) => "basic",
            AuthMode::Digest(_) => "digest",
            AuthMode::Ntlm(_) => "ntlm",
            AuthMode::Cookie(_) => "cookie",
        }
    }
}

/// Completes a username with a password from the flag, the environment, or a prompt
///
/// # Errors
///
/// Returns `AuthError::Prompt` if the terminal prompt fails.
pub fn resolve_password(username: &str, password: Option<String>) -> AuthResult<Credentials> {
    resolve_password_with(
        username,
        password,
        || env::var(auth::PASSWORD_ENV).ok(),
        |prompt| rpassword::prompt_password(prompt),
    )
}

/// Same as [`resolve_password`] with injectable sources
pub fn resolve_password_with<E, P>(
    username: &str,
    password: Option<String>,
    env_lookup: E,
    prompt: P,
) -> AuthResult<Credentials>
where
    E: FnOnce() -> Option<String>,
    P: FnOnce(&str) -> io::Result<String>,
{
    if let Some(password) = password {
        return Ok(Credentials::new(username, password));
    }
    if let Some(password) = env_lookup() {
        tracing::debug!("Using password from {}", auth::PASSWORD_ENV);
        return Ok(Credentials::new(username, password));
    }

    let password = prompt(&format!("Password for {}: ", username)).map_err(AuthError::Prompt)?;
    Ok(Credentials::new(username, password))
}
