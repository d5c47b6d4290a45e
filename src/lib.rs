//! JNLP Fetcher Library
//!
//! Downloads the JAR and native-library archives a JNLP descriptor
//! references, trying version-qualified alternatives when the plain href
//! is not served.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(constants::output::RANDOM_DIR_LEN, 10);
        assert_eq!(constants::auth::PASSWORD_ENV, "JNLP_FETCHER_PASSWORD");
        assert!(constants::http::USER_AGENT.starts_with("JNLP-Fetcher/"));
    }

    #[test]
    fn test_error_types() {
        let auth_error = errors::AuthError::NtlmNoChallenge;
        let app_error = AppError::Auth(auth_error);

        assert_eq!(app_error.category(), "authentication");
        assert!(!app_error.is_clean_exit());
    }
}
