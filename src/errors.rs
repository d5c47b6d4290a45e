//! Error types for JNLP Fetcher
//!
//! Every anticipated failure of a run maps onto one of these enums. The CLI
//! decides per class whether it is fatal (descriptor transport, parse and
//! codebase errors), degrades (filesystem) or is merely reported (resource
//! transport).

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// HTTP transport errors for the descriptor fetch and resource attempts
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with something other than 200
    #[error("{}", status_line(.status))]
    Status { status: StatusCode },

    /// URL assembled from the codebase and href does not parse
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Authentication handshake failed before a response was obtained
    #[error(transparent)]
    Auth(#[from] AuthError),
}

fn status_line(status: &StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Descriptor markup could not be turned into a tree
#[derive(Error, Debug)]
pub enum ParseError {
    /// Strict mode rejects bytes the document encoding cannot represent
    #[error("Descriptor is not valid {encoding}")]
    Encoding { encoding: &'static str },

    /// XML declaration names an encoding we cannot decode
    #[error("Unsupported descriptor encoding: {0}")]
    UnknownEncoding(String),

    /// Strict parser rejected the markup
    #[error("Malformed XML: {0}")]
    Strict(#[from] roxmltree::Error),

    /// Tolerant parser recovered no element; the first markup error seen
    #[error("Malformed XML at byte {position}: {reason}")]
    Tolerant { position: u64, reason: String },

    /// Input contained no element at all
    #[error("Descriptor has no root element")]
    MissingRoot,
}

/// Parsed descriptor lacks what every run needs
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Root element has no `codebase` attribute
    #[error("Descriptor root <{root}> has no codebase attribute")]
    MissingCodebase { root: String },

    /// `codebase` is present but blank
    #[error("Descriptor root <{root}> has an empty codebase attribute")]
    EmptyCodebase { root: String },
}

/// Destination directory problems
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Randomly named directory collides with an existing entry
    #[error("Directory already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Directory could not be created
    #[error("Failed to create directory {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Current working directory could not be determined
    #[error("Current directory is not accessible: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Reading a password from the terminal failed
    #[error("Failed to read password: {0}")]
    Prompt(#[source] std::io::Error),

    /// WWW-Authenticate header could not be understood
    #[error("Malformed {scheme} challenge: {reason}")]
    MalformedChallenge { scheme: &'static str, reason: String },

    /// Digest challenge asks for something we do not implement
    #[error("Unsupported digest {what}: {value}")]
    UnsupportedDigest { what: &'static str, value: String },

    /// Server never sent an NTLM challenge after our negotiate message
    #[error("Server did not answer the NTLM negotiate message with a challenge")]
    NtlmNoChallenge,

    /// Computed header value is not a valid HTTP header
    #[error("Invalid authorization header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format in {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Whether the run ends with a clean status line rather than an error exit
    pub fn is_clean_exit(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_) | AppError::Parse(_) | AppError::Descriptor(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Transport(_) => "transport",
            AppError::Parse(_) => "parse",
            AppError::Descriptor(_) => "descriptor",
            AppError::Filesystem(_) => "filesystem",
            AppError::Auth(_) => "authentication",
            AppError::Config(_) => "config",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Parse result type alias
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Descriptor result type alias
pub type DescriptorResult<T> = std::result::Result<T, DescriptorError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;
