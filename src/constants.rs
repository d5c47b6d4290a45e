//! Application constants for JNLP Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

/// Descriptor vocabulary and candidate naming rules
pub mod descriptor {
    /// Root attribute holding the base URL for every relative href
    pub const CODEBASE_ATTR: &str = "codebase";

    /// Resource reference attribute
    pub const HREF_ATTR: &str = "href";

    /// Optional resource version attribute
    pub const VERSION_ATTR: &str = "version";

    /// Application archive element
    pub const JAR_TAG: &str = "jar";

    /// Native library archive element
    pub const NATIVELIB_TAG: &str = "nativelib";

    /// Query appended to an href to request a specific version
    pub const VERSION_QUERY: &str = "?version-id=";

    /// Infix used by the version-in-filename naming convention
    pub const VERSION_MARKER: &str = "__V";

    /// Archive extension
    pub const JAR_EXTENSION: &str = ".jar";
}

/// Destination directory naming
pub mod output {
    /// Length of the random per-run directory name
    pub const RANDOM_DIR_LEN: usize = 10;

    /// Alphabet for the random directory name
    pub const RANDOM_DIR_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    /// Directory used when the random one cannot be used
    pub const FALLBACK_DIR: &str = ".";
}

/// HTTP client configuration constants
pub mod http {
    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("JNLP-Fetcher/", env!("CARGO_PKG_VERSION"));

    /// Idle connections kept per host; one keeps NTLM on the authenticated socket
    pub const POOL_MAX_PER_HOST: usize = 1;
}

/// Credential sources
pub mod auth {
    /// Environment variable consulted when a user flag has no password flag
    pub const PASSWORD_ENV: &str = "JNLP_FETCHER_PASSWORD";
}

/// Configuration file location
pub mod config {
    /// Directory below the platform config dir
    pub const APP_DIR: &str = "jnlp_fetcher";

    /// Configuration file name
    pub const FILE_NAME: &str = "config.toml";
}

/// Console status markers
pub mod status {
    /// Informational or fatal status line
    pub const INFO: &str = "[*]";

    /// An attempt is starting
    pub const ATTEMPT: &str = "[+]";

    /// A file is being written
    pub const SAVE: &str = "[-]";
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}
