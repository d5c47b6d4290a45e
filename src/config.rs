//! Configuration management for JNLP Fetcher
//!
//! Settings come from, in increasing precedence: built-in defaults, the
//! config file (`--config FILE`, else `<config_dir>/jnlp_fetcher/config.toml`
//! when present), then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, ParserMode};
use crate::constants::{config, http, logging, output};
use crate::errors::ConfigError;

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Descriptor parsing settings
    pub descriptor: DescriptorConfig,
    /// Destination directory settings
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Request timeout in seconds (None = no timeout)
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds (None = no timeout)
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: String,
    /// Disable TLS certificate validation
    pub insecure: bool,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: None,
            user_agent: http::USER_AGENT.to_string(),
            insecure: false,
        }
    }
}

/// Descriptor parsing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DescriptorConfig {
    /// Reject malformed descriptors instead of recovering
    pub strict: bool,
}

/// Destination directory configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Length of the random per-run directory name
    pub random_dir_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            random_dir_len: output::RANDOM_DIR_LEN,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// Load configuration from an explicit file or the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicitly named file is missing, or if
    /// the file found cannot be read, parsed or validated.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::default_config_path().filter(|path| path.exists()),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Default config file path for the current user, if a config dir exists
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(config::APP_DIR).join(config::FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Checks values serde cannot constrain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.random_dir_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "output.random_dir_len".to_string(),
                value: "0".to_string(),
                reason: "Directory name length must be at least 1".to_string(),
            });
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: format!("Expected one of: {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// Parser mode selected by the file
    pub fn parser_mode(&self) -> ParserMode {
        if self.descriptor.strict {
            ParserMode::Strict
        } else {
            ParserMode::Tolerant
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            user_agent: self.user_agent.clone(),
            insecure: self.insecure,
            ..ClientConfig::default()
        }
    }
}
