//! Command-line argument parsing for JNLP Fetcher
//!
//! The flag set keeps the names long-time users of JNLP downloaders expect
//! (`--link`, `--ntlmuser`, `--basicpass`, ...) on top of clap derive.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser};
use url::Url;

use crate::app::ParserMode;
use crate::auth::{resolve_password, AuthMode, CookieSet, Credentials};
use crate::errors::AuthResult;

/// JNLP Fetcher - download the archives a JNLP descriptor references
#[derive(Parser, Debug)]
#[command(
    name = "jnlp_fetcher",
    version,
    about = "Download JAR files associated with a JNLP file.",
    after_help = "Example: jnlp_fetcher https://www.example.com/java/jnlp/sample.jnlp"
)]
#[command(group(
    ArgGroup::new("link_source")
        .required(true)
        .args(["url", "link"])
))]
#[command(group(
    ArgGroup::new("auth")
        .multiple(false)
        .args(["ntlm_user", "basic_user", "digest_user", "cookie"])
))]
pub struct Cli {
    /// The full URL to the JNLP file (must include http(s)://)
    #[arg(value_name = "URL")]
    pub url: Option<Url>,

    /// Same as <URL> (for backwards compatibility)
    #[arg(long, value_name = "URL")]
    pub link: Option<Url>,

    /// Disable server TLS certificate validation for every request
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Use NTLM authentication with this username (DOMAIN\username)
    #[arg(long = "ntlmuser", value_name = "DOMAIN\\USER")]
    pub ntlm_user: Option<String>,

    /// Password for --ntlmuser
    #[arg(long = "ntlmpass", value_name = "PASSWORD", requires = "ntlm_user")]
    pub ntlm_pass: Option<String>,

    /// Use BASIC authentication with this username
    #[arg(long = "basicuser", value_name = "USER")]
    pub basic_user: Option<String>,

    /// Password for --basicuser
    #[arg(long = "basicpass", value_name = "PASSWORD", requires = "basic_user")]
    pub basic_pass: Option<String>,

    /// Use DIGEST authentication with this username
    #[arg(long = "digestuser", value_name = "USER")]
    pub digest_user: Option<String>,

    /// Password for --digestuser
    #[arg(long = "digestpass", value_name = "PASSWORD", requires = "digest_user")]
    pub digest_pass: Option<String>,

    /// Use a previously established session cookie ("name=value;name2=value2")
    #[arg(long, value_name = "COOKIE")]
    pub cookie: Option<String>,

    /// Fail on malformed descriptors instead of recovering what can be read
    #[arg(long)]
    pub strict_xml: bool,

    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Logging and configuration options
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Descriptor URL from the positional argument or `--link`
    pub fn descriptor_url(&self) -> Option<&Url> {
        self.url.as_ref().or(self.link.as_ref())
    }

    /// Get the logging level from the flags, if any flag asks for one
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }

    /// `--strict-xml` forces strict parsing, otherwise the configured mode applies
    pub fn parser_mode(&self, configured: ParserMode) -> ParserMode {
        if self.strict_xml {
            ParserMode::Strict
        } else {
            configured
        }
    }

    /// Builds the authentication mode, prompting for missing passwords
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Prompt` if a password has to be read and cannot be
    pub fn auth_mode(&self) -> AuthResult<AuthMode> {
        self.auth_mode_with(resolve_password)
    }

    /// Same as [`Cli::auth_mode`] with an injectable password source
    pub fn auth_mode_with<R>(&self, resolve: R) -> AuthResult<AuthMode>
    where
        R: FnOnce(&str, Option<String>) -> AuthResult<Credentials>,
    {
        if let Some(user) = &self.ntlm_user {
            return Ok(AuthMode::Ntlm(resolve(user, self.ntlm_pass.clone())?));
        }
        if let Some(user) = &self.basic_user {
            return Ok(AuthMode::Basic(resolve(user, self.basic_pass.clone())?));
        }
        if let Some(user) = &self.digest_user {
            return Ok(AuthMode::Digest(resolve(user, self.digest_pass.clone())?));
        }
        if let Some(raw) = &self.cookie {
            let cookies = CookieSet::parse(raw);
            if cookies.is_empty() {
                tracing::warn!("--cookie contained no usable name=value pair");
            }
            return Ok(AuthMode::Cookie(cookies));
        }
        Ok(AuthMode::None)
    }
}
