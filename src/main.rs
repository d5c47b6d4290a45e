//! JNLP Fetcher CLI application
//!
//! Fetches a JNLP descriptor and downloads every archive it references
//! into a fresh random directory.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use jnlp_fetcher::cli::{handle_fetch, Cli};
use jnlp_fetcher::config::AppConfig;
use jnlp_fetcher::errors::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("JNLP Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    handle_fetch(&cli, &config).await
}

/// Initialize logging from CLI verbosity, falling back to the config file level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.to_lowercase());

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("jnlp_fetcher={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
