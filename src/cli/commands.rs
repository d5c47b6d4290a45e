//! Command handler for JNLP Fetcher CLI
//!
//! Wires the parsed arguments and configuration into a [`Pipeline`] run and
//! renders its events as the classic `[*]`/`[+]`/`[-]` status trace.

use std::io::{self, IsTerminal};

use tracing::{debug, info};

use crate::app::{DescriptorParser, FetchEvent, Pipeline, RunEvent, SessionClient};
use crate::cli::{Cli, ProgressReporter};
use crate::config::AppConfig;
use crate::constants::status;
use crate::errors::{AppError, FilesystemError, Result, TransportError};

/// Handle a fetch run
///
/// Anticipated fatal conditions (descriptor unreachable, unparsable, or
/// without codebase) are reported as status lines and end the run
/// successfully; only setup failures are returned as errors.
pub async fn handle_fetch(cli: &Cli, config: &AppConfig) -> Result<()> {
    let url = cli
        .descriptor_url()
        .ok_or_else(|| TransportError::InvalidUrl {
            url: String::new(),
            error: "no descriptor URL given".to_string(),
        })?;

    let auth = cli.auth_mode()?;
    let mut client_config = config.client.to_runtime_config();
    client_config.insecure |= cli.insecure;
    let session = SessionClient::new(&client_config, auth)?;

    let output_root = std::env::current_dir().map_err(FilesystemError::CurrentDir)?;
    let parser = DescriptorParser::new(cli.parser_mode(config.parser_mode()));
    let pipeline = Pipeline::new(&session, parser, output_root)
        .with_dir_name_len(config.output.random_dir_len);
    debug!("Parser mode: {}", parser.mode());

    let mut trace = ConsoleTrace::new(ProgressReporter::new(
        io::stdout().is_terminal() && !cli.global.quiet,
    ));
    let result = pipeline
        .run(url, &mut |event| trace.handle(event))
        .await;
    trace.progress.finish();

    match result {
        Ok(report) => {
            info!(
                "Run finished: {} saved, {} missing, {} skipped entries",
                report.saved(),
                report.total() - report.saved(),
                report.rejected
            );
            println!(
                "{} Saved {} of {} resources",
                status::INFO,
                report.saved(),
                report.total()
            );
            Ok(())
        }
        Err(e) if e.is_clean_exit() => {
            info!("Run ended early ({}): {}", e.category(), e);
            for line in fatal_lines(&e, pipeline.parser()) {
                println!("{}", line);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Status lines for a run that stopped at the descriptor
pub fn fatal_lines(error: &AppError, parser: &DescriptorParser) -> Vec<String> {
    let mut lines = vec![format!("{} {}", status::INFO, error)];
    match error {
        AppError::Transport(_) => {
            lines.push(format!("{} Link was inaccessible, exiting.", status::INFO));
        }
        _ => {
            lines.push(format!("{} JNLP file was misformed, exiting.", status::INFO));
            if let Some(hint) = parser.recovery_hint() {
                lines.push(format!("{} {}", status::INFO, hint));
            }
        }
    }
    lines
}

/// Turns run events into console lines and progress updates
pub struct ConsoleTrace {
    progress: ProgressReporter,
    label: String,
}

impl ConsoleTrace {
    pub fn new(progress: ProgressReporter) -> Self {
        Self {
            progress,
            label: String::new(),
        }
    }

    fn handle(&mut self, event: RunEvent) {
        for line in self.lines_for(event) {
            self.progress.line(&line);
        }
    }

    /// Lines to print for an event; also updates progress and the directory label
    pub fn lines_for(&mut self, event: RunEvent) -> Vec<String> {
        match event {
            RunEvent::Rejected(entry) => vec![format!(
                "{} Skipping <{}> entry {}: {}",
                status::INFO,
                entry.kind,
                entry.href.as_deref().unwrap_or("(no href)"),
                entry.reason
            )],
            RunEvent::Planned { resources } => {
                self.progress.start(resources);
                Vec::new()
            }
            RunEvent::Destination {
                label, fallback, ..
            } => {
                self.label = label;
                match fallback {
                    Some(FilesystemError::AlreadyExists { .. }) => vec![format!(
                        "{} Random directory already exists, defaulting to current.",
                        status::INFO
                    )],
                    Some(_) => vec![format!(
                        "{} Failed to create random directory, defaulting to current.",
                        status::INFO
                    )],
                    None => Vec::new(),
                }
            }
            RunEvent::Fetch(event) => self.fetch_lines(event),
        }
    }

    fn fetch_lines(&mut self, event: FetchEvent) -> Vec<String> {
        match event {
            FetchEvent::Attempting { url, .. } => {
                vec![format!("{} Attempting to download: {}", status::ATTEMPT, url)]
            }
            FetchEvent::Rejected { url, error } => {
                debug!("{} rejected: {}", url, error);
                Vec::new()
            }
            FetchEvent::Saved { local_name, .. } => {
                self.progress.advance();
                vec![format!(
                    "{} Saving file: {} to {}",
                    status::SAVE,
                    local_name,
                    self.label
                )]
            }
            FetchEvent::WriteFailed {
                local_name, error, ..
            } => {
                self.progress.advance();
                vec![format!(
                    "{} Failed to save file: {} to {} ({})",
                    status::INFO,
                    local_name,
                    self.label,
                    error
                )]
            }
            FetchEvent::Exhausted { href, attempted } => {
                self.progress.advance();
                vec![format!(
                    "{} Could not download {} after {} attempts",
                    status::INFO,
                    href,
                    attempted
                )]
            }
        }
    }
}
