//! Command-line interface components
//!
//! This module contains CLI-specific code for the JNLP Fetcher application:
//! argument parsing, the run handler with its status trace, and progress
//! display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, GlobalArgs};
pub use commands::{fatal_lines, handle_fetch, ConsoleTrace};
pub use progress::ProgressReporter;
