//! Resource progress bar
//!
//! Counts finished resources while the status trace keeps printing above
//! it. Disabled when stdout is not a terminal, in which case lines are
//! printed plainly.

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} resources";

/// Progress display for one run
#[derive(Default)]
pub struct ProgressReporter {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    /// Shows the bar for `total` resources
    pub fn start(&mut self, total: usize) {
        if !self.enabled || total == 0 {
            return;
        }
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        self.bar = Some(bar);
    }

    /// Prints a status line without corrupting the bar
    pub fn line(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.println(message),
            None => println!("{}", message),
        }
    }

    /// Marks one resource as finished
    pub fn advance(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Removes the bar, leaving the printed lines in place
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(ProgressBar::position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_reporter_has_no_bar() {
        let mut reporter = ProgressReporter::new(false);
        reporter.start(5);
        reporter.advance();
        assert_eq!(reporter.position(), None);
        reporter.finish();
    }

    #[test]
    fn test_enabled_reporter_counts() {
        let mut reporter = ProgressReporter::new(true);
        reporter.start(3);
        reporter.advance();
        reporter.advance();
        assert_eq!(reporter.position(), Some(2));
        reporter.finish();
        assert_eq!(reporter.position(), None);
    }

    #[test]
    fn test_no_bar_for_empty_run() {
        let mut reporter = ProgressReporter::new(true);
        reporter.start(0);
        assert_eq!(reporter.position(), None);
    }
}
