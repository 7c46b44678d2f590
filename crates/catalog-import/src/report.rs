//! Human-readable progress output
//!
//! The orchestrator emits one line per flushed chunk and one summary line.
//! Where those lines go is up to the caller.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Sink for progress lines
pub trait ProgressReporter: Send + Sync {
    fn emit(&self, line: &str);

    /// Called once when the run ends, successfully or not
    fn finish(&self) {}
}

/// Spinner on stderr; progress lines are printed above it
pub struct ConsoleReporter {
    spinner: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn emit(&self, line: &str) {
        self.spinner.println(line);
        self.spinner.set_message(line.to_string());
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

/// Reporter that logs each line at INFO
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn emit(&self, line: &str) {
        info!(target: "catalog_import::progress", "{}", line);
    }
}

/// Reporter that keeps every line in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    lines: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProgressReporter for CollectingReporter {
    fn emit(&self, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_keeps_order() {
        let reporter = CollectingReporter::new();
        reporter.emit("chunk 1");
        reporter.emit("chunk 2");
        reporter.finish();
        assert_eq!(reporter.lines(), vec!["chunk 1", "chunk 2"]);
    }

    #[test]
    fn test_console_reporter_finishes() {
        let reporter = ConsoleReporter::new("Importing");
        reporter.emit("Chunk 1 committed");
        reporter.finish();
        assert!(reporter.spinner.is_finished());
    }
}
