// src/report.rs - Diagnostics sink for the parsing core
use std::path::Path;
use std::sync::Mutex;

use crate::error::{ExtractionError, ReadError, TimestampParseError};

/// A non-fatal event worth telling the operator about
#[derive(Debug)]
pub enum Report<'a> {
    /// Input file that is not a supported archive
    UnsupportedInput { path: &'a Path },
    ArchiveFailed {
        archive: &'a Path,
        error: &'a ExtractionError,
    },
    /// Extracted file no log type claims
    UnmatchedFile { path: &'a Path },
    FileFailed { error: &'a ReadError },
    TimestampRejected { error: &'a TimestampParseError },
}

/// Receives diagnostics from the extractor, parser and timeliner.
///
/// Called from worker threads, so implementations must be shareable.
pub trait Reporter: Send + Sync {
    fn report(&self, report: Report<'_>);
}

/// Forwards every report to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: Report<'_>) {
        match report {
            Report::UnsupportedInput { path } => {
                tracing::info!(path = %path.display(), "skipping unsupported input")
            }
            Report::ArchiveFailed { archive, error } => {
                tracing::error!(archive = %archive.display(), "{}", error)
            }
            Report::UnmatchedFile { path } => {
                tracing::debug!(path = %path.display(), "no log type for file")
            }
            Report::FileFailed { error } => tracing::warn!("{}", error),
            Report::TimestampRejected { error } => tracing::warn!("{}", error),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _report: Report<'_>) {}
}

/// Keeps rendered reports in memory, in arrival order
#[derive(Debug, Default)]
pub struct CollectingReporter {
    messages: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, report: Report<'_>) {
        let message = match report {
            Report::UnsupportedInput { path } => format!("unsupported input: {}", path.display()),
            Report::ArchiveFailed { error, .. } => error.to_string(),
            Report::UnmatchedFile { path } => format!("unmatched file: {}", path.display()),
            Report::FileFailed { error } => error.to_string(),
            Report::TimestampRejected { error } => error.to_string(),
        };
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, report: Report<'_>) {
        (**self).report(report)
    }
}
