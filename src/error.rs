// src/error.rs
use std::path::PathBuf;

/// Failure to unpack one archive. Fatal for that archive only.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("corrupt archive {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("unsafe entry '{entry}' in {}: resolves outside the destination", archive.display())]
    UnsafeEntry { archive: PathBuf, entry: String },

    #[error("I/O error extracting {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to read one file of the extraction tree.
///
/// `Io` keeps the records matched before the failing line; `Unreadable`
/// and `TimedOut` drop the whole file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("cannot open {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed in {} at line {line}: {source}", path.display())]
    Io {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("gave up on {} after {elapsed:?} (limit {limit:?})", path.display())]
    TimedOut {
        path: PathBuf,
        elapsed: std::time::Duration,
        limit: std::time::Duration,
    },
}

impl ReadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            ReadError::Unreadable { path, .. }
            | ReadError::Io { path, .. }
            | ReadError::TimedOut { path, .. } => path,
        }
    }
}

/// A timeline-eligible record whose timestamp matched none of its log type's layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{log_type} timestamp '{timestamp}' in {} line {line} does not parse", source_file.display())]
pub struct TimestampParseError {
    pub log_type: String,
    pub timestamp: String,
    pub source_file: PathBuf,
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("log type '{log_type}': invalid regex: {source}")]
    Regex {
        log_type: String,
        #[source]
        source: regex::Error,
    },

    #[error("log type '{log_type}': pattern for {access_type} lacks required group '{group}'")]
    MissingGroup {
        log_type: String,
        access_type: String,
        group: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("cannot prepare output directory {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot scan input directory {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("failed writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed writing summary {}: {source}", path.display())]
    Summary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
