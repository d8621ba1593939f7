// src/config.rs
use serde::Serialize;
use std::time::Duration;

use crate::output_format::OutputFormat;

/// Configuration for a triage run
#[derive(Debug, Clone, Serialize)]
pub struct TriageConfig {
    /// Parser worker threads per archive
    pub worker_count: usize,
    pub output_format: OutputFormat,
    /// Extract only files some log type recognizes
    pub logs_only: bool,
    /// Give up on a single file after this long
    #[serde(with = "humantime_option")]
    pub file_timeout: Option<Duration>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        TriageConfig {
            worker_count: default_worker_count(),
            output_format: OutputFormat::default(), // csv
            logs_only: false,
            file_timeout: None, // Disabled
        }
    }
}

/// One worker per available core
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

mod humantime_option {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.collect_str(&humantime::format_duration(*duration)),
            None => serializer.serialize_none(),
        }
    }
}
