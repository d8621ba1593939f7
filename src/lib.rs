// src/lib.rs
pub mod config;
pub mod error;
pub mod extract;
pub mod line_reader;
pub mod logging;
pub mod output_format;
pub mod parser;
pub mod record;
pub mod report;
pub mod rules;
pub mod timeline;
pub mod triage;

pub use error::*;

pub use config::TriageConfig;
pub use extract::{extract, ArchiveFormat, Extractor};
pub use line_reader::{LineReader, Lines};
pub use output_format::{OutputFormat, TableWriter};
pub use parser::{ParseOutcome, Parser};
pub use record::{ParsedRecord, RecordTables, Sequence};
pub use report::{CollectingReporter, NullReporter, Report, Reporter, TracingReporter};
pub use rules::{AccessType, DescriptionHandler, LogTypeRule, RuleCatalog};
pub use timeline::{Timeline, TimelineEntry, Timeliner};
pub use triage::{ArchiveStatus, ArchiveSummary, RunSummary, Triage};
