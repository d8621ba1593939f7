// src/record.rs
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::rules::{AccessType, LineMatch, TIMESTAMP_GROUP};

/// Position of a record in the traversal of the extraction tree.
///
/// `file_index` is the file's rank in the name-sorted walk and `line` is
/// 1-based, so ordering by `Sequence` reproduces "file order, then line
/// order" no matter which worker produced the record first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Sequence {
    pub file_index: usize,
    pub line: usize,
}

/// One matched log line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    /// Relative to the extraction directory
    pub source_file: PathBuf,
    pub log_type: &'static str,
    pub access_type: AccessType,
    /// As captured; normalized only when the timeline is built
    pub timestamp: String,
    pub fields: IndexMap<String, String>,
    pub description: String,
    pub sequence: Sequence,
}

impl ParsedRecord {
    pub fn from_match(
        line_match: &LineMatch,
        log_type: &'static str,
        source_file: &Path,
        sequence: Sequence,
    ) -> Self {
        let access_type = line_match.pattern.access_type();
        let fields = line_match.fields();
        let description = access_type.handler.format(&fields);
        let timestamp = fields
            .get(TIMESTAMP_GROUP)
            .cloned()
            .unwrap_or_default();

        ParsedRecord {
            source_file: source_file.to_path_buf(),
            log_type,
            access_type,
            timestamp,
            fields,
            description,
            sequence,
        }
    }

    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Records per log type name, only for types that matched something
pub type RecordTables = BTreeMap<&'static str, Vec<ParsedRecord>>;
