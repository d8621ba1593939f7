// src/output_format.rs - Delimited result tables
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::TriageError;
use crate::record::ParsedRecord;
use crate::rules::{LogTypeRule, DESCRIPTION_GROUP, TIMESTAMP_GROUP};
use crate::timeline::Timeline;

pub const SOURCE_FILE_COLUMN: &str = "Source File";
pub const ACCESS_TYPE_COLUMN: &str = "Access Type";
pub const TIMELINE_HEADER: [&str; 6] = [
    "Timestamp",
    "Log Type",
    "Access Type",
    "Source File",
    "Fields",
    "Description",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[value(name = "csv", help = "Comma-separated values")]
    Csv,
    #[value(name = "tsv", help = "Tab-separated values")]
    Tsv,
}

impl OutputFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Writes per-log-type tables and the merged timeline
#[derive(Debug, Clone, Copy)]
pub struct TableWriter {
    format: OutputFormat,
}

impl TableWriter {
    pub fn new(format: OutputFormat) -> Self {
        TableWriter { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn writer<W: Write>(&self, output: W) -> csv::Writer<W> {
        csv::WriterBuilder::new()
            .delimiter(self.format.delimiter())
            .from_writer(output)
    }

    /// Column order for a log type's table: source, timestamp and access type
    /// first, the description last, every other captured group in between.
    pub fn log_type_header(rule: &LogTypeRule) -> Vec<&str> {
        let mut header = vec![SOURCE_FILE_COLUMN, TIMESTAMP_GROUP, ACCESS_TYPE_COLUMN];
        header.extend(
            rule.field_names()
                .iter()
                .map(String::as_str)
                .filter(|name| *name != TIMESTAMP_GROUP && *name != DESCRIPTION_GROUP),
        );
        header.push(DESCRIPTION_GROUP);
        header
    }

    pub fn write_log_type<W: Write>(
        &self,
        output: W,
        rule: &LogTypeRule,
        records: &[ParsedRecord],
    ) -> csv::Result<()> {
        let header = Self::log_type_header(rule);
        let mut writer = self.writer(output);
        writer.write_record(&header)?;

        for record in records {
            let source = record.source_file.display().to_string();
            let row = header.iter().map(|column| match *column {
                SOURCE_FILE_COLUMN => source.as_str(),
                TIMESTAMP_GROUP => record.timestamp.as_str(),
                ACCESS_TYPE_COLUMN => record.access_type.label,
                DESCRIPTION_GROUP => record.description.as_str(),
                field => record.field(field),
            });
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_timeline<W: Write>(&self, output: W, timeline: &Timeline) -> csv::Result<()> {
        let mut writer = self.writer(output);
        writer.write_record(TIMELINE_HEADER)?;

        for entry in &timeline.entries {
            let record = entry.record;
            let timestamp = entry.formatted_timestamp();
            let source = record.source_file.display().to_string();
            let fields = logfmt_fields(record);
            writer.write_record([
                timestamp.as_str(),
                record.log_type,
                record.access_type.label,
                source.as_str(),
                fields.as_str(),
                record.description.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// `<dir>/<log type>.<ext>`
    pub fn write_log_type_file(
        &self,
        dir: &Path,
        rule: &LogTypeRule,
        records: &[ParsedRecord],
    ) -> Result<PathBuf, TriageError> {
        let path = dir.join(format!("{}.{}", rule.name(), self.format.extension()));
        let file = create(&path)?;
        self.write_log_type(BufWriter::new(file), rule, records)
            .map_err(|source| TriageError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// `<dir>/<stem>.<ext>`
    pub fn write_timeline_file(
        &self,
        dir: &Path,
        stem: &str,
        timeline: &Timeline,
    ) -> Result<PathBuf, TriageError> {
        let path = dir.join(format!("{}.{}", stem, self.format.extension()));
        let file = create(&path)?;
        self.write_timeline(BufWriter::new(file), timeline)
            .map_err(|source| TriageError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

fn create(path: &Path) -> Result<File, TriageError> {
    File::create(path).map_err(|e| TriageError::Write {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Captured fields other than timestamp and description as `key=value`
/// pairs. Empty fields are left out.
pub fn logfmt_fields(record: &ParsedRecord) -> String {
    record
        .fields
        .iter()
        .filter(|(key, value)| {
            !value.is_empty() && key.as_str() != TIMESTAMP_GROUP && key.as_str() != DESCRIPTION_GROUP
        })
        .map(|(key, value)| {
            if needs_quoting(value) {
                format!("{}=\"{}\"", key, value.replace('"', "\\\""))
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn needs_quoting(value: &str) -> bool {
    value.contains(' ')
        || value.contains('\t')
        || value.contains('\n')
        || value.contains('"')
        || value.contains('=')
}
