// src/timeline.rs - Chronological merge of timeline-eligible records

use chrono::NaiveDateTime;

use crate::error::TimestampParseError;
use crate::record::{ParsedRecord, RecordTables, Sequence};
use crate::report::{Report, Reporter};
use crate::rules::RuleCatalog;

/// Timestamp rendering used by the timeline output
pub const TIMELINE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry<'a> {
    /// Normalized to UTC
    pub timestamp: NaiveDateTime,
    pub record: &'a ParsedRecord,
}

impl TimelineEntry<'_> {
    pub fn sort_key(&self) -> (NaiveDateTime, Sequence) {
        (self.timestamp, self.record.sequence)
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMELINE_TIME_FORMAT).to_string()
    }
}

#[derive(Debug, Default)]
pub struct Timeline<'a> {
    pub entries: Vec<TimelineEntry<'a>>,
    /// Eligible records left out because their timestamp did not parse
    pub rejected: Vec<TimestampParseError>,
}

impl Timeline<'_> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Timeliner<'c> {
    catalog: &'c RuleCatalog,
}

impl<'c> Timeliner<'c> {
    pub fn new(catalog: &'c RuleCatalog) -> Self {
        Timeliner { catalog }
    }

    /// Merge every timeline-eligible record of `tables` into one ascending
    /// sequence. Ties on timestamp keep file-then-line order.
    pub fn merge<'a>(&self, tables: &'a RecordTables, reporter: &dyn Reporter) -> Timeline<'a> {
        let mut timeline = Timeline::default();

        for records in tables.values() {
            for record in records {
                if !record.access_type.include_in_timeline() {
                    continue;
                }

                let parsed = self
                    .catalog
                    .get(record.log_type)
                    .and_then(|rule| rule.parse_timestamp(&record.timestamp));
                match parsed {
                    Some(timestamp) => timeline.entries.push(TimelineEntry { timestamp, record }),
                    None => {
                        let error = TimestampParseError {
                            log_type: record.log_type.to_string(),
                            timestamp: record.timestamp.clone(),
                            source_file: record.source_file.clone(),
                            line: record.sequence.line,
                        };
                        reporter.report(Report::TimestampRejected { error: &error });
                        timeline.rejected.push(error);
                    }
                }
            }
        }

        timeline.entries.sort_by_key(|entry| entry.sort_key());
        timeline
    }
}
