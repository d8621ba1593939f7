// src/parser.rs - Concurrent classification of an extraction tree

use crossbeam_channel::bounded;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::error::ReadError;
use crate::line_reader::LineReader;
use crate::record::{ParsedRecord, RecordTables, Sequence};
use crate::report::{Report, Reporter};
use crate::rules::{LogTypeRule, RuleCatalog};

/// Lines between deadline checks when a per-file timeout is set
const TIMEOUT_CHECK_INTERVAL: usize = 256;

/// Result of parsing one extraction tree
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Per log type, sorted by sequence; types with no records are absent
    pub tables: RecordTables,
    /// Regular files visited, matched or not
    pub files_scanned: usize,
    /// Relative paths of files no log type claimed
    pub unmatched_files: Vec<PathBuf>,
    pub failures: Vec<ReadError>,
}

impl ParseOutcome {
    pub fn record_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

struct FileJob<'c> {
    index: usize,
    path: PathBuf,
    relative: PathBuf,
    rule: &'c LogTypeRule,
}

/// Records from one file, plus the error that ended the scan early, if any
struct FileScan {
    records: Vec<ParsedRecord>,
    failure: Option<ReadError>,
}

impl FileScan {
    fn failed(error: ReadError) -> Self {
        FileScan {
            records: Vec::new(),
            failure: Some(error),
        }
    }
}

pub struct Parser<'c> {
    catalog: &'c RuleCatalog,
    worker_count: usize,
    file_timeout: Option<Duration>,
}

impl<'c> Parser<'c> {
    pub fn new(catalog: &'c RuleCatalog, worker_count: usize) -> Self {
        Parser {
            catalog,
            worker_count: worker_count.max(1),
            file_timeout: None,
        }
    }

    /// Abandon a single file once reading it takes longer than `limit`
    pub fn with_file_timeout(mut self, limit: Option<Duration>) -> Self {
        self.file_timeout = limit;
        self
    }

    /// Walk `extraction_dir` and classify every line of every recognized file.
    ///
    /// Files are distributed over a bounded pool of workers. A read error
    /// partway through a file is reported and the lines before it are kept.
    /// A file that cannot be opened or runs past the timeout contributes no
    /// records. Either way the rest of the tree is still processed.
    pub fn process(&self, extraction_dir: &Path, reporter: &dyn Reporter) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let mut jobs = Vec::new();

        let walker = WalkDir::new(extraction_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(extraction_dir).to_path_buf();
                    let error = ReadError::Unreadable {
                        path,
                        source: err.into(),
                    };
                    reporter.report(Report::FileFailed { error: &error });
                    outcome.failures.push(error);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let index = outcome.files_scanned;
            outcome.files_scanned += 1;

            let relative = entry
                .path()
                .strip_prefix(extraction_dir)
                .unwrap_or(entry.path())
                .to_path_buf();
            let file_name = entry.file_name().to_string_lossy();
            match self.catalog.rule_for_file(&file_name) {
                Some(rule) => jobs.push(FileJob {
                    index,
                    path: entry.path().to_path_buf(),
                    relative,
                    rule,
                }),
                None => {
                    reporter.report(Report::UnmatchedFile { path: &relative });
                    outcome.unmatched_files.push(relative);
                }
            }
        }

        tracing::debug!(
            dir = %extraction_dir.display(),
            files = outcome.files_scanned,
            recognized = jobs.len(),
            "parsing extraction tree"
        );

        let tables: HashMap<&'static str, Mutex<Vec<ParsedRecord>>> = self
            .catalog
            .rules()
            .iter()
            .map(|rule| (rule.name(), Mutex::new(Vec::new())))
            .collect();
        let failures = Mutex::new(Vec::new());
        let workers = self.worker_count.min(jobs.len()).max(1);
        let (sender, receiver) = bounded::<FileJob>(workers * 2);

        thread::scope(|scope| {
            for _ in 0..workers {
                let receiver = receiver.clone();
                let tables = &tables;
                let failures = &failures;
                scope.spawn(move || {
                    for job in receiver.iter() {
                        let scan = self.scan_file(&job);
                        if !scan.records.is_empty() {
                            if let Some(table) = tables.get(job.rule.name()) {
                                table
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .extend(scan.records);
                            }
                        }
                        if let Some(error) = scan.failure {
                            reporter.report(Report::FileFailed { error: &error });
                            failures
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push(error);
                        }
                    }
                });
            }
            drop(receiver);

            for job in jobs {
                if sender.send(job).is_err() {
                    break;
                }
            }
            drop(sender);
        });

        for (name, table) in tables {
            let mut records = table.into_inner().unwrap_or_else(PoisonError::into_inner);
            if records.is_empty() {
                continue;
            }
            records.sort_by_key(|record| record.sequence);
            outcome.tables.insert(name, records);
        }
        outcome
            .failures
            .extend(failures.into_inner().unwrap_or_else(PoisonError::into_inner));
        outcome.failures.sort_by(|a, b| a.path().cmp(b.path()));

        outcome
    }

    fn scan_file(&self, job: &FileJob) -> FileScan {
        let started = Instant::now();
        let mut records = Vec::new();

        let lines = match LineReader::open(&job.path) {
            Ok(lines) => lines,
            Err(error) => return FileScan::failed(error),
        };
        for (i, line) in lines.enumerate() {
            let line_number = i + 1;
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    // keep what was matched before the damage
                    return FileScan {
                        records,
                        failure: Some(ReadError::Io {
                            path: job.path.clone(),
                            line: line_number,
                            source,
                        }),
                    };
                }
            };

            if let Some(limit) = self.file_timeout {
                if line_number % TIMEOUT_CHECK_INTERVAL == 0 && started.elapsed() > limit {
                    return FileScan::failed(ReadError::TimedOut {
                        path: job.path.clone(),
                        elapsed: started.elapsed(),
                        limit,
                    });
                }
            }

            if let Some(line_match) = job.rule.match_line(&line) {
                records.push(ParsedRecord::from_match(
                    &line_match,
                    job.rule.name(),
                    &job.relative,
                    Sequence {
                        file_index: job.index,
                        line: line_number,
                    },
                ));
            }
        }

        FileScan {
            records,
            failure: None,
        }
    }
}
