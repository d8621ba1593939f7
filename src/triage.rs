// src/triage.rs - Per-archive orchestration: extract, parse, merge, write

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use crate::config::TriageConfig;
use crate::error::{ExtractionError, TriageError};
use crate::extract::{ArchiveFormat, Extractor};
use crate::output_format::TableWriter;
use crate::parser::Parser;
use crate::report::{Report, Reporter};
use crate::rules::RuleCatalog;
use crate::timeline::Timeliner;

pub const RESULTS_SUFFIX: &str = "_results";
pub const EXTRACTED_DIR: &str = "Extracted_logs";
pub const TIMELINE_STEM: &str = "Timeline";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArchiveStatus {
    Completed,
    /// Extraction stopped early; whatever made it to disk was still parsed
    Partial { reason: String },
    Failed { reason: String },
}

/// What happened to one archive; also written as its `summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub archive: PathBuf,
    pub results_dir: PathBuf,
    pub status: ArchiveStatus,
    pub extracted_files: usize,
    pub files_scanned: usize,
    /// Record count per log type that matched anything
    pub records: BTreeMap<String, usize>,
    pub timeline_entries: usize,
    pub unmatched_files: Vec<PathBuf>,
    pub file_failures: Vec<String>,
    pub rejected_timestamps: Vec<String>,
    pub outputs: Vec<PathBuf>,
    pub elapsed_secs: f64,
}

impl ArchiveSummary {
    fn new(archive: &Path, results_dir: &Path) -> Self {
        ArchiveSummary {
            archive: archive.to_path_buf(),
            results_dir: results_dir.to_path_buf(),
            status: ArchiveStatus::Completed,
            extracted_files: 0,
            files_scanned: 0,
            records: BTreeMap::new(),
            timeline_entries: 0,
            unmatched_files: Vec::new(),
            file_failures: Vec::new(),
            rejected_timestamps: Vec::new(),
            outputs: Vec::new(),
            elapsed_secs: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ArchiveStatus::Completed
    }

    pub fn record_count(&self) -> usize {
        self.records.values().sum()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub archives: Vec<ArchiveSummary>,
    /// Inputs that are not a supported archive
    pub skipped_inputs: Vec<PathBuf>,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn completed_count(&self) -> usize {
        self.archives.iter().filter(|a| a.is_completed()).count()
    }

    pub fn partial_count(&self) -> usize {
        self.archives
            .iter()
            .filter(|a| matches!(a.status, ArchiveStatus::Partial { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.archives
            .iter()
            .filter(|a| matches!(a.status, ArchiveStatus::Failed { .. }))
            .count()
    }
}

/// `<archive file name>_results`
pub fn results_dir_name(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}{}", name, RESULTS_SUFFIX)
}

/// Supported archives directly inside `input_dir`, and everything else, both name-sorted
pub fn discover_archives(input_dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), TriageError> {
    let mut archives = Vec::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| TriageError::Input {
            path: input_dir.to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        match ArchiveFormat::from_path(entry.path()) {
            Some(_) => archives.push(entry.into_path()),
            None => skipped.push(entry.into_path()),
        }
    }

    Ok((archives, skipped))
}

pub struct Triage<'a> {
    config: TriageConfig,
    catalog: &'a RuleCatalog,
    reporter: &'a dyn Reporter,
}

impl<'a> Triage<'a> {
    pub fn new(config: TriageConfig, catalog: &'a RuleCatalog, reporter: &'a dyn Reporter) -> Self {
        Triage {
            config,
            catalog,
            reporter,
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Process every archive of `input_dir` into `output_dir`.
    ///
    /// A failing archive is recorded in the summary and the run moves on.
    /// An archive that turns out to be truncated or corrupt partway through
    /// is still parsed for whatever was extracted before the damage.
    /// Only an output root that cannot be created, or an input directory
    /// that cannot be listed, aborts the run.
    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary, TriageError> {
        let started = Instant::now();
        fs::create_dir_all(output_dir).map_err(|source| TriageError::Output {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let (archives, skipped) = discover_archives(input_dir)?;
        for path in &skipped {
            self.reporter.report(Report::UnsupportedInput { path });
        }
        tracing::info!(
            input = %input_dir.display(),
            archives = archives.len(),
            skipped = skipped.len(),
            "discovered inputs"
        );

        let mut summary = RunSummary {
            skipped_inputs: skipped,
            ..RunSummary::default()
        };
        for archive in &archives {
            summary.archives.push(self.process_archive(archive, output_dir));
        }
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        Ok(summary)
    }

    pub fn process_archive(&self, archive: &Path, output_dir: &Path) -> ArchiveSummary {
        let started = Instant::now();
        let results_dir = output_dir.join(results_dir_name(archive));
        let mut summary = ArchiveSummary::new(archive, &results_dir);

        if let Err(error) = self.try_process_archive(archive, &results_dir, &mut summary) {
            match &error {
                TriageError::Extraction(e) => self.reporter.report(Report::ArchiveFailed { archive, error: e }),
                other => tracing::error!(archive = %archive.display(), "{}", other),
            }
            summary.status = ArchiveStatus::Failed {
                reason: error.to_string(),
            };
        }
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        if results_dir.is_dir() {
            if let Err(e) = write_summary(&results_dir, &summary) {
                tracing::warn!("{}", e);
            }
        }
        summary
    }

    fn try_process_archive(
        &self,
        archive: &Path,
        results_dir: &Path,
        summary: &mut ArchiveSummary,
    ) -> Result<(), TriageError> {
        fs::create_dir_all(results_dir).map_err(|source| TriageError::Output {
            path: results_dir.to_path_buf(),
            source,
        })?;

        let extracted_dir = results_dir.join(EXTRACTED_DIR);
        tracing::info!(archive = %archive.display(), "extracting");
        let extractor = if self.config.logs_only {
            Extractor::with_filter(|name| self.catalog.rule_for_file(name).is_some())
        } else {
            Extractor::new()
        };
        summary.extracted_files = match extractor.extract(archive, &extracted_dir) {
            Ok(extracted) => extracted.len(),
            Err(error @ ExtractionError::Corrupt { .. }) => {
                let salvaged = count_files(&extracted_dir);
                if salvaged == 0 {
                    return Err(error.into());
                }
                self.reporter.report(Report::ArchiveFailed {
                    archive,
                    error: &error,
                });
                tracing::warn!(
                    archive = %archive.display(),
                    files = salvaged,
                    "archive is damaged, parsing the entries extracted before the damage"
                );
                summary.status = ArchiveStatus::Partial {
                    reason: error.to_string(),
                };
                salvaged
            }
            Err(error) => return Err(error.into()),
        };
        tracing::debug!(files = summary.extracted_files, dest = %extracted_dir.display(), "extracted");

        tracing::info!(archive = %archive.display(), "parsing");
        let outcome = Parser::new(self.catalog, self.config.worker_count)
            .with_file_timeout(self.config.file_timeout)
            .process(&extracted_dir, self.reporter);
        summary.files_scanned = outcome.files_scanned;
        summary.records = outcome
            .tables
            .iter()
            .map(|(name, records)| (name.to_string(), records.len()))
            .collect();
        summary.unmatched_files = outcome.unmatched_files.clone();
        summary.file_failures = outcome.failures.iter().map(|e| e.to_string()).collect();

        let timeline = Timeliner::new(self.catalog).merge(&outcome.tables, self.reporter);
        summary.timeline_entries = timeline.len();
        summary.rejected_timestamps = timeline.rejected.iter().map(|e| e.to_string()).collect();

        let writer = TableWriter::new(self.config.output_format);
        for rule in self.catalog.rules() {
            if let Some(records) = outcome.tables.get(rule.name()) {
                summary
                    .outputs
                    .push(writer.write_log_type_file(results_dir, rule, records)?);
            }
        }
        summary
            .outputs
            .push(writer.write_timeline_file(results_dir, TIMELINE_STEM, &timeline)?);

        tracing::info!(
            archive = %archive.display(),
            records = outcome.record_count(),
            timeline = timeline.len(),
            failures = outcome.failures.len(),
            "parsed"
        );
        Ok(())
    }
}

fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}

fn write_summary(results_dir: &Path, summary: &ArchiveSummary) -> Result<(), TriageError> {
    let path = results_dir.join(SUMMARY_FILE);
    let file = File::create(&path).map_err(|source| TriageError::Summary {
        path: path.clone(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary).map_err(|e| TriageError::Summary {
        path,
        source: e.into(),
    })
}
