use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use qelp::logging::init_tracing;
use qelp::{ArchiveStatus, OutputFormat, RuleCatalog, TracingReporter, Triage, TriageConfig};

#[derive(Parser)]
#[command(name = "qelp")]
#[command(about = "Quick ESXi Log Parser: turns ESXi support bundles into per-log tables and a timeline")]
#[command(version)]
struct Args {
    /// Directory containing .zip, .tar, .gz or .tgz support bundles
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory for extracted logs and results
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Log file, appended to
    #[arg(short = 'l', long = "log", default_value = "qelp.log")]
    log_file: PathBuf,

    /// Debug output on the console
    #[arg(short, long)]
    verbose: bool,

    /// Parser threads per archive (default: available cores)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Table format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Only extract files a log type recognizes
    #[arg(long)]
    logs_only: bool,

    /// Skip any single file that takes longer than this to parse, e.g. "30s"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    file_timeout: Option<Duration>,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        if !self.input_dir.is_dir() {
            return Err(format!(
                "input directory '{}' does not exist or is not a directory",
                self.input_dir.display()
            ));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(format!(
                "output path '{}' exists and is not a directory",
                self.output_dir.display()
            ));
        }
        if self.jobs == Some(0) {
            return Err("--jobs must be at least 1".to_string());
        }
        Ok(())
    }

    fn config(&self) -> TriageConfig {
        let mut config = TriageConfig {
            output_format: self.format,
            logs_only: self.logs_only,
            file_timeout: self.file_timeout,
            ..TriageConfig::default()
        };
        if let Some(jobs) = self.jobs {
            config.worker_count = jobs;
        }
        config
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    init_tracing(Some(&args.log_file), args.verbose)?;

    let catalog = RuleCatalog::builtin().context("built-in rule catalog failed to compile")?;
    let config = args.config();
    tracing::debug!(?config, "starting triage");

    let reporter = TracingReporter;
    let summary = Triage::new(config, &catalog, &reporter)
        .run(&args.input_dir, &args.output_dir)
        .context("triage aborted")?;

    for archive in &summary.archives {
        match &archive.status {
            ArchiveStatus::Completed => tracing::info!(
                archive = %archive.archive.display(),
                records = archive.record_count(),
                timeline = archive.timeline_entries,
                results = %archive.results_dir.display(),
                "completed"
            ),
            ArchiveStatus::Partial { reason } => tracing::warn!(
                archive = %archive.archive.display(),
                records = archive.record_count(),
                timeline = archive.timeline_entries,
                results = %archive.results_dir.display(),
                "partially extracted: {}",
                reason
            ),
            ArchiveStatus::Failed { reason } => tracing::warn!(
                archive = %archive.archive.display(),
                "failed: {}",
                reason
            ),
        }
    }
    tracing::info!(
        completed = summary.completed_count(),
        partial = summary.partial_count(),
        failed = summary.failed_count(),
        skipped = summary.skipped_inputs.len(),
        "triage finished in {:.2} seconds",
        summary.elapsed_secs
    );

    Ok(())
}
