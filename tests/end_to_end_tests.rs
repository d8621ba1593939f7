// tests/end_to_end_tests.rs
mod common;

use common::*;
use qelp::triage::{EXTRACTED_DIR, SUMMARY_FILE};
use qelp::{ArchiveStatus, CollectingReporter, NullReporter, OutputFormat, RuleCatalog, Triage, TriageConfig};
use std::fs;
use tempfile::TempDir;

fn run(input: &std::path::Path, output: &std::path::Path, config: TriageConfig) -> qelp::RunSummary {
    let catalog = RuleCatalog::builtin().unwrap();
    Triage::new(config, &catalog, &NullReporter)
        .run(input, output)
        .unwrap()
}

#[test]
fn test_single_hostd_login() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(
        input.path(),
        "test.tgz",
        &[("var/run/log/hostd.log", log(&[HOSTD_NOISE, HOSTD_LOGIN]))],
    );

    let summary = run(input.path(), output.path(), TriageConfig::default());
    assert_eq!(summary.completed_count(), 1);

    let results = output.path().join("test.tgz_results");
    assert!(results.join(EXTRACTED_DIR).join("var/run/log/hostd.log").is_file());

    let hostd = read_table(&results.join("hostd.csv"), b',');
    assert_eq!(hostd.len(), 2);
    assert_eq!(hostd[1][column(&hostd, "Source File")], "var/run/log/hostd.log");
    assert_eq!(hostd[1][column(&hostd, "Access Type")], "Logon");
    assert_eq!(
        hostd[1][column(&hostd, "Description")],
        "Accepted password for user root from 192.168.1.10"
    );

    let timeline = read_table(&results.join("Timeline.csv"), b',');
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1][0], "2024-01-01T10:00:00.000");
    assert_eq!(timeline[1][1], "hostd");
    assert_eq!(timeline[1][2], "Logon");
}

#[test]
fn test_timeline_merges_log_types_chronologically() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    // auth sorts before syslog by name but happens later
    write_tgz(
        input.path(),
        "esx01.tgz",
        &[
            ("var/run/log/auth.log", log(&[AUTH_LOGIN])),
            ("var/run/log/syslog.log", log(&[SYSLOG_LOGIN])),
        ],
    );

    run(input.path(), output.path(), TriageConfig::default());

    let timeline = read_table(&output.path().join("esx01.tgz_results/Timeline.csv"), b',');
    let log_types: Vec<&str> = timeline[1..].iter().map(|row| row[1].as_str()).collect();
    assert_eq!(log_types, vec!["syslog", "auth"]);
    assert_eq!(
        timeline[1][5],
        "sftp-server[3001]: User root logged in"
    );
}

#[test]
fn test_unrecognized_file_is_not_an_error() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(
        input.path(),
        "bundle.tgz",
        &[
            ("etc/vmware/esx.conf", b"/adv/Misc/HostName = \"esx01\"\n".to_vec()),
            ("var/run/log/shell.log", log(&[SHELL_COMMAND])),
        ],
    );

    let summary = run(input.path(), output.path(), TriageConfig::default());
    let archive = &summary.archives[0];
    assert!(archive.is_completed());
    assert!(archive.file_failures.is_empty());
    assert_eq!(archive.files_scanned, 2);
    assert_eq!(archive.unmatched_files.len(), 1);
    assert_eq!(archive.record_count(), 1);
    assert_eq!(archive.records.get("shell"), Some(&1));
}

#[test]
fn test_corrupt_archive_does_not_stop_the_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(input.path(), "a_host.tgz", &[("var/log/auth.log", log(&[AUTH_LOGIN]))]);
    fs::write(
        input.path().join("b_broken.zip"),
        b"this is not really a zip archive\n".repeat(8),
    )
    .unwrap();
    write_zip(input.path(), "c_host.zip", &[("var/log/shell.log", log(&[SHELL_COMMAND]))]);

    let catalog = RuleCatalog::builtin().unwrap();
    let reporter = CollectingReporter::new();
    let summary = Triage::new(TriageConfig::default(), &catalog, &reporter)
        .run(input.path(), output.path())
        .unwrap();

    assert_eq!(summary.archives.len(), 3);
    assert_eq!(summary.completed_count(), 2);
    assert_eq!(summary.failed_count(), 1);
    assert!(!summary.archives[1].is_completed());

    assert!(output.path().join("a_host.tgz_results/auth.csv").is_file());
    assert!(output.path().join("c_host.zip_results/shell.csv").is_file());
    assert!(!output.path().join("b_broken.zip_results/Timeline.csv").exists());
    assert!(reporter
        .messages()
        .iter()
        .any(|m| m.contains("b_broken.zip")));
}

#[test]
fn test_truncated_bundle_parses_what_was_extracted() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    // incompressible filler so the cut lands inside the second entry
    let mut state: u32 = 0x2545_f491;
    let filler: Vec<u8> = (0..256 * 1024)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect();
    let whole = gzip(&tar_bytes(&[
        ("var/run/log/auth.log", log(&[AUTH_LOGIN])),
        ("var/run/log/vmware-filler.bin", filler),
    ]));
    fs::write(input.path().join("cut.tgz"), &whole[..whole.len() * 3 / 4]).unwrap();

    let catalog = RuleCatalog::builtin().unwrap();
    let reporter = CollectingReporter::new();
    let summary = Triage::new(TriageConfig::default(), &catalog, &reporter)
        .run(input.path(), output.path())
        .unwrap();

    assert_eq!(summary.partial_count(), 1);
    assert_eq!(summary.failed_count(), 0);
    let archive = &summary.archives[0];
    assert!(matches!(archive.status, ArchiveStatus::Partial { .. }));
    assert_eq!(archive.records.get("auth"), Some(&1));
    assert!(reporter.messages().iter().any(|m| m.contains("cut.tgz")));

    let results = output.path().join("cut.tgz_results");
    let auth = read_table(&results.join("auth.csv"), b',');
    assert_eq!(auth.len(), 2);
    let timeline = read_table(&results.join("Timeline.csv"), b',');
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1][1], "auth");

    let written = fs::read_to_string(results.join(SUMMARY_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["status"]["state"], "partial");
}

#[test]
fn test_unparseable_timestamp_only_in_table() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(
        input.path(),
        "host.tgz",
        &[("var/run/log/auth.log", log(&[AUTH_LOGIN, AUTH_BAD_TIMESTAMP]))],
    );

    let summary = run(input.path(), output.path(), TriageConfig::default());
    let archive = &summary.archives[0];
    assert_eq!(archive.rejected_timestamps.len(), 1);

    let results = output.path().join("host.tgz_results");
    let auth = read_table(&results.join("auth.csv"), b',');
    assert_eq!(auth.len(), 3);
    assert_eq!(auth[2][column(&auth, "Timestamp")], "2024-13-45T99:00:00Z");

    let timeline = read_table(&results.join("Timeline.csv"), b',');
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1][0], "2024-01-02T08:20:00.000");
}

#[test]
fn test_rotated_gzip_logs_and_tsv() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let older = "2024-01-01T09:00:00Z shell[3000]: [root]: vim-cmd vmsvc/getallvms";
    write_tgz(
        input.path(),
        "host.tgz",
        &[
            ("var/run/log/shell.0.gz", gzip(&log(&[older]))),
            ("var/run/log/shell.log", log(&[SHELL_COMMAND])),
        ],
    );

    let config = TriageConfig {
        output_format: OutputFormat::Tsv,
        worker_count: 2,
        ..TriageConfig::default()
    };
    run(input.path(), output.path(), config);

    let results = output.path().join("host.tgz_results");
    let shell = read_table(&results.join("shell.tsv"), b'\t');
    assert_eq!(shell.len(), 3);
    // table rows follow file order, timeline follows time
    assert_eq!(shell[1][column(&shell, "Source File")], "var/run/log/shell.0.gz");

    let timeline = read_table(&results.join("Timeline.tsv"), b'\t');
    assert_eq!(timeline[1][0], "2024-01-01T09:00:00.000");
    assert_eq!(timeline[2][0], "2024-01-02T08:21:00.000");
}

#[test]
fn test_logs_only_skips_other_files() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(
        input.path(),
        "host.tgz",
        &[
            ("etc/passwd", b"root:x:0:0::/:/bin/sh\n".to_vec()),
            ("var/run/log/auth.log", log(&[AUTH_LOGIN])),
        ],
    );

    let config = TriageConfig {
        logs_only: true,
        ..TriageConfig::default()
    };
    let summary = run(input.path(), output.path(), config);

    let extracted = output.path().join("host.tgz_results").join(EXTRACTED_DIR);
    assert!(extracted.join("var/run/log/auth.log").is_file());
    assert!(!extracted.join("etc/passwd").exists());
    assert_eq!(summary.archives[0].extracted_files, 1);
    assert!(summary.archives[0].unmatched_files.is_empty());
}

#[test]
fn test_summary_json_and_skipped_inputs() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(input.path(), "host.tgz", &[("var/run/log/auth.log", log(&[AUTH_LOGIN]))]);
    fs::write(input.path().join("README.txt"), b"notes").unwrap();

    let summary = run(input.path(), output.path(), TriageConfig::default());
    assert_eq!(summary.skipped_inputs, vec![input.path().join("README.txt")]);

    let written = fs::read_to_string(output.path().join("host.tgz_results").join(SUMMARY_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["status"]["state"], "completed");
    assert_eq!(json["records"]["auth"], 1);
    assert_eq!(json["timeline_entries"], 1);
}

#[test]
fn test_rerun_overwrites_results() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tgz(input.path(), "host.tgz", &[("var/run/log/auth.log", log(&[AUTH_LOGIN]))]);

    run(input.path(), output.path(), TriageConfig::default());
    let summary = run(input.path(), output.path(), TriageConfig::default());
    assert_eq!(summary.completed_count(), 1);

    let auth = read_table(&output.path().join("host.tgz_results/auth.csv"), b',');
    assert_eq!(auth.len(), 2);
}
