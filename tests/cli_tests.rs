// tests/cli_tests.rs
mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn qelp() -> Command {
    Command::cargo_bin("qelp").unwrap()
}

#[test]
fn test_help_lists_options() {
    qelp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("INPUT_DIR"))
        .stdout(predicate::str::contains("--logs-only"))
        .stdout(predicate::str::contains("--file-timeout"));
}

#[test]
fn test_missing_arguments() {
    qelp().assert().failure();
}

#[test]
fn test_missing_input_dir_exits_1() {
    let work = TempDir::new().unwrap();
    qelp()
        .arg(work.path().join("nope"))
        .arg(work.path().join("out"))
        .arg("--log")
        .arg(work.path().join("qelp.log"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_zero_jobs_rejected() {
    let work = TempDir::new().unwrap();
    qelp()
        .arg(work.path())
        .arg(work.path().join("out"))
        .args(["--jobs", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--jobs"));
}

#[test]
fn test_bad_timeout_rejected() {
    let work = TempDir::new().unwrap();
    qelp()
        .arg(work.path())
        .arg(work.path().join("out"))
        .args(["--file-timeout", "soon"])
        .assert()
        .failure();
}

#[test]
fn test_full_run() {
    let input = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_tgz(
        input.path(),
        "esx01.tgz",
        &[
            ("var/run/log/hostd.log", log(&[HOSTD_LOGIN])),
            ("var/run/log/auth.log", log(&[AUTH_LOGIN])),
        ],
    );
    let output = work.path().join("out");
    let log_file = work.path().join("qelp.log");

    qelp()
        .arg(input.path())
        .arg(&output)
        .arg("--log")
        .arg(&log_file)
        .args(["--format", "tsv", "-j", "2"])
        .assert()
        .success();

    let results = output.join("esx01.tgz_results");
    assert!(results.join("hostd.tsv").is_file());
    assert!(results.join("auth.tsv").is_file());
    let timeline = read_table(&results.join("Timeline.tsv"), b'\t');
    assert_eq!(timeline.len(), 3);

    let logged = fs::read_to_string(&log_file).unwrap();
    assert!(logged.contains("esx01.tgz"));
    assert!(!logged.contains('\u{1b}'));
}

#[test]
fn test_failed_archive_still_exits_0() {
    let input = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(input.path().join("broken.tgz"), b"not gzip at all").unwrap();

    qelp()
        .arg(input.path())
        .arg(work.path().join("out"))
        .arg("--log")
        .arg(work.path().join("qelp.log"))
        .assert()
        .success()
        .stderr(predicate::str::contains("broken.tgz"));
}
