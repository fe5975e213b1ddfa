//! End-to-end checks for the runsheet binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn runsheet() -> Command {
    Command::cargo_bin("runsheet").expect("binary builds")
}

#[test]
fn config_show_prints_defaults_without_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");

    runsheet()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prefer_table_mode"));
}

#[test]
fn config_init_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");

    runsheet()
        .args(["--config", config.to_str().unwrap(), "config", "init"])
        .assert()
        .success();

    runsheet()
        .args([
            "--config",
            config.to_str().unwrap(),
            "config",
            "get",
            "pdf.timeout_secs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("30"));
}

#[test]
fn config_set_rejects_unknown_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");

    runsheet()
        .args([
            "--config",
            config.to_str().unwrap(),
            "config",
            "set",
            "nonsense.key",
            "1",
        ])
        .assert()
        .failure();
}

#[test]
fn process_missing_file_fails() {
    runsheet()
        .args(["process", "no-such-sheet.pdf"])
        .assert()
        .failure();
}

#[test]
fn batch_without_matches_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = dir.path().join("*.pdf");

    runsheet()
        .args(["batch", pattern.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}
