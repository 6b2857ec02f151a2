//! CLI integration tests.
//!
//! These tests run the actual spextract binary and check its exit codes and
//! output files.

mod common;

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use common::{file_names, sky_row, write_table};

/// Run spextract with arguments from `dir`.
fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spextract"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run spextract: {e}"))
}

fn code(output: &Output) -> Option<i32> {
    output.status.code()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("extract"));
    assert!(stdout.contains("month"));
}

#[test]
fn test_cli_requires_mode_without_jsonin() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["extract", "-s", "aos", "-i", "t.json"]);
    assert_eq!(code(&output), Some(2));
}

#[test]
fn test_cli_json_in_and_out_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["extract", "--jsonin", "--jsonout"]);
    assert_eq!(code(&output), Some(2));
}

// ============================================================================
// Exit codes
// ============================================================================

#[test]
fn test_cli_unknown_spectrometer() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(dir.path(), "t.json", &[sky_row(1, 2)]);
    let output = run_in(dir.path(), &["extract", "-s", "hifi", "-i", table.to_str().unwrap(), "-x", "1"]);
    assert_eq!(code(&output), Some(10));
}

#[test]
fn test_cli_extract_without_spectrometer() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "Data.json", &[sky_row(1, 2)]);
    let output = run_in(dir.path(), &["extract", "-i", "Data.json", "-x", "1"]);
    assert_eq!(code(&output), Some(10));
    assert_eq!(file_names(dir.path()), vec!["Data.json"]);
}

#[test]
fn test_cli_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["extract", "-s", "aos", "-i", "missing.json", "-x", "1"]);
    assert_eq!(code(&output), Some(20));
}

#[test]
fn test_cli_unsupported_input() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Data.DBF"), b"\x03").unwrap();
    let output = run_in(dir.path(), &["extract", "-s", "aos", "-i", "Data.DBF", "-x", "1"]);
    assert_eq!(code(&output), Some(30));
}

#[test]
fn test_cli_unreadable_table() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Data.json"), "{ not a table").unwrap();
    let output = run_in(dir.path(), &["extract", "-s", "rpgffts", "-i", "Data.json", "-x", "1"]);
    assert_eq!(code(&output), Some(30));
}

#[test]
fn test_cli_missing_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "t.json", &[sky_row(1, 2)]);
    let output = run_in(
        dir.path(),
        &["extract", "-s", "rpgffts", "-i", "t.json", "-x", "1", "-o", "nowhere"],
    );
    assert_eq!(code(&output), Some(40));
}

#[test]
fn test_cli_unwritable_output_file() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "Data.json", &[sky_row(1, 2)]);
    std::fs::create_dir(dir.path().join("Data_RPGFFTS.SUM")).unwrap();
    let output = run_in(dir.path(), &["extract", "-s", "rpgffts", "-i", "Data.json", "-x", "1"]);
    assert_eq!(code(&output), Some(60));
}

#[test]
fn test_cli_invalid_mode() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "t.json", &[sky_row(1, 2)]);
    let output = run_in(dir.path(), &["extract", "-s", "rpgffts", "-i", "t.json", "-x", "2"]);
    assert_eq!(code(&output), Some(1));
    assert!(file_names(dir.path()).iter().all(|n| !n.ends_with(".SUM")));
}

// ============================================================================
// Conversions
// ============================================================================

#[test]
fn test_cli_extract_to_files() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "Data.json", &[sky_row(1, 2), sky_row(2, 2)]);
    let output = run_in(dir.path(), &["extract", "-s", "RPGFFTS", "-i", "Data.json", "-x", "3"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(file_names(dir.path()).contains(&"Data_RPGFFTS.SUM".to_string()));
}

#[test]
fn test_cli_json_relay() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("out")).unwrap();
    write_table(dir.path(), "Data.json", &[sky_row(1, 3), sky_row(2, 3)]);

    let exported = run_in(
        dir.path(),
        &["extract", "-s", "rpgffts", "-i", "Data.json", "-x", "1", "--jsonout"],
    );
    assert!(exported.status.success());
    assert!(exported.stdout.starts_with(b"[{"));

    let mut child = Command::new(env!("CARGO_BIN_EXE_spextract"))
        .current_dir(dir.path())
        .args(["extract", "--jsonin", "-o", "out", "-f", "relay.sum"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(&exported.stdout).unwrap();
    let imported = child.wait_with_output().unwrap();
    assert!(imported.status.success(), "{}", String::from_utf8_lossy(&imported.stderr));
    assert_eq!(
        file_names(&dir.path().join("out")),
        vec!["relay_00001.sum", "relay_00002.sum"]
    );
}

#[test]
fn test_cli_month_uses_settings_layout() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw").join("2020").join("2020-01");
    let sum = dir.path().join("sum").join("KIMRA").join("rpgffts");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::create_dir_all(&sum).unwrap();
    write_table(&raw, "Data_2020-01-03.json", &[sky_row(7, 2)]);
    std::fs::write(
        dir.path().join("spextract.toml"),
        "basedir = \"sum\"\n[instruments.kimra]\npath = \"raw\"\n",
    )
    .unwrap();

    let output = run_in(dir.path(), &["month", "kimra", "2020", "1"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(file_names(&sum), vec!["Data_2020-01-03_RPGFFTS.SUM"]);
}
