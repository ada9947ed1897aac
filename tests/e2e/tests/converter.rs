//! E2E tests for the `file2ofx` CLI.

use std::fs;

use assert_cmd::Command;
use e2e_tests::{fixture, listing, stage};
use predicates::prelude::*;
use tempfile::tempdir;

const INSTITUTION: [&str; 4] = ["--fi-id", "123456789", "--account-id", "000111222"];

/// Command for the `file2ofx` binary.
///
/// `cargo_bin` is deprecated over an edge case with custom build
/// directories, but it is the only way to reach another crate's binary.
#[expect(deprecated)]
fn file2ofx() -> Command {
    Command::cargo_bin("file2ofx").unwrap()
}

// ============================================================================
// Successful conversions
// ============================================================================

#[test]
fn test_scenario_default_output_name() {
    let dir = stage(&["scenario.csv"]);
    let input = dir.path().join("scenario.csv");

    file2ofx()
        .arg(&input)
        .args(INSTITUTION)
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 1 transaction(s)"));

    let content = fs::read_to_string(dir.path().join("scenario.ofx")).unwrap();
    assert!(content.starts_with("OFXHEADER:100\n"));
    assert!(content.contains("<DTPOSTED>20240115000000\n"));
    assert!(content.contains("<TRNAMT>-4.50\n"));
    assert!(content.contains("<TRNTYPE>DEBIT\n"));
}

#[test]
fn test_existing_output_gets_numbered() {
    let dir = stage(&["scenario.csv"]);
    let input = dir.path().join("scenario.csv");
    fs::write(dir.path().join("scenario.ofx"), "keep me").unwrap();

    file2ofx().arg(&input).args(INSTITUTION).assert().success();
    file2ofx().arg(&input).args(INSTITUTION).assert().success();

    assert_eq!(fs::read_to_string(dir.path().join("scenario.ofx")).unwrap(), "keep me");
    assert_eq!(
        listing(dir.path()),
        vec!["scenario.csv", "scenario.ofx", "scenario_1.ofx", "scenario_2.ofx"]
    );
}

#[test]
fn test_bank_export_with_preamble() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("checking.ofx");

    file2ofx()
        .arg(fixture("checking_export.csv"))
        .args(INSTITUTION)
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 5 transaction(s)"))
        .stderr(predicate::str::contains("warning").not());

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("<TRNAMT>-1250.00"));
    assert!(content.contains("<TRNAMT>3400.00"));
    assert!(content.contains("<TRNAMT>-86.17"));
    assert!(content.contains("<NAME>Transfer to savings"));
    assert_eq!(content.matches("<TRNTYPE>CREDIT").count(), 1);
    assert_eq!(content.matches("<TRNTYPE>DEBIT").count(), 4);
}

#[test]
fn test_config_file_and_modern_version() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("scenario.csv"))
        .args(["--config", fixture("bank.json").to_str().unwrap()])
        .args(["--output", output.to_str().unwrap()])
        .args(["--ledger-balance", "1520.33", "--balance-date", "2024-01-31"])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"));
    assert!(content.contains("VERSION=\"220\""));
    assert!(content.contains("<ORG>Test Bank</ORG>"));
    assert!(content.contains("<CURDEF>EUR</CURDEF>"));
    assert!(content.contains("<ACCTTYPE>SAVINGS</ACCTTYPE>"));
    assert!(content.contains("<BALAMT>1520.33</BALAMT>"));
    assert!(content.contains("<DTASOF>20240131000000</DTASOF>"));
}

#[test]
fn test_flag_overrides_config_version() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("scenario.csv"))
        .args(["--config", fixture("bank.json").to_str().unwrap()])
        .args(["--ofx-version", "1.6.0", "-o", output.to_str().unwrap()])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("VERSION:160\n"));
}

#[test]
fn test_debit_credit_export_with_balance() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("split.ofx");

    file2ofx()
        .arg(fixture("debit_credit.csv"))
        .args(INSTITUTION)
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 4 transaction(s)"))
        .stderr(predicate::str::contains("warning").not());

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("<TRNAMT>-4.50\n"));
    assert!(content.contains("<TRNAMT>1500.00\n"));
    assert!(content.contains("<TRNAMT>-900.00\n"));
    assert!(content.contains("<TRNAMT>12.00\n"));
    assert!(!content.contains("995.50"));
}

#[test]
fn test_fixed_width_with_cols_file() {
    let dir = stage(&["fixed.txt", "fixed.cols"]);

    file2ofx()
        .arg(dir.path().join("fixed.txt"))
        .args(INSTITUTION)
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 3 transaction(s)"));

    let content = fs::read_to_string(dir.path().join("fixed.ofx")).unwrap();
    assert!(content.contains("<TRNAMT>-120.00"));
    assert!(content.contains("<TRNAMT>15.00"));
}

#[test]
fn test_latin1_input_warns() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("latin1.csv"))
        .args(INSTITUTION)
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("decoded as windows-1252"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("<NAME>Café Müller"));
}

#[test]
fn test_explicit_encoding_has_no_warning() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("latin1.csv"))
        .args(INSTITUTION)
        .args(["-e", "latin1", "-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning").not());
}

#[test]
fn test_explicit_columns_skip_detection() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("no_amount.csv"))
        .args(INSTITUTION)
        .args(["--date-column", "0", "--amount-column", "1", "-o", output.to_str().unwrap()])
        .assert()
        .code(5);
}

// ============================================================================
// Failures and exit codes
// ============================================================================

#[test]
fn test_too_many_invalid_rows() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("bad_rows.csv"))
        .args(INSTITUTION)
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("too many invalid rows: 2 of 4"));

    assert!(!output.exists());
    assert!(listing(dir.path()).is_empty());
}

#[test]
fn test_raised_ceiling_and_strict() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.ofx");

    file2ofx()
        .arg(fixture("bad_rows.csv"))
        .args(INSTITUTION)
        .args(["--max-invalid-ratio", "0.5", "-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("skipped line 3"))
        .stderr(predicate::str::contains("skipped line 4"));

    file2ofx()
        .arg(fixture("bad_rows.csv"))
        .args(INSTITUTION)
        .args(["--max-invalid-ratio", "0.5", "--strict", "-o", output.to_str().unwrap()])
        .assert()
        .code(2);
}

#[test]
fn test_missing_amount_column() {
    let dir = tempdir().unwrap();

    file2ofx()
        .arg(fixture("no_amount.csv"))
        .args(INSTITUTION)
        .args(["-o", dir.path().join("out.ofx").to_str().unwrap()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("missing role(s): amount"));
}

#[test]
fn test_unsupported_version() {
    file2ofx()
        .arg(fixture("scenario.csv"))
        .args(INSTITUTION)
        .args(["--ofx-version", "230", "-o", "unused.ofx"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("supported: 102, 103"));
}

#[test]
fn test_fixed_width_without_mapping() {
    let dir = stage(&["fixed.txt"]);

    file2ofx().arg(dir.path().join("fixed.txt")).args(INSTITUTION).assert().code(3);
    assert_eq!(listing(dir.path()), vec!["fixed.txt"]);
}

#[test]
fn test_missing_account_id() {
    let dir = tempdir().unwrap();

    file2ofx()
        .arg(fixture("scenario.csv"))
        .args(["--fi-id", "123", "-o", dir.path().join("out.ofx").to_str().unwrap()])
        .assert()
        .code(8)
        .stderr(predicate::str::contains("account_id"));
}

#[test]
fn test_output_in_missing_directory() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("nope").join("out.ofx");

    file2ofx()
        .arg(fixture("scenario.csv"))
        .args(INSTITUTION)
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .code(7);
}

#[test]
fn test_missing_input() {
    let dir = tempdir().unwrap();

    file2ofx()
        .arg(dir.path().join("absent.csv"))
        .args(INSTITUTION)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
