//! # e2e-tests - end-to-end tests for the `file2ofx` CLI
//!
//! The tests in `tests/` run the built binary against the files in
//! `fixtures/`:
//! - `scenario.csv`: header plus a single debit row
//! - `checking_export.csv`: bank preamble, semicolons, decimal commas
//! - `fixed.txt` + `fixed.cols`: header-less fixed-width data with a mapping
//! - `latin1.csv`: Windows-1252 bytes
//! - `bad_rows.csv`: half the rows unparseable
//! - `no_amount.csv`: no amount column
//! - `debit_credit.csv`: split debit/credit columns next to a running balance
//! - `bank.json`: config file

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

/// Fixture directory.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Path of a fixture by file name.
pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Copies fixtures into a fresh temp dir so default output names land there.
pub fn stage(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for name in names {
        fs::copy(fixture(name), dir.path().join(name)).expect("copy fixture");
    }
    dir
}

/// Names of the files in `dir`, sorted.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
