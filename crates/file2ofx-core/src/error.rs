//! Error types for the conversion pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::{detect::Role, diagnostics::RowSkipped};

/// Fatal conversion error.
///
/// Every variant carries enough structure (row numbers, roles, paths) for a
/// caller to render its own message. Non-fatal row problems are reported as
/// [`crate::diagnostics::Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    // === Request validation ===
    /// The requested OFX version is not one of the supported revisions.
    #[error("unsupported OFX version '{requested}' (supported: {})", supported.join(", "))]
    UnsupportedVersion {
        /// Version string as requested.
        requested: String,
        /// Accepted version strings.
        supported: Vec<&'static str>,
    },

    // === Input format ===
    /// Encoding or layout could not be resolved from the sample.
    #[error("unresolved input format: {reason}")]
    UnresolvedFormat {
        /// Why sniffing gave up.
        reason: String,
    },

    /// A mandatory column role could not be assigned.
    #[error("column detection failed, missing role(s): {}", format_roles(missing))]
    ColumnDetectionFailed {
        /// Mandatory roles left unresolved.
        missing: Vec<Role>,
    },

    /// The companion `.cols` file is unreadable or empty.
    #[error("invalid column mapping {path}: {reason}")]
    MappingFile {
        /// Path of the mapping file.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    // === Row parsing ===
    /// Too many rows failed to parse.
    #[error(
        "too many invalid rows: {} of {total} skipped (allowed ratio {ceiling})",
        skipped.len()
    )]
    TooManyInvalidRows {
        /// Every skipped row with its reason.
        skipped: Vec<RowSkipped>,
        /// Number of non-empty data rows seen.
        total: usize,
        /// Configured ceiling ratio.
        ceiling: f64,
    },

    /// No row produced a transaction.
    #[error("no transactions found in input")]
    NoTransactions,

    // === Assembly ===
    /// A mandatory institution field is blank.
    #[error("missing required field '{field}'")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    // === Output ===
    /// The destination could not be written; no partial file is left behind.
    #[error("failed to write output {path}: {reason}")]
    OutputWriteFailed {
        /// Requested destination.
        path: PathBuf,
        /// Short description.
        reason: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    // === Plumbing ===
    /// I/O error while reading the source.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error while streaming rows.
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    /// CSV reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rendering into a caller-supplied writer failed.
    #[error("failed to write document: {0}")]
    Write(#[source] std::io::Error),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn unresolved(reason: impl Into<String>) -> Self {
        Self::UnresolvedFormat { reason: reason.into() }
    }
}

fn format_roles(roles: &[Role]) -> String {
    roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
}

/// Shorthand `Result` for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
