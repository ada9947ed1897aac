//! Companion `.cols` column-name files.
//!
//! A source `statement.txt` may sit next to `statement.cols`, whose first
//! non-empty line lists the column names:
//!
//! ```text
//! "Date","Description","Amount"
//! ```

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::error::{ConvertError, ConvertResult};

/// Extension of companion mapping files.
pub const COMPANION_EXTENSION: &str = "cols";

/// Path of the companion mapping for `source`.
///
/// ```
/// use std::path::Path;
/// use file2ofx_core::mapping::companion_path;
///
/// assert_eq!(companion_path(Path::new("in/bank.txt")), Path::new("in/bank.cols"));
/// ```
#[must_use]
pub fn companion_path(source: &Path) -> PathBuf {
    source.with_extension(COMPANION_EXTENSION)
}

/// Reads the companion mapping of `source`, if one exists.
///
/// # Errors
///
/// [`ConvertError::MappingFile`] when the file exists but cannot be read or
/// holds no names.
pub fn read_companion(source: &Path) -> ConvertResult<Option<Vec<String>>> {
    let path = companion_path(source);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConvertError::MappingFile { path, reason: e.to_string() }),
    };

    let line = content.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let names = parse_column_names(line)
        .map_err(|reason| ConvertError::MappingFile { path: path.clone(), reason })?;
    if names.is_empty() {
        return Err(ConvertError::MappingFile { path, reason: "no column names".to_string() });
    }
    Ok(Some(names))
}

/// Splits a comma-separated, optionally double-quoted list of names.
///
/// Names are trimmed and unquoted (also when a space precedes the quote);
/// empty entries are kept so positions stay aligned.
///
/// # Errors
///
/// A message when the line is not valid CSV.
pub fn parse_column_names(line: &str) -> Result<Vec<String>, String> {
    let line = line.trim_start_matches('\u{feff}').trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => {
            Ok(record.iter().map(|name| name.trim_matches('"').trim().to_string()).collect())
        }
        Some(Err(e)) => Err(e.to_string()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_quoted_and_bare_names() {
        assert_eq!(
            parse_column_names(r#""Date", Amount ,"Payee, full""#).unwrap(),
            vec!["Date", "Amount", "Payee, full"]
        );
        assert_eq!(parse_column_names(r#""Date", "Amount""#).unwrap(), vec!["Date", "Amount"]);
        assert!(parse_column_names("   ").unwrap().is_empty());
    }

    #[test]
    fn test_missing_companion_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_companion(&dir.path().join("bank.txt")).unwrap(), None);
    }

    #[test]
    fn test_reads_first_non_empty_line() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bank.cols"), "\n\"Date\",\"Amount\"\nignored\n").unwrap();
        let names = read_companion(&dir.path().join("bank.txt")).unwrap().unwrap();
        assert_eq!(names, vec!["Date", "Amount"]);
    }

    #[test]
    fn test_empty_companion_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bank.cols"), "\n  \n").unwrap();
        let err = read_companion(&dir.path().join("bank.txt")).unwrap_err();
        assert!(matches!(err, ConvertError::MappingFile { .. }));
    }
}
