//! Default output naming.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Highest numeric suffix tried before giving up.
const MAX_SUFFIX: u32 = 99;

/// `input` with an `.ofx` extension, or `<stem>_N.ofx` (N = 1..=99) when
/// that file already exists.
pub fn default_output(input: &Path) -> Result<PathBuf> {
    let Some(stem) = input.file_stem().and_then(|s| s.to_str()).filter(|s| !s.is_empty()) else {
        bail!("Cannot derive an output name from {}", input.display());
    };

    let candidate = input.with_extension("ofx");
    if !candidate.exists() {
        return Ok(candidate);
    }

    for n in 1..=MAX_SUFFIX {
        let candidate = input.with_file_name(format!("{stem}_{n}.ofx"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    bail!("Could not find a free output name for {} (tried _1 to _{MAX_SUFFIX})", input.display())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_free_name() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bank.csv");
        assert_eq!(default_output(&input).unwrap(), dir.path().join("bank.ofx"));
    }

    #[test]
    fn test_numbered_when_taken() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bank.csv");
        fs::write(dir.path().join("bank.ofx"), "").unwrap();
        fs::write(dir.path().join("bank_1.ofx"), "").unwrap();
        assert_eq!(default_output(&input).unwrap(), dir.path().join("bank_2.ofx"));
    }

    #[test]
    fn test_gives_up_after_99() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bank.csv");
        fs::write(dir.path().join("bank.ofx"), "").unwrap();
        for n in 1..=MAX_SUFFIX {
            fs::write(dir.path().join(format!("bank_{n}.ofx")), "").unwrap();
        }
        assert!(default_output(&input).is_err());
    }
}
