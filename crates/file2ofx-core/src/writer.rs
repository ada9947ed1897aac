//! Atomic output file.
//!
//! [`OutputFile`] buffers into a temp file in the destination directory and
//! only renames it over the destination on [`OutputFile::commit`]. Dropping
//! it uncommitted removes the temp file, so a failed conversion never leaves
//! a partial document behind.

use std::{
    io::{self, BufWriter, Write},
    path::{Component, Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ConvertError, ConvertResult};

/// Prefix of in-progress temp files.
const TEMP_PREFIX: &str = ".file2ofx-";

/// Buffered writer over a temp file that becomes `path` on commit.
pub struct OutputFile {
    path: PathBuf,
    inner: BufWriter<NamedTempFile>,
    /// Bytes written so far.
    bytes_written: u64,
}

impl OutputFile {
    /// Opens a temp file beside `path`.
    ///
    /// # Errors
    ///
    /// [`ConvertError::OutputWriteFailed`] when `path` has a `..` component,
    /// its directory does not exist, or the temp file cannot be created.
    pub fn create(path: &Path) -> ConvertResult<Self> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(failed(path, "path must not contain '..'", None));
        }
        if path.file_name().is_none() {
            return Err(failed(path, "path has no file name", None));
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(failed(path, "parent directory does not exist", None));
        }

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| failed(path, "cannot create temporary file", Some(e)))?;
        debug!(temp = %temp.path().display(), "opened temporary output");

        Ok(Self { path: path.to_path_buf(), inner: BufWriter::new(temp), bytes_written: 0 })
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes and renames the temp file over the destination.
    ///
    /// # Errors
    ///
    /// [`ConvertError::OutputWriteFailed`] if flushing, syncing or renaming
    /// fails. The temp file is removed in every failure case.
    pub fn commit(self) -> ConvertResult<PathBuf> {
        let Self { path, inner, bytes_written } = self;
        let temp = inner
            .into_inner()
            .map_err(|e| failed(&path, "flush failed", Some(e.into_error())))?;
        temp.as_file().sync_all().map_err(|e| failed(&path, "sync failed", Some(e)))?;
        temp.persist(&path).map_err(|e| failed(&path, "rename failed", Some(e.error)))?;

        debug!(path = %path.display(), bytes = bytes_written, "committed output");
        Ok(path)
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn failed(path: &Path, reason: &str, source: Option<io::Error>) -> ConvertError {
    ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
        source,
    }
}
