//! Crash-safe whole-file writes.
//!
//! [`AtomicFile::write`] stages content in a sibling `*.tmp` file, syncs it,
//! and renames it over the target, so a crash leaves either the old or the
//! new content on disk. [`AtomicFile::append`] is for append-only logs where
//! a torn trailing line is acceptable.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Handle to a file that is only ever replaced wholesale or appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the full contents as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is missing, unreadable, or not UTF-8.
    pub fn read(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }

    /// Replace the file contents atomically.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temp file cannot be written, synced, or
    /// renamed into place.
    pub fn write(&self, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(contents)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }

    /// Append bytes with `O_APPEND` + `write_all` + `flush`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written.
    pub fn append(&self, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(contents)?;
        file.flush()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
