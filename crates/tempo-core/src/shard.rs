//! Monthly data files.
//!
//! Intervals are stored in one file per calendar month, named after the
//! month their *start* falls in:
//!
//! ```text
//! <location>/
//!   2016-06.data      # intervals starting in June 2016
//!   2019-06.data
//!   tags.data         # tag index (see `tags`)
//!   undo.data         # undo journal (see `journal`)
//! ```
//!
//! # Invariants
//!
//! - A shard's lines are sorted; since timestamps are fixed-width, string
//!   order is start-time order.
//! - Every line in a shard starts within the shard's month.
//! - Lines are loaded on first access and written back only on
//!   [`Shard::commit`], and only when something changed.
//! - An emptied shard is written as an empty file; it is never removed here.

use std::cell::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};

use crate::atomic::AtomicFile;
use crate::interval::Interval;
use crate::range::{Range, month_start};

/// Suffix shared by every shard file.
pub const SHARD_EXTENSION: &str = ".data";

/// One month of interval records.
#[derive(Debug)]
pub struct Shard {
    name: String,
    file: AtomicFile,
    range: Range,
    lines: OnceCell<Vec<String>>,
    dirty: bool,
}

impl Shard {
    /// Open an existing shard file. Lines are not read until needed.
    ///
    /// Returns `None` if the file name is not a valid `YYYY-MM.data` name.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_str()?.to_string();
        let (year, month) = parse_shard_filename(&name)?;
        Some(Self {
            name,
            file: AtomicFile::new(path),
            range: Range::month_of(month_start(year, month)),
            lines: OnceCell::new(),
            dirty: false,
        })
    }

    /// A new, empty shard for the month containing `start`.
    ///
    /// Nothing is written until [`Shard::commit`].
    #[must_use]
    pub fn create(location: &Path, start: DateTime<Utc>) -> Self {
        let name = shard_filename(start.year(), start.month());
        Self {
            file: AtomicFile::new(location.join(&name)),
            name,
            range: Range::month_of(start),
            lines: OnceCell::from(Vec::new()),
            dirty: false,
        }
    }

    /// File name, e.g. `2016-06.data`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The month this shard covers.
    #[must_use]
    pub const fn range(&self) -> &Range {
        &self.range
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Every serialized interval in this shard, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the backing file exists but cannot be read.
    pub fn all_lines(&self) -> io::Result<&[String]> {
        if let Some(lines) = self.lines.get() {
            return Ok(lines.as_slice());
        }

        let loaded = self.load_lines()?;
        Ok(self.lines.get_or_init(|| loaded).as_slice())
    }

    /// Lines already in memory, without touching the disk.
    #[must_use]
    pub fn cached_lines(&self) -> Option<&[String]> {
        self.lines.get().map(Vec::as_slice)
    }

    /// Insert the interval at its sorted position.
    ///
    /// Returns `false` if an identical record is already present, in which
    /// case nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the shard's lines must be loaded and cannot be.
    pub fn add_interval(&mut self, interval: &Interval) -> io::Result<bool> {
        debug_assert!(interval.starts_within(&self.range));

        let serialized = interval.serialize();
        let lines = self.lines_mut()?;
        match lines.binary_search(&serialized) {
            Ok(_) => Ok(false),
            Err(pos) => {
                lines.insert(pos, serialized);
                self.dirty = true;
                Ok(true)
            }
        }
    }

    /// Remove the record matching `interval` exactly.
    ///
    /// Returns `false` if no such record exists.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the shard's lines must be loaded and cannot be.
    pub fn delete_interval(&mut self, interval: &Interval) -> io::Result<bool> {
        let serialized = interval.serialize();
        let lines = self.lines_mut()?;
        match lines.iter().position(|line| *line == serialized) {
            Some(pos) => {
                lines.remove(pos);
                self.dirty = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write pending changes through the atomic writer.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write fails; the shard stays dirty.
    pub fn commit(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let mut contents = String::new();
        for line in self.lines.get().map(Vec::as_slice).unwrap_or_default() {
            contents.push_str(line);
            contents.push('\n');
        }
        self.file.write(contents.as_bytes())?;
        self.dirty = false;

        tracing::debug!(shard = %self.name, "committed data file");
        Ok(())
    }

    /// Human-readable summary for diagnostics.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = format!(
            "Datafile\n  Name:        {}\n  dirty:       {}\n  lines:       {}\n  range:       {} - {}\n",
            self.name,
            self.dirty,
            self.cached_lines().map_or(0, <[String]>::len),
            self.range.start.format("%Y-%m-%d"),
            self.range
                .end
                .map_or_else(String::new, |end| end.format("%Y-%m-%d").to_string()),
        );
        if self.lines.get().is_none() {
            out.push_str("  (lines not loaded)\n");
        }
        out
    }

    fn lines_mut(&mut self) -> io::Result<&mut Vec<String>> {
        if self.lines.get().is_none() {
            let loaded = self.load_lines()?;
            let _ = self.lines.set(loaded);
        }
        self.lines
            .get_mut()
            .ok_or_else(|| io::Error::other("shard lines failed to initialize"))
    }

    fn load_lines(&self) -> io::Result<Vec<String>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }

        let content = self.file.read()?;
        let lines = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        tracing::trace!(shard = %self.name, "loaded data file");
        Ok(lines)
    }
}

/// Generate the shard filename for a given year and month.
#[must_use]
pub fn shard_filename(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}{SHARD_EXTENSION}")
}

/// Parse a shard filename like `"2016-06.data"` into (year, month).
///
/// Only the exact `####-##.data` shape is accepted, so `tags.data` and
/// `undo.data` in the same directory are never mistaken for shards.
#[must_use]
pub fn parse_shard_filename(name: &str) -> Option<(i32, u32)> {
    let stem = name.strip_suffix(SHARD_EXTENSION)?;
    let (year_str, month_str) = stem.split_once('-')?;
    if year_str.len() != 4 || month_str.len() != 2 {
        return None;
    }
    if !year_str.bytes().chain(month_str.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = year_str.parse().ok()?;
    let month: u32 = month_str.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

/// List valid shard file names in `location`, sorted chronologically.
///
/// `YYYY-MM` names sort lexicographically in date order. A missing
/// directory yields an empty list.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be read.
pub fn list_shard_files(location: &Path) -> io::Result<Vec<PathBuf>> {
    if !location.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(location)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if parse_shard_filename(&name_str).is_some() {
            names.push(name_str.into_owned());
        }
    }
    names.sort_unstable();
    Ok(names.into_iter().map(|name| location.join(name)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .expect("valid date")
    }

    fn hour(y: i32, m: u32, d: u32, h: u32) -> Interval {
        Interval::closed(at(y, m, d, h), at(y, m, d, h + 1))
    }

    // -----------------------------------------------------------------------
    // parse_shard_filename
    // -----------------------------------------------------------------------

    #[test]
    fn parse_valid_shard_filenames() {
        assert_eq!(parse_shard_filename("2016-01.data"), Some((2016, 1)));
        assert_eq!(parse_shard_filename("2016-12.data"), Some((2016, 12)));
        assert_eq!(parse_shard_filename("1980-06.data"), Some((1980, 6)));
    }

    #[test]
    fn parse_invalid_shard_filenames() {
        assert_eq!(parse_shard_filename("tags.data"), None);
        assert_eq!(parse_shard_filename("undo.data"), None);
        assert_eq!(parse_shard_filename("2016-13.data"), None); // month > 12
        assert_eq!(parse_shard_filename("2016-00.data"), None); // month 0
        assert_eq!(parse_shard_filename("2016-1.data"), None);
        assert_eq!(parse_shard_filename("16-01.data"), None);
        assert_eq!(parse_shard_filename("2016-01.data.tmp"), None);
        assert_eq!(parse_shard_filename("2016-01.events"), None);
        assert_eq!(parse_shard_filename("+016-01.data"), None);
        assert_eq!(parse_shard_filename(""), None);
    }

    #[test]
    fn shard_filename_format() {
        assert_eq!(shard_filename(2016, 1), "2016-01.data");
        assert_eq!(shard_filename(1980, 12), "1980-12.data");
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn list_shard_files_sorted_and_filtered() {
        let tmp = TempDir::new().expect("tempdir");
        for name in ["2019-06.data", "2016-06.data", "tags.data", "undo.data", "2017-06.data"] {
            fs::write(tmp.path().join(name), "").expect("write");
        }
        fs::write(tmp.path().join("readme.txt"), "hi").expect("write");

        let files = list_shard_files(tmp.path()).expect("list");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2016-06.data", "2017-06.data", "2019-06.data"]);
    }

    #[test]
    fn list_shard_files_missing_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let files = list_shard_files(&tmp.path().join("nope")).expect("list");
        assert!(files.is_empty());
    }

    // -----------------------------------------------------------------------
    // Shard
    // -----------------------------------------------------------------------

    #[test]
    fn create_derives_name_and_range() {
        let shard = Shard::create(Path::new("/db"), at(2016, 6, 15, 3));
        assert_eq!(shard.name(), "2016-06.data");
        assert_eq!(shard.path(), Path::new("/db/2016-06.data"));
        assert_eq!(shard.range().start, at(2016, 6, 1, 0));
        assert_eq!(shard.range().end, Some(at(2016, 7, 1, 0)));
        assert_eq!(shard.cached_lines(), Some(&[][..]));
    }

    #[test]
    fn open_rejects_bad_name() {
        assert!(Shard::open("/db/tags.data").is_none());
        assert!(Shard::open("/db/2016-06.data").is_some());
    }

    #[test]
    fn add_keeps_lines_sorted() {
        let tmp = TempDir::new().expect("tempdir");
        let mut shard = Shard::create(tmp.path(), at(2016, 6, 1, 0));

        assert!(shard.add_interval(&hour(2016, 6, 3, 1)).expect("add"));
        assert!(shard.add_interval(&hour(2016, 6, 1, 1)).expect("add"));
        assert!(shard.add_interval(&hour(2016, 6, 2, 1)).expect("add"));

        let lines = shard.all_lines().expect("lines");
        assert!(lines.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(lines.len(), 3);
        assert!(shard.is_dirty());
    }

    #[test]
    fn add_duplicate_is_noop() {
        let tmp = TempDir::new().expect("tempdir");
        let mut shard = Shard::create(tmp.path(), at(2016, 6, 1, 0));
        assert!(shard.add_interval(&hour(2016, 6, 3, 1)).expect("add"));
        assert!(!shard.add_interval(&hour(2016, 6, 3, 1)).expect("dup"));
        assert_eq!(shard.all_lines().expect("lines").len(), 1);
    }

    #[test]
    fn delete_reports_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let mut shard = Shard::create(tmp.path(), at(2016, 6, 1, 0));
        shard.add_interval(&hour(2016, 6, 3, 1)).expect("add");

        assert!(!shard.delete_interval(&hour(2016, 6, 4, 1)).expect("delete"));
        assert!(shard.delete_interval(&hour(2016, 6, 3, 1)).expect("delete"));
        assert!(shard.all_lines().expect("lines").is_empty());
    }

    #[test]
    fn commit_writes_and_reopen_reads_lazily() {
        let tmp = TempDir::new().expect("tempdir");
        let mut shard = Shard::create(tmp.path(), at(2016, 6, 1, 0));
        shard.add_interval(&hour(2016, 6, 2, 1)).expect("add");
        shard.add_interval(&hour(2016, 6, 1, 1)).expect("add");
        shard.commit().expect("commit");
        assert!(!shard.is_dirty());

        let reopened = Shard::open(tmp.path().join("2016-06.data")).expect("open");
        assert!(reopened.cached_lines().is_none());
        assert_eq!(
            reopened.all_lines().expect("lines"),
            shard.all_lines().expect("lines")
        );
    }

    #[test]
    fn commit_of_clean_shard_writes_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let mut shard = Shard::create(tmp.path(), at(2016, 6, 1, 0));
        shard.commit().expect("commit");
        assert!(!shard.path().exists());
    }

    #[test]
    fn emptied_shard_leaves_empty_file() {
        let tmp = TempDir::new().expect("tempdir");
        let mut shard = Shard::create(tmp.path(), at(2016, 6, 1, 0));
        shard.add_interval(&hour(2016, 6, 2, 1)).expect("add");
        shard.commit().expect("commit");
        shard.delete_interval(&hour(2016, 6, 2, 1)).expect("delete");
        shard.commit().expect("commit");

        let content = fs::read_to_string(shard.path()).expect("read");
        assert!(content.is_empty());
    }

    #[test]
    fn load_skips_blank_lines() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("2016-06.data");
        fs::write(
            &path,
            "inc 20160601T010000Z - 20160601T020000Z\n\n  \ninc 20160602T010000Z - 20160602T020000Z\n",
        )
        .expect("write");

        let shard = Shard::open(&path).expect("open");
        assert_eq!(shard.all_lines().expect("lines").len(), 2);
    }

    #[test]
    fn dump_mentions_name() {
        let shard = Shard::create(Path::new("/db"), at(2016, 6, 1, 0));
        let dump = shard.dump();
        assert!(dump.contains("2016-06.data"));
        assert!(dump.contains("2016-06-01 - 2016-07-01"));
    }
}
