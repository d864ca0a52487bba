//! The interval store.
//!
//! A [`Store`] owns the sorted collection of monthly shards, the tag index,
//! and the undo journal for one data directory. Mutations touch memory only;
//! [`Store::commit`] makes them durable.
//!
//! # Invariants
//!
//! - `shards` is sorted by month and no two shards cover the same month.
//! - Concatenating every shard's lines in order gives all intervals in
//!   ascending start order.
//! - After every successful add/delete, each tag's count equals the number
//!   of stored intervals carrying it.
//! - Every successful mutation appends one undo record.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::atomic::AtomicFile;
use crate::cursor::{Direction, Entries};
use crate::error::StoreError;
use crate::interval::Interval;
use crate::journal::Journal;
use crate::shard::{Shard, list_shard_files};
use crate::tags::{TAGS_FILENAME, TagIndex};

/// Result of [`Store::add_interval`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// False when an identical record was already stored.
    pub inserted: bool,
    /// Tags that went from unused to used with this add.
    pub new_tags: Vec<String>,
}

/// Where an interval's start lands in the shard collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// The shard at this index covers the start.
    Found(usize),
    /// No shard covers it; a new one belongs at this index.
    Insert(usize),
}

/// Locate the shard for `start`, scanning from the most recent shard since
/// new data usually lands at the end.
fn locate(shards: &[Shard], start: DateTime<Utc>) -> Slot {
    for (idx, shard) in shards.iter().enumerate().rev() {
        let range = shard.range();
        if range.contains(start) {
            return Slot::Found(idx);
        }
        if range.end.is_some_and(|end| end <= start) {
            return Slot::Insert(idx + 1);
        }
    }
    Slot::Insert(0)
}

/// Monthly-sharded interval storage rooted at one directory.
#[derive(Debug)]
pub struct Store {
    location: PathBuf,
    shards: Vec<Shard>,
    tags: TagIndex,
    journal: Journal,
}

impl Store {
    /// Open (or initialize) the store at `location`.
    ///
    /// Lists existing data files and loads the tag index, rebuilding it from
    /// the data files when `tags.data` is missing or invalid.
    /// `journal_size` follows [`crate::journal::Retention::from_size`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or
    /// listed, or if a rebuild cannot read the data files, and
    /// [`StoreError::Parse`] if a rebuild meets a corrupt record.
    pub fn open(location: impl Into<PathBuf>, journal_size: i64) -> Result<Self, StoreError> {
        let location = location.into();
        fs::create_dir_all(&location)?;

        let shards = list_shard_files(&location)?
            .into_iter()
            .filter_map(Shard::open)
            .collect::<Vec<_>>();
        tracing::debug!(
            location = %location.display(),
            shard_count = shards.len(),
            "opened store"
        );

        let mut store = Self {
            journal: Journal::new(&location, journal_size),
            location,
            shards,
            tags: TagIndex::new(),
        };
        store.initialize_tags()?;
        Ok(store)
    }

    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    #[must_use]
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Mutable journal access, for wrapping bulk operations in a
    /// transaction.
    pub const fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }

    #[must_use]
    pub const fn tag_index(&self) -> &TagIndex {
        &self.tags
    }

    /// Every tag the index has seen.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.tags.tags()
    }

    #[must_use]
    pub fn tag_count(&self, tag: &str) -> u64 {
        self.tags.count(tag)
    }

    /// Data file names in chronological order.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.shards.iter().map(|s| s.name().to_string()).collect()
    }

    /// Most-recent-first traversal of every stored line.
    #[must_use]
    pub fn iter(&self) -> Entries<'_> {
        Entries::new(&self.shards, Direction::Forward)
    }

    /// Oldest-first traversal of every stored line.
    #[must_use]
    pub fn iter_rev(&self) -> Entries<'_> {
        Entries::new(&self.shards, Direction::Reverse)
    }

    /// The canonical past-the-end cursor.
    #[must_use]
    pub fn end(&self) -> Entries<'_> {
        Entries::end(&self.shards, Direction::Forward)
    }

    /// True if no shard holds any line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter() == self.end()
    }

    /// The most recent stored line, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if a data file cannot be read.
    pub fn latest_entry(&self) -> Result<Option<String>, StoreError> {
        self.iter().next().transpose().map(|line| line.map(str::to_string))
    }

    /// Store an interval.
    ///
    /// Creates the owning month's shard if it does not exist yet. A record
    /// identical to one already stored is not duplicated and records no
    /// undo entry. Tag counts change only once the line and its undo record
    /// are both in place; any failure leaves the store as it was.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Consistency`] for a closed interval that ends
    /// before it starts, [`StoreError::Io`] if the shard or journal fails.
    pub fn add_interval(&mut self, interval: &Interval) -> Result<AddOutcome, StoreError> {
        if !interval.is_well_formed() {
            return Err(StoreError::Consistency(format!(
                "interval starts after it ends: {interval}"
            )));
        }
        let after = interval.to_json().map_err(std::io::Error::other)?;

        let (idx, created) = self.shard_index_for(interval.start);
        let inserted = match self.shards[idx].add_interval(interval) {
            Ok(inserted) => inserted,
            Err(err) => {
                self.discard_created(idx, created);
                return Err(err.into());
            }
        };

        if !inserted {
            tracing::debug!(interval = %interval, "interval already stored");
            return Ok(AddOutcome::default());
        }

        if let Err(err) = self.journal.record_interval_action("", &after) {
            if created {
                self.discard_created(idx, created);
            } else if let Err(undo_err) = self.shards[idx].delete_interval(interval) {
                tracing::warn!(error = %undo_err, "failed to roll back add");
            }
            return Err(err.into());
        }

        let mut new_tags = Vec::new();
        for tag in &interval.tags {
            if self.tags.increment(tag) == 1 {
                tracing::info!(tag = %tag, "new tag");
                new_tags.push(tag.clone());
            }
        }
        Ok(AddOutcome { inserted, new_tags })
    }

    /// Remove a stored interval.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Consistency`] if no shard holds the exact
    /// record; nothing is changed in that case. Returns [`StoreError::Io`]
    /// if the shard or journal fails, after putting the line back.
    pub fn delete_interval(&mut self, interval: &Interval) -> Result<(), StoreError> {
        let before = interval.to_json().map_err(std::io::Error::other)?;

        let Slot::Found(idx) = locate(&self.shards, interval.start) else {
            return Err(StoreError::Consistency(format!(
                "no data file holds the deleted interval: {interval}"
            )));
        };
        if !self.shards[idx].delete_interval(interval)? {
            return Err(StoreError::Consistency(format!(
                "data file {} does not contain the deleted interval: {interval}",
                self.shards[idx].name()
            )));
        }

        if let Err(err) = self.journal.record_interval_action(&before, "") {
            if let Err(undo_err) = self.shards[idx].add_interval(interval) {
                tracing::warn!(error = %undo_err, "failed to roll back delete");
            }
            return Err(err.into());
        }

        for tag in &interval.tags {
            self.tags.decrement(tag);
        }
        Ok(())
    }

    /// Replace `from` with `to` as a delete followed by an add, each with
    /// its own undo record. A `None` side is skipped.
    ///
    /// The delete-then-add shape handles a start time that moves the
    /// interval into a different month.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Store::delete_interval`] and
    /// [`Store::add_interval`].
    pub fn modify_interval(
        &mut self,
        from: Option<&Interval>,
        to: Option<&Interval>,
    ) -> Result<AddOutcome, StoreError> {
        if let Some(from) = from {
            self.delete_interval(from)?;
        }

        match to {
            Some(to) => self.add_interval(to),
            None => Ok(AddOutcome::default()),
        }
    }

    /// Flush every changed shard, then the tag index if it changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on the first failed write. Files written
    /// before the failure stay written.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        for shard in &mut self.shards {
            shard.commit()?;
        }

        if self.tags.is_modified() {
            self.tags_file().write(self.tags.to_json().as_bytes())?;
            self.tags.clear_modified();
            tracing::debug!(tag_count = self.tags.counts().len(), "committed tag index");
        }
        Ok(())
    }

    /// Discard the tag index and recount it from every stored interval.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if a data file cannot be read and
    /// [`StoreError::Parse`] for a corrupt record.
    pub fn rebuild_tags(&mut self) -> Result<(), StoreError> {
        let mut rebuilt = TagIndex::new();
        for line in self.iter() {
            let interval = Interval::from_serialization(line?)?;
            for tag in &interval.tags {
                rebuilt.increment(tag);
            }
        }
        self.tags = rebuilt;
        Ok(())
    }

    /// Human-readable summary of every shard.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::from("Database\n");
        for shard in &self.shards {
            out.push_str(&shard.dump());
        }
        let _ = writeln!(out, "Tags: {}", self.tags.counts().len());
        out
    }

    /// Index of the shard owning `start`, created in sorted position if
    /// missing. The flag is true when the shard was just created.
    fn shard_index_for(&mut self, start: DateTime<Utc>) -> (usize, bool) {
        match locate(&self.shards, start) {
            Slot::Found(idx) => (idx, false),
            Slot::Insert(idx) => {
                let shard = Shard::create(&self.location, start);
                tracing::debug!(shard = %shard.name(), position = idx, "created data file");
                self.shards.insert(idx, shard);
                (idx, true)
            }
        }
    }

    /// Drop a shard created by an add that did not go through.
    fn discard_created(&mut self, idx: usize, created: bool) {
        if created {
            self.shards.remove(idx);
        }
    }

    fn tags_file(&self) -> AtomicFile {
        AtomicFile::new(self.location.join(TAGS_FILENAME))
    }

    /// Load `tags.data`, or reset it and rebuild from the data files.
    ///
    /// The empty index is written before the rebuild starts so the file
    /// always exists afterwards; a failed rebuild leaves it empty.
    fn initialize_tags(&mut self) -> Result<(), StoreError> {
        let file = self.tags_file();
        let exists = file.exists();

        if exists {
            match file.read() {
                Ok(content) => match TagIndex::from_json(&content) {
                    Ok(index) => {
                        self.tags = index;
                        return Ok(());
                    }
                    Err(err) => tracing::warn!(error = %err, "error parsing tags database"),
                },
                Err(err) => tracing::warn!(error = %err, "error reading tags database"),
            }
        }

        self.tags = TagIndex::new();
        file.write(self.tags.to_json().as_bytes())?;

        if self.is_empty() {
            return Ok(());
        }

        if exists {
            tracing::info!("recreating tags database from interval data");
        } else {
            tracing::info!("tags database does not exist, recreating from interval data");
        }
        self.rebuild_tags()
    }
}
