//! Whole-store traversal.
//!
//! [`Entries`] walks every shard and, within each shard, every line,
//! yielding one logically ordered stream of serialized intervals. Shards
//! load lazily as the cursor reaches them; nothing beyond the current
//! shard is read.
//!
//! Positions are counted in traversal order, so both directions share the
//! same advance/settle logic and only differ in how a position maps to a
//! physical index.

use crate::error::StoreError;
use crate::shard::Shard;

/// Traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Most recent first.
    Forward,
    /// Oldest first.
    Reverse,
}

impl Direction {
    /// Physical index of the `pos`-th element, counted in traversal order,
    /// out of `len`.
    const fn physical(self, pos: usize, len: usize) -> usize {
        match self {
            Self::Forward => len - 1 - pos,
            Self::Reverse => pos,
        }
    }
}

/// Cursor over every stored line.
///
/// Yields `Err` once if a shard cannot be loaded, then ends.
#[derive(Debug)]
pub struct Entries<'a> {
    shards: &'a [Shard],
    direction: Direction,
    shard: usize,
    line: usize,
    pending: Option<StoreError>,
}

impl<'a> Entries<'a> {
    /// Cursor at the first line in `direction`, skipping empty shards.
    pub(crate) fn new(shards: &'a [Shard], direction: Direction) -> Self {
        let mut cursor = Self {
            shards,
            direction,
            shard: 0,
            line: 0,
            pending: None,
        };
        cursor.settle();
        cursor
    }

    /// The past-the-end cursor.
    pub(crate) fn end(shards: &'a [Shard], direction: Direction) -> Self {
        Self {
            shards,
            direction,
            shard: shards.len(),
            line: 0,
            pending: None,
        }
    }

    /// True once every line has been yielded.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.shard >= self.shards.len()
    }

    /// The line under the cursor, without advancing.
    ///
    /// Returns `None` at the end.
    #[must_use]
    pub fn peek(&self) -> Option<&'a str> {
        if self.is_end() {
            return None;
        }
        let shards: &'a [Shard] = self.shards;
        let shard = &shards[self.direction.physical(self.shard, shards.len())];
        let lines = shard.cached_lines()?;
        lines
            .get(self.direction.physical(self.line, lines.len()))
            .map(String::as_str)
    }

    /// Move past exhausted (or empty) shards until the cursor rests on a
    /// line or reaches the end.
    fn settle(&mut self) {
        let shards: &'a [Shard] = self.shards;
        while self.shard < shards.len() {
            let shard = &shards[self.direction.physical(self.shard, shards.len())];
            match shard.all_lines() {
                Ok(lines) if self.line < lines.len() => return,
                Ok(_) => {
                    self.shard += 1;
                    self.line = 0;
                }
                Err(err) => {
                    tracing::warn!(shard = %shard.name(), error = %err, "failed to load data file");
                    self.pending = Some(StoreError::Io(err));
                    self.shard = shards.len();
                    self.line = 0;
                    return;
                }
            }
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<&'a str, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }

        let line = self.peek()?;
        self.line += 1;
        self.settle();
        Some(Ok(line))
    }
}

/// End cursors are equal whatever their direction or history; otherwise
/// cursors are equal when they walk the same shards in the same direction
/// and rest on the same position.
impl PartialEq for Entries<'_> {
    fn eq(&self, other: &Self) -> bool {
        if other.is_end() {
            return self.is_end();
        }
        std::ptr::eq(self.shards, other.shards)
            && self.direction == other.direction
            && self.shard == other.shard
            && self.line == other.line
    }
}
