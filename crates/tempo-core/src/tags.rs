//! Tag usage index.
//!
//! A reverse index from tag name to the number of stored intervals that
//! carry it, persisted as `tags.data`:
//!
//! ```json
//! {
//!   "client": { "count": 12 },
//!   "deep work": { "count": 3 }
//! }
//! ```
//!
//! The index is derived data. The store rebuilds it from the data files
//! whenever the file is missing or cannot be trusted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File name of the persisted index inside the store location.
pub const TAGS_FILENAME: &str = "tags.data";

/// Per-tag statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub count: u64,
}

/// The persisted index did not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum TagIndexError {
    #[error("tags database is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tags database must be a JSON object")]
    NotAnObject,

    #[error("failed to find \"count\" member for tag {0:?} in tags database")]
    MissingCount(String),
}

/// Tag name → usage count, with a dirty flag tracking divergence from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    tags: BTreeMap<String, TagInfo>,
    modified: bool,
}

impl TagIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted JSON form. The result is clean (not modified).
    ///
    /// # Errors
    ///
    /// Returns [`TagIndexError`] if the document is not an object of
    /// objects each carrying a non-negative integer `count`.
    pub fn from_json(content: &str) -> Result<Self, TagIndexError> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Object(map) = value else {
            return Err(TagIndexError::NotAnObject);
        };

        let mut tags = BTreeMap::new();
        for (name, entry) in map {
            let count = entry
                .get("count")
                .and_then(Value::as_u64)
                .ok_or_else(|| TagIndexError::MissingCount(name.clone()))?;
            tags.insert(name, TagInfo { count });
        }

        Ok(Self {
            tags,
            modified: false,
        })
    }

    /// Render the persisted JSON form.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Keys are strings and values plain structs; serialization cannot fail.
        serde_json::to_string_pretty(&self.tags).unwrap_or_else(|_| "{}".to_string()) + "\n"
    }

    /// Bump the count for `tag` and return the new count.
    ///
    /// A return of `1` means the tag went from unused to used.
    pub fn increment(&mut self, tag: &str) -> u64 {
        self.modified = true;
        let info = self.tags.entry(tag.to_string()).or_default();
        info.count += 1;
        info.count
    }

    /// Lower the count for `tag`, saturating at zero, and return the new
    /// count. The tag stays known even at zero.
    pub fn decrement(&mut self, tag: &str) -> u64 {
        self.modified = true;
        let info = self.tags.entry(tag.to_string()).or_default();
        info.count = info.count.saturating_sub(1);
        info.count
    }

    #[must_use]
    pub fn count(&self, tag: &str) -> u64 {
        self.tags.get(tag).map_or(0, |info| info.count)
    }

    /// Every tag the index knows about, including ones no longer in use.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.tags.keys().cloned().collect()
    }

    #[must_use]
    pub fn counts(&self) -> &BTreeMap<String, TagInfo> {
        &self.tags
    }

    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }
}
