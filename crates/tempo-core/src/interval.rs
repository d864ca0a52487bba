//! Interval records and their on-disk line format.
//!
//! Each stored interval is one line:
//!
//! ```text
//! inc 20160602T010000Z - 20160602T020000Z # client "deep work"
//! inc 20160603T090000Z # running
//! ```
//!
//! Timestamps are fixed-width ISO-8601 basic UTC, so sorting lines as
//! strings sorts them by start time. Tags are sorted (they live in a
//! `BTreeSet`); a tag is quoted when it is empty or contains whitespace,
//! `"`, `#`, or `\`.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::range::Range;

/// Timestamp layout used by both the line format and the JSON form.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const RECORD_KEYWORD: &str = "inc";

/// A stored interval could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid interval record {line:?}: {reason}")]
pub struct ParseError {
    pub line: String,
    pub reason: String,
}

impl ParseError {
    fn new(line: &str, reason: impl Into<String>) -> Self {
        Self {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// A tracked span of time with a set of tags.
///
/// An interval with no `end` is open: tracking is still running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl Interval {
    #[must_use]
    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
            tags: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn open(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: None,
            tags: BTreeSet::new(),
        }
    }

    /// Builder-style helper to attach tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    #[must_use]
    pub const fn range(&self) -> Range {
        Range {
            start: self.start,
            end: self.end,
        }
    }

    #[must_use]
    pub fn starts_within(&self, range: &Range) -> bool {
        range.contains(self.start)
    }

    /// A closed interval must not end before it starts.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.end.is_none_or(|end| self.start <= end)
    }

    /// Render the single-line storage form.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = format!("{RECORD_KEYWORD} {}", format_timestamp(self.start));
        if let Some(end) = self.end {
            out.push_str(" - ");
            out.push_str(&format_timestamp(end));
        }
        if !self.tags.is_empty() {
            out.push_str(" #");
            for tag in &self.tags {
                out.push(' ');
                out.push_str(&quote_if_needed(tag));
            }
        }
        out
    }

    /// Render the JSON form used by the undo journal and export.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a line produced by [`Interval::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the line is not a well-formed record.
    pub fn from_serialization(line: &str) -> Result<Self, ParseError> {
        let (times, tag_text) = match line.split_once(" #") {
            Some((times, tags)) => (times, Some(tags)),
            None => (line, None),
        };

        let mut words = times.split_whitespace();
        if words.next() != Some(RECORD_KEYWORD) {
            return Err(ParseError::new(line, "missing 'inc' keyword"));
        }

        let start = words
            .next()
            .ok_or_else(|| ParseError::new(line, "missing start time"))
            .and_then(|s| parse_timestamp(s).map_err(|e| ParseError::new(line, e)))?;

        let end = match words.next() {
            None => None,
            Some("-") => {
                let raw = words
                    .next()
                    .ok_or_else(|| ParseError::new(line, "missing end time after '-'"))?;
                Some(parse_timestamp(raw).map_err(|e| ParseError::new(line, e))?)
            }
            Some(other) => {
                return Err(ParseError::new(line, format!("unexpected token {other:?}")));
            }
        };

        if let Some(extra) = words.next() {
            return Err(ParseError::new(line, format!("unexpected token {extra:?}")));
        }

        let tags = match tag_text {
            Some(text) => split_tags(text).map_err(|e| ParseError::new(line, e))?,
            None => BTreeSet::new(),
        };

        Ok(Self { start, end, tags })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[must_use]
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `YYYYMMDDTHHMMSSZ` timestamp.
///
/// # Errors
///
/// Returns a description of the problem when `raw` is not in that layout.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("bad timestamp {raw:?}: {e}"))
}

fn needs_quotes(tag: &str) -> bool {
    tag.is_empty()
        || tag
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '#' | '\\'))
}

/// Quote a tag for the storage line. Control characters are escaped so a
/// record never spans more than one line.
fn quote_if_needed(tag: &str) -> String {
    if !needs_quotes(tag) {
        return tag.to_string();
    }

    let mut out = String::with_capacity(tag.len() + 2);
    out.push('"');
    for c in tag.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Decode the escape that follows a backslash inside a quoted tag.
fn unescape<I: Iterator<Item = char>>(chars: &mut I) -> Result<char, String> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('u') => {
            if chars.next() != Some('{') {
                return Err("expected '{' after \\u in tag".into());
            }
            let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| format!("invalid \\u{{{hex}}} escape in tag"))
        }
        Some(other) => Ok(other),
        None => Err("dangling escape in tag".into()),
    }
}

/// Split the text after `#` into tags, honouring double quotes and
/// backslash escapes inside them.
fn split_tags(text: &str) -> Result<BTreeSet<String>, String> {
    let mut tags = BTreeSet::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut tag = String::new();
        if first == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => tag.push(unescape(&mut chars)?),
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => tag.push(other),
                }
            }
            if !closed {
                return Err("unterminated quoted tag".into());
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                tag.push(c);
            }
        }
        tags.insert(tag);
    }

    Ok(tags)
}

/// Serde adapter for [`TIMESTAMP_FORMAT`] strings.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            t: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_str(&super::super::format_timestamp(*t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| super::super::parse_timestamp(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
