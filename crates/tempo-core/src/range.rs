//! Half-open time ranges and calendar-month segmentation.
//!
//! A [`Range`] is `[start, end)`. An absent `end` means the range is open
//! and extends indefinitely into the future; open ranges are how running
//! intervals are represented.

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// A half-open `[start, end)` time range with an optional end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Range {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// The calendar month containing `t`, as `[first of month, first of next month)`.
    #[must_use]
    pub fn month_of(t: DateTime<Utc>) -> Self {
        let (year, month) = (t.year(), t.month());
        Self::new(month_start(year, month), month_start_after(year, month))
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// True if `t` lies in `[start, end)`.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && self.end.is_none_or(|end| t < end)
    }

    /// True if this range's start falls within `other`.
    #[must_use]
    pub fn starts_within(&self, other: &Self) -> bool {
        other.contains(self.start)
    }

    /// True if the two ranges share at least one instant.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let self_before_other_ends = other.end.is_none_or(|end| self.start < end);
        let other_before_self_ends = self.end.is_none_or(|end| other.start < end);
        self_before_other_ends && other_before_self_ends
    }

    /// The overlapping portion of two ranges, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }

        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        Some(Self { start, end })
    }
}

/// Split `range` into the calendar-month pieces it spans.
///
/// Each segment is the intersection of one month with `range`, so the first
/// and last segments may be shorter than a full month. An open range is
/// treated as ending at `now`.
///
/// ```text
/// 2016-02-20 .. 2016-04-15
///   -> [2016-02-20, 2016-03-01)
///      [2016-03-01, 2016-04-01)
///      [2016-04-01, 2016-04-15)
/// ```
#[must_use]
pub fn segment_range(range: &Range, now: DateTime<Utc>) -> Vec<Range> {
    let end = range.end.unwrap_or(now);
    let bounded = Range::new(range.start, end);

    let (mut year, mut month) = (range.start.year(), range.start.month());
    let (end_year, end_month) = (end.year(), end.month());

    let mut segments = Vec::new();
    while year < end_year || (year == end_year && month <= end_month) {
        let segment = Range::new(month_start(year, month), month_start_after(year, month));
        if let Some(piece) = bounded.intersection(&segment) {
            segments.push(piece);
        }

        (year, month) = next_month(year, month);
    }

    segments
}

/// [`segment_range`] with open ranges ending at the current time.
#[must_use]
pub fn segment_range_now(range: &Range) -> Vec<Range> {
    segment_range(range, Utc::now())
}

const fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Midnight UTC on the first day of the given month.
pub(crate) fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn month_start_after(year: i32, month: u32) -> DateTime<Utc> {
    let (year, month) = next_month(year, month);
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
