//! Time ranges and midnight splitting.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Nanoseconds in one tick.
pub(crate) const TICK_NANOS: i64 = 100;

/// Smallest time step the pipeline distinguishes.
///
/// A day split ends one tick before midnight so that consecutive parts never
/// share an instant.
pub const TICK: TimeDelta = TimeDelta::nanoseconds(TICK_NANOS);

/// A span of wall-clock time from `start` up to `end`.
///
/// `end` is the last covered instant, except that an `end` falling exactly on
/// a bucket boundary does not claim the bucket starting there: `08:00..12:00`
/// covers the morning buckets and stops short of the one at noon.
/// [`Range::intersects`] compares the raw instants and so treats both ends as
/// closed.
///
/// `start <= end` is expected but not enforced: unpaired markers in the
/// source can produce reversed ranges, and every stage tolerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Range {
    pub const fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns true if the two ranges share at least one instant.
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.end < other.start || self.start > other.end)
    }

    /// The calendar date this range is attributed to.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Splits the range so that no part crosses midnight.
    ///
    /// Every part but the last ends at `23:59:59.9999999`; the next part starts
    /// at the following midnight.
    pub fn split_by_date(&self) -> DaySplit {
        DaySplit {
            cursor: Some(self.start),
            end: self.end,
        }
    }
}

/// Iterator returned by [`Range::split_by_date`].
#[derive(Debug, Clone)]
pub struct DaySplit {
    cursor: Option<NaiveDateTime>,
    end: NaiveDateTime,
}

impl Iterator for DaySplit {
    type Item = Range;

    fn next(&mut self) -> Option<Range> {
        let cursor = self.cursor?;

        if cursor.date() < self.end.date() {
            if let Some(next_day) = cursor.date().succ_opt() {
                let midnight = next_day.and_time(NaiveTime::MIN);
                self.cursor = Some(midnight);
                return Some(Range::new(cursor, midnight - TICK));
            }
        }

        self.cursor = None;
        Some(Range::new(cursor, self.end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            None => (0, Some(0)),
            Some(cursor) => {
                let days = (self.end.date() - cursor.date()).num_days().max(0);
                let remaining = usize::try_from(days).map_or(usize::MAX, |d| d.saturating_add(1));
                (remaining, Some(remaining))
            }
        }
    }
}

impl std::iter::FusedIterator for DaySplit {}
