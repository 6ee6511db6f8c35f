//! Time-of-day buckets and presence vectors.
//!
//! A day is divided into `buckets_per_day` equal slots. A single-day
//! [`Range`] becomes a [`Presence`] vector with every slot it touches set.
//!
//! # Rounding
//!
//! The start of a range is floored to its slot and the end is rounded up to
//! the slot containing its final instant, so a slot covered for even a single
//! tick counts as present. Reported durations are therefore an upper bound on
//! the time actually covered, never a lower one.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::range::{Range, TICK_NANOS};

/// Default number of buckets per day (30-minute slots).
pub const DEFAULT_BUCKETS_PER_DAY: u32 = 48;

/// Ticks in one calendar day.
const DAY_TICKS: i64 = 86_400 * 1_000_000_000 / TICK_NANOS;

/// Validated bucket layout for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    buckets: u32,
}

impl BucketConfig {
    /// Creates a layout with `buckets` slots per day.
    ///
    /// Rejects zero and any count that does not divide the day's ticks evenly.
    pub fn new(buckets: u32) -> Result<Self> {
        if buckets == 0 || DAY_TICKS % i64::from(buckets) != 0 {
            return Err(Error::InvalidBucketCount {
                buckets,
                day_ticks: DAY_TICKS,
            });
        }
        Ok(Self { buckets })
    }

    pub const fn buckets_per_day(&self) -> u32 {
        self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets as usize
    }

    fn span_nanos(self) -> i64 {
        DAY_TICKS / i64::from(self.buckets) * TICK_NANOS
    }

    /// Duration of a single bucket.
    pub fn bucket_span(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.span_nanos())
    }

    /// Time of day at which bucket `index` begins.
    pub fn bucket_start(&self, index: usize) -> NaiveTime {
        let offset = i32::try_from(index).map_or(TimeDelta::zero(), |i| self.bucket_span() * i);
        NaiveTime::MIN + offset
    }

    /// Total active time represented by a presence vector.
    pub fn duration_of(&self, presence: &Presence) -> TimeDelta {
        let worked = i32::try_from(presence.worked_buckets()).unwrap_or(i32::MAX);
        self.bucket_span() * worked
    }

    /// An all-false vector of the right length.
    pub fn empty(&self) -> Presence {
        Presence::empty(self.len())
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS_PER_DAY,
        }
    }
}

/// Per-day presence: one flag per bucket in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Presence(Vec<bool>);

impl Presence {
    /// All-false vector, the identity of [`Presence::combine`].
    pub fn empty(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    /// Number of active buckets.
    pub fn worked_buckets(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Indices of active buckets, ascending.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
    }

    /// Bucket-wise OR of two vectors of equal length.
    pub fn combine(&self, other: &Self) -> Result<Self> {
        let mut merged = self.clone();
        merged.merge(other)?;
        Ok(merged)
    }

    /// In-place bucket-wise OR.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::LengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        for (mine, theirs) in self.0.iter_mut().zip(&other.0) {
            *mine |= *theirs;
        }
        Ok(())
    }

    /// ASCII rendering: `*` for active, `.` for inactive.
    pub fn render(&self) -> String {
        self.0.iter().map(|&b| if b { '*' } else { '.' }).collect()
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Presence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.chars()
            .map(|c| match c {
                '*' => Ok(true),
                '.' => Ok(false),
                other => Err(format!("invalid presence character: {other:?}")),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl Serialize for Presence {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.render())
    }
}

impl<'de> Deserialize<'de> for Presence {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Integer division rounding toward positive infinity. `divisor` must be positive.
const fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value / divisor;
    if value % divisor > 0 {
        quotient + 1
    } else {
        quotient
    }
}

/// Maps a single-day range onto a presence vector.
///
/// The day is the calendar date of `range.start`. An end beyond that day is
/// clamped to the last bucket; a zero-length or reversed range marks only
/// the start bucket.
pub fn bucketize(range: &Range, config: &BucketConfig) -> Presence {
    let day_start = range.start.date().and_time(NaiveTime::MIN);
    let span = config.span_nanos();
    let last = i64::from(config.buckets) - 1;

    let start_nanos = (range.start - day_start).num_nanoseconds().unwrap_or(0);
    // Offsets beyond ~292 years overflow; only the direction matters then.
    let end_nanos = (range.end - day_start).num_nanoseconds().unwrap_or_else(|| {
        if range.end < range.start {
            start_nanos
        } else {
            i64::MAX - span
        }
    });

    let start_bucket = (start_nanos / span).clamp(0, last);
    let end_bucket = (ceil_div(end_nanos, span) - 1).clamp(start_bucket, last);

    let mut presence = config.empty();
    let first = usize::try_from(start_bucket).unwrap_or(0);
    let end = usize::try_from(end_bucket).unwrap_or(first);
    for slot in &mut presence.0[first..=end] {
        *slot = true;
    }

    tracing::trace!(
        start = %range.start,
        end = %range.end,
        first,
        last = end,
        "bucketized range"
    );
    presence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::TICK;
    use chrono::NaiveDateTime;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    fn day_range(start: &str, end: &str) -> Range {
        Range::new(at("2025-01-27", start), at("2025-01-27", end))
    }

    #[test]
    fn test_config_rejects_zero_and_non_divisors() {
        assert!(matches!(
            BucketConfig::new(0),
            Err(Error::InvalidBucketCount { buckets: 0, .. })
        ));
        assert!(BucketConfig::new(7).is_err());
        assert!(BucketConfig::new(1).is_ok());
        assert!(BucketConfig::new(24).is_ok());
        assert!(BucketConfig::new(48).is_ok());
        assert!(BucketConfig::new(96).is_ok());
        assert!(BucketConfig::new(1440).is_ok());
    }

    #[test]
    fn test_default_config_has_half_hour_buckets() {
        let config = BucketConfig::default();
        assert_eq!(config.buckets_per_day(), 48);
        assert_eq!(config.bucket_span(), TimeDelta::minutes(30));
        assert_eq!(config.bucket_start(17), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    fn test_morning_session_marks_eight_buckets() {
        let presence = bucketize(&day_range("08:00:00", "12:00:00"), &BucketConfig::default());

        assert_eq!(presence.active().collect::<Vec<_>>(), (16..=23).collect::<Vec<_>>());
        assert_eq!(
            presence.render(),
            "................********........................"
        );
        assert_eq!(
            BucketConfig::default().duration_of(&presence),
            TimeDelta::hours(4)
        );
    }

    #[test]
    fn test_zero_length_range_marks_one_bucket() {
        let presence = bucketize(&day_range("10:00:00", "10:00:00"), &BucketConfig::default());
        assert_eq!(presence.active().collect::<Vec<_>>(), vec![20]);
    }

    #[test]
    fn test_single_tick_overlap_marks_bucket() {
        let config = BucketConfig::default();
        let start = at("2025-01-27", "10:29:59.9999999");
        let presence = bucketize(&Range::new(start, start + TICK), &config);
        assert_eq!(presence.active().collect::<Vec<_>>(), vec![20]);

        let into_next = bucketize(&Range::new(start, start + TICK * 2), &config);
        assert_eq!(into_next.active().collect::<Vec<_>>(), vec![20, 21]);
    }

    #[test]
    fn test_aligned_end_stops_before_boundary_bucket() {
        let config = BucketConfig::default();
        let morning = day_range("08:00:00", "12:00:00");
        let noon_start = at("2025-01-27", "12:00:00");
        let noon = Range::new(noon_start, noon_start + TICK);

        assert!(morning.intersects(&noon));
        assert_eq!(
            bucketize(&morning, &config).active().collect::<Vec<_>>(),
            (16..=23).collect::<Vec<_>>()
        );
        assert_eq!(bucketize(&noon, &config).active().collect::<Vec<_>>(), vec![24]);
    }

    #[test]
    fn test_partial_buckets_round_outward() {
        let presence = bucketize(&day_range("09:10:00", "09:40:00"), &BucketConfig::default());
        assert_eq!(presence.active().collect::<Vec<_>>(), vec![18, 19]);
    }

    #[test]
    fn test_end_of_day_clamps_to_last_bucket() {
        let config = BucketConfig::default();
        let before_midnight = bucketize(&day_range("22:00:00", "23:59:59.9999999"), &config);
        assert_eq!(before_midnight.active().collect::<Vec<_>>(), (44..=47).collect::<Vec<_>>());

        let past_midnight = Range::new(at("2025-01-27", "23:00:00"), at("2025-01-29", "05:00:00"));
        let clamped = bucketize(&past_midnight, &config);
        assert_eq!(clamped.active().collect::<Vec<_>>(), vec![46, 47]);
    }

    #[test]
    fn test_reversed_range_marks_start_bucket() {
        let presence = bucketize(&day_range("12:00:00", "08:00:00"), &BucketConfig::default());
        assert_eq!(presence.active().collect::<Vec<_>>(), vec![24]);
    }

    #[test]
    fn test_indices_stay_within_bounds_for_all_layouts() {
        let ranges = [
            day_range("00:00:00", "00:00:00"),
            day_range("00:00:00", "23:59:59.9999999"),
            day_range("23:59:59.9999999", "23:59:59.9999999"),
            day_range("06:17:43", "18:02:11.5"),
            Range::new(at("2025-01-27", "12:00:00"), at("2025-01-28", "00:00:00")),
        ];
        for buckets in [1, 2, 24, 48, 96, 288, 1440] {
            let config = BucketConfig::new(buckets).unwrap();
            for range in &ranges {
                let presence = bucketize(range, &config);
                assert_eq!(presence.len(), config.len());
                assert!(presence.worked_buckets() >= 1);
                assert!(presence.active().all(|i| i < config.len()));
            }
        }
    }

    #[test]
    fn test_full_day_marks_every_bucket() {
        let config = BucketConfig::new(24).unwrap();
        let presence = bucketize(&day_range("00:00:00", "23:59:59.9999999"), &config);
        assert_eq!(presence.worked_buckets(), 24);
        assert_eq!(config.duration_of(&presence), TimeDelta::days(1));
    }

    #[test]
    fn test_combine_is_commutative_associative_and_idempotent() {
        let a: Presence = "**......".parse().unwrap();
        let b: Presence = "..**..*.".parse().unwrap();
        let c: Presence = "*....**.".parse().unwrap();

        let left = a.combine(&b.combine(&c).unwrap()).unwrap();
        let right = a.combine(&b).unwrap().combine(&c).unwrap();
        let swapped = b.combine(&a.combine(&c).unwrap()).unwrap();

        assert_eq!(left, right);
        assert_eq!(left, swapped);
        assert_eq!(left.render(), "****.**.");
        assert_eq!(a.combine(&a).unwrap(), a);
        assert_eq!(a.combine(&Presence::empty(8)).unwrap(), a);
    }

    #[test]
    fn test_combine_rejects_length_mismatch() {
        let err = Presence::empty(48).combine(&Presence::empty(24)).unwrap_err();
        assert_eq!(err, Error::LengthMismatch { left: 48, right: 24 });
    }

    #[test]
    fn test_rendering_matches_length_and_charset() {
        let config = BucketConfig::new(96).unwrap();
        let rendered = bucketize(&day_range("13:05:00", "15:55:00"), &config).render();
        assert_eq!(rendered.len(), 96);
        assert!(rendered.chars().all(|c| c == '*' || c == '.'));
    }

    #[test]
    fn test_presence_parse_rejects_unknown_characters() {
        assert!("*.x".parse::<Presence>().is_err());
    }

    #[test]
    fn test_presence_serializes_as_rendering() {
        let presence: Presence = "*..*".parse().unwrap();
        assert_eq!(serde_json::to_string(&presence).unwrap(), r#""*..*""#);
    }
}
