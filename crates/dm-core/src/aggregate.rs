//! Merging per-range presence into one vector per calendar date.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{NaiveDate, TimeDelta};

use crate::bucket::{BucketConfig, Presence, bucketize};
use crate::error::Error;
use crate::event::Event;
use crate::range::Range;
use crate::reconstruct::{Intervals, PairingPolicy};

/// Presence per calendar date.
///
/// Only dates with at least one contributing range have an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAggregate {
    config: BucketConfig,
    days: BTreeMap<NaiveDate, Presence>,
}

impl DayAggregate {
    pub const fn config(&self) -> &BucketConfig {
        &self.config
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Presence> {
        self.days.get(&date)
    }

    /// Presence for `date`, or an all-false vector if nothing was recorded.
    pub fn get_or_empty(&self, date: NaiveDate) -> Presence {
        self.days
            .get(&date)
            .cloned()
            .unwrap_or_else(|| self.config.empty())
    }

    /// Dates with activity, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Presence)> {
        self.days.iter().map(|(date, presence)| (*date, presence))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Active time across every recorded date.
    pub fn total_duration(&self) -> TimeDelta {
        self.days
            .values()
            .map(|presence| self.config.duration_of(presence))
            .sum()
    }
}

/// Accumulates ranges into a [`DayAggregate`].
#[derive(Debug, Clone)]
pub struct DayAggregator {
    config: BucketConfig,
    days: BTreeMap<NaiveDate, Presence>,
}

impl DayAggregator {
    pub const fn new(config: BucketConfig) -> Self {
        Self {
            config,
            days: BTreeMap::new(),
        }
    }

    /// Splits `range` at midnight and ORs each part into its date.
    pub fn add_range(&mut self, range: &Range) -> Result<(), Error> {
        for part in range.split_by_date() {
            let presence = bucketize(&part, &self.config);
            self.add_presence(part.date(), &presence)?;
        }
        Ok(())
    }

    /// ORs an already-bucketized vector into `date`.
    pub fn add_presence(&mut self, date: NaiveDate, presence: &Presence) -> Result<(), Error> {
        match self.days.entry(date) {
            Entry::Vacant(slot) => {
                if presence.len() != self.config.len() {
                    return Err(Error::LengthMismatch {
                        left: self.config.len(),
                        right: presence.len(),
                    });
                }
                slot.insert(presence.clone());
            }
            Entry::Occupied(mut slot) => slot.get_mut().merge(presence)?,
        }
        Ok(())
    }

    pub fn finish(self) -> DayAggregate {
        tracing::debug!(days = self.days.len(), "aggregated presence");
        DayAggregate {
            config: self.config,
            days: self.days,
        }
    }
}

/// Aggregates a stream of ranges; the first error aborts with no result.
pub fn aggregate_ranges<I, E>(ranges: I, config: BucketConfig) -> Result<DayAggregate, E>
where
    I: IntoIterator<Item = Result<Range, E>>,
    E: From<Error>,
{
    let mut aggregator = DayAggregator::new(config);
    let mut count = 0usize;
    for range in ranges {
        aggregator.add_range(&range?)?;
        count += 1;
    }
    tracing::debug!(ranges = count, "consumed ranges");
    Ok(aggregator.finish())
}

/// Runs the whole pipeline: markers to per-date presence.
pub fn presence_by_day<I, E>(
    events: I,
    config: BucketConfig,
    policy: PairingPolicy,
) -> Result<DayAggregate, E>
where
    I: IntoIterator<Item = Result<Event, E>>,
    E: From<Error>,
{
    aggregate_ranges(Intervals::new(events.into_iter(), policy), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ok_events(events: Vec<Event>) -> impl Iterator<Item = Result<Event, Error>> {
        events.into_iter().map(Ok)
    }

    #[test]
    fn test_single_session_renders_its_window() {
        let events = vec![
            Event::begin(at("2025-01-27", "08:00")),
            Event::end(at("2025-01-27", "12:00")),
        ];
        let aggregate =
            presence_by_day(ok_events(events), BucketConfig::default(), PairingPolicy::Lenient)
                .unwrap();

        assert_eq!(aggregate.len(), 1);
        let presence = aggregate.get(date("2025-01-27")).unwrap();
        assert_eq!(presence.active().collect::<Vec<_>>(), (16..=23).collect::<Vec<_>>());
        assert_eq!(presence.render().matches('*').count(), 8);
        assert_eq!(aggregate.total_duration(), TimeDelta::hours(4));
    }

    #[test]
    fn test_same_day_ranges_are_merged_not_overwritten() {
        let ranges = [
            Range::new(at("2025-01-27", "09:00"), at("2025-01-27", "10:00")),
            Range::new(at("2025-01-27", "14:00"), at("2025-01-27", "15:00")),
        ];
        let aggregate =
            aggregate_ranges(ranges.into_iter().map(Ok::<_, Error>), BucketConfig::default())
                .unwrap();

        let presence = aggregate.get(date("2025-01-27")).unwrap();
        assert_eq!(presence.active().collect::<Vec<_>>(), vec![18, 19, 28, 29]);
        assert_eq!(
            presence.render(),
            "..................**........**.................."
        );
    }

    #[test]
    fn test_overnight_range_contributes_to_both_dates() {
        let range = Range::new(at("2025-01-27", "22:00"), at("2025-01-28", "02:00"));
        let mut aggregator = DayAggregator::new(BucketConfig::default());
        aggregator.add_range(&range).unwrap();
        let aggregate = aggregator.finish();

        let first = aggregate.get(date("2025-01-27")).unwrap();
        let second = aggregate.get(date("2025-01-28")).unwrap();
        assert_eq!(first.active().collect::<Vec<_>>(), (44..=47).collect::<Vec<_>>());
        assert_eq!(second.active().collect::<Vec<_>>(), (0..=3).collect::<Vec<_>>());
        assert_eq!(aggregate.total_duration(), TimeDelta::hours(4));
    }

    #[test]
    fn test_result_is_independent_of_range_order() {
        let ranges = vec![
            Range::new(at("2025-01-27", "22:00"), at("2025-01-28", "02:00")),
            Range::new(at("2025-01-28", "09:00"), at("2025-01-28", "11:00")),
            Range::new(at("2025-01-27", "07:15"), at("2025-01-27", "08:45")),
            Range::new(at("2025-01-28", "10:00"), at("2025-01-28", "12:30")),
        ];
        let forward =
            aggregate_ranges(ranges.iter().copied().map(Ok::<_, Error>), BucketConfig::default())
                .unwrap();
        let backward = aggregate_ranges(
            ranges.iter().rev().copied().map(Ok::<_, Error>),
            BucketConfig::default(),
        )
        .unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_duplicate_range_is_idempotent() {
        let range = Range::new(at("2025-01-27", "09:00"), at("2025-01-27", "10:00"));
        let once = aggregate_ranges([Ok::<_, Error>(range)], BucketConfig::default()).unwrap();
        let twice =
            aggregate_ranges([Ok::<_, Error>(range), Ok(range)], BucketConfig::default()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_absent_dates_read_as_empty() {
        let aggregate = DayAggregator::new(BucketConfig::default()).finish();
        assert!(aggregate.is_empty());
        let presence = aggregate.get_or_empty(date("2025-01-27"));
        assert_eq!(presence.len(), 48);
        assert_eq!(presence.worked_buckets(), 0);
    }

    #[test]
    fn test_add_presence_rejects_wrong_length() {
        let mut aggregator = DayAggregator::new(BucketConfig::default());
        let err = aggregator
            .add_presence(date("2025-01-27"), &Presence::empty(24))
            .unwrap_err();
        assert_eq!(err, Error::LengthMismatch { left: 48, right: 24 });
    }

    #[test]
    fn test_first_error_aborts_aggregation() {
        let events = vec![
            Ok(Event::begin(at("2025-01-27", "08:00"))),
            Ok(Event::end(at("2025-01-27", "09:00"))),
            Ok(Event::end(at("2025-01-27", "10:00"))),
        ];
        let result = presence_by_day(events, BucketConfig::default(), PairingPolicy::Strict);
        assert!(matches!(result, Err(Error::UnpairedEnd { .. })));
    }

    #[test]
    fn test_dates_iterate_in_order() {
        let ranges = [
            Range::new(at("2025-01-29", "09:00"), at("2025-01-29", "10:00")),
            Range::new(at("2025-01-27", "09:00"), at("2025-01-27", "10:00")),
        ];
        let aggregate =
            aggregate_ranges(ranges.into_iter().map(Ok::<_, Error>), BucketConfig::default())
                .unwrap();
        let dates: Vec<_> = aggregate.iter().map(|(d, _)| d).collect();
        assert_eq!(dates, vec![date("2025-01-27"), date("2025-01-29")]);
    }
}
