//! Core presence pipeline for daymap.
//!
//! This crate turns an ordered stream of begin/end markers into one
//! presence vector per calendar day:
//! - Reconstruction: pairing markers into [`Range`]s
//! - Splitting: cutting ranges at midnight boundaries
//! - Bucketing: mapping single-day ranges onto fixed time-of-day slots
//! - Aggregation: OR-merging all vectors that share a date

pub mod aggregate;
pub mod bucket;
mod error;
pub mod event;
pub mod range;
pub mod reconstruct;

pub use aggregate::{DayAggregate, DayAggregator, aggregate_ranges, presence_by_day};
pub use bucket::{BucketConfig, DEFAULT_BUCKETS_PER_DAY, Presence, bucketize};
pub use error::{Error, Result};
pub use event::{Event, EventKind, UnknownEventKind};
pub use range::{DaySplit, Range, TICK};
pub use reconstruct::{Intervals, PairingPolicy, PairingState, reconstruct};
