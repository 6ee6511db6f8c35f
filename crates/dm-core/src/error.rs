//! Error types for the presence pipeline.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::event::UnknownEventKind;

/// Errors raised by the core pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The bucket count is zero or does not divide one day evenly.
    #[error("buckets per day must be a positive divisor of {day_ticks} ticks, got {buckets}")]
    InvalidBucketCount { buckets: u32, day_ticks: i64 },

    /// An event carried a kind other than begin or end.
    #[error(transparent)]
    UnknownEventKind(#[from] UnknownEventKind),

    /// A begin marker arrived while an interval was already open.
    #[error("begin at {at} while interval opened at {open_since} is still open")]
    UnpairedBegin {
        at: NaiveDateTime,
        open_since: NaiveDateTime,
    },

    /// An end marker arrived with no open interval.
    #[error("end at {at} has no matching begin")]
    UnpairedEnd { at: NaiveDateTime },

    /// Two presence vectors of different lengths were combined.
    #[error("cannot combine presence vectors of length {left} and {right}")]
    LengthMismatch { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
