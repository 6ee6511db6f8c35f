//! Ranges command for inspecting reconstructed sessions.
//!
//! This module outputs the ranges paired from the event log as JSONL for
//! debugging.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use dm_core::{Intervals, Range};
use serde::Serialize;

use crate::cli::RangesArgs;
use crate::commands::util::{now_at, resolve_window};
use crate::source::EventLog;
use crate::{Config, Settings};

#[derive(Debug, Serialize)]
struct RangeLine {
    start: NaiveDateTime,
    end: NaiveDateTime,
    minutes: i64,
    days: usize,
}

impl From<Range> for RangeLine {
    fn from(range: Range) -> Self {
        Self {
            start: range.start,
            end: range.end,
            minutes: range.length().num_minutes(),
            days: range.split_by_date().count(),
        }
    }
}

/// Runs the ranges command, writing one JSON object per range.
///
/// Nothing is written unless the whole log pairs cleanly.
pub fn run<W: Write>(
    writer: &mut W,
    args: &RangesArgs,
    config: &Config,
    settings: &Settings,
) -> Result<()> {
    let window = resolve_window(&args.window, now_at(settings.offset), settings.offset)?;
    let log_path = args.window.log.as_deref().unwrap_or(config.log_path.as_path());

    let events = EventLog::open(log_path)?.events(window, settings.offset);
    let ranges = Intervals::new(events, settings.pairing).collect::<Result<Vec<_>>>()?;
    tracing::debug!(ranges = ranges.len(), "reconstructed ranges");

    let mut output = String::new();
    for range in ranges {
        output.push_str(&serde_json::to_string(&RangeLine::from(range))?);
        output.push('\n');
    }
    write!(writer, "{output}")?;

    Ok(())
}
