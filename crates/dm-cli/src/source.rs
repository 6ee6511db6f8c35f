//! Event log reader.
//!
//! The log is JSON Lines, one marker per line:
//!
//! ```text
//! {"timestamp":"2025-01-27T08:00:00+01:00","kind":"begin"}
//! {"timestamp":"2025-01-27T12:00:00+01:00","kind":"end"}
//! ```
//!
//! Timestamps with an offset are shifted to the configured fixed offset;
//! timestamps without one are taken as wall-clock already. Blank lines and
//! lines starting with `#` are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use dm_core::{Event, EventKind};
use serde::Deserialize;

/// Half-open span `[from, to)` of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl Window {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Result<Self> {
        if from >= to {
            anyhow::bail!("empty window: {from} is not before {to}");
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.from && at < self.to
    }

    /// Every calendar date the window touches, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let last = (self.to - dm_core::TICK).date();
        self.from
            .date()
            .iter_days()
            .take_while(move |date| *date <= last)
    }
}

/// An opened event log.
pub struct EventLog {
    reader: Box<dyn BufRead>,
    origin: String,
}

impl EventLog {
    /// Opens `path`, or stdin when `path` is `-`.
    pub fn open(path: &Path) -> Result<Self> {
        if path == Path::new("-") {
            return Ok(Self::from_reader(io::stdin().lock(), "<stdin>"));
        }
        let file = File::open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }

    pub fn from_reader<R: BufRead + 'static>(reader: R, origin: impl Into<String>) -> Self {
        Self {
            reader: Box::new(reader),
            origin: origin.into(),
        }
    }

    /// Lazily yields the markers inside `window`.
    ///
    /// Reading stops, and the underlying reader is released, at the first
    /// marker at or past `window.to`, at the first error, or at end of input.
    pub fn events(self, window: Window, offset: FixedOffset) -> LogEvents {
        LogEvents {
            lines: Some(self.reader.lines()),
            origin: self.origin,
            line_no: 0,
            window,
            offset,
        }
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`EventLog::events`].
pub struct LogEvents {
    lines: Option<Lines<Box<dyn BufRead>>>,
    origin: String,
    line_no: usize,
    window: Window,
    offset: FixedOffset,
}

#[derive(Debug, Deserialize)]
struct LogLine {
    timestamp: String,
    kind: String,
}

impl LogEvents {
    fn parse(&self, line: &str) -> Result<Event> {
        let parsed: LogLine = serde_json::from_str(line).context("invalid JSON")?;
        let timestamp = parse_timestamp(&parsed.timestamp, self.offset)?;
        let kind = parsed
            .kind
            .parse::<EventKind>()
            .map_err(dm_core::Error::from)?;
        Ok(Event { timestamp, kind })
    }

    fn close(&mut self) {
        if self.lines.take().is_some() {
            tracing::debug!(origin = %self.origin, lines = self.line_no, "closed event log");
        }
    }
}

impl Iterator for LogEvents {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.as_mut()?.next();
            let line = match next {
                None => {
                    self.close();
                    return None;
                }
                Some(Err(err)) => {
                    self.close();
                    let context = format!("failed to read {} line {}", self.origin, self.line_no + 1);
                    return Some(Err(anyhow::Error::new(err).context(context)));
                }
                Some(Ok(line)) => line,
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let event = match self.parse(trimmed) {
                Ok(event) => event,
                Err(err) => {
                    let context = format!("invalid event on {} line {}", self.origin, self.line_no);
                    self.close();
                    return Some(Err(err.context(context)));
                }
            };

            if self.window.contains(event.timestamp) {
                return Some(Ok(event));
            }
            if event.timestamp >= self.window.to {
                self.close();
                return None;
            }
        }
    }
}

impl std::iter::FusedIterator for LogEvents {}

/// Parses an RFC 3339 timestamp into wall-clock time at `offset`.
///
/// A timestamp without an offset is returned as-is.
fn parse_timestamp(s: &str, offset: FixedOffset) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&offset).naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .with_context(|| format!("invalid timestamp {s:?}, expected RFC 3339"))
}
