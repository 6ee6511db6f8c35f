//! Session markers consumed by the pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single begin or end marker.
///
/// The timestamp is wall-clock time: any clock offset has already been
/// applied by whoever produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: NaiveDateTime,
    pub kind: EventKind,
}

impl Event {
    pub const fn begin(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            kind: EventKind::Begin,
        }
    }

    pub const fn end(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            kind: EventKind::End,
        }
    }
}

/// Marker kind. Canonical strings are `begin` and `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Begin,
    End,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Begin => "begin",
            Self::End => "end",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "begin" | "start" | "session_start" | "logon" | "unlock" => Ok(Self::Begin),
            "end" | "stop" | "session_end" | "logoff" | "lock" => Ok(Self::End),
            _ => Err(UnknownEventKind(s.to_string())),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unrecognized marker kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(String);

impl UnknownEventKind {
    /// The rejected kind string.
    pub fn kind(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}
