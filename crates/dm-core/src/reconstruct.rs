//! Pairing begin/end markers into ranges.
//!
//! Pairing is a small state machine over [`PairingState`]:
//!
//! | state    | begin                        | end                          |
//! |----------|------------------------------|------------------------------|
//! | `Idle`   | open                         | skipped (leading end)        |
//! | `Open`   | restart, or error if strict  | emit range, close            |
//! | `Closed` | open                         | skipped, or error if strict  |
//!
//! An interval still open when the stream ends is dropped.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::event::{Event, EventKind};
use crate::range::Range;

/// How to treat markers that do not alternate begin/end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingPolicy {
    /// Repeated begins restart the interval; repeated ends are ignored.
    #[default]
    Lenient,
    /// Repeated begins or ends abort the pipeline.
    Strict,
}

/// Where the reconstructor is between markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// No begin seen yet.
    Idle,
    /// A begin has been seen and not yet closed.
    Open { started: NaiveDateTime },
    /// The last marker closed an interval.
    Closed,
}

/// Iterator adapter turning markers into ranges.
///
/// Source errors are passed through unchanged; pairing violations under
/// [`PairingPolicy::Strict`] are converted into the source's error type.
#[derive(Debug)]
pub struct Intervals<I> {
    events: I,
    policy: PairingPolicy,
    state: PairingState,
    emitted: usize,
}

impl<I> Intervals<I> {
    pub const fn new(events: I, policy: PairingPolicy) -> Self {
        Self {
            events,
            policy,
            state: PairingState::Idle,
            emitted: 0,
        }
    }

    pub const fn state(&self) -> PairingState {
        self.state
    }

    /// Number of ranges produced so far.
    pub const fn emitted(&self) -> usize {
        self.emitted
    }

    /// Applies one marker, returning a range if it closed one.
    fn step(&mut self, event: Event) -> Result<Option<Range>, Error> {
        match (self.state, event.kind) {
            (PairingState::Idle, EventKind::End) => {
                tracing::debug!(at = %event.timestamp, "skipping end before first begin");
                Ok(None)
            }
            (PairingState::Idle | PairingState::Closed, EventKind::Begin) => {
                self.state = PairingState::Open {
                    started: event.timestamp,
                };
                Ok(None)
            }
            (PairingState::Open { started }, EventKind::Begin) => match self.policy {
                PairingPolicy::Lenient => {
                    tracing::warn!(
                        discarded = %started,
                        at = %event.timestamp,
                        "begin while interval open, restarting"
                    );
                    self.state = PairingState::Open {
                        started: event.timestamp,
                    };
                    Ok(None)
                }
                PairingPolicy::Strict => Err(Error::UnpairedBegin {
                    at: event.timestamp,
                    open_since: started,
                }),
            },
            (PairingState::Open { started }, EventKind::End) => {
                self.state = PairingState::Closed;
                self.emitted += 1;
                Ok(Some(Range::new(started, event.timestamp)))
            }
            (PairingState::Closed, EventKind::End) => match self.policy {
                PairingPolicy::Lenient => {
                    tracing::warn!(at = %event.timestamp, "end without begin, ignoring");
                    Ok(None)
                }
                PairingPolicy::Strict => Err(Error::UnpairedEnd {
                    at: event.timestamp,
                }),
            },
        }
    }
}

impl<I, E> Iterator for Intervals<I>
where
    I: Iterator<Item = Result<Event, E>>,
    E: From<Error>,
{
    type Item = Result<Range, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(event) = self.events.next() else {
                if let PairingState::Open { started } = self.state {
                    tracing::debug!(%started, "dropping interval still open at end of stream");
                    self.state = PairingState::Closed;
                }
                return None;
            };

            match event.and_then(|e| self.step(e).map_err(E::from)) {
                Ok(Some(range)) => return Some(Ok(range)),
                Ok(None) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Reconstructs ranges from markers that cannot fail to load.
pub fn reconstruct<T>(
    events: T,
    policy: PairingPolicy,
) -> Intervals<impl Iterator<Item = Result<Event, Error>>>
where
    T: IntoIterator<Item = Event>,
{
    Intervals::new(events.into_iter().map(Ok), policy)
}
