//! Low-level filter events crossing into the core
//!
//! The native filter cascade reports start-of-event, stable-phase and
//! end-of-event through registered callbacks. `FilterEventHandler` is that
//! callback contract; `FilterEvent` is the same thing as a tagged record so
//! recorded streams can be replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Callbacks invoked by the filter, each stamped with the caller's clock.
pub trait FilterEventHandler {
    fn start_of_event(&mut self, now: DateTime<Utc>);
    fn stable_phase(&mut self, now: DateTime<Utc>, length: f64, value: f64);
    fn end_of_event(&mut self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterEvent {
    StartOfEvent {
        timestamp: DateTime<Utc>,
    },
    StablePhase {
        timestamp: DateTime<Utc>,
        length: f64,
        value: f64,
    },
    EndOfEvent {
        timestamp: DateTime<Utc>,
    },
}

impl FilterEvent {
    /// Parse a FilterEvent from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, Box<dyn Error>> {
        let event: FilterEvent = serde_json::from_str(line)?;
        Ok(event)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            FilterEvent::StartOfEvent { timestamp }
            | FilterEvent::StablePhase { timestamp, .. }
            | FilterEvent::EndOfEvent { timestamp } => *timestamp,
        }
    }

    /// Deliver this event to a push-style handler
    pub fn dispatch<H: FilterEventHandler + ?Sized>(self, handler: &mut H) {
        match self {
            FilterEvent::StartOfEvent { timestamp } => handler.start_of_event(timestamp),
            FilterEvent::StablePhase {
                timestamp,
                length,
                value,
            } => handler.stable_phase(timestamp, length, value),
            FilterEvent::EndOfEvent { timestamp } => handler.end_of_event(timestamp),
        }
    }
}
