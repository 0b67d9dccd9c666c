//! Stable phase aggregation: frames filter callbacks into scale events
//!
//! One aggregator per physical sensor stream. It buffers stable phases
//! between a start and an end marker and seals them into a `ScaleEvent`.
//! No thresholding happens here; every accepted phase is kept in arrival order.

use super::event_source::{FilterEvent, FilterEventHandler};
use super::types::{ScaleEvent, StablePhase};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolViolation {
    /// A start marker arrived while an episode was open; its phases were dropped
    DuplicateStart { discarded_phases: usize },
    /// A stable phase arrived with no open episode; the phase was dropped
    StablePhaseWhileIdle,
    /// An end marker arrived with no open episode; nothing was emitted
    EndWhileIdle,
}

impl std::fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolViolation::DuplicateStart { discarded_phases } => write!(
                f,
                "start of event while open, discarded {} buffered phases",
                discarded_phases
            ),
            ProtocolViolation::StablePhaseWhileIdle => {
                write!(f, "stable phase outside of event")
            }
            ProtocolViolation::EndWhileIdle => write!(f, "end of event without start"),
        }
    }
}

impl std::error::Error for ProtocolViolation {}

#[derive(Debug)]
enum AggregatorState {
    Idle,
    Open {
        start_time: DateTime<Utc>,
        phases: Vec<StablePhase>,
    },
}

#[derive(Debug)]
pub struct StablePhaseAggregator {
    toilet_id: i32,
    state: AggregatorState,
    violations: u64,
}

impl StablePhaseAggregator {
    pub fn new(toilet_id: i32) -> Self {
        Self {
            toilet_id,
            state: AggregatorState::Idle,
            violations: 0,
        }
    }

    pub fn toilet_id(&self) -> i32 {
        self.toilet_id
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, AggregatorState::Open { .. })
    }

    /// Number of phases buffered in the open episode (0 when idle)
    pub fn buffered_phases(&self) -> usize {
        match &self.state {
            AggregatorState::Open { phases, .. } => phases.len(),
            AggregatorState::Idle => 0,
        }
    }

    /// Protocol violations seen since creation
    pub fn violation_count(&self) -> u64 {
        self.violations
    }

    /// Open a new episode at `now`.
    ///
    /// On `Err(DuplicateStart)` the new episode is still open; only the
    /// previous unsealed buffer was lost.
    pub fn on_start_of_event(&mut self, now: DateTime<Utc>) -> Result<(), ProtocolViolation> {
        let previous = std::mem::replace(
            &mut self.state,
            AggregatorState::Open {
                start_time: now,
                phases: Vec::new(),
            },
        );

        match previous {
            AggregatorState::Idle => Ok(()),
            AggregatorState::Open { phases, .. } => {
                self.violations += 1;
                Err(ProtocolViolation::DuplicateStart {
                    discarded_phases: phases.len(),
                })
            }
        }
    }

    pub fn on_stable_phase(
        &mut self,
        now: DateTime<Utc>,
        length: f64,
        value: f64,
    ) -> Result<(), ProtocolViolation> {
        match &mut self.state {
            AggregatorState::Open { phases, .. } => {
                phases.push(StablePhase::new(now, length, value));
                Ok(())
            }
            AggregatorState::Idle => {
                self.violations += 1;
                Err(ProtocolViolation::StablePhaseWhileIdle)
            }
        }
    }

    /// Seal the open episode at `now` and return it.
    pub fn on_end_of_event(&mut self, now: DateTime<Utc>) -> Result<ScaleEvent, ProtocolViolation> {
        match std::mem::replace(&mut self.state, AggregatorState::Idle) {
            AggregatorState::Open { start_time, phases } => {
                Ok(ScaleEvent::new(self.toilet_id, start_time, now, phases))
            }
            AggregatorState::Idle => {
                self.violations += 1;
                Err(ProtocolViolation::EndWhileIdle)
            }
        }
    }

    /// Apply one tagged filter event. Violations are logged and swallowed.
    pub fn process(&mut self, event: FilterEvent) -> Option<ScaleEvent> {
        let result = match event {
            FilterEvent::StartOfEvent { timestamp } => {
                self.on_start_of_event(timestamp).map(|_| None)
            }
            FilterEvent::StablePhase {
                timestamp,
                length,
                value,
            } => self.on_stable_phase(timestamp, length, value).map(|_| None),
            FilterEvent::EndOfEvent { timestamp } => self.on_end_of_event(timestamp).map(Some),
        };

        match result {
            Ok(sealed) => sealed,
            Err(violation) => {
                log::warn!("⚠️  Toilet {}: {}", self.toilet_id, violation);
                None
            }
        }
    }
}

/// Push-side adapter: collects every sealed event of one sensor stream.
#[derive(Debug)]
pub struct EventBuffer {
    aggregator: StablePhaseAggregator,
    scale_events: Vec<ScaleEvent>,
}

impl EventBuffer {
    pub fn new(toilet_id: i32) -> Self {
        Self {
            aggregator: StablePhaseAggregator::new(toilet_id),
            scale_events: Vec::new(),
        }
    }

    pub fn scale_events(&self) -> &[ScaleEvent] {
        &self.scale_events
    }

    pub fn violation_count(&self) -> u64 {
        self.aggregator.violation_count()
    }

    pub fn into_scale_events(self) -> Vec<ScaleEvent> {
        if self.aggregator.is_open() {
            log::warn!(
                "Stream ended inside an open event, dropping {} phases",
                self.aggregator.buffered_phases()
            );
        }
        self.scale_events
    }

    fn record(&mut self, event: FilterEvent) {
        if let Some(sealed) = self.aggregator.process(event) {
            self.scale_events.push(sealed);
        }
    }
}

impl FilterEventHandler for EventBuffer {
    fn start_of_event(&mut self, now: DateTime<Utc>) {
        self.record(FilterEvent::StartOfEvent { timestamp: now });
    }

    fn stable_phase(&mut self, now: DateTime<Utc>, length: f64, value: f64) {
        self.record(FilterEvent::StablePhase {
            timestamp: now,
            length,
            value,
        });
    }

    fn end_of_event(&mut self, now: DateTime<Utc>) {
        self.record(FilterEvent::EndOfEvent { timestamp: now });
    }
}
