//! Scale Core - Toilet Scale Event Pipeline
//!
//! Turns the callbacks of the native weight filter into discrete domain
//! events: a cat used the toilet, or the toilet was cleaned.
//!
//! # Architecture
//!
//! ```text
//! Weight samples → filter cascade (native) → FilterEvent callbacks
//!     ↓
//! StablePhaseAggregator (one per toilet: start / stable phases / end)
//!     ↓
//! ValidationLimits (duration, age, phase bounds) + RecentStarts (replays)
//!     ↓
//! ScaleEventClassifier (Cleaning > Measurement > Unclassified, cat matching)
//!     ↓
//! ScaleEventSink → JSONL backend
//! ```

pub mod aggregator;
pub mod cat_matcher;
pub mod classifier;
pub mod event_source;
pub mod ingestion;
pub mod jsonl_writer;
pub mod reader;
pub mod roster;
pub mod stats;
pub mod thresholds;
pub mod types;
pub mod validation;
pub mod writer_backend;

pub use aggregator::{EventBuffer, ProtocolViolation, StablePhaseAggregator};
pub use cat_matcher::match_cat_by_weight;
pub use classifier::{Classification, ScaleEventClassifier, UnclassifiedReason};
pub use event_source::{FilterEvent, FilterEventHandler};
pub use ingestion::{classify_sealed_event, run_ingestion, IngestionOptions, IngestionSummary};
pub use jsonl_writer::JsonlOutcomeWriter;
pub use reader::FilterEventTailReader;
pub use roster::{load_roster, RosterError, RosterSnapshot};
pub use stats::{poo_counts, PooCount, ScaleEventCounts, ScaleEventStats};
pub use thresholds::ClassificationThresholds;
pub use types::{Cat, CatWeight, Cleaning, Measurement, ScaleEvent, StablePhase};
pub use validation::{RecentStarts, ValidationError, ValidationLimits};
pub use writer_backend::{OutcomeRecord, ScaleEventSink, SinkError};
