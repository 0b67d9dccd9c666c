//! Plausibility checks for sealed scale events

use super::types::{offset_seconds, ScaleEvent};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::io::{BufRead, BufReader};
use std::ops::Bound;
use std::path::Path;

/// Events on one toilet starting closer than this are the same event.
const DUPLICATE_WINDOW_SECS: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    TooShort { duration_secs: f64 },
    TooLong { duration_secs: f64 },
    StartInFuture,
    TooOld,
    PhaseOutOfBounds { index: usize },
    Duplicate { existing: DateTime<Utc> },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::TooShort { duration_secs } => {
                write!(f, "event too short ({:.1}s)", duration_secs)
            }
            ValidationError::TooLong { duration_secs } => {
                write!(f, "event too long ({:.1}s)", duration_secs)
            }
            ValidationError::StartInFuture => write!(f, "start time is in the future"),
            ValidationError::TooOld => write!(f, "start time is too far in the past"),
            ValidationError::PhaseOutOfBounds { index } => {
                write!(f, "stable phase {} lies outside the event bounds", index)
            }
            ValidationError::Duplicate { existing } => {
                write!(f, "an event starting at {} was already recorded", existing)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub min_duration: Duration,
    pub max_duration: Duration,
    /// `None` disables the age check (reprocessing old recordings)
    pub max_age: Option<Duration>,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_duration: Duration::seconds(5),
            max_duration: Duration::minutes(15),
            max_age: Some(Duration::days(7)),
        }
    }
}

impl ValidationLimits {
    pub fn without_age_check() -> Self {
        Self {
            max_age: None,
            ..Self::default()
        }
    }

    pub fn validate(&self, event: &ScaleEvent, now: DateTime<Utc>) -> Result<(), ValidationError> {
        // An unrepresentable bound means the end can never reach it
        let too_short = match event.start_time.checked_add_signed(self.min_duration) {
            Some(min_end) => event.end_time < min_end,
            None => true,
        };
        if too_short {
            return Err(ValidationError::TooShort {
                duration_secs: event.duration_secs(),
            });
        }

        let too_long = match event.start_time.checked_add_signed(self.max_duration) {
            Some(max_end) => event.end_time > max_end,
            None => false,
        };
        if too_long {
            return Err(ValidationError::TooLong {
                duration_secs: event.duration_secs(),
            });
        }

        if event.start_time > now {
            return Err(ValidationError::StartInFuture);
        }

        if let Some(oldest) = self.max_age.and_then(|age| now.checked_sub_signed(age)) {
            if event.start_time < oldest {
                return Err(ValidationError::TooOld);
            }
        }

        for (index, phase) in event.stable_phases.iter().enumerate() {
            let in_bounds = match offset_seconds(phase.timestamp, -phase.length) {
                Some(phase_start) => {
                    phase_start >= event.start_time && phase.timestamp <= event.end_time
                }
                None => false,
            };
            if !in_bounds {
                return Err(ValidationError::PhaseOutOfBounds { index });
            }
        }

        Ok(())
    }
}

/// Only the identifying fields of a written outcome line.
#[derive(Deserialize)]
struct OutcomeKey {
    toilet_id: i32,
    start_time: DateTime<Utc>,
}

/// Start times of accepted events, per toilet.
///
/// A second event on the same toilet starting within one second of a known
/// one is a replay and gets rejected.
#[derive(Debug, Clone, Default)]
pub struct RecentStarts {
    starts: HashMap<i32, BTreeSet<DateTime<Utc>>>,
}

impl RecentStarts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from an outcomes JSONL file. A missing file yields an empty set;
    /// unreadable lines are skipped.
    pub fn from_outcomes_file(path: &Path) -> std::io::Result<Self> {
        let mut recent = Self::new();
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(recent),
            Err(e) => return Err(e),
        };

        let mut skipped = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OutcomeKey>(&line) {
                Ok(key) => recent.record(key.toilet_id, key.start_time),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} unreadable lines in {}", skipped, path.display());
        }
        log::info!("📖 {} known events in {}", recent.len(), path.display());
        Ok(recent)
    }

    pub fn len(&self) -> usize {
        self.starts.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn check(&self, event: &ScaleEvent) -> Result<(), ValidationError> {
        let Some(starts) = self.starts.get(&event.toilet_id) else {
            return Ok(());
        };

        let window = Duration::seconds(DUPLICATE_WINDOW_SECS);
        let lower = event
            .start_time
            .checked_sub_signed(window)
            .map_or(Bound::Unbounded, Bound::Excluded);
        let upper = event
            .start_time
            .checked_add_signed(window)
            .map_or(Bound::Unbounded, Bound::Excluded);

        match starts.range((lower, upper)).next() {
            Some(&existing) => Err(ValidationError::Duplicate { existing }),
            None => Ok(()),
        }
    }

    pub fn record(&mut self, toilet_id: i32, start_time: DateTime<Utc>) {
        self.starts.entry(toilet_id).or_default().insert(start_time);
    }

    /// Forget starts older than `cutoff`.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) {
        for starts in self.starts.values_mut() {
            *starts = starts.split_off(&cutoff);
        }
        self.starts.retain(|_, starts| !starts.is_empty());
    }
}
