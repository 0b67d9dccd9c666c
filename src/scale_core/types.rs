//! Scale event data model shared by the aggregator and the classifier

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds elapsed from `from` to `to` (negative if `to` is earlier).
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

/// Shift an instant by a fractional number of seconds.
///
/// `None` if the shift is not finite or leaves the representable range.
pub fn offset_seconds(instant: DateTime<Utc>, seconds: f64) -> Option<DateTime<Utc>> {
    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    instant.checked_add_signed(Duration::microseconds(micros as i64))
}

/// A stretch where the filtered signal held steady.
///
/// `timestamp` marks the END of the stretch; the start is `timestamp - length`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StablePhase {
    pub timestamp: DateTime<Utc>,
    /// Seconds the signal was stable before `timestamp`
    pub length: f64,
    /// Grams relative to the pre-event baseline (negative = mass removed)
    pub value: f64,
}

impl StablePhase {
    pub fn new(timestamp: DateTime<Utc>, length: f64, value: f64) -> Self {
        Self {
            timestamp,
            length,
            value,
        }
    }

    /// `None` for lengths too large to place on the calendar
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        offset_seconds(self.timestamp, -self.length)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cleaning {
    pub timestamp: DateTime<Utc>,
    /// Event duration in seconds
    pub time: f64,
    /// Estimated removed mass in grams
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub cat_id: i32,
    pub setup_time: f64,
    pub poo_time: f64,
    pub cleanup_time: f64,
    pub cat_weight: f64,
    pub poo_weight: f64,
}

/// One bounded episode of activity on a toilet scale.
///
/// Phases and bounds are fixed once sealed; only the outcome slots change,
/// and at most one of them is ever set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScaleEventRecord")]
pub struct ScaleEvent {
    pub toilet_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub stable_phases: Vec<StablePhase>,
    cleaning: Option<Cleaning>,
    measurement: Option<Measurement>,
}

impl ScaleEvent {
    pub fn new(
        toilet_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        stable_phases: Vec<StablePhase>,
    ) -> Self {
        Self {
            toilet_id,
            start_time,
            end_time,
            stable_phases,
            cleaning: None,
            measurement: None,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start_time, self.end_time)
    }

    pub fn cleaning(&self) -> Option<&Cleaning> {
        self.cleaning.as_ref()
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn is_classified(&self) -> bool {
        self.cleaning.is_some() || self.measurement.is_some()
    }

    pub fn clear_outcome(&mut self) {
        self.cleaning = None;
        self.measurement = None;
    }

    pub(crate) fn set_cleaning(&mut self, cleaning: Cleaning) {
        self.clear_outcome();
        self.cleaning = Some(cleaning);
    }

    pub(crate) fn set_measurement(&mut self, measurement: Measurement) {
        self.clear_outcome();
        self.measurement = Some(measurement);
    }
}

/// Wire shape of a `ScaleEvent`, checked before it becomes one.
#[derive(Deserialize)]
struct ScaleEventRecord {
    toilet_id: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(default)]
    stable_phases: Vec<StablePhase>,
    #[serde(default)]
    cleaning: Option<Cleaning>,
    #[serde(default)]
    measurement: Option<Measurement>,
}

impl TryFrom<ScaleEventRecord> for ScaleEvent {
    type Error = String;

    fn try_from(record: ScaleEventRecord) -> Result<Self, Self::Error> {
        if record.cleaning.is_some() && record.measurement.is_some() {
            return Err(format!(
                "toilet {} event at {} carries both a cleaning and a measurement",
                record.toilet_id, record.start_time
            ));
        }

        Ok(Self {
            toilet_id: record.toilet_id,
            start_time: record.start_time,
            end_time: record.end_time,
            stable_phases: record.stable_phases,
            cleaning: record.cleaning,
            measurement: record.measurement,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatWeight {
    pub timestamp: DateTime<Utc>,
    pub weight: f64,
}

/// A cat known to the caller. Read-only to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cat {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub weights: Vec<CatWeight>,
}

impl Cat {
    /// Most recent weight sample taken strictly before `timestamp`
    pub fn last_weight_before(&self, timestamp: DateTime<Utc>) -> Option<&CatWeight> {
        self.weights
            .iter()
            .filter(|w| w.timestamp < timestamp)
            .max_by_key(|w| w.timestamp)
    }
}
