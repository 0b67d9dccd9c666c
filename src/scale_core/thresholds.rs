//! Classification thresholds with environment overrides

use std::env;

/// Numeric cutoffs used by the classifier.
///
/// Defaults match the deployed toilets. Every field can be overridden from
/// the environment so boundary values can be tuned without a rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationThresholds {
    /// Phases must be stable for longer than this (seconds)
    pub min_phase_length: f64,

    /// Phases with |value| at or below this are noise (grams)
    pub noise_floor: f64,

    /// Negative phases below this mark a cleaning (grams)
    pub significant_negative: f64,

    /// Positive phases above this mark a cat on the scale (grams)
    pub significant_positive: f64,

    /// Max distance between measured and known cat weight (grams, exclusive)
    pub cat_match_tolerance: f64,

    /// Poo weights outside [0, max_poo_weight] are reported as 0 (grams)
    pub max_poo_weight: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            min_phase_length: 1.0,
            noise_floor: 10.0,
            significant_negative: -500.0,
            significant_positive: 5000.0,
            cat_match_tolerance: 500.0,
            max_poo_weight: 500.0,
        }
    }
}

impl ClassificationThresholds {
    /// Load thresholds from environment variables
    ///
    /// Environment variables:
    /// - `SCALE_MIN_PHASE_LENGTH` (default: 1.0)
    /// - `SCALE_NOISE_FLOOR` (default: 10.0)
    /// - `SCALE_SIGNIFICANT_NEGATIVE` (default: -500.0)
    /// - `SCALE_SIGNIFICANT_POSITIVE` (default: 5000.0)
    /// - `SCALE_CAT_MATCH_TOLERANCE` (default: 500.0)
    /// - `SCALE_MAX_POO_WEIGHT` (default: 500.0)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: f64| -> f64 {
            match lookup(key) {
                Some(raw) => match raw.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        log::warn!("Invalid {} '{}', using default {}", key, raw, default);
                        default
                    }
                },
                None => default,
            }
        };

        Self {
            min_phase_length: read("SCALE_MIN_PHASE_LENGTH", defaults.min_phase_length),
            noise_floor: read("SCALE_NOISE_FLOOR", defaults.noise_floor),
            significant_negative: read("SCALE_SIGNIFICANT_NEGATIVE", defaults.significant_negative),
            significant_positive: read("SCALE_SIGNIFICANT_POSITIVE", defaults.significant_positive),
            cat_match_tolerance: read("SCALE_CAT_MATCH_TOLERANCE", defaults.cat_match_tolerance),
            max_poo_weight: read("SCALE_MAX_POO_WEIGHT", defaults.max_poo_weight),
        }
    }
}
