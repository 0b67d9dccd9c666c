//! Scale event classification: cleaning, measurement, or neither
//!
//! # Rules
//! - Only phases stable for longer than `min_phase_length` and outside the
//!   noise floor are considered
//! - **Cleaning**: any significant negative phase (mass removed)
//! - **Measurement**: any significant positive phase (a cat sat on the scale)
//!   and a known cat matches the measured weight
//!
//! # Priority
//! Cleaning takes precedence over Measurement if both conditions are met

use super::cat_matcher::match_cat_by_weight;
use super::thresholds::ClassificationThresholds;
use super::types::{seconds_between, Cat, Cleaning, Measurement, ScaleEvent, StablePhase};

#[derive(Debug, Clone, PartialEq)]
pub enum UnclassifiedReason {
    /// No phase crossed either significance threshold
    NoSignificantPhases,
    /// Looked like a measurement but no cat was within tolerance
    UnknownCat { cat_weight: f64 },
}

impl std::fmt::Display for UnclassifiedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnclassifiedReason::NoSignificantPhases => write!(f, "no significant stable phases"),
            UnclassifiedReason::UnknownCat { cat_weight } => {
                write!(f, "no cat matches weight {:.1}g", cat_weight)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Cleaning(Cleaning),
    Measurement(Measurement),
    Unclassified(UnclassifiedReason),
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Cleaning(_) => "CLEANING",
            Classification::Measurement(_) => "MEASUREMENT",
            Classification::Unclassified(_) => "UNCLASSIFIED",
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Classification::Unclassified(_))
    }
}

/// Phases of one event that survived the length and noise filters.
struct PhaseSegments<'a> {
    negative: Vec<&'a StablePhase>,
    positive: Vec<&'a StablePhase>,
}

impl<'a> PhaseSegments<'a> {
    fn split(phases: &'a [StablePhase], thresholds: &ClassificationThresholds) -> Self {
        let mut ordered: Vec<&StablePhase> = phases
            .iter()
            .filter(|sp| sp.length > thresholds.min_phase_length)
            .collect();
        ordered.sort_by_key(|sp| sp.timestamp);

        let negative = ordered
            .iter()
            .copied()
            .filter(|sp| sp.value < -thresholds.noise_floor)
            .collect();
        let positive = ordered
            .iter()
            .copied()
            .filter(|sp| sp.value > thresholds.noise_floor)
            .collect();

        Self { negative, positive }
    }
}

pub struct ScaleEventClassifier {
    thresholds: ClassificationThresholds,
}

impl ScaleEventClassifier {
    pub fn new(thresholds: ClassificationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClassificationThresholds::default())
    }

    pub fn thresholds(&self) -> &ClassificationThresholds {
        &self.thresholds
    }

    /// Classify `event` against the roster snapshot in `cats`.
    ///
    /// Pure: the event is not touched. See `classify_in_place` to attach the
    /// result.
    pub fn classify(&self, cats: &[Cat], event: &ScaleEvent) -> Classification {
        let th = &self.thresholds;
        let segments = PhaseSegments::split(&event.stable_phases, th);

        let significant_negative: Vec<&StablePhase> = segments
            .negative
            .iter()
            .copied()
            .filter(|sp| sp.value < th.significant_negative)
            .collect();

        let significant_positive: Vec<&StablePhase> = segments
            .positive
            .iter()
            .copied()
            .filter(|sp| sp.value > th.significant_positive)
            .collect();

        if !significant_negative.is_empty() && !significant_positive.is_empty() {
            log::info!(
                "🔀 Toilet {} event at {} has both removal and cat phases, treating as cleaning",
                event.toilet_id,
                event.start_time
            );
        }

        // Cleaning (higher priority)
        if let Some(first) = significant_negative.first() {
            let max_value = first.value;
            let min_value = significant_negative[1..]
                .iter()
                .map(|sp| sp.value)
                .reduce(f64::min)
                .unwrap_or(max_value);
            let mut cleaning_weight = max_value - min_value;

            // A trailing small removal is a better read of the net mass taken out
            if let Some(last) = segments.negative.last() {
                if last.value > th.significant_negative {
                    cleaning_weight = last.value;
                }
            }

            return Classification::Cleaning(Cleaning {
                timestamp: event.start_time,
                time: event.duration_secs(),
                weight: cleaning_weight,
            });
        }

        // Measurement
        let Some(longest) = longest_phase(&significant_positive) else {
            return Classification::Unclassified(UnclassifiedReason::NoSignificantPhases);
        };
        let cat_weight = longest.value;

        let Some(cat) = match_cat_by_weight(
            cats,
            event.start_time,
            cat_weight,
            th.cat_match_tolerance,
        ) else {
            return Classification::Unclassified(UnclassifiedReason::UnknownCat { cat_weight });
        };

        // Seconds, not instants: a phase length need not fit on the calendar
        let poo_end = longest.timestamp;
        let poo_time = longest.length;

        let poo_weight = segments
            .positive
            .last()
            .map(|sp| clamp_poo_weight(sp.value, th.max_poo_weight))
            .unwrap_or(0.0);

        Classification::Measurement(Measurement {
            timestamp: event.start_time,
            cat_id: cat.id,
            setup_time: seconds_between(event.start_time, poo_end) - poo_time,
            poo_time,
            cleanup_time: seconds_between(poo_end, event.end_time),
            cat_weight,
            poo_weight,
        })
    }

    /// Clear any previous outcome on `event`, classify it and attach the result.
    pub fn classify_in_place(&self, cats: &[Cat], event: &mut ScaleEvent) -> Classification {
        event.clear_outcome();

        let classification = self.classify(cats, event);
        match &classification {
            Classification::Cleaning(cleaning) => event.set_cleaning(cleaning.clone()),
            Classification::Measurement(measurement) => {
                if measurement.setup_time < 0.0 || measurement.cleanup_time < 0.0 {
                    log::warn!(
                        "Toilet {} measurement at {} has negative timing (setup {:.1}s, cleanup {:.1}s)",
                        event.toilet_id,
                        event.start_time,
                        measurement.setup_time,
                        measurement.cleanup_time
                    );
                }
                event.set_measurement(measurement.clone());
            }
            Classification::Unclassified(reason @ UnclassifiedReason::UnknownCat { .. }) => {
                log::warn!(
                    "❓ Toilet {} event at {}: {}",
                    event.toilet_id,
                    event.start_time,
                    reason
                );
            }
            Classification::Unclassified(reason) => {
                log::debug!(
                    "Toilet {} event at {} unclassified: {}",
                    event.toilet_id,
                    event.start_time,
                    reason
                );
            }
        }

        classification
    }
}

/// Longest phase; the earliest one wins on equal length (input is time-ordered).
fn longest_phase<'a>(phases: &[&'a StablePhase]) -> Option<&'a StablePhase> {
    let mut longest: Option<&StablePhase> = None;
    for &sp in phases {
        match longest {
            Some(current) if current.length >= sp.length => {}
            _ => longest = Some(sp),
        }
    }
    longest
}

/// Values outside [0, max] are not plausible poo weights and become 0.
pub(crate) fn clamp_poo_weight(value: f64, max: f64) -> f64 {
    if (0.0..=max).contains(&value) {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale_core::types::CatWeight;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn create_test_event(start: i64, end: i64, phases: &[(i64, f64, f64)]) -> ScaleEvent {
        ScaleEvent::new(
            1,
            t(start),
            t(end),
            phases
                .iter()
                .map(|&(ts, length, value)| StablePhase::new(t(ts), length, value))
                .collect(),
        )
    }

    fn create_test_roster() -> Vec<Cat> {
        vec![
            Cat {
                id: 1,
                name: "Felix".to_string(),
                weights: vec![CatWeight { timestamp: t(-86_400), weight: 4200.0 }],
            },
            Cat {
                id: 2,
                name: "Luna".to_string(),
                weights: vec![CatWeight { timestamp: t(-86_400), weight: 5600.0 }],
            },
        ]
    }

    #[test]
    fn test_cleaning_takes_precedence() {
        let classifier = ScaleEventClassifier::with_defaults();
        let event = create_test_event(0, 60, &[(10, 2.0, -600.0), (30, 2.0, 6000.0)]);

        let result = classifier.classify(&create_test_roster(), &event);
        assert!(matches!(result, Classification::Cleaning(_)), "got {:?}", result);
    }

    #[test]
    fn test_cleaning_trailing_phase_override() {
        let classifier = ScaleEventClassifier::with_defaults();
        let event = create_test_event(
            0,
            120,
            &[(10, 2.0, -700.0), (20, 2.0, -550.0), (30, 2.0, -200.0)],
        );

        match classifier.classify(&[], &event) {
            Classification::Cleaning(cleaning) => {
                assert_eq!(cleaning.weight, -200.0);
                assert_eq!(cleaning.timestamp, t(0));
                assert_eq!(cleaning.time, 120.0);
            }
            other => panic!("expected cleaning, got {:?}", other),
        }
    }

    #[test]
    fn test_cleaning_single_significant_phase_collapses_to_zero() {
        let classifier = ScaleEventClassifier::with_defaults();
        let event = create_test_event(0, 60, &[(10, 2.0, -700.0)]);

        match classifier.classify(&[], &event) {
            Classification::Cleaning(cleaning) => assert_eq!(cleaning.weight, 0.0),
            other => panic!("expected cleaning, got {:?}", other),
        }
    }

    #[test]
    fn test_cleaning_weight_is_raw_difference() {
        let classifier = ScaleEventClassifier::with_defaults();
        // max = first (-700), min of the rest = -900
        let event = create_test_event(0, 60, &[(10, 2.0, -700.0), (20, 2.0, -900.0)]);

        match classifier.classify(&[], &event) {
            Classification::Cleaning(cleaning) => assert_eq!(cleaning.weight, 200.0),
            other => panic!("expected cleaning, got {:?}", other),
        }
    }

    #[test]
    fn test_phases_sorted_by_timestamp() {
        let classifier = ScaleEventClassifier::with_defaults();
        // Delivered out of order: -200 is chronologically first, -800 last
        let event = create_test_event(0, 60, &[(40, 2.0, -800.0), (5, 2.0, -200.0)]);

        match classifier.classify(&[], &event) {
            // Last negative is -800 so no override; single significant phase
            Classification::Cleaning(cleaning) => assert_eq!(cleaning.weight, 0.0),
            other => panic!("expected cleaning, got {:?}", other),
        }
    }

    #[test]
    fn test_measurement_timing() {
        let classifier = ScaleEventClassifier::with_defaults();
        // Longest significant phase ends at T=100 and lasts 10s; event is [T-20, T+30]
        let event = create_test_event(
            80,
            130,
            &[(85, 2.0, 5500.0), (100, 10.0, 5650.0), (120, 3.0, 80.0)],
        );

        match classifier.classify(&create_test_roster(), &event) {
            Classification::Measurement(m) => {
                assert_eq!(m.cat_id, 2);
                assert_eq!(m.timestamp, t(80));
                assert_eq!(m.setup_time, 10.0);
                assert_eq!(m.poo_time, 10.0);
                assert_eq!(m.cleanup_time, 30.0);
                assert_eq!(m.cat_weight, 5650.0);
                assert_eq!(m.poo_weight, 80.0);
            }
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_longest_phase_tie_takes_earliest() {
        let classifier = ScaleEventClassifier::with_defaults();
        let event = create_test_event(0, 60, &[(20, 8.0, 5550.0), (40, 8.0, 5900.0)]);

        match classifier.classify(&create_test_roster(), &event) {
            Classification::Measurement(m) => {
                assert_eq!(m.cat_weight, 5550.0);
                assert_eq!(m.setup_time, 12.0);
            }
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_timing_is_reported() {
        let classifier = ScaleEventClassifier::with_defaults();
        // Phase claims to have started 5s before the event did
        let event = create_test_event(10, 40, &[(20, 15.0, 5600.0)]);

        match classifier.classify(&create_test_roster(), &event) {
            Classification::Measurement(m) => assert_eq!(m.setup_time, -5.0),
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_identity_tolerance_boundary() {
        let classifier = ScaleEventClassifier::with_defaults();
        let roster = vec![Cat {
            id: 9,
            name: "Tom".to_string(),
            weights: vec![CatWeight { timestamp: t(-10), weight: 5000.0 }],
        }];

        let at_boundary = create_test_event(0, 60, &[(30, 10.0, 5500.0)]);
        assert_eq!(
            classifier.classify(&roster, &at_boundary),
            Classification::Unclassified(UnclassifiedReason::UnknownCat { cat_weight: 5500.0 })
        );

        let inside = create_test_event(0, 60, &[(30, 10.0, 5499.999)]);
        match classifier.classify(&roster, &inside) {
            Classification::Measurement(m) => assert_eq!(m.cat_id, 9),
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_cat_leaves_event_unclassified() {
        let classifier = ScaleEventClassifier::with_defaults();
        let mut event = create_test_event(0, 60, &[(30, 10.0, 9000.0)]);

        let result = classifier.classify_in_place(&create_test_roster(), &mut event);

        assert!(result.is_unclassified());
        assert!(!event.is_classified());
    }

    #[test]
    fn test_poo_weight_clamp() {
        assert_eq!(clamp_poo_weight(-5.0, 500.0), 0.0);
        assert_eq!(clamp_poo_weight(900.0, 500.0), 0.0);
        assert_eq!(clamp_poo_weight(250.0, 500.0), 250.0);
        assert_eq!(clamp_poo_weight(500.0, 500.0), 500.0);
        assert_eq!(clamp_poo_weight(0.0, 500.0), 0.0);
    }

    #[test]
    fn test_poo_weight_uses_last_positive_phase() {
        let classifier = ScaleEventClassifier::with_defaults();

        let heavy = create_test_event(0, 60, &[(30, 10.0, 5600.0), (50, 2.0, 900.0)]);
        match classifier.classify(&create_test_roster(), &heavy) {
            Classification::Measurement(m) => assert_eq!(m.poo_weight, 0.0),
            other => panic!("expected measurement, got {:?}", other),
        }

        let normal = create_test_event(0, 60, &[(30, 10.0, 5600.0), (50, 2.0, 250.0)]);
        match classifier.classify(&create_test_roster(), &normal) {
            Classification::Measurement(m) => assert_eq!(m.poo_weight, 250.0),
            other => panic!("expected measurement, got {:?}", other),
        }

        // The cat phase itself is the last positive phase
        let no_poo = create_test_event(0, 60, &[(30, 10.0, 5600.0)]);
        match classifier.classify(&create_test_roster(), &no_poo) {
            Classification::Measurement(m) => assert_eq!(m.poo_weight, 0.0),
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_noise_only_event_is_unclassified() {
        let classifier = ScaleEventClassifier::with_defaults();
        let mut event = create_test_event(
            0,
            60,
            &[(10, 1.0, -6000.0), (20, 0.5, 7000.0), (30, 20.0, 10.0), (40, 20.0, -10.0)],
        );

        let result = classifier.classify_in_place(&create_test_roster(), &mut event);

        assert_eq!(
            result,
            Classification::Unclassified(UnclassifiedReason::NoSignificantPhases)
        );
        assert!(event.cleaning().is_none());
        assert!(event.measurement().is_none());
    }

    #[test]
    fn test_reclassification_replaces_outcome() {
        let roster = create_test_roster();
        let mut event = create_test_event(0, 60, &[(30, 10.0, 5600.0)]);

        let result = ScaleEventClassifier::with_defaults().classify_in_place(&roster, &mut event);
        assert_eq!(result.as_str(), "MEASUREMENT");
        assert!(event.measurement().is_some());

        // Raising the cat threshold above the phase makes it unclassifiable
        let strict = ScaleEventClassifier::new(ClassificationThresholds {
            significant_positive: 6000.0,
            ..ClassificationThresholds::default()
        });
        let result = strict.classify_in_place(&roster, &mut event);

        assert!(result.is_unclassified());
        assert!(!event.is_classified());
        assert_eq!(event.stable_phases.len(), 1);
    }

    #[test]
    fn test_huge_phase_length_does_not_panic() {
        let classifier = ScaleEventClassifier::with_defaults();
        let roster = vec![Cat {
            id: 3,
            name: "Tiger".to_string(),
            weights: vec![CatWeight { timestamp: t(-86_400), weight: 6000.0 }],
        }];

        let event = create_test_event(0, 60, &[(30, 1e13, 6000.0)]);
        match classifier.classify(&roster, &event) {
            Classification::Measurement(m) => {
                assert_eq!(m.cat_id, 3);
                assert_eq!(m.poo_time, 1e13);
                assert_eq!(m.setup_time, 30.0 - 1e13);
                assert_eq!(m.cleanup_time, 30.0);
            }
            other => panic!("expected measurement, got {:?}", other),
        }

        // Negative lengths never pass the minimum length filter
        let event = create_test_event(0, 60, &[(30, -1e13, 6000.0)]);
        assert_eq!(
            classifier.classify(&roster, &event),
            Classification::Unclassified(UnclassifiedReason::NoSignificantPhases)
        );
    }

    #[test]
    fn test_empty_event_is_unclassified() {
        let classifier = ScaleEventClassifier::with_defaults();
        let event = create_test_event(0, 60, &[]);

        assert!(classifier.classify(&create_test_roster(), &event).is_unclassified());
    }
}
