//! Cat identity resolution by nearest known weight

use super::types::Cat;
use chrono::{DateTime, Utc};

/// Find the cat whose last weight before `timestamp` is closest to `weight`.
///
/// Cats without a sample strictly before `timestamp` are skipped. Only
/// differences strictly below `tolerance` qualify; ties go to the cat that
/// appears first in `cats`.
pub fn match_cat_by_weight<'a>(
    cats: &'a [Cat],
    timestamp: DateTime<Utc>,
    weight: f64,
    tolerance: f64,
) -> Option<&'a Cat> {
    let mut best: Option<(&Cat, f64)> = None;

    for cat in cats {
        let Some(sample) = cat.last_weight_before(timestamp) else {
            continue;
        };

        let diff = (weight - sample.weight).abs();
        if !(diff < tolerance) {
            continue;
        }

        match best {
            Some((_, best_diff)) if best_diff <= diff => {}
            _ => best = Some((cat, diff)),
        }
    }

    best.map(|(cat, _)| cat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale_core::types::CatWeight;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn create_test_cat(id: i32, samples: &[(i64, f64)]) -> Cat {
        Cat {
            id,
            name: format!("cat{}", id),
            weights: samples
                .iter()
                .map(|&(secs, weight)| CatWeight { timestamp: t(secs), weight })
                .collect(),
        }
    }

    #[test]
    fn test_nearest_cat_wins() {
        let cats = vec![
            create_test_cat(1, &[(0, 4000.0)]),
            create_test_cat(2, &[(0, 5200.0)]),
            create_test_cat(3, &[(0, 4900.0)]),
        ];

        let cat = match_cat_by_weight(&cats, t(100), 5000.0, 500.0).unwrap();
        assert_eq!(cat.id, 3);
    }

    #[test]
    fn test_tolerance_is_exclusive() {
        let cats = vec![create_test_cat(1, &[(0, 5000.0)])];

        assert!(match_cat_by_weight(&cats, t(100), 5500.0, 500.0).is_none());
        assert_eq!(match_cat_by_weight(&cats, t(100), 5499.999, 500.0).unwrap().id, 1);
        assert_eq!(match_cat_by_weight(&cats, t(100), 4500.001, 500.0).unwrap().id, 1);
    }

    #[test]
    fn test_only_samples_before_timestamp_count() {
        let cats = vec![
            // Weighed at the event start itself: not strictly before
            create_test_cat(1, &[(100, 5000.0)]),
            // Old sample far away, newer sample after the event
            create_test_cat(2, &[(0, 3000.0), (200, 5000.0)]),
        ];

        assert!(match_cat_by_weight(&cats, t(100), 5000.0, 500.0).is_none());
    }

    #[test]
    fn test_uses_most_recent_sample() {
        let cats = vec![create_test_cat(1, &[(0, 3000.0), (50, 4800.0), (10, 3500.0)])];

        assert_eq!(match_cat_by_weight(&cats, t(100), 5000.0, 500.0).unwrap().id, 1);
    }

    #[test]
    fn test_tie_goes_to_roster_order() {
        let cats = vec![
            create_test_cat(7, &[(0, 4800.0)]),
            create_test_cat(4, &[(0, 5200.0)]),
        ];

        assert_eq!(match_cat_by_weight(&cats, t(100), 5000.0, 500.0).unwrap().id, 7);
    }

    #[test]
    fn test_empty_roster() {
        assert!(match_cat_by_weight(&[], t(100), 5000.0, 500.0).is_none());
    }
}
