//! Event counts and poo counts over classified scale events

use super::types::ScaleEvent;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScaleEventCounts {
    pub total: usize,
    pub cleanings: usize,
    pub measurements: usize,
}

impl ScaleEventCounts {
    fn add(&mut self, event: &ScaleEvent) {
        self.total += 1;
        if event.cleaning().is_some() {
            self.cleanings += 1;
        }
        if event.measurement().is_some() {
            self.measurements += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScaleEventStats {
    pub all_time: ScaleEventCounts,
    pub yesterday: ScaleEventCounts,
    pub today: ScaleEventCounts,
}

impl ScaleEventStats {
    /// Bucket events by start time. `today_start` is local midnight in UTC.
    pub fn compute<'a, I>(events: I, today_start: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a ScaleEvent>,
    {
        let yesterday_start = today_start - Duration::days(1);
        let mut stats = Self::default();

        for event in events {
            stats.all_time.add(event);
            if event.start_time >= today_start {
                stats.today.add(event);
            } else if event.start_time >= yesterday_start {
                stats.yesterday.add(event);
            }
        }

        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PooCount {
    pub toilet_id: i32,
    pub count: usize,
}

/// Measurements per toilet since that toilet's latest cleaning, ordered by toilet id.
pub fn poo_counts<'a, I>(events: I) -> Vec<PooCount>
where
    I: IntoIterator<Item = &'a ScaleEvent>,
{
    let events: Vec<&ScaleEvent> = events.into_iter().collect();

    let mut last_cleaning: BTreeMap<i32, Option<DateTime<Utc>>> = BTreeMap::new();
    for event in &events {
        let entry = last_cleaning.entry(event.toilet_id).or_insert(None);
        if event.cleaning().is_some() && entry.map_or(true, |t| event.start_time > t) {
            *entry = Some(event.start_time);
        }
    }

    last_cleaning
        .into_iter()
        .map(|(toilet_id, cleaned_at)| {
            let count = events
                .iter()
                .filter(|e| e.toilet_id == toilet_id && e.measurement().is_some())
                .filter(|e| cleaned_at.map_or(true, |t| e.start_time > t))
                .count();
            PooCount { toilet_id, count }
        })
        .collect()
}
