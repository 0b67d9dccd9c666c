//! Scale event ingestion - async channel processor for filter events
//!
//! Main loop:
//! 1. Receives filter events for one toilet via mpsc channel
//! 2. Frames them into scale events with the StablePhaseAggregator
//! 3. Validates and classifies every sealed event, writes it to the sink
//! 4. Periodically flushes the sink and refreshes the cat roster
//!
//! One bad episode never stops the loop; it only ends when the channel closes.

use super::aggregator::StablePhaseAggregator;
use super::classifier::{Classification, ScaleEventClassifier};
use super::event_source::FilterEvent;
use super::roster::RosterSnapshot;
use super::types::{Cat, ScaleEvent};
use super::validation::{RecentStarts, ValidationLimits};
use super::writer_backend::{OutcomeRecord, ScaleEventSink};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub flush_interval: Duration,
    pub limits: ValidationLimits,
    /// Events already written, typically seeded from the outcomes file
    pub known_events: RecentStarts,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(5),
            limits: ValidationLimits::default(),
            known_events: RecentStarts::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub filter_events: u64,
    pub scale_events: u64,
    pub rejected: u64,
    pub cleanings: u64,
    pub measurements: u64,
    pub unclassified: u64,
    pub sink_errors: u64,
}

impl IngestionSummary {
    fn count(&mut self, classification: &Classification) {
        match classification {
            Classification::Cleaning(_) => self.cleanings += 1,
            Classification::Measurement(_) => self.measurements += 1,
            Classification::Unclassified(_) => self.unclassified += 1,
        }
    }
}

/// Validate and classify one sealed event.
///
/// Returns `None` when the event fails validation or repeats a known one;
/// such events are logged and dropped. Accepted events are added to `known`.
pub fn classify_sealed_event(
    mut event: ScaleEvent,
    cats: &[Cat],
    classifier: &ScaleEventClassifier,
    limits: &ValidationLimits,
    known: &mut RecentStarts,
) -> Option<(OutcomeRecord, Classification)> {
    let checked = limits
        .validate(&event, Utc::now())
        .and_then(|()| known.check(&event));
    if let Err(e) = checked {
        log::warn!(
            "🚫 Rejected toilet {} event at {}: {}",
            event.toilet_id,
            event.start_time,
            e
        );
        return None;
    }
    known.record(event.toilet_id, event.start_time);

    let classification = classifier.classify_in_place(cats, &mut event);
    log::info!(
        "🎯 Toilet {} event at {} ({:.0}s, {} phases): {}",
        event.toilet_id,
        event.start_time,
        event.duration_secs(),
        event.stable_phases.len(),
        classification.as_str()
    );

    let record = OutcomeRecord::new(event, &classification);
    Some((record, classification))
}

/// Run the ingestion loop until `rx` is closed.
pub async fn run_ingestion(
    mut rx: mpsc::Receiver<FilterEvent>,
    mut aggregator: StablePhaseAggregator,
    classifier: &ScaleEventClassifier,
    mut roster: RosterSnapshot,
    sink: &mut dyn ScaleEventSink,
    options: IngestionOptions,
) -> IngestionSummary {
    log::info!("🚀 Starting scale event ingestion for toilet {}", aggregator.toilet_id());
    log::info!("   ├─ Flush interval: {:?}", options.flush_interval);
    log::info!("   └─ Sink: {}", sink.backend_type());

    let mut known = options.known_events;
    let mut flush_timer = interval(options.flush_interval);
    flush_timer.tick().await; // Skip first immediate tick
    let mut summary = IngestionSummary::default();

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(filter_event) = received else {
                    break;
                };
                summary.filter_events += 1;

                let Some(sealed) = aggregator.process(filter_event) else {
                    continue;
                };
                summary.scale_events += 1;

                let cats = roster.cats();
                match classify_sealed_event(sealed, &cats, classifier, &options.limits, &mut known) {
                    Some((record, classification)) => {
                        summary.count(&classification);
                        if let Err(e) = sink.write_event(&record).await {
                            summary.sink_errors += 1;
                            log::error!("Failed to write scale event: {}", e);
                        }
                    }
                    None => summary.rejected += 1,
                }
            }

            _ = flush_timer.tick() => {
                if let Err(e) = sink.flush().await {
                    summary.sink_errors += 1;
                    log::error!("Failed to flush {} sink: {}", sink.backend_type(), e);
                }
                roster.reload().await;
                if let Some(oldest) = options
                    .limits
                    .max_age
                    .and_then(|age| Utc::now().checked_sub_signed(age))
                {
                    // Older events fail the age check before reaching the set
                    known.prune_before(oldest);
                }
            }
        }
    }

    if aggregator.is_open() {
        log::warn!(
            "Filter stream closed inside an open event, dropping {} phases",
            aggregator.buffered_phases()
        );
    }

    if let Err(e) = sink.flush().await {
        summary.sink_errors += 1;
        log::error!("Final flush failed: {}", e);
    }

    log::info!(
        "✅ Ingestion stopped: {} scale events ({} cleanings, {} measurements, {} unclassified, {} rejected)",
        summary.scale_events,
        summary.cleanings,
        summary.measurements,
        summary.unclassified,
        summary.rejected
    );

    summary
}
