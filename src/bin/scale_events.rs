//! Scale Events Binary - live litter box event pipeline
//!
//! Tails the filter event stream of one toilet, frames scale events,
//! classifies them and appends the outcomes to a JSONL file.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin scale_events
//! ```
//!
//! ## Environment Variables
//!
//! - FILTER_EVENTS_PATH - JSONL filter event stream (required)
//! - CAT_ROSTER_PATH - JSON cat roster (required)
//! - OUTCOMES_OUTPUT_PATH - Output file (default: streams/outcomes.jsonl)
//! - TOILET_ID - Toilet the stream belongs to (default: 1)
//! - FLUSH_INTERVAL_SECS - Flush and roster reload interval (default: 5)
//! - CHANNEL_BUFFER - Filter events buffered between reader and ingestion (default: 1000)
//! - SCALE_* - Classification threshold overrides (see ClassificationThresholds)
//! - RUST_LOG - Logging level (optional, default: info)

use scaleflow::config::RuntimeConfig;
use scaleflow::scale_core::{
    run_ingestion, ClassificationThresholds, FilterEventTailReader, IngestionOptions,
    JsonlOutcomeWriter, RecentStarts, RosterSnapshot, ScaleEventClassifier,
    StablePhaseAggregator, ValidationLimits,
};
use tokio::sync::mpsc;
use tokio::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = RuntimeConfig::from_env()?;
    let thresholds = ClassificationThresholds::from_env();

    log::info!("🚀 Starting Scale Event Pipeline");
    log::info!("   Toilet: {}", config.toilet_id);
    log::info!("   Filter events: {}", config.filter_events_path.display());
    log::info!("   Cat roster: {}", config.cat_roster_path.display());
    log::info!("   Output: {}", config.outcomes_output_path.display());
    log::info!("   Thresholds: {:?}", thresholds);

    let roster = RosterSnapshot::from_file(config.cat_roster_path.clone())?;
    let classifier = ScaleEventClassifier::new(thresholds);
    let aggregator = StablePhaseAggregator::new(config.toilet_id);
    let known_events = RecentStarts::from_outcomes_file(&config.outcomes_output_path)?;
    let mut writer = JsonlOutcomeWriter::new(&config.outcomes_output_path)?;

    let mut reader = FilterEventTailReader::new(config.filter_events_path.clone());
    reader.start().await?;

    let (tx, rx) = mpsc::channel(config.channel_buffer);

    let reader_task = tokio::spawn(async move {
        loop {
            match reader.read_event().await {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break; // Ingestion stopped
                    }
                }
                Err(e) => {
                    log::error!("Filter event stream error: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });

    let abort_handle = reader_task.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("🛑 Shutdown requested, draining filter events...");
            abort_handle.abort();
        }
    });

    let options = IngestionOptions {
        flush_interval: Duration::from_secs(config.flush_interval_secs),
        limits: ValidationLimits::default(),
        known_events,
    };

    log::info!("✅ Pipeline running - waiting for filter events...");
    let summary = run_ingestion(rx, aggregator, &classifier, roster, &mut writer, options).await;

    log::info!("👋 Processed {} filter events", summary.filter_events);
    Ok(())
}
