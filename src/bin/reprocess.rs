//! Reprocess Binary - re-runs the scale event pipeline over a recorded stream
//!
//! Reads a complete JSONL filter event recording, frames every scale event,
//! classifies it against the cat roster and writes the outcomes. Useful after
//! threshold changes or when the live runtime was down.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin reprocess -- filter_events.jsonl cats.json [outcomes.jsonl]
//! ```
//!
//! ## Environment Variables
//!
//! - TOILET_ID - Toilet the recording belongs to (default: 1)
//! - SCALE_* - Classification threshold overrides (see ClassificationThresholds)
//! - RUST_LOG - Logging level (optional, default: info)

use chrono::Utc;
use scaleflow::scale_core::{
    classify_sealed_event, load_roster, poo_counts, ClassificationThresholds, EventBuffer,
    FilterEvent, JsonlOutcomeWriter, RecentStarts, ScaleEventClassifier, ScaleEventStats,
    ValidationLimits,
};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

struct ReprocessArgs {
    filter_events_path: PathBuf,
    cat_roster_path: PathBuf,
    output_path: PathBuf,
    toilet_id: i32,
}

fn parse_args() -> Option<ReprocessArgs> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: reprocess <filter_events.jsonl> <cats.json> [outcomes.jsonl]");
        eprintln!("eg:    reprocess recordings/2023-05-20.jsonl data/cats.json");
        return None;
    }

    Some(ReprocessArgs {
        filter_events_path: PathBuf::from(&args[1]),
        cat_roster_path: PathBuf::from(&args[2]),
        output_path: args
            .get(3)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("streams/reprocessed.jsonl")),
        toilet_id: env::var("TOILET_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let Some(args) = parse_args() else {
        std::process::exit(2);
    };

    let thresholds = ClassificationThresholds::from_env();
    log::info!("🔁 Reprocessing {}", args.filter_events_path.display());
    log::info!("   Toilet: {}", args.toilet_id);
    log::info!("   Thresholds: {:?}", thresholds);

    let cats = load_roster(&args.cat_roster_path)?;
    log::info!("🐈 {} cats in roster", cats.len());

    // Frame scale events
    let mut buffer = EventBuffer::new(args.toilet_id);
    let mut skipped = 0usize;
    let reader = BufReader::new(File::open(&args.filter_events_path)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match FilterEvent::from_jsonl(line.trim()) {
            Ok(event) => event.dispatch(&mut buffer),
            Err(e) => {
                skipped += 1;
                log::warn!("Failed to parse filter event ({}): {}", e, line);
            }
        }
    }

    let violations = buffer.violation_count();
    let scale_events = buffer.into_scale_events();
    log::info!(
        "📊 {} scale events ({} protocol violations, {} unparsable lines)",
        scale_events.len(),
        violations,
        skipped
    );

    // Classify and write
    let classifier = ScaleEventClassifier::new(thresholds);
    let limits = ValidationLimits::without_age_check();
    // Events from earlier runs or overlapping recordings are written once
    let mut known = RecentStarts::from_outcomes_file(&args.output_path)?;
    let mut writer = JsonlOutcomeWriter::new(&args.output_path)?;
    let mut classified = Vec::with_capacity(scale_events.len());

    for event in scale_events {
        let outcome = classify_sealed_event(event, &cats, &classifier, &limits, &mut known);
        if let Some((record, _)) = outcome {
            writer.write_record(&record)?;
            classified.push(record.event);
        }
    }
    writer.flush_now()?;

    let today_start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or_else(Utc::now);
    let stats = ScaleEventStats::compute(&classified, today_start);

    log::info!(
        "✅ Wrote {} events to {}",
        classified.len(),
        writer.path().display()
    );
    log::info!(
        "   All time: {} total, {} cleanings, {} measurements",
        stats.all_time.total,
        stats.all_time.cleanings,
        stats.all_time.measurements
    );
    for count in poo_counts(&classified) {
        log::info!(
            "   💩 Toilet {}: {} visits since last cleaning",
            count.toilet_id,
            count.count
        );
    }

    Ok(())
}
