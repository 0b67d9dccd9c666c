//! Scaleflow - litter box scale event pipeline
//!
//! Aggregates the stable phases reported by the toilet's weight filter into
//! scale events and classifies each one as a cleaning or a cat measurement.
//! See [`scale_core`] for the pipeline layout.

#[cfg(test)]
mod tests;

pub mod config;
pub mod scale_core;
