//! Sink trait for classified scale events
//!
//! Defines the interface the ingestion loop hands finished events to.

use super::classifier::Classification;
use super::types::ScaleEvent;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err)
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "IO error: {}", e),
            SinkError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {}

/// One output line: the sealed event with its outcome attached.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    pub classification: &'static str,
    pub reason: Option<String>,
    #[serde(flatten)]
    pub event: ScaleEvent,
}

impl OutcomeRecord {
    pub fn new(event: ScaleEvent, classification: &Classification) -> Self {
        let reason = match classification {
            Classification::Unclassified(reason) => Some(reason.to_string()),
            _ => None,
        };

        Self {
            classification: classification.as_str(),
            reason,
            event,
        }
    }
}

#[async_trait]
pub trait ScaleEventSink: Send {
    /// Write a single classified event
    async fn write_event(&mut self, record: &OutcomeRecord) -> Result<(), SinkError>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
