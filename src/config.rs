use std::env;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the scale event runtime, loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// JSONL stream of filter events for one toilet
    pub filter_events_path: PathBuf,

    /// JSON cat roster, reloaded on every flush
    pub cat_roster_path: PathBuf,

    /// Where classified scale events are appended
    pub outcomes_output_path: PathBuf,

    pub toilet_id: i32,

    pub flush_interval_secs: u64,

    /// Channel buffer between the tail reader and ingestion (filter events)
    pub channel_buffer: usize,

    pub rust_log: String,
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FILTER_EVENTS_PATH` (required)
    /// - `CAT_ROSTER_PATH` (required)
    /// - `OUTCOMES_OUTPUT_PATH` (default: streams/outcomes.jsonl)
    /// - `TOILET_ID` (default: 1)
    /// - `FLUSH_INTERVAL_SECS` (default: 5)
    /// - `CHANNEL_BUFFER` (default: 1000)
    /// - `RUST_LOG` (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<PathBuf, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
        };

        let filter_events_path = required("FILTER_EVENTS_PATH")?;
        let cat_roster_path = required("CAT_ROSTER_PATH")?;

        let outcomes_output_path = lookup("OUTCOMES_OUTPUT_PATH")
            .unwrap_or_else(|| "streams/outcomes.jsonl".to_string())
            .into();

        let toilet_id = match lookup("TOILET_ID") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                ConfigError::InvalidValue(format!("TOILET_ID must be an integer, got '{}'", raw))
            })?,
            None => 1,
        };

        let flush_interval_secs = lookup("FLUSH_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        if flush_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "FLUSH_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        let channel_buffer = lookup("CHANNEL_BUFFER")
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(1_000);

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            filter_events_path,
            cat_roster_path,
            outcomes_output_path,
            toilet_id,
            flush_interval_secs,
            channel_buffer,
            rust_log,
        })
    }
}
