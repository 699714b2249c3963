use std::path::Path;

use chrono::{FixedOffset, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, StormError};

/// Top-level configuration for Stormwatch.
///
/// Loaded from `stormwatch.toml` by default. Every section falls back to its
/// defaults when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StormConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl StormConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StormConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults. A missing file is the
    /// normal case and only noted at debug level; an unreadable or invalid
    /// one is warned about.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config. Using defaults.");
                Self::default()
            }
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// JSON file holding the monitored subject list.
    pub subjects_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            subjects_file: "users_subjects.json".to_string(),
        }
    }
}

/// Time bucketing and storm detection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Day zero for bucket keys, `YYYY-MM-DD`.
    pub epoch: String,
    /// Offset from UTC, in minutes, used to decide an event's local day.
    pub utc_offset_minutes: i32,
    /// A bucket must score strictly above this many standard deviations.
    pub storm_zscore: f64,
    /// A bucket must hold strictly more than this many events.
    pub storm_min_count: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            epoch: "2020-01-01".to_string(),
            utc_offset_minutes: 0,
            storm_zscore: 1.5,
            storm_min_count: 1000,
        }
    }
}

impl DetectionConfig {
    /// Parse the configured epoch date.
    pub fn epoch_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.epoch, "%Y-%m-%d")
            .map_err(|e| StormError::Config(format!("invalid epoch '{}': {}", self.epoch, e)))
    }

    /// The fixed offset events are bucketed in.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            StormError::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

/// Output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Event output format: "json" or "text".
    pub format: String,
    /// Salt mixed into author screen names before hashing in text output.
    pub author_salt: String,
    /// Maximum clusters listed per duplicate report section.
    pub duplicate_report_limit: usize,
    /// File that receives one summary row per statistics run.
    pub summary_file: String,
    /// Log progress every this many output events.
    pub progress_interval: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            author_salt: "saltystuff".to_string(),
            duplicate_report_limit: 200,
            summary_file: "output/stormStats.txt".to_string(),
            progress_interval: 10_000,
        }
    }
}
