//! Engine settings loaded from a file and the environment.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use vitalwatch_types::VitalDefinition;

use crate::error::EngineError;

/// Number of simultaneous warnings that escalate to an alarm by default.
pub const DEFAULT_ALARM_COUNT_THRESHOLD: u32 = 2;

/// Prefix for environment overrides, e.g. `VITALWATCH_ALARM_COUNT_THRESHOLD=3`.
pub const ENV_PREFIX: &str = "VITALWATCH";

/// Configuration for an alarm engine.
///
/// # Example
///
/// ```toml
/// alarm_count_threshold = 2
///
/// [[vitals]]
/// label = "HR"
/// unit = "bpm"
/// metric_ids = ["MDC_ECG_HEART_RATE", "MDC_PULS_OXIM_PULS_RATE"]
/// thresholds = { warning_low = 60.0, warning_high = 100.0, critical_low = 40.0, critical_high = 150.0 }
/// minimum = 0.0
/// maximum = 250.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Warnings at or above this count escalate to an alarm.
    pub alarm_count_threshold: u32,

    /// Vitals to create, in evaluation order.
    pub vitals: Vec<VitalDefinition>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            alarm_count_threshold: DEFAULT_ALARM_COUNT_THRESHOLD,
            vitals: Vec::new(),
        }
    }
}

impl EngineSettings {
    /// Load settings from a file, with `VITALWATCH_*` environment overrides.
    ///
    /// The format is inferred from the file extension.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, EngineError> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
