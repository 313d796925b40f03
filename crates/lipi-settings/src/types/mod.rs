//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Every section is `#[serde(default)]`,
//! so a partial JSON file fills the gaps from the defaults.

mod model;
mod pipeline;

pub use model::*;
pub use pipeline::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for lipi.
///
/// Loaded from `~/.lipi/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "processing": { "maxSeqLength": 128 },
///   "decoding": { "strategies": [{ "kind": "greedy" }] }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LipiSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Capture surface geometry.
    pub capture: CaptureSettings,
    /// Stroke preprocessing.
    pub processing: ProcessingSettings,
    /// CTC decoding.
    pub decoding: DecodingSettings,
    /// Model artifact and runtime bounds.
    pub model: ModelSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for LipiSettings {
    fn default() -> Self {
        Self {
            version: lipi_core::constants::VERSION.to_string(),
            name: lipi_core::constants::NAME.to_string(),
            capture: CaptureSettings::default(),
            processing: ProcessingSettings::default(),
            decoding: DecodingSettings::default(),
            model: ModelSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl LipiSettings {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SettingsError::InvalidValue(msg));

        if !is_positive(self.capture.surface_width) || !is_positive(self.capture.surface_height) {
            return invalid(format!(
                "capture surface must be positive, got {}x{}",
                self.capture.surface_width, self.capture.surface_height
            ));
        }
        if self.processing.max_seq_length == 0 {
            return invalid("processing.maxSeqLength must be at least 1".into());
        }
        if !is_positive(self.processing.resample_distance) {
            return invalid(format!(
                "processing.resampleDistance must be positive, got {}",
                self.processing.resample_distance
            ));
        }
        if !(0.0..=1.0).contains(&self.decoding.confidence_threshold) {
            return invalid(format!(
                "decoding.confidenceThreshold must lie in [0, 1], got {}",
                self.decoding.confidence_threshold
            ));
        }
        if self.decoding.strategies.is_empty() {
            return invalid("decoding.strategies must not be empty".into());
        }
        for strategy in &self.decoding.strategies {
            if let StrategySettings::BeamSearch { beam_width: 0 } = strategy {
                return invalid("decoding beamWidth must be at least 1".into());
            }
        }
        if let Some(r) = self.decoding.target_scripts.iter().find(|r| r.start > r.end) {
            return invalid(format!("target script {} has start after end", r.name));
        }
        if self.model.load_timeout_ms == 0 || self.model.inference_timeout_ms == 0 {
            return invalid("model timeouts must be positive".into());
        }
        if self.model.intra_threads == 0 {
            return invalid("model.intraThreads must be at least 1".into());
        }
        if let (Some(size), Some(blank)) = (self.model.alphabet_size, self.model.blank_index) {
            if blank >= size {
                return invalid(format!(
                    "model.blankIndex {blank} out of range for alphabet of {size}"
                ));
            }
        }
        Ok(())
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Log verbosity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level (most verbose).
    Trace,
    /// Debug-level.
    Debug,
    /// Info-level.
    Info,
    /// Warning-level (default).
    #[default]
    Warn,
    /// Error-level (least verbose).
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr.
    pub level: LogLevel,
}
