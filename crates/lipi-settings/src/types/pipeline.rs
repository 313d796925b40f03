//! Capture, processing and decoding settings.

use lipi_core::constants::{
    DEFAULT_BEAM_WIDTH, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_SEQ_LENGTH,
    DEFAULT_RESAMPLE_DISTANCE,
};
use serde::{Deserialize, Serialize};

/// Capture surface settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// Intrinsic surface width that device coordinates are mapped onto.
    pub surface_width: f64,
    /// Intrinsic surface height that device coordinates are mapped onto.
    pub surface_height: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            surface_width: 512.0,
            surface_height: 512.0,
        }
    }
}

/// Stroke preprocessing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingSettings {
    /// Minimum path distance between kept points, in surface units.
    pub resample_distance: f64,
    /// Fixed model input length in frames.
    pub max_seq_length: usize,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            resample_distance: DEFAULT_RESAMPLE_DISTANCE,
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
        }
    }
}

/// One entry of the ordered decoding strategy list.
///
/// ```json
/// [{"kind": "beamSearch", "beamWidth": 10}, {"kind": "greedy"}]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StrategySettings {
    /// CTC prefix beam search.
    BeamSearch {
        /// Hypotheses kept after each timestep.
        #[serde(default = "default_beam_width")]
        beam_width: usize,
    },
    /// Best-path (arg-max) decoding.
    Greedy,
}

fn default_beam_width() -> usize {
    DEFAULT_BEAM_WIDTH
}

/// A named inclusive range of Unicode scalar values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRange {
    /// Human-readable script name.
    pub name: String,
    /// First code point.
    pub start: u32,
    /// Last code point (inclusive).
    pub end: u32,
}

impl ScriptRange {
    /// The Devanagari block, U+0900..=U+097F.
    pub fn devanagari() -> Self {
        Self {
            name: "devanagari".to_string(),
            start: 0x0900,
            end: 0x097F,
        }
    }

    /// Whether `c` falls inside the range.
    pub fn contains(&self, c: char) -> bool {
        (self.start..=self.end).contains(&u32::from(c))
    }
}

/// CTC decoding settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecodingSettings {
    /// Strategies tried in order until one is confident enough.
    pub strategies: Vec<StrategySettings>,
    /// Confidence at or above which later strategies are skipped.
    pub confidence_threshold: f64,
    /// Scripts whose characters keep a line alive during post-filtering.
    pub target_scripts: Vec<ScriptRange>,
}

impl Default for DecodingSettings {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategySettings::BeamSearch {
                    beam_width: DEFAULT_BEAM_WIDTH,
                },
                StrategySettings::Greedy,
            ],
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            target_scripts: vec![ScriptRange::devanagari()],
        }
    }
}
