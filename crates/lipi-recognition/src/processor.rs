//! Stroke preprocessing: `StrokeSet → FeatureSequence`.
//!
//! ```text
//! flatten → resample → normalize to [-1, 1] → delta-encode → pad/truncate
//! ```
//!
//! The transform is a pure function of its input and configuration: no
//! clocks, no randomness, no shared state.

use lipi_core::constants::{DEFAULT_MAX_SEQ_LENGTH, DEFAULT_RESAMPLE_DISTANCE};
use lipi_core::{FeatureFrame, FeatureSequence, PenState, Point, StrokeSet};
use lipi_settings::ProcessingSettings;
use tracing::debug;

/// Preprocessing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorConfig {
    /// Minimum path distance between kept points.
    pub resample_distance: f64,
    /// Output length in frames.
    pub max_seq_length: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            resample_distance: DEFAULT_RESAMPLE_DISTANCE,
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
        }
    }
}

impl ProcessorConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ProcessingSettings) -> Self {
        Self {
            resample_distance: settings.resample_distance,
            max_seq_length: settings.max_seq_length,
        }
    }
}

/// Turns a stroke set into a fixed-length feature sequence.
#[derive(Clone, Debug, Default)]
pub struct StrokeProcessor {
    config: ProcessorConfig,
}

impl StrokeProcessor {
    /// Create a processor.
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run the full transform. An empty stroke set yields all-zero frames.
    pub fn process(&self, strokes: &StrokeSet) -> FeatureSequence {
        let flat = flatten(strokes);
        let kept = resample(&flat, self.config.resample_distance);
        let normalized = normalize(&kept);
        let frames = delta_encode(&normalized);
        debug!(
            points = flat.len(),
            kept = kept.len(),
            max_seq_length = self.config.max_seq_length,
            truncated = frames.len() > self.config.max_seq_length,
            "processed strokes"
        );
        FeatureSequence::fit(frames, self.config.max_seq_length)
    }
}

/// Concatenate all strokes' points in drawing order.
pub fn flatten(strokes: &StrokeSet) -> Vec<Point> {
    strokes
        .iter()
        .flat_map(|s| s.points().iter().copied())
        .collect()
}

/// Keep points spaced at least `distance` apart along the path.
///
/// Stroke boundaries are always kept: the pen-up point ending a stroke and
/// the first point after it. The first and last points are always kept.
pub fn resample(points: &[Point], distance: f64) -> Vec<Point> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let last_index = rest.len();
    let mut kept = vec![first];
    let mut prev = first;
    let mut travelled = 0.0;

    for (i, &p) in rest.iter().enumerate() {
        travelled += prev.distance_to(&p);
        let boundary = p.pen_state == PenState::Up || prev.pen_state == PenState::Up;
        if travelled >= distance || boundary || i + 1 == last_index {
            kept.push(p);
            travelled = 0.0;
        }
        prev = p;
    }
    kept
}

/// Map each axis onto `[-1, 1]` using the bounding box of `points`.
///
/// An axis extent below one unit is treated as one, so degenerate input
/// stays finite.
pub fn normalize(points: &[Point]) -> Vec<Point> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let range_x = (max_x - min_x).max(1.0);
    let range_y = (max_y - min_y).max(1.0);

    points
        .iter()
        .map(|p| Point {
            x: 2.0 * (p.x - min_x) / range_x - 1.0,
            y: 2.0 * (p.y - min_y) / range_y - 1.0,
            ..*p
        })
        .collect()
}

/// Replace absolute positions with offsets from the preceding point.
#[allow(clippy::cast_possible_truncation)]
pub fn delta_encode(points: &[Point]) -> Vec<FeatureFrame> {
    let mut prev: Option<&Point> = None;
    points
        .iter()
        .map(|p| {
            let (dx, dy) = prev.map_or((0.0, 0.0), |q| (p.x - q.x, p.y - q.y));
            prev = Some(p);
            FeatureFrame {
                dx: dx as f32,
                dy: dy as f32,
                pen_state: p.pen_state.as_bit(),
            }
        })
        .collect()
}
