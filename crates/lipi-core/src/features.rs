//! Model input features.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::constants::FEATURE_WIDTH;

/// One timestep of model input: offset from the previous point and pen bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFrame {
    /// Horizontal offset from the preceding frame.
    pub dx: f32,
    /// Vertical offset from the preceding frame.
    pub dy: f32,
    /// `1` while the pen is down, `0` when lifted or padding.
    pub pen_state: u8,
}

impl FeatureFrame {
    /// The zero frame used for padding.
    pub const ZERO: Self = Self {
        dx: 0.0,
        dy: 0.0,
        pen_state: 0,
    };

    /// Frame values in tensor order.
    pub fn to_array(self) -> [f32; FEATURE_WIDTH] {
        [self.dx, self.dy, f32::from(self.pen_state)]
    }
}

/// Fixed-length sequence of feature frames.
///
/// The length always equals the `max_len` it was fitted to: excess frames are
/// dropped from the tail, a deficit is filled with [`FeatureFrame::ZERO`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureSequence {
    frames: Vec<FeatureFrame>,
}

impl FeatureSequence {
    /// Pad or truncate `frames` to exactly `max_len`.
    pub fn fit(mut frames: Vec<FeatureFrame>, max_len: usize) -> Self {
        frames.truncate(max_len);
        frames.resize(max_len, FeatureFrame::ZERO);
        Self { frames }
    }

    /// All-zero sequence of `max_len` frames.
    pub fn zeros(max_len: usize) -> Self {
        Self::fit(Vec::new(), max_len)
    }

    /// Frames in order.
    pub fn frames(&self) -> &[FeatureFrame] {
        &self.frames
    }

    /// Sequence length (always the fitted length).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the sequence was fitted to length zero.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames before trailing zero padding.
    pub fn content_len(&self) -> usize {
        self.frames
            .iter()
            .rposition(|f| *f != FeatureFrame::ZERO)
            .map_or(0, |i| i + 1)
    }

    /// Row-major `[len * 3]` buffer for tensor construction.
    pub fn to_flat(&self) -> Vec<f32> {
        self.frames.iter().flat_map(|f| f.to_array()).collect()
    }

    /// `[len, 3]` matrix view of the sequence.
    pub fn to_array(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.frames.len(), FEATURE_WIDTH), |(t, c)| {
            self.frames[t].to_array()[c]
        })
    }
}
