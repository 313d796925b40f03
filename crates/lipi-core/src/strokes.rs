//! Stroke data model.
//!
//! A [`Point`] is one pointer sample in capture-surface coordinates. A
//! [`Stroke`] is one continuous pen-down segment whose last point is marked
//! [`PenState::Up`]. A [`StrokeSet`] is the ordered drawing of one input field.

use serde::{Deserialize, Serialize};

use crate::errors::{RecognitionError, Result};

/// Pen contact state of a sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenState {
    /// Pen touching the surface.
    #[default]
    Down,
    /// Pen lifted; marks the final sample of a stroke.
    Up,
}

impl PenState {
    /// Feature encoding: `1` while the pen is down, `0` once lifted.
    ///
    /// Zero-padding frames therefore read as "pen lifted, not moving".
    pub const fn as_bit(self) -> u8 {
        match self {
            Self::Down => 1,
            Self::Up => 0,
        }
    }
}

/// A single pointer sample in capture-surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Sample time in milliseconds.
    pub timestamp: u64,
    /// Pen contact state.
    #[serde(default)]
    pub pen_state: PenState,
}

impl Point {
    /// A pen-down sample.
    pub const fn down(x: f64, y: f64, timestamp: u64) -> Self {
        Self {
            x,
            y,
            timestamp,
            pen_state: PenState::Down,
        }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One continuous pen-down-to-pen-up segment.
///
/// Timestamps strictly increase within a stroke. A completed stroke has every
/// point marked [`PenState::Down`] except the last, which is [`PenState::Up`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke at `first`, forced to [`PenState::Down`].
    pub fn begin(first: Point) -> Self {
        Self {
            points: vec![Point {
                pen_state: PenState::Down,
                ..first
            }],
        }
    }

    /// Build a completed stroke from recorded points.
    ///
    /// Pen states are normalized (down everywhere, up on the last point).
    /// Fails on an empty list or non-increasing timestamps.
    pub fn from_points(mut points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(RecognitionError::Input("stroke has no points".into()));
        }
        if let Some(pair) = points
            .windows(2)
            .find(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(RecognitionError::Input(format!(
                "stroke timestamps must strictly increase ({} then {})",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        for p in &mut points {
            p.pen_state = PenState::Down;
        }
        let mut stroke = Self { points };
        stroke.finish();
        Ok(stroke)
    }

    /// Append a sample. Returns `false` (and records nothing) if the
    /// timestamp does not advance past the last recorded sample.
    pub fn push(&mut self, point: Point) -> bool {
        if let Some(last) = self.points.last() {
            if point.timestamp <= last.timestamp {
                return false;
            }
        }
        self.points.push(Point {
            pen_state: PenState::Down,
            ..point
        });
        true
    }

    /// Mark the last recorded sample as [`PenState::Up`].
    pub fn finish(&mut self) {
        if let Some(last) = self.points.last_mut() {
            last.pen_state = PenState::Up;
        }
    }

    /// Recorded samples in order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the stroke has no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<Point>> for Stroke {
    type Error = RecognitionError;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Self::from_points(points)
    }
}

impl From<Stroke> for Vec<Point> {
    fn from(stroke: Stroke) -> Self {
        stroke.points
    }
}

/// Ordered strokes of one input gesture.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeSet {
    strokes: Vec<Stroke>,
}

impl StrokeSet {
    /// Create an empty stroke set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed stroke.
    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Strokes in drawing order.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Number of strokes.
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Whether no strokes were recorded.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Total number of samples across all strokes.
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }

    /// Discard every stroke.
    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Iterate over strokes in drawing order.
    pub fn iter(&self) -> std::slice::Iter<'_, Stroke> {
        self.strokes.iter()
    }
}

impl From<Vec<Stroke>> for StrokeSet {
    fn from(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }
}

impl<'a> IntoIterator for &'a StrokeSet {
    type Item = &'a Stroke;
    type IntoIter = std::slice::Iter<'a, Stroke>;

    fn into_iter(self) -> Self::IntoIter {
        self.strokes.iter()
    }
}
