//! Pointer input capture.
//!
//! [`StrokeCapture`] is a two-state machine (`Idle`, `Drawing`) driven by
//! discrete [`InputEvent`]s. It owns the [`StrokeSet`] of one capture surface;
//! surfaces never share capture state.

use lipi_core::{Point, RecognitionError, Result, Stroke, StrokeSet};
use lipi_settings::CaptureSettings;
use tracing::debug;

/// Capture state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    /// No stroke in progress.
    Idle,
    /// A stroke is being recorded.
    Drawing,
}

/// A discrete pointer event from the UI layer, in device coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    Down(Point),
    /// Pointer moved.
    Move(Point),
    /// Pointer released.
    Up,
    /// Surface reset.
    Clear,
}

/// Maps device coordinates onto the surface's intrinsic resolution.
///
/// Two surfaces of different physical size produce comparable strokes as
/// long as both map onto the same intrinsic resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceTransform {
    scale_x: f64,
    scale_y: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SurfaceTransform {
    /// Device coordinates are already intrinsic.
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Map a `device_width × device_height` rectangle onto
    /// `surface_width × surface_height`.
    pub fn new(
        device_width: f64,
        device_height: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> Result<Self> {
        let dims = [device_width, device_height, surface_width, surface_height];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(RecognitionError::Input(format!(
                "surface dimensions must be positive, got device {device_width}x{device_height} \
                 and surface {surface_width}x{surface_height}"
            )));
        }
        Ok(Self {
            scale_x: surface_width / device_width,
            scale_y: surface_height / device_height,
            offset_x: 0.0,
            offset_y: 0.0,
        })
    }

    /// Map a device rectangle onto the intrinsic surface size from settings.
    pub fn from_settings(
        settings: &CaptureSettings,
        device_width: f64,
        device_height: f64,
    ) -> Result<Self> {
        Self::new(
            device_width,
            device_height,
            settings.surface_width,
            settings.surface_height,
        )
    }

    /// Subtract the surface's device-space origin before scaling.
    #[must_use]
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// Map one point; timestamp and pen state pass through.
    pub fn map(&self, point: Point) -> Point {
        Point {
            x: (point.x - self.offset_x) * self.scale_x,
            y: (point.y - self.offset_y) * self.scale_y,
            ..point
        }
    }
}

/// Records pointer input for one capture surface.
#[derive(Clone, Debug, Default)]
pub struct StrokeCapture {
    transform: SurfaceTransform,
    strokes: StrokeSet,
    active: Option<Stroke>,
}

impl StrokeCapture {
    /// Create an idle capture with no strokes.
    pub fn new(transform: SurfaceTransform) -> Self {
        Self {
            transform,
            strokes: StrokeSet::new(),
            active: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        if self.active.is_some() {
            CaptureState::Drawing
        } else {
            CaptureState::Idle
        }
    }

    /// Dispatch one input event.
    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Down(p) => self.on_pointer_down(p),
            InputEvent::Move(p) => {
                let _ = self.on_pointer_move(p);
            }
            InputEvent::Up => self.on_pointer_up(),
            InputEvent::Clear => self.clear(),
        }
    }

    /// Start a new stroke at `point`.
    ///
    /// A down while already drawing closes the active stroke first, as if
    /// the matching up had been delivered.
    pub fn on_pointer_down(&mut self, point: Point) {
        if self.active.is_some() {
            debug!("pointer down while drawing, closing active stroke");
            self.on_pointer_up();
        }
        self.active = Some(Stroke::begin(self.transform.map(point)));
    }

    /// Append `point` to the active stroke.
    ///
    /// Returns `false` when idle or when the sample's timestamp does not
    /// advance past the previous one.
    pub fn on_pointer_move(&mut self, point: Point) -> bool {
        let Some(stroke) = self.active.as_mut() else {
            return false;
        };
        let accepted = stroke.push(self.transform.map(point));
        if !accepted {
            debug!(timestamp = point.timestamp, "dropping out-of-order sample");
        }
        accepted
    }

    /// Close the active stroke and add it to the stroke set. No-op when idle.
    pub fn on_pointer_up(&mut self) {
        if let Some(mut stroke) = self.active.take() {
            stroke.finish();
            self.strokes.push(stroke);
        }
    }

    /// Discard every stroke, including one in progress.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    /// Whether any completed or in-progress stroke exists.
    pub fn has_strokes(&self) -> bool {
        !self.strokes.is_empty() || self.active.is_some()
    }

    /// Completed strokes.
    pub fn strokes(&self) -> &StrokeSet {
        &self.strokes
    }

    /// Copy of the completed strokes for handing to the recognizer.
    ///
    /// Later input or a `clear()` does not affect the returned set.
    pub fn snapshot(&self) -> StrokeSet {
        self.strokes.clone()
    }
}
