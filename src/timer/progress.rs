//! Circular progress readout geometry.

use std::f64::consts::PI;

use serde::Serialize;

use crate::types::TimerState;

/// Size of the square viewport the ring is drawn in.
pub const DEFAULT_RING_SIZE: f64 = 120.0;

/// Stroke width of the ring.
pub const DEFAULT_STROKE_WIDTH: f64 = 8.0;

/// Geometry of the countdown ring.
///
/// The ring is drawn as a dashed circle whose dash offset shrinks from the full
/// circumference to zero as the phase progresses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRing {
    size: f64,
    stroke_width: f64,
}

impl Default for ProgressRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_SIZE, DEFAULT_STROKE_WIDTH)
    }
}

impl ProgressRing {
    pub fn new(size: f64, stroke_width: f64) -> Self {
        Self { size, stroke_width }
    }

    /// Center coordinate on both axes.
    pub fn center(&self) -> f64 {
        self.size / 2.0
    }

    /// Radius of the stroke's centerline.
    pub fn radius(&self) -> f64 {
        self.center() - self.stroke_width / 2.0
    }

    pub fn circumference(&self) -> f64 {
        2.0 * PI * self.radius()
    }

    /// Dash offset for a progress fraction; out-of-range input is clamped.
    pub fn dash_offset(&self, progress_fraction: f64) -> f64 {
        self.circumference() * (1.0 - progress_fraction.clamp(0.0, 1.0))
    }

    /// Render-ready readout for a timer state.
    pub fn readout(&self, state: &TimerState) -> ProgressReadout {
        let progress_fraction = state.progress_fraction();
        ProgressReadout {
            progress_fraction,
            circumference: self.circumference(),
            dash_offset: self.dash_offset(progress_fraction),
            time_text: state.display_time(),
        }
    }
}

/// Everything the presentation layer needs to draw the ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReadout {
    pub progress_fraction: f64,
    pub circumference: f64,
    pub dash_offset: f64,
    /// `MM:SS` clock text shown in the middle of the ring
    pub time_text: String,
}
