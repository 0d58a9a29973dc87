//! Coordinate & Timing Utilities
//!
//! Pure conversions between pixel and percentage positions, and anchor-time
//! arithmetic for relative timings.
//!
//! Pixel positions are offsets of the element centre from the canvas centre,
//! so `(0, 0)` is a centred element on any canvas. Percentages use the same
//! origin and are relative to the canvas width (x) or height (y).

use serde::{Deserialize, Serialize};

use super::models::{PercentPosition, TimingAnchor};
use crate::core::{Size2D, TimeSec};

/// Position in pixels, relative to the canvas centre
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl PixelPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Converts a pixel offset to a percentage of `size`.
///
/// A non-positive size has no meaningful basis and yields 0.
pub fn position_to_percent(value: f64, size: f64) -> f64 {
    if size <= 0.0 || !size.is_finite() {
        return 0.0;
    }
    value / size * 100.0
}

/// Converts a percentage of `size` back to pixels
pub fn percent_to_position(percent: f64, size: f64) -> f64 {
    percent / 100.0 * size
}

/// Converts a pixel position into a resolution-independent one
pub fn to_percent_position(position: &PixelPosition, canvas: Size2D) -> PercentPosition {
    let (w, h) = (canvas.width as f64, canvas.height as f64);
    PercentPosition {
        x_percent: position_to_percent(position.x, w),
        y_percent: position_to_percent(position.y, h),
        rotation: position.rotation,
        width_percent: position.width.map(|v| position_to_percent(v, w)),
        height_percent: position.height.map(|v| position_to_percent(v, h)),
    }
}

/// Resolves a percentage position against a concrete canvas
pub fn to_pixel_position(position: &PercentPosition, canvas: Size2D) -> PixelPosition {
    let (w, h) = (canvas.width as f64, canvas.height as f64);
    PixelPosition {
        x: percent_to_position(position.x_percent, w),
        y: percent_to_position(position.y_percent, h),
        rotation: position.rotation,
        width: position.width_percent.map(|v| percent_to_position(v, w)),
        height: position.height_percent.map(|v| percent_to_position(v, h)),
    }
}

/// Time of an anchor point on an element
pub fn anchor_time(start: TimeSec, duration: TimeSec, anchor: TimingAnchor) -> TimeSec {
    match anchor {
        TimingAnchor::Start => start,
        TimingAnchor::End => start + duration,
    }
}

/// Start time of an element positioned relative to an anchor element
pub fn relative_start(
    anchor_start: TimeSec,
    anchor_duration: TimeSec,
    anchor: TimingAnchor,
    offset: TimeSec,
) -> TimeSec {
    anchor_time(anchor_start, anchor_duration, anchor) + offset
}
