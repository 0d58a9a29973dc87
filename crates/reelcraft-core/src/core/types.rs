//! Reelcraft Core Type Definitions
//!
//! Defines fundamental types shared by templates, source projects and
//! generated projects.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Template unique identifier (ULID)
pub type TemplateId = String;

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Element unique identifier (ULID)
pub type ElementId = String;

/// Placeholder unique identifier (ULID or user-chosen slug)
pub type PlaceholderId = String;

/// Media file unique identifier
pub type MediaId = String;

/// Automation rule unique identifier
pub type RuleId = String;

/// Creates a fresh unique identifier
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Tolerance used when comparing resolved times
pub const TIME_EPSILON: f64 = 1e-6;

// =============================================================================
// Spatial Types
// =============================================================================

/// 2D size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: u32,
    pub height: u32,
}

impl Size2D {
    /// Creates a new size, replacing zero dimensions with 1
    pub fn new(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            warn!(
                "Size2D created with zero dimension ({}x{}), clamping to 1",
                width, height
            );
        }
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Returns the aspect ratio (width / height)
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}
