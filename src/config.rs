//! Editor tuning knobs.
//!
//! The host page may pass a JSON object to `init_editor`; any field left out
//! keeps its default.

use serde::{Deserialize, Serialize};

/// Radius of the cylinder proxy used when picking bones (world units)
pub const PICK_RADIUS: f32 = 0.05;

/// Roll applied per arrow-key press (radians)
pub const ROLL_SPEED: f32 = 0.1;

/// Largest rotation a single drag event may apply (radians)
pub const MAX_DRAG_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EditorConfig {
    pub pick_radius: f32,
    pub roll_speed: f32,
    pub max_drag_step: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pick_radius: PICK_RADIUS,
            roll_speed: ROLL_SPEED,
            max_drag_step: MAX_DRAG_STEP,
        }
    }
}

impl EditorConfig {
    /// Parse from JSON, falling back to defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}
