//! Editor settings and UI preferences
//!
//! These control how the graph editor interprets input and places nodes.
//! The camera's scale bounds are fixed and live in `editor::camera`.

use serde::{Deserialize, Serialize};

/// Tunables for the graph editor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorSettings {
    /// Scale factor applied per wheel notch
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Extra pick radius around ports and link curves, in screen pixels
    #[serde(default = "default_hit_tolerance_px")]
    pub hit_tolerance_px: f32,

    /// Maximum pointer travel for a press/release to count as a click
    #[serde(default = "default_click_slop_px")]
    pub click_slop_px: f32,

    /// Keep per-column row counters across layout passes so nodes that
    /// appear later do not land on top of earlier ones
    #[serde(default = "default_true")]
    pub persist_layout_columns: bool,
}

fn default_zoom_step() -> f32 {
    1.1
}

fn default_hit_tolerance_px() -> f32 {
    6.0
}

fn default_click_slop_px() -> f32 {
    4.0
}

fn default_true() -> bool {
    true
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            zoom_step: default_zoom_step(),
            hit_tolerance_px: default_hit_tolerance_px(),
            click_slop_px: default_click_slop_px(),
            persist_layout_columns: true,
        }
    }
}

/// UI preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiPreferences {
    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    /// Initial window size in points
    #[serde(default = "default_window_size")]
    pub window_size: [f32; 2],
}

fn default_window_size() -> [f32; 2] {
    [1280.0, 720.0]
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            dark_mode: true,
            window_size: default_window_size(),
        }
    }
}
