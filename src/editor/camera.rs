//! Camera transform between screen space and graph space.
//!
//! `screen = graph * scale + translation`. The camera outlives every
//! snapshot; reconciliation never touches it.

use egui::{Pos2, Vec2};

/// Smallest allowed scale
pub const MIN_SCALE: f32 = 0.1;
/// Largest allowed scale
pub const MAX_SCALE: f32 = 5.0;

/// Pan offset + uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    scale: f32,
    translation: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: Vec2::ZERO,
        }
    }
}

impl Camera {
    pub fn new(scale: f32, translation: Vec2) -> Self {
        Self {
            scale: clamp_scale(scale),
            translation,
        }
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    /// Screen point (canvas-relative) to graph point.
    #[inline]
    pub fn to_graph(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.translation) / self.scale).to_pos2()
    }

    /// Graph point to screen point (canvas-relative).
    #[inline]
    pub fn to_screen(&self, graph: Pos2) -> Pos2 {
        (graph.to_vec2() * self.scale + self.translation).to_pos2()
    }

    /// Multiply the scale by `factor`, clamped to `[MIN_SCALE, MAX_SCALE]`.
    ///
    /// Anchored at the coordinate origin: the translation is unchanged.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.scale = clamp_scale(self.scale * factor);
        }
    }

    /// Set the scale directly (pinch gestures), clamped.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.scale = clamp_scale(scale);
        }
    }

    /// `translation = start_translation + delta`.
    ///
    /// `start_translation` is captured once when the gesture begins so
    /// per-frame deltas never accumulate rounding drift.
    pub fn pan(&mut self, start_translation: Vec2, delta: Vec2) {
        self.translation = start_translation + delta;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}
