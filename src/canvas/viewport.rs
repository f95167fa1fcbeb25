//! Pan and zoom of the flow canvas.

use egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 2.0;
/// Zoom change per wheel pixel while the zoom modifier is held.
const ZOOM_SENSITIVITY: f32 = 0.002;

/// Maps canvas coordinates (node positions) to screen coordinates:
/// `screen = origin + pan + canvas * zoom`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn canvas_to_screen(&self, origin: Pos2, canvas: Pos2) -> Pos2 {
        origin + self.pan + canvas.to_vec2() * self.zoom
    }

    pub fn screen_to_canvas(&self, origin: Pos2, screen: Pos2) -> Pos2 {
        ((screen - origin - self.pan) / self.zoom).to_pos2()
    }

    /// Sets the zoom, keeping the canvas point under `anchor` (screen
    /// coordinates) in place.
    pub fn zoom_at(&mut self, origin: Pos2, anchor: Pos2, zoom: f32) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let fixed = self.screen_to_canvas(origin, anchor);
        self.zoom = zoom;
        self.pan = anchor - origin - fixed.to_vec2() * zoom;
    }

    /// Handles one wheel event. `delta` follows the browser convention
    /// (positive y scrolls down). With the zoom modifier held it zooms around
    /// `pointer`; otherwise it pans.
    pub fn handle_wheel(&mut self, origin: Pos2, pointer: Pos2, delta: Vec2, zoom_modifier: bool) {
        if zoom_modifier {
            let factor = (-delta.y * ZOOM_SENSITIVITY).exp();
            self.zoom_at(origin, pointer, self.zoom * factor);
        } else {
            self.pan -= delta;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
