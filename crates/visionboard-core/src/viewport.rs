//! Viewport module for pan/zoom transforms.
//!
//! The viewport is presentation state only. Nothing here reads or writes card data.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed scale.
pub const MIN_SCALE: f64 = 0.1;
/// Largest allowed scale.
pub const MAX_SCALE: f64 = 5.0;
/// Zoom step for one wheel notch or zoom button press.
pub const ZOOM_STEP: f64 = 1.1;

/// Viewport manages the view transform for the canvas.
///
/// Screen coordinates map to canvas coordinates as
/// `canvas = (screen - offset) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation (pan) in screen pixels.
    pub offset: Vec2,
    /// Current uniform scale, always within `MIN_SCALE..=MAX_SCALE`.
    scale: f64,
    /// Size of the visible area in screen pixels.
    pub screen_size: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            screen_size: Size::new(800.0, 600.0),
        }
    }
}

impl Viewport {
    /// Create a new viewport at `(0, 0)` with scale 1.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the scale directly, clamped to the allowed range.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = clamp_scale(scale);
    }

    /// Set the screen size of the visible area.
    pub fn set_screen_size(&mut self, width: f64, height: f64) {
        self.screen_size = Size::new(width.max(1.0), height.max(1.0));
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts canvas coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to canvas coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Convert a screen-space delta into canvas units.
    pub fn screen_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }

    /// Canvas point currently at the middle of the screen.
    pub fn center_in_canvas(&self) -> Point {
        self.screen_to_canvas(Point::new(
            self.screen_size.width / 2.0,
            self.screen_size.height / 2.0,
        ))
    }

    /// Pan by a raw screen-pixel delta. Not scaled by zoom.
    pub fn pan(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.offset += delta;
        }
    }

    /// Multiply the scale by `factor`, keeping `anchor` (screen coordinates) fixed.
    /// Without an anchor the middle of the screen stays fixed.
    pub fn zoom(&mut self, factor: f64, anchor: Option<Point>) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = anchor.unwrap_or_else(|| {
            Point::new(self.screen_size.width / 2.0, self.screen_size.height / 2.0)
        });

        let new_scale = clamp_scale(self.scale * factor);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let canvas_point = self.screen_to_canvas(anchor);
        self.scale = new_scale;

        // Adjust offset so canvas_point stays at anchor
        let new_screen = self.canvas_to_screen(canvas_point);
        self.offset += anchor - new_screen;
    }

    /// Zoom in by one step around the screen center.
    pub fn zoom_in(&mut self) {
        self.zoom(ZOOM_STEP, None);
    }

    /// Zoom out by one step around the screen center.
    pub fn zoom_out(&mut self) {
        self.zoom(1.0 / ZOOM_STEP, None);
    }

    /// Reset pan and zoom.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
    }
}

fn clamp_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}
