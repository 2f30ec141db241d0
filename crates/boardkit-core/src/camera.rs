//! Camera module for pan/zoom/rotation transforms.
//!
//! World to view is `center + R(rotation) * (zoom * (world + offset))`,
//! where `center` is the middle of the drawing surface. View to world is the
//! exact inverse.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
pub const DEFAULT_MAX_ZOOM: f64 = 10.0;

/// Camera manages the view transform for the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Pan offset, added to world coordinates before scaling.
    pub offset: Vec2,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f64,
    /// Whole-board rotation in degrees about the surface center.
    pub rotation: f64,
    /// Size of the drawing surface in pixels.
    pub viewport: Size,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            rotation: 0.0,
            viewport: Size::ZERO,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    /// Center of the drawing surface in view coordinates.
    pub fn center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Set the board rotation in degrees.
    pub fn set_rotation(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.rotation = degrees % 360.0;
        }
    }

    /// Set the zoom directly, clamped to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Get the affine transform for rendering (world to view).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale(self.zoom)
            * Affine::translate(self.offset)
    }

    /// Get the inverse transform for input handling (view to world).
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(-self.offset)
            * Affine::scale(1.0 / self.zoom)
            * Affine::rotate(-self.rotation.to_radians())
            * Affine::translate(-self.center().to_vec2())
    }

    /// Convert a view point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to view coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan by a raw pixel delta. The delta is applied to the offset as is,
    /// not converted to world units.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping the world point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;

        // Solve world_to_screen(world_point) == screen_point for the offset.
        let unrotated = Affine::rotate(-self.rotation.to_radians())
            * (screen_point - self.center()).to_point();
        self.offset = unrotated.to_vec2() / self.zoom - world_point.to_vec2();
    }

    /// Reset pan, zoom and rotation.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
        self.rotation = 0.0;
    }

    /// Fit the camera to show the given bounding box, centered.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        if bounds.is_zero_area() || self.viewport.is_zero_area() {
            self.offset = -bounds.center().to_vec2();
            return;
        }

        let padded = Size::new(
            (self.viewport.width - padding * 2.0).max(1.0),
            (self.viewport.height - padding * 2.0).max(1.0),
        );
        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);
        self.offset = -bounds.center().to_vec2();
    }
}
