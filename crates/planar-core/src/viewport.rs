//! Viewport transform for pan/zoom.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed scale.
pub const MIN_SCALE: f64 = 0.1;
/// Largest allowed scale.
pub const MAX_SCALE: f64 = 10.0;
/// Factor applied by one zoom-in/zoom-out step.
pub const ZOOM_STEP: f64 = 1.2;

/// World-to-screen map: `screen = world * scale + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan, in screen pixels.
    pub x: f64,
    /// Vertical pan, in screen pixels.
    pub y: f64,
    /// Zoom factor.
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self {
            x,
            y,
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
        }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// World to screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset()) * Affine::scale(self.scale)
    }

    /// Screen to world.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset())
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.x) / self.scale,
            (screen_point.y - self.y) / self.scale,
        )
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.scale + self.x,
            world_point.y * self.scale + self.y,
        )
    }

    /// Convert a screen-space length (e.g. a pixel tolerance) to world units.
    pub fn screen_to_world_len(&self, len: f64) -> f64 {
        len / self.scale
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Zoom by `factor`, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        self.zoom_to_at(screen_point, self.scale * factor);
    }

    /// Set the scale, keeping the given screen point fixed.
    pub fn zoom_to_at(&mut self, screen_point: Point, scale: f64) {
        let new_scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.scale = new_scale;

        let new_screen = self.world_to_screen(world_point);
        self.x += screen_point.x - new_screen.x;
        self.y += screen_point.y - new_screen.y;
    }

    /// One step in, about the center of a viewport of `size` pixels.
    pub fn zoom_in(&mut self, size: Size) {
        self.zoom_at(size_center(size), ZOOM_STEP);
    }

    /// One step out, about the center of a viewport of `size` pixels.
    pub fn zoom_out(&mut self, size: Size) {
        self.zoom_at(size_center(size), 1.0 / ZOOM_STEP);
    }

    /// Jump to an absolute scale about the viewport center.
    pub fn zoom_to(&mut self, scale: f64, size: Size) {
        self.zoom_to_at(size_center(size), scale);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fit and center `bounds` inside a viewport of `size` pixels.
    pub fn fit_to_bounds(&mut self, bounds: Rect, size: Size, padding: f64) {
        if bounds.width() <= 0.0 && bounds.height() <= 0.0 {
            self.reset();
            return;
        }

        let padded = Size::new(
            (size.width - padding * 2.0).max(1.0),
            (size.height - padding * 2.0).max(1.0),
        );

        let scale_x = if bounds.width() > 0.0 {
            padded.width / bounds.width()
        } else {
            f64::INFINITY
        };
        let scale_y = if bounds.height() > 0.0 {
            padded.height / bounds.height()
        } else {
            f64::INFINITY
        };
        self.scale = scale_x.min(scale_y).clamp(MIN_SCALE, MAX_SCALE);

        let bounds_center = bounds.center();
        let view_center = size_center(size);
        self.x = view_center.x - bounds_center.x * self.scale;
        self.y = view_center.y - bounds_center.y * self.scale;
    }

    /// World-space rectangle covered by a viewport of `size` pixels.
    pub fn visible_world_rect(&self, size: Size) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(size.width, size.height));
        Rect::from_points(top_left, bottom_right)
    }
}

fn size_center(size: Size) -> Point {
    Point::new(size.width / 2.0, size.height / 2.0)
}
