//! Rectangle shape.

use super::BoxGeometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Top-left corner in unrotated local space.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Horizontal corner radius.
    #[serde(default)]
    pub rx: Option<f64>,
    /// Vertical corner radius (defaults to `rx`).
    #[serde(default)]
    pub ry: Option<f64>,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            rx: None,
            ry: None,
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let min_x = p1.x.min(p2.x);
        let min_y = p1.y.min(p2.y);
        let width = (p2.x - p1.x).abs();
        let height = (p2.y - p1.y).abs();

        Self::new(Point::new(min_x, min_y), width, height)
    }

    pub fn with_radius(mut self, rx: f64, ry: f64) -> Self {
        self.rx = Some(rx);
        self.ry = Some(ry);
        self
    }

    /// Corner radii clamped to half the side lengths. `(0, 0)` when square.
    pub fn corner_radii(&self) -> (f64, f64) {
        let rx = self.rx.or(self.ry).unwrap_or(0.0).max(0.0);
        let ry = self.ry.or(self.rx).unwrap_or(0.0).max(0.0);
        (rx.min(self.width / 2.0), ry.min(self.height / 2.0))
    }

    pub fn is_rounded(&self) -> bool {
        let (rx, ry) = self.corner_radii();
        rx > 0.0 && ry > 0.0
    }
}

impl BoxGeometry for Rectangle {
    fn local_box(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    fn set_local_box(&mut self, rect: Rect) {
        self.position = Point::new(rect.x0, rect.y0);
        self.width = rect.width();
        self.height = rect.height();
    }
}
