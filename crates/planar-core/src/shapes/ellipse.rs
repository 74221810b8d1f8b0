//! Ellipse shape.

use super::BoxGeometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An ellipse shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center point.
    pub center: Point,
    /// Horizontal radius.
    pub radius_x: f64,
    /// Vertical radius.
    pub radius_y: f64,
}

impl Ellipse {
    /// Create a new ellipse.
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
        }
    }

    /// Create a circle.
    pub fn circle(center: Point, radius: f64) -> Self {
        Self::new(center, radius, radius)
    }

    /// Create an ellipse from a bounding rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }

    /// Whether a point given relative to the center, in the unrotated frame,
    /// lies inside or on the ellipse.
    pub fn contains_local(&self, offset_x: f64, offset_y: f64) -> bool {
        if self.radius_x <= 0.0 || self.radius_y <= 0.0 {
            return false;
        }
        let nx = offset_x / self.radius_x;
        let ny = offset_y / self.radius_y;
        nx * nx + ny * ny <= 1.0
    }
}

impl BoxGeometry for Ellipse {
    fn local_box(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }

    fn set_local_box(&mut self, rect: Rect) {
        *self = Self::from_rect(rect);
    }
}
