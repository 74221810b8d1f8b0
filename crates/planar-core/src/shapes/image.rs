//! Image shape. Pixel data lives with the renderer; the element only keeps
//! the resource locator.

use super::BoxGeometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An image placed in a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Top-left corner in unrotated local space.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Resource locator (URL, data URI or host-defined key).
    pub href: String,
}

impl Image {
    pub fn new(position: Point, width: f64, height: f64, href: impl Into<String>) -> Self {
        Self {
            position,
            width,
            height,
            href: href.into(),
        }
    }

    /// Width over height, or 1.0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

impl BoxGeometry for Image {
    fn local_box(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    fn set_local_box(&mut self, rect: Rect) {
        self.position = rect.origin();
        self.width = rect.width();
        self.height = rect.height();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_box() {
        let mut image = Image::new(Point::new(5.0, 5.0), 200.0, 100.0, "cat.png");
        assert!((image.aspect_ratio() - 2.0).abs() < f64::EPSILON);
        image.set_local_box(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(image.local_box(), Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(image.href, "cat.png");
    }
}
