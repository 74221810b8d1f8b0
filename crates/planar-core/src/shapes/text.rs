//! Text shape.
//!
//! Glyph layout belongs to the host's font pipeline. The canvas only needs a
//! box, which comes from `bounds` when the host has measured the text and from
//! a per-character estimate otherwise.

use super::BoxGeometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Estimated horizontal advance per character, as a fraction of font size.
const ADVANCE_RATIO: f64 = 0.6;
/// Estimated ascent, as a fraction of font size.
const ASCENT_RATIO: f64 = 0.8;
/// Estimated descent, as a fraction of font size.
const DESCENT_RATIO: f64 = 0.2;

fn default_font_size() -> f64 {
    16.0
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_font_weight() -> u16 {
    400
}

/// A single-line text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Baseline origin.
    pub position: Point,
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    /// Measured bounds relative to `position`.
    #[serde(default)]
    pub bounds: Option<Rect>,
}

impl Text {
    /// Create a new text element.
    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            position,
            content: content.into(),
            font_size: default_font_size(),
            font_family: default_font_family(),
            font_weight: default_font_weight(),
            bounds: None,
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    /// Box relative to the baseline origin, measured or estimated.
    pub fn relative_bounds(&self) -> Rect {
        self.bounds.unwrap_or_else(|| self.estimated_bounds())
    }

    /// Metric estimate used when the host has not measured the text.
    pub fn estimated_bounds(&self) -> Rect {
        let chars = self.content.chars().count() as f64;
        Rect::new(
            0.0,
            -ASCENT_RATIO * self.font_size,
            ADVANCE_RATIO * self.font_size * chars,
            DESCENT_RATIO * self.font_size,
        )
    }
}

impl BoxGeometry for Text {
    fn local_box(&self) -> Rect {
        self.relative_bounds() + self.position.to_vec2()
    }

    fn set_local_box(&mut self, rect: Rect) {
        let current = self.relative_bounds();
        let sx = if current.width() > 0.0 {
            rect.width() / current.width()
        } else {
            1.0
        };
        let sy = if current.height() > 0.0 {
            rect.height() / current.height()
        } else {
            1.0
        };
        let scaled = Rect::new(
            current.x0 * sx,
            current.y0 * sy,
            current.x1 * sx,
            current.y1 * sy,
        );

        self.font_size *= sy;
        self.bounds = Some(scaled);
        self.position = Point::new(rect.x0 - scaled.x0, rect.y0 - scaled.y0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_bounds() {
        let text = Text::new(Point::new(0.0, 100.0), "Hello").with_font_size(20.0);
        let local = text.local_box();
        assert!((local.x0 - 0.0).abs() < 1e-9);
        assert!((local.y0 - 84.0).abs() < 1e-9);
        assert!((local.x1 - 60.0).abs() < 1e-9);
        assert!((local.y1 - 104.0).abs() < 1e-9);
    }

    #[test]
    fn test_measured_bounds_win() {
        let mut text = Text::new(Point::new(10.0, 10.0), "Hi");
        text.bounds = Some(Rect::new(0.0, -12.0, 30.0, 4.0));
        assert_eq!(text.local_box(), Rect::new(10.0, -2.0, 40.0, 14.0));
    }

    #[test]
    fn test_set_local_box_scales_font() {
        let mut text = Text::new(Point::ZERO, "abcd").with_font_size(10.0);
        text.set_local_box(Rect::new(50.0, 50.0, 98.0, 70.0));
        assert!((text.font_size - 20.0).abs() < 1e-9);
        let local = text.local_box();
        assert!((local.x0 - 50.0).abs() < 1e-9);
        assert!((local.y0 - 50.0).abs() < 1e-9);
        assert!((local.x1 - 98.0).abs() < 1e-9);
        assert!((local.y1 - 70.0).abs() < 1e-9);
    }
}
