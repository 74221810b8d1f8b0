//! Line shape.

use kurbo::{Line as KurboLine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Decoration drawn at a line endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    #[default]
    None,
    /// Open arrowhead.
    Arrow,
    /// Filled triangle pointing away from the line.
    Triangle,
    /// Filled triangle pointing back along the line.
    ReversedTriangle,
    #[serde(alias = "round")]
    Circle,
    Diamond,
    Square,
}

/// A straight segment between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
    #[serde(default)]
    pub start_marker: Marker,
    #[serde(default)]
    pub end_marker: Marker,
}

impl Line {
    /// Create a new line.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            start_marker: Marker::None,
            end_marker: Marker::None,
        }
    }

    pub fn with_markers(mut self, start: Marker, end: Marker) -> Self {
        self.start_marker = start;
        self.end_marker = end;
        self
    }

    /// Get the length of the line.
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Get the midpoint of the line.
    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }

    /// Direction angle from start to end, in radians.
    pub fn angle(&self) -> f64 {
        (self.end.y - self.start.y).atan2(self.end.x - self.start.x)
    }

    /// Axis-aligned bounds of the two endpoints.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    /// Get as a kurbo Line.
    pub fn as_kurbo(&self) -> KurboLine {
        KurboLine::new(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_creation() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!((line.length() - 100.0).abs() < f64::EPSILON);
        assert_eq!(line.start_marker, Marker::None);
    }

    #[test]
    fn test_midpoint_and_angle() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        let mid = line.midpoint();
        assert!((mid.x - 50.0).abs() < f64::EPSILON);
        assert!((mid.y - 50.0).abs() < f64::EPSILON);
        assert!((line.angle() - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_bounds() {
        let line = Line::new(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        let bounds = line.bounds();
        assert!((bounds.x0 - 10.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - 20.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 50.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_marker_alias() {
        let marker: Marker = serde_json::from_str("\"round\"").unwrap();
        assert_eq!(marker, Marker::Circle);
        let marker: Marker = serde_json::from_str("\"reversed_triangle\"").unwrap();
        assert_eq!(marker, Marker::ReversedTriangle);
    }
}
