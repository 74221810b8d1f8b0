//! Free-form path shape backed by SVG path data.

use super::BoxGeometry;
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};

/// A path described by an SVG `d` string in its own local space.
///
/// `bounds` is a cache of the local-space bounding box of `d`. Writing `d`
/// directly leaves it stale; go through [`PathShape::set_d`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathShape {
    /// Offset of the local space into the world.
    pub position: Point,
    /// SVG path commands.
    pub d: String,
    /// Local-space bounds of `d`.
    pub bounds: Rect,
}

impl PathShape {
    /// Create a path at the origin, computing its bounds.
    pub fn new(d: impl Into<String>) -> Self {
        let d = d.into();
        let bounds = Self::compute_bounds(&d);
        Self {
            position: Point::ZERO,
            d,
            bounds,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Replace the path data and recompute the cached bounds.
    pub fn set_d(&mut self, d: impl Into<String>) {
        self.d = d.into();
        self.bounds = Self::compute_bounds(&self.d);
    }

    /// Parse `d`. Malformed data yields `None`.
    pub fn parse(&self) -> Option<BezPath> {
        BezPath::from_svg(&self.d).ok()
    }

    fn compute_bounds(d: &str) -> Rect {
        match BezPath::from_svg(d) {
            Ok(path) if !path.elements().is_empty() => path.bounding_box(),
            Ok(_) => Rect::ZERO,
            Err(err) => {
                log::warn!("Unparseable path data {d:?}: {err}");
                Rect::ZERO
            }
        }
    }
}

impl BoxGeometry for PathShape {
    fn local_box(&self) -> Rect {
        self.bounds + self.position.to_vec2()
    }

    fn set_local_box(&mut self, rect: Rect) {
        let origin = self.bounds.origin();
        let sx = if self.bounds.width() > 0.0 {
            rect.width() / self.bounds.width()
        } else {
            1.0
        };
        let sy = if self.bounds.height() > 0.0 {
            rect.height() / self.bounds.height()
        } else {
            1.0
        };

        if let Some(path) = self.parse() {
            let scale = Affine::translate(origin.to_vec2())
                * Affine::scale_non_uniform(sx, sy)
                * Affine::translate(-origin.to_vec2());
            let scaled = scale * path;
            self.d = scaled.to_svg();
            self.bounds = if scaled.elements().is_empty() {
                Rect::ZERO
            } else {
                scaled.bounding_box()
            };
        }

        let current = self.bounds.origin();
        self.position = rect.origin() - Vec2::new(current.x, current.y);
    }
}
