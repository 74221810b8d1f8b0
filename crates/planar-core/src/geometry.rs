//! Geometry helpers shared by hit-testing, snapping, manipulation and the
//! renderer.
//!
//! Everything here is a pure function of the elements passed in. Bounds are
//! recomputed on every call and never cached.

use crate::selection::ResizeHandle;
use crate::shapes::{Element, Shape};
use kurbo::{Point, Rect, Vec2};

/// Rotate `point` about `center` by `angle` radians.
pub fn rotate_point(point: Point, center: Point, angle: f64) -> Point {
    if angle == 0.0 {
        return point;
    }
    let (sin, cos) = angle.sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Rotate a vector by `angle` radians.
pub fn rotate_vec(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Corners of `rect` in nw, ne, se, sw order.
pub fn rect_corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// World-space corners of an element.
///
/// Box-like shapes yield their local box rotated about its center (nw, ne,
/// se, sw). Lines yield their two endpoints regardless of rotation. Groups
/// have no geometry of their own and yield nothing.
pub fn rotated_corners(element: &Element) -> Vec<Point> {
    match &element.shape {
        Shape::Line(line) => vec![line.start, line.end],
        Shape::Group(_) => Vec::new(),
        Shape::Rect(_) | Shape::Ellipse(_) | Shape::Path(_) | Shape::Text(_) | Shape::Image(_) => {
            let Some(local) = element.shape.local_box() else {
                return Vec::new();
            };
            let center = local.center();
            rect_corners(local)
                .into_iter()
                .map(|corner| rotate_point(corner, center, element.rotation))
                .collect()
        }
    }
}

/// Axis-aligned bounds of a point set.
pub fn points_bounds(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    let mut bounds = Rect::from_points(*first, *first);
    for p in rest {
        bounds = bounds.union_pt(*p);
    }
    Some(bounds)
}

/// Axis-aligned bounds of one element's rotated corners.
pub fn element_bounds(element: &Element) -> Option<Rect> {
    points_bounds(&rotated_corners(element))
}

/// Union of two optional boxes.
pub fn union_bounds(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Union of the rotated-corner extents of `elements`.
///
/// Groups and invisible elements are skipped; `None` when nothing remains.
pub fn axis_aligned_bounding_box<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
) -> Option<Rect> {
    elements
        .into_iter()
        .filter(|e| e.visible && !e.is_group())
        .fold(None, |acc, e| union_bounds(acc, element_bounds(e)))
}

/// A rectangle of `width` by `height` centered at `center`, rotated by
/// `rotation` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl OrientedBox {
    pub fn new(center: Point, width: f64, height: f64, rotation: f64) -> Self {
        Self {
            center,
            width,
            height,
            rotation,
        }
    }

    /// An unrotated box.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width(), rect.height(), 0.0)
    }

    /// Oriented box of a single non-group element.
    pub fn of_element(element: &Element) -> Option<Self> {
        let local = element.shape.local_box()?;
        Some(Self::new(
            local.center(),
            local.width(),
            local.height(),
            element.rotation,
        ))
    }

    /// The box before rotation.
    pub fn local_rect(&self) -> Rect {
        Rect::from_center_size(self.center, (self.width, self.height))
    }

    /// World-space corners in nw, ne, se, sw order.
    pub fn corners(&self) -> [Point; 4] {
        rect_corners(self.local_rect()).map(|p| rotate_point(p, self.center, self.rotation))
    }

    /// Inclusive containment test in the box's own frame.
    pub fn contains(&self, point: Point) -> bool {
        let local = rotate_point(point, self.center, -self.rotation);
        (local.x - self.center.x).abs() <= self.width / 2.0
            && (local.y - self.center.y).abs() <= self.height / 2.0
    }

    /// World-space position of a resize handle.
    pub fn handle_position(&self, handle: ResizeHandle) -> Point {
        let (fx, fy) = handle.factors();
        let local = Point::new(
            self.center.x + fx * self.width / 2.0,
            self.center.y + fy * self.height / 2.0,
        );
        rotate_point(local, self.center, self.rotation)
    }

    /// Axis-aligned bounds of the rotated corners.
    pub fn bounds(&self) -> Rect {
        let corners = self.corners();
        points_bounds(&corners).unwrap_or_else(|| Rect::from_center_size(self.center, (0.0, 0.0)))
    }
}

/// Oriented bounds of a group's flattened children in the group's frame.
///
/// Every child corner is rotated by `-group_rotation`, the extent is taken
/// there, and the extent's center is rotated back by `+group_rotation`.
/// Groups and invisible children contribute nothing.
pub fn group_oriented_bounding_box<'a>(
    children: impl IntoIterator<Item = &'a Element>,
    group_rotation: f64,
) -> Option<OrientedBox> {
    let local_points: Vec<Point> = children
        .into_iter()
        .filter(|e| e.visible && !e.is_group())
        .flat_map(rotated_corners)
        .map(|p| rotate_point(p, Point::ZERO, -group_rotation))
        .collect();
    let extent = points_bounds(&local_points)?;
    let center = rotate_point(extent.center(), Point::ZERO, group_rotation);
    Some(OrientedBox::new(
        center,
        extent.width(),
        extent.height(),
        group_rotation,
    ))
}

/// Distance from `point` to the segment `a`-`b`.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Projection parameter of `point` onto the infinite line through `a` and
/// `b`, together with the perpendicular distance.
pub fn project_onto_line(point: Point, a: Point, b: Point) -> (f64, f64) {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return (0.0, point.distance(a));
    }
    let t = (point - a).dot(ab) / len_sq;
    let dist = (point - a).cross(ab).abs() / len_sq.sqrt();
    (t, dist)
}

/// Inclusive point-in-rect test (kurbo's `contains` excludes the far edges).
pub fn rect_contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Whether two boxes overlap, touching edges included.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_4, PI};

    const EPS: f64 = 1e-9;

    fn assert_point_eq(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn test_rotate_point_quarter_turn() {
        let p = rotate_point(Point::new(10.0, 0.0), Point::ZERO, PI / 2.0);
        assert_point_eq(p, Point::new(0.0, 10.0));
    }

    #[test]
    fn test_rotation_round_trip() {
        for angle in [0.3, FRAC_PI_4, 2.0, -1.1, PI] {
            let rect = Element::rect(10.0, 20.0, 80.0, 40.0).with_rotation(angle);
            let ellipse = Element::ellipse(-30.0, 15.0, 25.0, 10.0).with_rotation(angle);
            for element in [rect, ellipse] {
                let local = element.shape.local_box().unwrap();
                let center = local.center();
                let corners = rotated_corners(&element);
                assert_eq!(corners.len(), 4);
                for (rotated, original) in corners.iter().zip(rect_corners(local)) {
                    assert_point_eq(rotate_point(*rotated, center, -angle), original);
                }
            }
        }
    }

    #[test]
    fn test_line_corners_are_endpoints() {
        let line = Element::line(Point::new(1.0, 2.0), Point::new(3.0, 4.0)).with_rotation(1.0);
        assert_eq!(
            rotated_corners(&line),
            vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]
        );
        assert!(rotated_corners(&Element::group()).is_empty());
    }

    #[test]
    fn test_bounding_box_union() {
        let a = Element::rect(0.0, 0.0, 50.0, 50.0);
        let b = Element::rect(100.0, 100.0, 50.0, 50.0);
        let bounds = axis_aligned_bounding_box([&a, &b]).unwrap();
        assert!((bounds.x0 - 0.0).abs() < EPS);
        assert!((bounds.y0 - 0.0).abs() < EPS);
        assert!((bounds.width() - 150.0).abs() < EPS);
        assert!((bounds.height() - 150.0).abs() < EPS);
    }

    #[test]
    fn test_bounding_box_empty_and_invisible() {
        assert!(axis_aligned_bounding_box(std::iter::empty()).is_none());

        let visible = Element::rect(0.0, 0.0, 50.0, 50.0);
        let hidden = Element::rect(100.0, 100.0, 50.0, 50.0).with_visible(false);
        let bounds = axis_aligned_bounding_box([&visible, &hidden]).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 50.0, 50.0));

        assert!(axis_aligned_bounding_box([&hidden]).is_none());
        assert!(axis_aligned_bounding_box([&Element::group()]).is_none());
    }

    #[test]
    fn test_rotated_rect_bounds_grow() {
        let rect = Element::rect(0.0, 0.0, 100.0, 100.0).with_rotation(FRAC_PI_4);
        let bounds = element_bounds(&rect).unwrap();
        let half_diag = 50.0 * 2f64.sqrt();
        assert!((bounds.x0 - (50.0 - half_diag)).abs() < EPS);
        assert!((bounds.x1 - (50.0 + half_diag)).abs() < EPS);
    }

    #[test]
    fn test_group_obb_round_trip() {
        let child = Element::rect(0.0, 0.0, 100.0, 100.0).with_rotation(FRAC_PI_4);
        let obb = group_oriented_bounding_box([&child], FRAC_PI_4).unwrap();
        assert!((obb.rotation - FRAC_PI_4).abs() < EPS);
        assert!((obb.width - 100.0).abs() < 1e-6);
        assert!((obb.height - 100.0).abs() < 1e-6);
        assert_point_eq(obb.center, Point::new(50.0, 50.0));
    }

    #[test]
    fn test_group_obb_unrotated_is_aabb() {
        let a = Element::rect(0.0, 0.0, 10.0, 10.0);
        let b = Element::rect(30.0, 20.0, 10.0, 10.0);
        let obb = group_oriented_bounding_box([&a, &b], 0.0).unwrap();
        assert_eq!(obb.local_rect(), Rect::new(0.0, 0.0, 40.0, 30.0));
        assert!(group_oriented_bounding_box(std::iter::empty(), 0.0).is_none());
    }

    #[test]
    fn test_oriented_box_contains_and_handles() {
        let obb = OrientedBox::new(Point::new(50.0, 50.0), 100.0, 20.0, PI / 2.0);
        assert!(obb.contains(Point::new(50.0, 95.0)));
        assert!(!obb.contains(Point::new(95.0, 50.0)));
        assert_point_eq(obb.handle_position(ResizeHandle::E), Point::new(50.0, 100.0));
        assert_point_eq(obb.handle_position(ResizeHandle::Nw), obb.corners()[0]);
    }

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < EPS);
        assert!((point_to_segment_dist(Point::new(13.0, 4.0), a, b) - 5.0).abs() < EPS);
        assert!((point_to_segment_dist(Point::new(3.0, 4.0), a, a) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_inclusive_contains() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(rect_contains_inclusive(rect, Point::new(100.0, 100.0)));
        assert!(!rect_contains_inclusive(rect, Point::new(100.1, 50.0)));
    }
}
