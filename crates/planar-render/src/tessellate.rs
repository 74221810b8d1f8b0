//! Turning shapes into triangles.
//!
//! Everything here is pure: the same input always yields the same vertices in
//! the same order, which keeps re-rendered frames identical.

use kurbo::{Affine, BezPath, PathEl, Point, Rect, Vec2};
use planar_core::shapes::Marker;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Fewest segments used for any closed curve.
const MIN_ARC_SEGMENTS: usize = 8;
const MAX_ARC_SEGMENTS: usize = 256;
/// Dash runs that would split into more pieces than this are drawn solid.
pub const MAX_DASHES: usize = 10_000;

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, point: Point) -> u32 {
        self.vertices.push(point);
        (self.vertices.len() - 1) as u32
    }

    pub fn push_triangle(&mut self, a: Point, b: Point, c: Point) {
        let a = self.push_vertex(a);
        let b = self.push_vertex(b);
        let c = self.push_vertex(c);
        self.indices.extend([a, b, c]);
    }

    /// Two triangles `a b c` and `a c d`.
    pub fn push_quad(&mut self, a: Point, b: Point, c: Point, d: Point) {
        let a = self.push_vertex(a);
        let b = self.push_vertex(b);
        let c = self.push_vertex(c);
        let d = self.push_vertex(d);
        self.indices.extend([a, b, c, a, c, d]);
    }

    /// A triangle fan around `center` over a closed `ring`.
    pub fn push_fan(&mut self, center: Point, ring: &[Point]) {
        if ring.len() < 2 {
            return;
        }
        let c = self.push_vertex(center);
        let first = self.vertices.len() as u32;
        for point in ring {
            self.push_vertex(*point);
        }
        let n = ring.len() as u32;
        for i in 0..n {
            self.indices.extend([c, first + i, first + (i + 1) % n]);
        }
    }

    /// Ear-clipped simple polygon.
    pub fn push_polygon(&mut self, points: &[Point]) {
        let base = self.vertices.len() as u32;
        let triangles = triangulate(points);
        if triangles.is_empty() {
            return;
        }
        self.vertices.extend_from_slice(points);
        for [a, b, c] in triangles {
            self.indices
                .extend([base + a as u32, base + b as u32, base + c as u32]);
        }
    }

    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    pub fn transform(&mut self, affine: Affine) {
        for vertex in &mut self.vertices {
            *vertex = affine * *vertex;
        }
    }

    pub fn transformed(mut self, affine: Affine) -> Self {
        self.transform(affine);
        self
    }

    /// Triangles as point triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Point; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.vertices[t[0] as usize],
                self.vertices[t[1] as usize],
                self.vertices[t[2] as usize],
            ]
        })
    }

    pub fn bounds(&self) -> Option<Rect> {
        let mut points = self.indices.iter().map(|i| self.vertices[*i as usize]);
        let first = points.next()?;
        Some(points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p)))
    }
}

/// An open or closed run of points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Segment count that keeps a circle of `radius` within `tolerance`.
pub fn arc_segments(radius: f64, tolerance: f64) -> usize {
    if radius <= tolerance || tolerance <= 0.0 {
        return MIN_ARC_SEGMENTS;
    }
    let step = 2.0 * (1.0 - tolerance / radius).acos();
    let n = (TAU / step).ceil() as usize;
    n.clamp(MIN_ARC_SEGMENTS, MAX_ARC_SEGMENTS)
}

pub fn fill_rect(rect: Rect) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.push_quad(
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    );
    mesh
}

/// Rounded rectangle: three straight-edge quads plus a fan per corner.
pub fn fill_rounded_rect(rect: Rect, rx: f64, ry: f64, tolerance: f64) -> Mesh {
    if rx <= 0.0 || ry <= 0.0 {
        return fill_rect(rect);
    }
    let mut mesh = Mesh::new();
    let quads = [
        Rect::new(rect.x0 + rx, rect.y0, rect.x1 - rx, rect.y1),
        Rect::new(rect.x0, rect.y0 + ry, rect.x0 + rx, rect.y1 - ry),
        Rect::new(rect.x1 - rx, rect.y0 + ry, rect.x1, rect.y1 - ry),
    ];
    for quad in quads {
        if quad.width() > 0.0 && quad.height() > 0.0 {
            mesh.append(&fill_rect(quad));
        }
    }
    let steps = corner_steps(rx.max(ry), tolerance);
    for (center, start) in corner_arcs(rect, rx, ry) {
        let arc = arc_points(center, rx, ry, start, FRAC_PI_2, steps);
        let c = mesh.push_vertex(center);
        let first = mesh.vertices.len() as u32;
        for point in &arc {
            mesh.push_vertex(*point);
        }
        for i in 0..(arc.len() as u32 - 1) {
            mesh.indices.extend([c, first + i, first + i + 1]);
        }
    }
    mesh
}

/// Closed outline of a rounded rectangle, clockwise on screen from the
/// top-left arc.
pub fn rounded_rect_outline(rect: Rect, rx: f64, ry: f64, tolerance: f64) -> Vec<Point> {
    if rx <= 0.0 || ry <= 0.0 {
        return rect_outline(rect);
    }
    let steps = corner_steps(rx.max(ry), tolerance);
    corner_arcs(rect, rx, ry)
        .into_iter()
        .flat_map(|(center, start)| arc_points(center, rx, ry, start, FRAC_PI_2, steps))
        .collect()
}

pub fn rect_outline(rect: Rect) -> Vec<Point> {
    vec![
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

// nw, ne, se, sw with the angle each quarter arc starts at (y points down).
fn corner_arcs(rect: Rect, rx: f64, ry: f64) -> [(Point, f64); 4] {
    [
        (Point::new(rect.x0 + rx, rect.y0 + ry), PI),
        (Point::new(rect.x1 - rx, rect.y0 + ry), 1.5 * PI),
        (Point::new(rect.x1 - rx, rect.y1 - ry), 0.0),
        (Point::new(rect.x0 + rx, rect.y1 - ry), FRAC_PI_2),
    ]
}

fn corner_steps(radius: f64, tolerance: f64) -> usize {
    (arc_segments(radius, tolerance) / 4).max(2)
}

fn arc_points(center: Point, rx: f64, ry: f64, start: f64, sweep: f64, steps: usize) -> Vec<Point> {
    (0..=steps)
        .map(|i| {
            let angle = start + sweep * i as f64 / steps as f64;
            Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
        })
        .collect()
}

/// Points around an ellipse, without repeating the first.
pub fn ellipse_points(center: Point, rx: f64, ry: f64, tolerance: f64) -> Vec<Point> {
    let segments = arc_segments(rx.max(ry), tolerance);
    let mut points = arc_points(center, rx, ry, 0.0, TAU, segments);
    points.pop();
    points
}

pub fn fill_ellipse(center: Point, rx: f64, ry: f64, tolerance: f64) -> Mesh {
    let mut mesh = Mesh::new();
    if rx > 0.0 && ry > 0.0 {
        mesh.push_fan(center, &ellipse_points(center, rx, ry, tolerance));
    }
    mesh
}

pub fn fill_polygon(points: &[Point]) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.push_polygon(points);
    mesh
}

/// Quad strip along `points` with bevel joins.
pub fn stroke_polyline(points: &[Point], width: f64, closed: bool) -> Mesh {
    let mut mesh = Mesh::new();
    if points.len() < 2 || width <= 0.0 {
        return mesh;
    }
    let half = width / 2.0;

    let mut segments: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && points.len() > 2 {
        segments.push((points[points.len() - 1], points[0]));
    }
    let normals: Vec<Option<Vec2>> = segments
        .iter()
        .map(|(a, b)| {
            let dir = *b - *a;
            let len = dir.hypot();
            (len > 0.0).then(|| Vec2::new(-dir.y, dir.x) * (half / len))
        })
        .collect();

    for ((a, b), normal) in segments.iter().zip(&normals) {
        if let Some(n) = normal {
            mesh.push_quad(*a + *n, *b + *n, *b - *n, *a - *n);
        }
    }

    let join_count = if closed { segments.len() } else { segments.len() - 1 };
    for i in 0..join_count {
        let next = (i + 1) % segments.len();
        if let (Some(n1), Some(n2)) = (normals[i], normals[next]) {
            let p = segments[i].1;
            mesh.push_triangle(p, p + n1, p + n2);
            mesh.push_triangle(p, p - n1, p - n2);
        }
    }
    mesh
}

/// Split a polyline into dashes following an SVG-style dash array.
///
/// Odd-length patterns repeat twice. Patterns that are empty, negative or sum
/// to zero yield the input unchanged, as do patterns so fine that the run
/// would split into more than [`MAX_DASHES`] pieces.
pub fn dash_polyline(points: &[Point], pattern: &[f64]) -> Vec<Vec<Point>> {
    let total: f64 = pattern.iter().sum();
    if points.len() < 2
        || pattern.is_empty()
        || pattern.iter().any(|d| *d < 0.0 || !d.is_finite())
        || total <= 0.0
    {
        return vec![points.to_vec()];
    }
    let pattern: Vec<f64> = if pattern.len() % 2 == 1 {
        pattern.iter().chain(pattern).copied().collect()
    } else {
        pattern.to_vec()
    };
    let run_length: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    let cycle: f64 = pattern.iter().sum();
    let pieces = run_length / cycle * (pattern.len() / 2) as f64;
    if pieces > MAX_DASHES as f64 {
        return vec![points.to_vec()];
    }

    let mut dashes = Vec::new();
    let mut current = vec![points[0]];
    let mut on = true;
    let mut index = 0;
    let mut remaining = pattern[0];

    for segment in points.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let len = a.distance(b);
        if len <= 0.0 {
            continue;
        }
        let mut pos = 0.0;
        loop {
            let left = len - pos;
            if remaining > left {
                remaining -= left;
                if on {
                    current.push(b);
                }
                break;
            }
            pos += remaining;
            let p = a.lerp(b, pos / len);
            if on {
                current.push(p);
                if current.len() >= 2 {
                    dashes.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            } else {
                current.push(p);
            }
            on = !on;
            index = (index + 1) % pattern.len();
            remaining = pattern[index];
        }
    }
    if on {
        dashes.push(current);
    }
    // Zero-length pieces appear where a dash boundary meets a vertex.
    dashes.retain(|dash| dash.windows(2).any(|w| w[0] != w[1]));
    dashes
}

/// Size of an endpoint marker for a stroke of `stroke_width`.
pub fn marker_size(stroke_width: f64) -> f64 {
    (stroke_width * 4.0).max(8.0)
}

/// Endpoint decoration at `tip`, pointing along `direction` (radians, away
/// from the line).
pub fn marker_mesh(marker: Marker, tip: Point, direction: f64, stroke_width: f64, tolerance: f64) -> Mesh {
    let size = marker_size(stroke_width);
    let along = Vec2::from_angle(direction);
    let across = Vec2::new(-along.y, along.x);
    let back = tip - along * size;
    let half = across * (size / 2.0);

    match marker {
        Marker::None => Mesh::new(),
        Marker::Arrow => stroke_polyline(&[back + half, tip, back - half], stroke_width.max(1.0), false),
        Marker::Triangle => fill_polygon(&[tip, back + half, back - half]),
        Marker::ReversedTriangle => fill_polygon(&[tip + half, back, tip - half]),
        Marker::Circle => fill_ellipse(tip, size / 2.0, size / 2.0, tolerance),
        Marker::Diamond => {
            let mid = tip - along * (size / 2.0);
            fill_polygon(&[tip, mid + half, back, mid - half])
        }
        Marker::Square => {
            let a = along * (size / 2.0);
            fill_polygon(&[tip + a + half, tip - a + half, tip - a - half, tip + a - half])
        }
    }
}

/// Flatten a path into polylines, one per subpath.
pub fn flatten_path(path: &BezPath, tolerance: f64) -> Vec<Polyline> {
    fn finish(lines: &mut Vec<Polyline>, current: &mut Polyline) {
        let line = std::mem::take(current);
        if line.points.len() >= 2 {
            lines.push(line);
        }
    }

    let mut lines = Vec::new();
    let mut current = Polyline::default();
    kurbo::flatten(path, tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            finish(&mut lines, &mut current);
            current.points.push(p);
        }
        PathEl::LineTo(p) => current.points.push(p),
        PathEl::ClosePath => {
            let start = current.points.first().copied();
            current.closed = true;
            finish(&mut lines, &mut current);
            // Drawing after a close continues from the subpath start.
            current.points.extend(start);
        }
        _ => {}
    });
    finish(&mut lines, &mut current);
    lines
}

/// Fill every subpath as its own polygon; open subpaths close implicitly.
pub fn fill_polylines(lines: &[Polyline]) -> Mesh {
    let mut mesh = Mesh::new();
    for line in lines.iter().filter(|l| l.points.len() >= 3) {
        mesh.push_polygon(&line.points);
    }
    mesh
}

pub fn stroke_polylines(lines: &[Polyline], width: f64) -> Mesh {
    let mut mesh = Mesh::new();
    for line in lines {
        mesh.append(&stroke_polyline(&line.points, width, line.closed));
    }
    mesh
}

fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = (b - a).cross(p - a);
    let d2 = (c - b).cross(p - b);
    let d3 = (a - c).cross(p - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Ear-clipping triangulation of a simple polygon. Returns index triples
/// into `points`. Self-intersecting input falls back to a fan for whatever
/// cannot be clipped. Cost grows with the cube of the vertex count in the
/// worst case; [`crate::cache::PathCache`] keeps path inputs bounded.
pub fn triangulate(points: &[Point]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let mut ring: Vec<usize> = (0..n).collect();
    if signed_area(points) < 0.0 {
        ring.reverse();
    }

    let mut triangles = Vec::with_capacity(n - 2);
    while ring.len() > 3 {
        let m = ring.len();
        let ear = (0..m).find(|&i| {
            let (prev, cur, next) = (ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]);
            let (a, b, c) = (points[prev], points[cur], points[next]);
            if (b - a).cross(c - b) <= 0.0 {
                return false;
            }
            !ring
                .iter()
                .filter(|j| **j != prev && **j != cur && **j != next)
                .any(|j| point_in_triangle(points[*j], a, b, c))
        });
        match ear {
            Some(i) => {
                triangles.push([ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]]);
                ring.remove(i);
            }
            None => {
                for k in 1..m - 1 {
                    triangles.push([ring[0], ring[k], ring[k + 1]]);
                }
                return triangles;
            }
        }
    }
    triangles.push([ring[0], ring[1], ring[2]]);
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn mesh_area(mesh: &Mesh) -> f64 {
        mesh.triangles()
            .map(|[a, b, c]| ((b - a).cross(c - a) / 2.0).abs())
            .sum()
    }

    #[test]
    fn test_fill_rect() {
        let mesh = fill_rect(Rect::new(0.0, 0.0, 10.0, 5.0));
        assert_eq!(mesh.triangle_count(), 2);
        assert!((mesh_area(&mesh) - 50.0).abs() < EPS);
        assert_eq!(mesh.bounds(), Some(Rect::new(0.0, 0.0, 10.0, 5.0)));
    }

    #[test]
    fn test_rounded_rect_area() {
        let rect = Rect::new(0.0, 0.0, 100.0, 60.0);
        let r = 10.0;
        let mesh = fill_rounded_rect(rect, r, r, 0.01);
        let expected = 100.0 * 60.0 - (4.0 - PI) * r * r;
        assert!((mesh_area(&mesh) - expected).abs() < 0.5);
        assert_eq!(mesh.bounds(), Some(rect));
    }

    #[test]
    fn test_ellipse_area() {
        let mesh = fill_ellipse(Point::new(0.0, 0.0), 40.0, 20.0, 0.01);
        assert!((mesh_area(&mesh) - PI * 800.0).abs() < 2.0);
        assert!(fill_ellipse(Point::ZERO, 0.0, 5.0, 0.1).is_empty());
    }

    #[test]
    fn test_triangulate_concave() {
        // L-shape, area 3.
        let points = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let mesh = fill_polygon(&points);
        assert_eq!(mesh.triangle_count(), 4);
        assert!((mesh_area(&mesh) - 3.0).abs() < EPS);

        // Same polygon wound the other way.
        let mut reversed = points.to_vec();
        reversed.reverse();
        assert!((mesh_area(&fill_polygon(&reversed)) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_stroke_polyline() {
        let mesh = stroke_polyline(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 2.0, false);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.bounds(), Some(Rect::new(0.0, -1.0, 10.0, 1.0)));

        let square = rect_outline(Rect::new(0.0, 0.0, 10.0, 10.0));
        let closed = stroke_polyline(&square, 2.0, true);
        // Four segment quads plus two bevel triangles per corner.
        assert_eq!(closed.triangle_count(), 4 * 2 + 4 * 2);
        assert!(stroke_polyline(&square, 0.0, true).is_empty());
    }

    #[test]
    fn test_dashes() {
        let line = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let dashes = dash_polyline(&line, &[3.0, 2.0]);
        assert_eq!(dashes.len(), 2);
        assert_eq!(dashes[0], vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)]);
        assert_eq!(dashes[1], vec![Point::new(5.0, 0.0), Point::new(8.0, 0.0)]);

        // Dashes carry over polyline corners.
        let bent = [Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(2.0, 2.0)];
        let dashes = dash_polyline(&bent, &[3.0, 10.0]);
        assert_eq!(
            dashes,
            vec![vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(2.0, 1.0)]]
        );

        assert_eq!(dash_polyline(&line, &[0.0, 0.0]), vec![line.to_vec()]);
        assert_eq!(dash_polyline(&line, &[]).len(), 1);
    }

    #[test]
    fn test_tiny_dashes_draw_solid() {
        let line = [Point::new(0.0, 0.0), Point::new(1000.0, 0.0)];
        assert_eq!(dash_polyline(&line, &[1e-4, 1e-4]), vec![line.to_vec()]);

        // Just under the limit still dashes.
        let cycle = 1000.0 / MAX_DASHES as f64;
        let dashes = dash_polyline(&line, &[cycle * 0.6, cycle * 0.6]);
        assert!(dashes.len() > 1 && dashes.len() <= MAX_DASHES);
    }

    #[test]
    fn test_markers() {
        let tip = Point::new(10.0, 0.0);
        assert!(marker_mesh(Marker::None, tip, 0.0, 2.0, 0.1).is_empty());
        for marker in [
            Marker::Arrow,
            Marker::Triangle,
            Marker::ReversedTriangle,
            Marker::Circle,
            Marker::Diamond,
            Marker::Square,
        ] {
            let mesh = marker_mesh(marker, tip, 0.0, 2.0, 0.1);
            assert!(!mesh.is_empty(), "{marker:?}");
        }
        // A triangle pointing along +x sits behind its tip.
        let bounds = marker_mesh(Marker::Triangle, tip, 0.0, 2.0, 0.1).bounds().unwrap();
        assert!((bounds.x1 - 10.0).abs() < EPS);
        assert!((bounds.x0 - 2.0).abs() < EPS);
    }

    #[test]
    fn test_flatten_path() {
        let path = BezPath::from_svg("M0 0 L10 0 L10 10 Z M20 20 L30 20").unwrap();
        let lines = flatten_path(&path, 0.1);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].closed);
        assert_eq!(lines[0].points.len(), 3);
        assert!(!lines[1].closed);
        assert!((mesh_area(&fill_polylines(&lines)) - 50.0).abs() < EPS);

        let curve = BezPath::from_svg("M0 0 Q50 100 100 0").unwrap();
        let lines = flatten_path(&curve, 0.1);
        assert!(lines[0].points.len() > 3);
    }

    #[test]
    fn test_arc_segments() {
        assert_eq!(arc_segments(0.01, 0.25), MIN_ARC_SEGMENTS);
        assert!(arc_segments(1000.0, 0.25) > arc_segments(10.0, 0.25));
        assert_eq!(arc_segments(1e12, 1e-9), MAX_ARC_SEGMENTS);
    }
}
