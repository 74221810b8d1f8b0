//! Snapping of dragged bounds to the grid, to other elements and to their
//! vertices.
//!
//! [`snap_bounds`] is a pure function re-run on every drag tick. Passes run in
//! increasing priority: grid, object alignment, equal-gap distribution, then
//! vertices. Each axis keeps its own best candidate, except vertex snaps which
//! always move both axes together.

use crate::canvas::Document;
use crate::geometry::rotated_corners;
use crate::settings::SnapSettings;
use crate::shapes::ElementId;
use kurbo::{Point, Rect, Vec2};
use std::collections::HashSet;

/// Angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;

/// Which coordinate a guide constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal position; alignment guides are vertical lines.
    X,
    /// Vertical position; alignment guides are horizontal lines.
    Y,
}

/// Transient visual hint produced while dragging.
#[derive(Debug, Clone, PartialEq)]
pub enum SmartGuide {
    /// A line at `position` on `axis`, running from `start` to `end` along
    /// the other axis.
    Alignment {
        axis: Axis,
        position: f64,
        start: f64,
        end: f64,
    },
    /// A gap indicator from `from` to `to` on `axis`, drawn at `cross` on
    /// the other axis.
    Spacing {
        axis: Axis,
        from: f64,
        to: f64,
        cross: f64,
        gap: f64,
    },
    /// A snapped vertex.
    Vertex { point: Point },
}

impl SmartGuide {
    /// Numeric label for spacing guides.
    pub fn label(&self) -> Option<String> {
        match self {
            SmartGuide::Spacing { gap, .. } => Some(format_gap(*gap)),
            _ => None,
        }
    }

    pub fn is_spacing(&self) -> bool {
        matches!(self, SmartGuide::Spacing { .. })
    }

    pub fn is_alignment_on(&self, on: Axis) -> bool {
        matches!(self, SmartGuide::Alignment { axis, .. } if *axis == on)
    }
}

fn format_gap(gap: f64) -> String {
    let rounded = (gap * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

/// Something the dragged bounds may snap to.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCandidate {
    pub id: ElementId,
    pub bounds: Rect,
    /// Corner and center points used by the vertex pass.
    pub vertices: Vec<Point>,
}

impl SnapCandidate {
    /// A candidate whose vertices are its box corners and center.
    pub fn from_bounds(id: ElementId, bounds: Rect) -> Self {
        let mut vertices = crate::geometry::rect_corners(bounds).to_vec();
        vertices.push(bounds.center());
        Self {
            id,
            bounds,
            vertices,
        }
    }
}

/// Result of a snap operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    /// Correction to add to the raw drag position.
    pub delta: Vec2,
    pub guides: Vec<SmartGuide>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.delta != Vec2::ZERO || !self.guides.is_empty()
    }
}

#[derive(Debug, Clone)]
struct AxisSnap {
    delta: f64,
    distance: f64,
    guides: Vec<SmartGuide>,
}

fn beats(best: &Option<AxisSnap>, distance: f64) -> bool {
    best.as_ref().is_none_or(|b| distance < b.distance)
}

fn axis_range(rect: Rect, axis: Axis) -> (f64, f64) {
    match axis {
        Axis::X => (rect.x0, rect.x1),
        Axis::Y => (rect.y0, rect.y1),
    }
}

fn other(axis: Axis) -> Axis {
    match axis {
        Axis::X => Axis::Y,
        Axis::Y => Axis::X,
    }
}

fn anchors(rect: Rect, axis: Axis) -> [f64; 3] {
    let (min, max) = axis_range(rect, axis);
    [min, (min + max) / 2.0, max]
}

/// Snap `dragged` against `candidates`.
///
/// `scale` is the viewport scale; the pixel threshold is converted to world
/// units with it.
pub fn snap_bounds(
    dragged: Rect,
    candidates: &[SnapCandidate],
    settings: &SnapSettings,
    scale: f64,
) -> SnapResult {
    if !settings.any_enabled() || scale <= 0.0 {
        return SnapResult::none();
    }
    let threshold = settings.threshold_px / scale;

    let mut best = [None, None];
    for (slot, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
        let best_axis = &mut best[slot];
        if settings.snap_to_grid {
            grid_pass(dragged, axis, settings.grid_size, threshold, best_axis);
        }
        if settings.snap_to_objects {
            alignment_pass(dragged, axis, candidates, threshold, best_axis);
            equal_gap_pass(dragged, axis, candidates, threshold, best_axis);
        }
    }

    if settings.snap_to_geometry {
        vertex_pass(dragged, candidates, threshold, &mut best);
    }

    let [best_x, best_y] = best;
    let mut result = SnapResult::none();
    for (snap, axis) in [(best_x, Axis::X), (best_y, Axis::Y)] {
        if let Some(snap) = snap {
            match axis {
                Axis::X => result.delta.x = snap.delta,
                Axis::Y => result.delta.y = snap.delta,
            }
            result.guides.extend(snap.guides);
        }
    }
    result
}

/// Snap a single point, e.g. a resize handle target.
pub fn snap_point(
    point: Point,
    candidates: &[SnapCandidate],
    settings: &SnapSettings,
    scale: f64,
) -> SnapResult {
    snap_bounds(Rect::from_points(point, point), candidates, settings, scale)
}

fn grid_pass(dragged: Rect, axis: Axis, grid_size: f64, threshold: f64, best: &mut Option<AxisSnap>) {
    if grid_size <= 0.0 {
        return;
    }
    let (min, _) = axis_range(dragged, axis);
    let target = (min / grid_size).round() * grid_size;
    let delta = target - min;
    if delta.abs() <= threshold && beats(best, delta.abs()) {
        *best = Some(AxisSnap {
            delta,
            distance: delta.abs(),
            guides: Vec::new(),
        });
    }
}

fn alignment_pass(
    dragged: Rect,
    axis: Axis,
    candidates: &[SnapCandidate],
    threshold: f64,
    best: &mut Option<AxisSnap>,
) {
    let cross = other(axis);
    for candidate in candidates {
        for a in anchors(dragged, axis) {
            for c in anchors(candidate.bounds, axis) {
                let delta = c - a;
                let distance = delta.abs();
                if distance > threshold || !beats(best, distance) {
                    continue;
                }
                let (d0, d1) = axis_range(dragged, cross);
                let (c0, c1) = axis_range(candidate.bounds, cross);
                *best = Some(AxisSnap {
                    delta,
                    distance,
                    guides: vec![SmartGuide::Alignment {
                        axis,
                        position: c,
                        start: d0.min(c0),
                        end: d1.max(c1),
                    }],
                });
            }
        }
    }
}

fn equal_gap_pass(
    dragged: Rect,
    axis: Axis,
    candidates: &[SnapCandidate],
    threshold: f64,
    best: &mut Option<AxisSnap>,
) {
    let cross = other(axis);
    let (d_min, d_max) = axis_range(dragged, axis);
    let (dc_min, dc_max) = axis_range(dragged, cross);
    let size = d_max - d_min;

    let overlapping = candidates.iter().filter(|c| {
        let (c0, c1) = axis_range(c.bounds, cross);
        c0 < dc_max && c1 > dc_min
    });

    let mut near: Option<(f64, f64)> = None; // neighbour before: its max
    let mut far: Option<(f64, f64)> = None; // neighbour after: its min
    for candidate in overlapping {
        let (c_min, c_max) = axis_range(candidate.bounds, axis);
        if c_max <= d_min {
            let gap = d_min - c_max;
            if near.is_none_or(|(g, _)| gap < g) {
                near = Some((gap, c_max));
            }
        } else if c_min >= d_max {
            let gap = c_min - d_max;
            if far.is_none_or(|(g, _)| gap < g) {
                far = Some((gap, c_min));
            }
        }
    }

    let (Some((gap_before, near_max)), Some((gap_after, far_min))) = (near, far) else {
        return;
    };
    if (gap_before - gap_after).abs() > 2.0 * threshold {
        return;
    }

    let target = (far_min + near_max - size) / 2.0;
    let delta = target - d_min;
    let distance = delta.abs();
    let current = best.as_ref().map_or(threshold, |b| b.distance);
    if distance > current {
        return;
    }

    let gap = target - near_max;
    let cross_mid = (dc_min + dc_max) / 2.0;
    *best = Some(AxisSnap {
        delta,
        distance,
        guides: vec![
            SmartGuide::Spacing {
                axis,
                from: near_max,
                to: target,
                cross: cross_mid,
                gap,
            },
            SmartGuide::Spacing {
                axis,
                from: target + size,
                to: far_min,
                cross: cross_mid,
                gap,
            },
        ],
    });
}

fn vertex_pass(
    dragged: Rect,
    candidates: &[SnapCandidate],
    threshold: f64,
    best: &mut [Option<AxisSnap>; 2],
) {
    let mut points = crate::geometry::rect_corners(dragged).to_vec();
    points.push(dragged.center());

    let mut closest: Option<(f64, Point, Point)> = None;
    for candidate in candidates {
        for vertex in &candidate.vertices {
            for point in &points {
                let distance = point.distance(*vertex);
                if distance <= threshold && closest.is_none_or(|(d, _, _)| distance < d) {
                    closest = Some((distance, *point, *vertex));
                }
            }
        }
    }

    let Some((distance, from, to)) = closest else {
        return;
    };
    if !beats(&best[0], distance) || !beats(&best[1], distance) {
        return;
    }
    best[0] = Some(AxisSnap {
        delta: to.x - from.x,
        distance,
        guides: vec![SmartGuide::Vertex { point: to }],
    });
    best[1] = Some(AxisSnap {
        delta: to.y - from.y,
        distance,
        guides: Vec::new(),
    });
}

/// Build candidates from visible top-level elements, skipping `exclude` and
/// any group containing an excluded element.
pub fn snap_candidates(document: &Document, exclude: &[ElementId]) -> Vec<SnapCandidate> {
    let excluded: HashSet<ElementId> = exclude
        .iter()
        .copied()
        .chain(document.flatten_ids(exclude))
        .collect();

    document
        .root_order()
        .iter()
        .filter(|id| !excluded.contains(id) && document.is_effectively_visible(**id))
        .filter(|id| {
            !document
                .flatten_ids(&[**id])
                .iter()
                .any(|leaf| excluded.contains(leaf))
        })
        .filter_map(|id| {
            let element = document.get(*id)?;
            let bounds = document.world_bounds(*id)?;
            let mut vertices = if element.is_group() {
                document
                    .group_oriented_box(*id)
                    .map(|obb| obb.corners().to_vec())
                    .unwrap_or_default()
            } else {
                rotated_corners(element)
            };
            vertices.push(bounds.center());
            Some(SnapCandidate {
                id: *id,
                bounds,
                vertices,
            })
        })
        .collect()
}

/// Snap an angle in radians to the nearest multiple of `step_degrees`.
pub fn snap_angle(radians: f64, step_degrees: f64) -> f64 {
    if step_degrees <= 0.0 {
        return radians;
    }
    let step = step_degrees.to_radians();
    (radians / step).round() * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Element;
    use uuid::Uuid;

    fn candidate(x: f64, y: f64, w: f64, h: f64) -> SnapCandidate {
        SnapCandidate::from_bounds(Uuid::new_v4(), Rect::new(x, y, x + w, y + h))
    }

    fn objects_only() -> SnapSettings {
        SnapSettings {
            snap_to_objects: true,
            ..SnapSettings::disabled()
        }
    }

    #[test]
    fn test_disabled_returns_zero() {
        let candidates = vec![candidate(0.0, 0.0, 50.0, 50.0)];
        let result = snap_bounds(
            Rect::new(52.0, 0.0, 102.0, 50.0),
            &candidates,
            &SnapSettings::disabled(),
            1.0,
        );
        assert_eq!(result, SnapResult::none());
    }

    #[test]
    fn test_nothing_near() {
        let candidates = vec![candidate(0.0, 0.0, 50.0, 50.0)];
        let dragged = Rect::new(500.0, 503.0, 550.0, 553.0);
        let result = snap_bounds(dragged, &candidates, &objects_only(), 1.0);
        assert!(!result.is_snapped());
    }

    #[test]
    fn test_left_edge_aligns_to_right_edge() {
        let candidates = vec![candidate(0.0, 0.0, 100.0, 100.0)];
        let dragged = Rect::new(104.0, 300.0, 154.0, 337.0);
        let result = snap_bounds(dragged, &candidates, &objects_only(), 1.0);

        assert!((dragged.x0 + result.delta.x - 100.0).abs() < f64::EPSILON);
        assert!(result.delta.y.abs() < f64::EPSILON);
        let x_guides: Vec<_> = result
            .guides
            .iter()
            .filter(|g| g.is_alignment_on(Axis::X))
            .collect();
        assert_eq!(x_guides.len(), 1);
        assert_eq!(
            x_guides[0],
            &SmartGuide::Alignment {
                axis: Axis::X,
                position: 100.0,
                start: 0.0,
                end: 337.0,
            }
        );
    }

    #[test]
    fn test_threshold_scales_with_zoom() {
        let candidates = vec![candidate(0.0, 0.0, 100.0, 100.0)];
        let dragged = Rect::new(106.0, 300.0, 156.0, 337.0);
        assert!(snap_bounds(dragged, &candidates, &objects_only(), 1.0).delta.x < 0.0);
        // At 2x zoom, 10px is 5 world units.
        let zoomed = snap_bounds(dragged, &candidates, &objects_only(), 2.0);
        assert!(zoomed.delta.x.abs() < f64::EPSILON);
    }

    #[test]
    fn test_closest_alignment_wins() {
        let candidates = vec![candidate(0.0, 0.0, 100.0, 100.0), candidate(0.0, 500.0, 103.0, 50.0)];
        let dragged = Rect::new(104.0, 300.0, 154.0, 337.0);
        let result = snap_bounds(dragged, &candidates, &objects_only(), 1.0);
        assert!((result.delta.x - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_grid_pass() {
        let settings = SnapSettings {
            snap_to_grid: true,
            ..SnapSettings::disabled()
        };
        let result = snap_bounds(Rect::new(23.0, 38.0, 50.0, 60.0), &[], &settings, 1.0);
        assert!((result.delta.x - (-3.0)).abs() < 1e-12);
        assert!((result.delta.y - 2.0).abs() < 1e-12);
        assert!(result.guides.is_empty());
    }

    #[test]
    fn test_alignment_overrides_grid_when_closer() {
        let settings = SnapSettings {
            snap_to_grid: true,
            snap_to_objects: true,
            ..SnapSettings::disabled()
        };
        let candidates = vec![candidate(0.0, 500.0, 27.0, 10.0)];
        // Grid would move left edge 28 -> 30 (2), the candidate's right edge is 1 away.
        let result = snap_bounds(Rect::new(28.0, 0.0, 48.0, 20.0), &candidates, &settings, 1.0);
        assert!((result.delta.x - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_equal_gap_distribution() {
        let left = candidate(0.0, 0.0, 100.0, 100.0);
        let right = candidate(243.0, 0.0, 100.0, 100.0);
        // Gaps of 20 and 23.
        let dragged = Rect::new(120.0, 0.0, 220.0, 100.0);
        let result = snap_bounds(dragged, &[left, right], &objects_only(), 1.0);

        let snapped_x0 = dragged.x0 + result.delta.x;
        assert!((snapped_x0 - 121.5).abs() < 1e-9);
        assert!((snapped_x0 - 100.0 - 21.5).abs() < 1e-9);
        assert!((243.0 - (snapped_x0 + 100.0) - 21.5).abs() < 1e-9);

        let spacing: Vec<_> = result.guides.iter().filter(|g| g.is_spacing()).collect();
        assert_eq!(spacing.len(), 2);
        assert_eq!(spacing[0].label(), spacing[1].label());
        assert_eq!(spacing[0].label().as_deref(), Some("21.5"));
    }

    #[test]
    fn test_equal_gap_rejects_large_difference() {
        let left = candidate(0.0, 0.0, 100.0, 100.0);
        let right = candidate(270.0, 0.0, 100.0, 100.0);
        // Gaps 20 and 50: difference above 2x threshold.
        let dragged = Rect::new(120.0, 0.0, 220.0, 100.0);
        let result = snap_bounds(dragged, &[left, right], &objects_only(), 1.0);
        assert!(!result.guides.iter().any(SmartGuide::is_spacing));
    }

    #[test]
    fn test_distribution_wins_tie_with_alignment() {
        // Alignment of left edge to x=118 is 2 away; distribution target 118 too.
        let left = candidate(0.0, 0.0, 100.0, 100.0);
        let right = candidate(236.0, 0.0, 100.0, 100.0);
        let above = candidate(118.0, -400.0, 10.0, 10.0);
        let dragged = Rect::new(120.0, 0.0, 220.0, 100.0);
        let result = snap_bounds(dragged, &[left, right, above], &objects_only(), 1.0);
        assert!((result.delta.x - (-2.0)).abs() < 1e-9);
        assert!(result.guides.iter().any(SmartGuide::is_spacing));
        assert!(!result.guides.iter().any(|g| g.is_alignment_on(Axis::X)));
    }

    #[test]
    fn test_vertex_snaps_both_axes() {
        let settings = SnapSettings {
            snap_to_geometry: true,
            ..SnapSettings::disabled()
        };
        let target = SnapCandidate {
            id: Uuid::new_v4(),
            bounds: Rect::new(0.0, 0.0, 1.0, 1.0),
            vertices: vec![Point::new(200.0, 200.0)],
        };
        let dragged = Rect::new(203.0, 196.0, 253.0, 246.0);
        let result = snap_bounds(dragged, &[target], &settings, 1.0);
        assert!((result.delta.x - (-3.0)).abs() < 1e-12);
        assert!((result.delta.y - 4.0).abs() < 1e-12);
        assert_eq!(
            result.guides,
            vec![SmartGuide::Vertex {
                point: Point::new(200.0, 200.0)
            }]
        );
    }

    #[test]
    fn test_vertex_does_not_override_closer_alignment() {
        let settings = SnapSettings {
            snap_to_objects: true,
            snap_to_geometry: true,
            ..SnapSettings::disabled()
        };
        let aligned = candidate(0.0, 400.0, 100.0, 10.0);
        let vertex = SnapCandidate {
            id: Uuid::new_v4(),
            bounds: Rect::new(1000.0, 1000.0, 1001.0, 1001.0),
            vertices: vec![Point::new(105.0, 205.0)],
        };
        // Left edge is 1 from x=100; nearest vertex is ~7 away.
        let dragged = Rect::new(101.0, 200.0, 131.0, 230.0);
        let result = snap_bounds(dragged, &[aligned, vertex], &settings, 1.0);
        assert!((result.delta.x - (-1.0)).abs() < 1e-12);
        assert!(!result.guides.iter().any(|g| matches!(g, SmartGuide::Vertex { .. })));
    }

    #[test]
    fn test_candidates_skip_excluded_and_hidden() {
        let mut doc = Document::new();
        let a = doc.add(Element::rect(0.0, 0.0, 10.0, 10.0));
        let b = doc.add(Element::rect(20.0, 0.0, 10.0, 10.0));
        let c = doc.add(Element::rect(40.0, 0.0, 10.0, 10.0).with_visible(false));
        let d = doc.add(Element::rect(60.0, 0.0, 10.0, 10.0));
        let group = doc.group_elements(&[d]).unwrap();

        let candidates = snap_candidates(&doc, &[a]);
        let ids: Vec<_> = candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b, group]);
        assert!(!ids.contains(&c));
        assert_eq!(candidates[0].vertices.len(), 5);

        // Dragging a grouped child excludes its group.
        let ids: Vec<_> = snap_candidates(&doc, &[d]).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_snap_angle() {
        let snapped = snap_angle(17f64.to_radians(), ANGLE_SNAP_INCREMENT);
        assert!((snapped - 15f64.to_radians()).abs() < 1e-12);
        let snapped = snap_angle(-8f64.to_radians(), ANGLE_SNAP_INCREMENT);
        assert!((snapped - (-15f64).to_radians()).abs() < 1e-12);
        assert!((snap_angle(0.3, 0.0) - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gap_label_format() {
        assert_eq!(format_gap(20.0), "20");
        assert_eq!(format_gap(21.54), "21.5");
    }
}
