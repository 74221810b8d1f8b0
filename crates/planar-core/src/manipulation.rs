//! Resize and rotate math.
//!
//! Functions here take the geometry captured at gesture start and return new
//! geometry for the current pointer position. They never look at the
//! previous tick, so repeated calls cannot drift.

use crate::geometry::{OrientedBox, rotate_point, rotate_vec};
use crate::selection::ResizeHandle;
use crate::shapes::{Element, Shape};
use kurbo::{Point, Rect, Vec2};

/// Anchor-preserving resize of an oriented box.
///
/// `world_delta` is the pointer movement since gesture start. It is rotated
/// into the box's frame; the edges named by `handle` follow it, the opposite
/// edges (or the center line, for edge handles) stay fixed in world space.
/// Width and height never drop below `min_size`.
pub fn resize_oriented_box(
    original: OrientedBox,
    handle: ResizeHandle,
    world_delta: Vec2,
    min_size: f64,
) -> OrientedBox {
    let local = rotate_vec(world_delta, -original.rotation);
    let (fx, fy) = handle.factors();

    let width = if fx != 0.0 {
        (original.width + fx * local.x).max(min_size)
    } else {
        original.width
    };
    let height = if fy != 0.0 {
        (original.height + fy * local.y).max(min_size)
    } else {
        original.height
    };

    // Anchor offset from the center in the box frame, before and after.
    let anchor_before = Vec2::new(-fx * original.width / 2.0, -fy * original.height / 2.0);
    let anchor_after = Vec2::new(-fx * width / 2.0, -fy * height / 2.0);

    let anchor_world = original.center + rotate_vec(anchor_before, original.rotation);
    let center = anchor_world - rotate_vec(anchor_after, original.rotation);

    OrientedBox::new(center, width, height, original.rotation)
}

/// Map a point from one oriented box onto another, preserving its relative
/// position inside the box.
pub fn map_between_boxes(point: Point, from: OrientedBox, to: OrientedBox) -> Point {
    let local = rotate_vec(point - from.center, -from.rotation);
    let sx = ratio(to.width, from.width);
    let sy = ratio(to.height, from.height);
    to.center + rotate_vec(Vec2::new(local.x * sx, local.y * sy), to.rotation)
}

fn ratio(new: f64, old: f64) -> f64 {
    if old > 0.0 { new / old } else { 1.0 }
}

/// Resize a single box-like element to `new_box`. Lines and groups are
/// returned unchanged.
pub fn apply_box(original: &Element, new_box: OrientedBox) -> Element {
    let mut element = original.clone();
    element
        .shape
        .set_local_box(Rect::from_center_size(new_box.center, (new_box.width, new_box.height)));
    element
}

/// Move the line endpoint named by `handle` (`Nw` = start, `Se` = end).
pub fn resize_line(original: &Element, handle: ResizeHandle, world_delta: Vec2) -> Element {
    let mut element = original.clone();
    if let Shape::Line(line) = &mut element.shape {
        match handle {
            ResizeHandle::Nw => line.start += world_delta,
            ResizeHandle::Se => line.end += world_delta,
            _ => {}
        }
    }
    element
}

/// Proportionally remap a leaf element from the `from` frame into the `to`
/// frame. The element's center moves with the frame; its own size scales by
/// the frame's width and height ratios, clamped to `min_size`.
pub fn remap_element(original: &Element, from: OrientedBox, to: OrientedBox, min_size: f64) -> Element {
    let mut element = original.clone();
    match &mut element.shape {
        Shape::Line(line) => {
            line.start = map_between_boxes(line.start, from, to);
            line.end = map_between_boxes(line.end, from, to);
        }
        Shape::Group(_) => {}
        _ => {
            if let Some(local) = original.shape.local_box() {
                let center = map_between_boxes(local.center(), from, to);
                let width = (local.width() * ratio(to.width, from.width)).max(min_size);
                let height = (local.height() * ratio(to.height, from.height)).max(min_size);
                element
                    .shape
                    .set_local_box(Rect::from_center_size(center, (width, height)));
            }
        }
    }
    element
}

/// Rotate an element about `pivot` by `delta` radians.
///
/// Box-like shapes orbit their center around the pivot and add `delta` to
/// their rotation. Lines rotate their endpoints and keep `rotation` as
/// bookkeeping. Groups only update their bookkeeping rotation.
pub fn rotate_element(original: &Element, pivot: Point, delta: f64) -> Element {
    let mut element = original.clone();
    element.rotation = original.rotation + delta;
    match &mut element.shape {
        Shape::Line(line) => {
            line.start = rotate_point(line.start, pivot, delta);
            line.end = rotate_point(line.end, pivot, delta);
        }
        Shape::Group(_) => {}
        shape => {
            if let Some(center) = shape.center() {
                shape.set_center(rotate_point(center, pivot, delta));
            }
        }
    }
    element
}

/// Angle of `point` around `center`, in radians.
pub fn pointer_angle(center: Point, point: Point) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

/// Normalize an angle to `(-PI, PI]`.
pub fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}
