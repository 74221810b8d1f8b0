//! Selection frame and resize handle system.

use crate::canvas::Document;
use crate::geometry::{OrientedBox, axis_aligned_bounding_box};
use crate::shapes::{ElementId, Shape};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Handle square size in screen pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Extra slack around a handle square for hit-testing, in screen pixels.
pub const HANDLE_HIT_SLACK: f64 = 4.0;
/// Edge hit tolerance in screen pixels.
pub const EDGE_HIT_TOLERANCE: f64 = 6.0;

/// One of the eight resize handles of a selection frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    Nw,
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
}

impl ResizeHandle {
    /// Corner handles in nw, ne, se, sw order.
    pub const CORNERS: [ResizeHandle; 4] = [
        ResizeHandle::Nw,
        ResizeHandle::Ne,
        ResizeHandle::Se,
        ResizeHandle::Sw,
    ];

    /// Edge handles in n, e, s, w order.
    pub const EDGES: [ResizeHandle; 4] = [
        ResizeHandle::N,
        ResizeHandle::E,
        ResizeHandle::S,
        ResizeHandle::W,
    ];

    /// Unit offsets from the frame center: -1 is west/north, +1 east/south.
    pub fn factors(self) -> (f64, f64) {
        match self {
            ResizeHandle::Nw => (-1.0, -1.0),
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::Ne => (1.0, -1.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::Se => (1.0, 1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::Sw => (-1.0, 1.0),
            ResizeHandle::W => (-1.0, 0.0),
        }
    }

    pub fn is_corner(self) -> bool {
        let (fx, fy) = self.factors();
        fx != 0.0 && fy != 0.0
    }

    pub fn opposite(self) -> Self {
        match self {
            ResizeHandle::Nw => ResizeHandle::Se,
            ResizeHandle::N => ResizeHandle::S,
            ResizeHandle::Ne => ResizeHandle::Sw,
            ResizeHandle::E => ResizeHandle::W,
            ResizeHandle::Se => ResizeHandle::Nw,
            ResizeHandle::S => ResizeHandle::N,
            ResizeHandle::Sw => ResizeHandle::Ne,
            ResizeHandle::W => ResizeHandle::E,
        }
    }

    /// Direction the handle points, in radians, before element rotation.
    pub fn direction(self) -> f64 {
        let (fx, fy) = self.factors();
        fy.atan2(fx)
    }
}

/// What the handles of a selection are laid out on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandleFrame {
    /// A single line: one handle per endpoint.
    Segment { start: Point, end: Point },
    /// A (possibly rotated) box with corner and edge handles.
    Box(OrientedBox),
}

impl HandleFrame {
    /// Handles drawn for this frame, with their world positions.
    ///
    /// Segments get two (start as `Nw`, end as `Se`), boxes get their four
    /// corners. Edge handles are hit-testable but not drawn.
    pub fn visible_handles(&self) -> Vec<(ResizeHandle, Point)> {
        match self {
            HandleFrame::Segment { start, end } => {
                vec![(ResizeHandle::Nw, *start), (ResizeHandle::Se, *end)]
            }
            HandleFrame::Box(obb) => ResizeHandle::CORNERS
                .iter()
                .map(|h| (*h, obb.handle_position(*h)))
                .collect(),
        }
    }

    /// Rotation of the frame; segments report zero.
    pub fn rotation(&self) -> f64 {
        match self {
            HandleFrame::Segment { .. } => 0.0,
            HandleFrame::Box(obb) => obb.rotation,
        }
    }

    /// Pivot for rotate gestures.
    pub fn center(&self) -> Point {
        match self {
            HandleFrame::Segment { start, end } => start.midpoint(*end),
            HandleFrame::Box(obb) => obb.center,
        }
    }

    /// Axis-aligned bounds of the frame.
    pub fn bounds(&self) -> Rect {
        match self {
            HandleFrame::Segment { start, end } => Rect::from_points(*start, *end),
            HandleFrame::Box(obb) => obb.bounds(),
        }
    }
}

/// How a selection is framed, which also decides how it is resized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionFrame {
    /// One non-group element.
    Single(ElementId, HandleFrame),
    /// One group, framed by its oriented bounds.
    Group(ElementId, OrientedBox),
    /// Several elements, framed by their combined axis-aligned bounds.
    Multiple(Rect),
}

impl SelectionFrame {
    pub fn handle_frame(&self) -> HandleFrame {
        match self {
            SelectionFrame::Single(_, frame) => *frame,
            SelectionFrame::Group(_, obb) => HandleFrame::Box(*obb),
            SelectionFrame::Multiple(rect) => HandleFrame::Box(OrientedBox::from_rect(*rect)),
        }
    }
}

/// Compute the frame of the current selection.
///
/// Returns `None` when the selection is empty or resolves to no geometry.
pub fn selection_frame(document: &Document, selection: &[ElementId]) -> Option<SelectionFrame> {
    match selection {
        [] => None,
        [id] => {
            let element = document.get(*id)?;
            match &element.shape {
                Shape::Group(_) => document
                    .group_oriented_box(*id)
                    .map(|obb| SelectionFrame::Group(*id, obb)),
                Shape::Line(line) => Some(SelectionFrame::Single(
                    *id,
                    HandleFrame::Segment {
                        start: line.start,
                        end: line.end,
                    },
                )),
                _ => OrientedBox::of_element(element)
                    .map(|obb| SelectionFrame::Single(*id, HandleFrame::Box(obb))),
            }
        }
        ids => {
            let leaves = document.flatten_ids(ids);
            axis_aligned_bounding_box(leaves.iter().filter_map(|id| document.get(*id)))
                .map(SelectionFrame::Multiple)
        }
    }
}
