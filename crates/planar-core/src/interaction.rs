//! Interaction state machine: turns pointer and key events into pan, drag,
//! resize, rotate and marquee gestures on a [`Canvas`].
//!
//! Each gesture keeps a snapshot of the geometry it touches, taken on
//! mouse-down. Every move recomputes the result from that snapshot and the
//! total pointer offset, so skipped or repeated ticks never accumulate.

use crate::canvas::{Canvas, InteractionFlags, Tool};
use crate::geometry::{OrientedBox, axis_aligned_bounding_box};
use crate::hit_test::{hit_test_handle, hit_test_marquee, hit_test_point};
use crate::input::{KeyEvent, KeyState, Modifiers, MouseButton, PointerEvent};
use crate::manipulation::{
    apply_box, normalize_angle, pointer_angle, remap_element, resize_line, resize_oriented_box,
    rotate_element,
};
use crate::selection::{HandleFrame, ResizeHandle, SelectionFrame, selection_frame};
use crate::shapes::{Element, ElementId};
use crate::snap::{SnapCandidate, SnapResult, snap_angle, snap_bounds, snap_candidates, snap_point};
use kurbo::{Point, Rect, Vec2};

/// Drag state: pointer origin, the leaves being moved and their bounds.
#[derive(Debug, Clone)]
pub struct DragGesture {
    start: Point,
    originals: Vec<Element>,
    start_bounds: Option<Rect>,
    candidates: Vec<SnapCandidate>,
}

/// Resize state.
#[derive(Debug, Clone)]
pub struct ResizeGesture {
    start: Point,
    handle: ResizeHandle,
    frame: SelectionFrame,
    originals: Vec<Element>,
    candidates: Vec<SnapCandidate>,
}

impl ResizeGesture {
    pub fn handle(&self) -> ResizeHandle {
        self.handle
    }
}

/// Rotate state.
#[derive(Debug, Clone)]
pub struct RotateGesture {
    pivot: Point,
    start_angle: f64,
    originals: Vec<Element>,
}

impl RotateGesture {
    pub fn pivot(&self) -> Point {
        self.pivot
    }
}

/// The gesture in progress.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Panning {
        last: Point,
    },
    Dragging(DragGesture),
    Resizing(ResizeGesture),
    Rotating(RotateGesture),
    MarqueeSelecting {
        start: Point,
    },
}

impl Gesture {
    fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Panning { .. } => "panning",
            Gesture::Dragging(_) => "dragging",
            Gesture::Resizing(_) => "resizing",
            Gesture::Rotating(_) => "rotating",
            Gesture::MarqueeSelecting { .. } => "marquee",
        }
    }

    fn flags(&self) -> InteractionFlags {
        InteractionFlags {
            is_panning: matches!(self, Gesture::Panning { .. }),
            is_dragging: matches!(self, Gesture::Dragging(_)),
            is_resizing: matches!(self, Gesture::Resizing(_)),
            is_rotating: matches!(self, Gesture::Rotating(_)),
            is_marquee_selecting: matches!(self, Gesture::MarqueeSelecting { .. }),
        }
    }

    /// Geometry captured at gesture start, if the gesture edits elements.
    fn originals(&self) -> &[Element] {
        match self {
            Gesture::Dragging(g) => &g.originals,
            Gesture::Resizing(g) => &g.originals,
            Gesture::Rotating(g) => &g.originals,
            _ => &[],
        }
    }
}

/// Cursor hint for the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cursor {
    Default,
    Grab,
    Grabbing,
    Move,
    /// Resize arrow pointing at `angle` radians (handle direction plus the
    /// frame's rotation).
    Resize { angle: f64 },
    Rotate,
    Crosshair,
}

/// Drives gestures on a canvas.
#[derive(Debug, Clone, Default)]
pub struct InteractionMachine {
    gesture: Gesture,
    keys: KeyState,
    deep_select: bool,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Pick grouped children directly instead of their outermost group.
    pub fn set_deep_select(&mut self, deep: bool) {
        self.deep_select = deep;
    }

    pub fn handle_pointer(&mut self, canvas: &mut Canvas, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => self.pointer_down(canvas, position, button, modifiers),
            PointerEvent::Move {
                position,
                modifiers,
            } => self.pointer_move(canvas, position, modifiers),
            PointerEvent::Up { position, .. } => self.pointer_up(canvas, position),
        }
    }

    /// Track held keys. Escape aborts the gesture in progress.
    pub fn handle_key(&mut self, canvas: &mut Canvas, event: &KeyEvent) {
        self.keys.handle(event);
        if matches!(event, KeyEvent::Pressed(key) if key.eq_ignore_ascii_case("escape")) {
            self.cancel(canvas);
        }
    }

    /// Start a gesture. `position` is in screen coordinates.
    pub fn pointer_down(
        &mut self,
        canvas: &mut Canvas,
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    ) {
        if !self.is_idle() {
            // The previous mouse-up never arrived; settle that gesture first.
            log::debug!("Mouse-down during {}; finishing it", self.gesture.name());
            self.pointer_up(canvas, position);
        }

        if canvas.tool() == Tool::Pan || button == MouseButton::Middle || self.keys.space_held() {
            self.begin(canvas, Gesture::Panning { last: position });
            return;
        }
        if button != MouseButton::Left {
            return;
        }

        let world = canvas.screen_to_world(position);
        let scale = canvas.viewport().scale;
        let frame = selection_frame(canvas.document(), canvas.selection());

        if let Some(frame) = frame {
            let handle_frame = frame.handle_frame();
            if let Some(handle) = hit_test_handle(world, &handle_frame, scale) {
                let rotate_modifier = canvas.settings().interaction.rotate_modifier;
                let on_corner = handle.is_corner();
                if modifiers.has(rotate_modifier) && on_corner {
                    self.begin_rotate(canvas, world, handle_frame);
                } else {
                    self.begin_resize(canvas, world, handle, frame);
                }
                return;
            }
        }

        match hit_test_point(world, canvas.document(), self.deep_select) {
            Some(id) => {
                if modifiers.toggles_selection() {
                    canvas.toggle_selection(id);
                    return;
                }
                if !canvas.is_selected(id) {
                    canvas.select(id);
                }
                self.begin_drag(canvas, world);
            }
            None => {
                if !modifiers.shift {
                    canvas.clear_selection();
                }
                canvas.set_selection_box(Some(Rect::from_points(world, world)));
                self.begin(canvas, Gesture::MarqueeSelecting { start: world });
            }
        }
    }

    /// Advance the gesture. `position` is in screen coordinates.
    pub fn pointer_move(&mut self, canvas: &mut Canvas, position: Point, modifiers: Modifiers) {
        let world = canvas.screen_to_world(position);
        let scale = canvas.viewport().scale;

        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Panning { last } => {
                let mut viewport = canvas.viewport();
                viewport.pan(position - *last);
                canvas.set_viewport(viewport);
                *last = position;
            }
            Gesture::Dragging(drag) => {
                let raw = world - drag.start;
                let snap = match drag.start_bounds {
                    Some(bounds) => {
                        snap_bounds(bounds + raw, &drag.candidates, &canvas.settings().snap, scale)
                    }
                    None => SnapResult::none(),
                };
                let delta = raw + snap.delta;
                let moved = drag.originals.iter().map(|original| {
                    let mut element = original.clone();
                    element.shape.translate(delta);
                    element
                });
                write_geometry(canvas, moved);
                canvas.set_guides(snap.guides);
            }
            Gesture::Resizing(resize) => {
                let mut delta = world - resize.start;
                if canvas.settings().interaction.snap_while_resizing {
                    let target = handle_position(&resize.frame, resize.handle) + delta;
                    let snap = snap_point(target, &resize.candidates, &canvas.settings().snap, scale);
                    delta += snap.delta;
                    canvas.set_guides(snap.guides);
                }
                let min_size = canvas.settings().interaction.min_size;
                let resized = resize_elements(resize, delta, min_size);
                write_geometry(canvas, resized);
            }
            Gesture::Rotating(rotate) => {
                let mut delta = normalize_angle(pointer_angle(rotate.pivot, world) - rotate.start_angle);
                if modifiers.shift {
                    delta = snap_angle(delta, canvas.settings().interaction.angle_snap_degrees);
                }
                let pivot = rotate.pivot;
                let rotated = rotate
                    .originals
                    .iter()
                    .map(|original| rotate_element(original, pivot, delta));
                write_geometry(canvas, rotated);
            }
            Gesture::MarqueeSelecting { start } => {
                canvas.set_selection_box(Some(Rect::from_points(*start, world)));
            }
        }
    }

    /// Finish the gesture and return to idle.
    pub fn pointer_up(&mut self, canvas: &mut Canvas, position: Point) {
        let gesture = std::mem::take(&mut self.gesture);
        if let Gesture::MarqueeSelecting { start } = gesture {
            let world = canvas.screen_to_world(position);
            let hits = hit_test_marquee(Rect::from_points(start, world), canvas.document());
            canvas.extend_selection(hits);
        }
        if !matches!(gesture, Gesture::Idle) {
            log::debug!("Finished {}", gesture.name());
        }
        reset_transient(canvas);
    }

    /// Abort the gesture in progress, restoring the geometry it changed.
    pub fn cancel(&mut self, canvas: &mut Canvas) {
        let gesture = std::mem::take(&mut self.gesture);
        if matches!(gesture, Gesture::Idle) {
            return;
        }
        log::debug!("Cancelled {}", gesture.name());
        write_geometry(canvas, gesture.originals().iter().cloned());
        reset_transient(canvas);
    }

    /// The host lost focus: held keys are unknown and the mouse-up may never
    /// arrive.
    pub fn blur(&mut self, canvas: &mut Canvas) {
        self.keys.clear();
        self.cancel(canvas);
    }

    /// Cursor to show at `position` (screen coordinates).
    pub fn hover_cursor(&self, canvas: &Canvas, position: Point, modifiers: Modifiers) -> Cursor {
        match &self.gesture {
            Gesture::Panning { .. } => return Cursor::Grabbing,
            Gesture::Dragging(_) => return Cursor::Move,
            Gesture::Rotating(_) => return Cursor::Rotate,
            Gesture::MarqueeSelecting { .. } => return Cursor::Crosshair,
            Gesture::Resizing(resize) => {
                return Cursor::Resize {
                    angle: resize.handle.direction() + resize.frame.handle_frame().rotation(),
                };
            }
            Gesture::Idle => {}
        }

        if canvas.tool() == Tool::Pan || self.keys.space_held() {
            return Cursor::Grab;
        }

        let world = canvas.screen_to_world(position);
        let scale = canvas.viewport().scale;
        if let Some(frame) = selection_frame(canvas.document(), canvas.selection()) {
            let handle_frame = frame.handle_frame();
            if let Some(handle) = hit_test_handle(world, &handle_frame, scale) {
                let rotate_modifier = canvas.settings().interaction.rotate_modifier;
                if modifiers.has(rotate_modifier) && handle.is_corner() {
                    return Cursor::Rotate;
                }
                return Cursor::Resize {
                    angle: handle.direction() + handle_frame.rotation(),
                };
            }
        }

        if hit_test_point(world, canvas.document(), self.deep_select).is_some() {
            Cursor::Move
        } else {
            Cursor::Default
        }
    }

    fn begin(&mut self, canvas: &mut Canvas, gesture: Gesture) {
        log::debug!("Starting {}", gesture.name());
        canvas.set_flags(gesture.flags());
        self.gesture = gesture;
    }

    fn begin_drag(&mut self, canvas: &mut Canvas, world: Point) {
        if canvas.selection_has_locked() {
            return;
        }
        let document = canvas.document();
        let selection = canvas.selection().to_vec();
        let originals = snapshot(canvas, &document.flatten_ids(&selection));
        let start_bounds = axis_aligned_bounding_box(&originals);
        let candidates = snap_candidates(document, &selection);
        self.begin(
            canvas,
            Gesture::Dragging(DragGesture {
                start: world,
                originals,
                start_bounds,
                candidates,
            }),
        );
    }

    fn begin_resize(
        &mut self,
        canvas: &mut Canvas,
        world: Point,
        handle: ResizeHandle,
        frame: SelectionFrame,
    ) {
        if canvas.selection_has_locked() {
            return;
        }
        let selection = canvas.selection().to_vec();
        let originals = snapshot(canvas, &canvas.document().flatten_ids(&selection));
        let candidates = if canvas.settings().interaction.snap_while_resizing {
            snap_candidates(canvas.document(), &selection)
        } else {
            Vec::new()
        };
        self.begin(
            canvas,
            Gesture::Resizing(ResizeGesture {
                start: world,
                handle,
                frame,
                originals,
                candidates,
            }),
        );
    }

    fn begin_rotate(&mut self, canvas: &mut Canvas, world: Point, frame: HandleFrame) {
        if canvas.selection_has_locked() {
            return;
        }
        let document = canvas.document();
        // Groups ride along so their bookkeeping rotation follows.
        let ids: Vec<ElementId> = canvas
            .selection()
            .iter()
            .flat_map(|id| document.subtree(*id))
            .collect();
        let originals = snapshot(canvas, &ids);
        let pivot = frame.center();
        self.begin(
            canvas,
            Gesture::Rotating(RotateGesture {
                pivot,
                start_angle: pointer_angle(pivot, world),
                originals,
            }),
        );
    }
}

/// World position of a handle on a selection frame.
fn handle_position(frame: &SelectionFrame, handle: ResizeHandle) -> Point {
    match frame.handle_frame() {
        HandleFrame::Segment { start, end } => {
            if handle == ResizeHandle::Nw {
                start
            } else {
                end
            }
        }
        HandleFrame::Box(obb) => obb.handle_position(handle),
    }
}

fn snapshot(canvas: &Canvas, ids: &[ElementId]) -> Vec<Element> {
    ids.iter()
        .filter_map(|id| canvas.document().get(*id).cloned())
        .collect()
}

fn resize_elements(resize: &ResizeGesture, delta: Vec2, min_size: f64) -> Vec<Element> {
    match resize.frame {
        SelectionFrame::Single(_, HandleFrame::Segment { .. }) => resize
            .originals
            .iter()
            .map(|original| resize_line(original, resize.handle, delta))
            .collect(),
        SelectionFrame::Single(_, HandleFrame::Box(obb)) => {
            let new_box = resize_oriented_box(obb, resize.handle, delta, min_size);
            resize
                .originals
                .iter()
                .map(|original| apply_box(original, new_box))
                .collect()
        }
        SelectionFrame::Group(_, obb) => remap_all(&resize.originals, obb, resize.handle, delta, min_size),
        SelectionFrame::Multiple(rect) => remap_all(
            &resize.originals,
            OrientedBox::from_rect(rect),
            resize.handle,
            delta,
            min_size,
        ),
    }
}

fn remap_all(
    originals: &[Element],
    frame: OrientedBox,
    handle: ResizeHandle,
    delta: Vec2,
    min_size: f64,
) -> Vec<Element> {
    let new_frame = resize_oriented_box(frame, handle, delta, min_size);
    originals
        .iter()
        .map(|original| remap_element(original, frame, new_frame, min_size))
        .collect()
}

/// Copy geometry (shape and rotation) of `elements` into the document.
fn write_geometry(canvas: &mut Canvas, elements: impl IntoIterator<Item = Element>) {
    let document = canvas.document_mut();
    for element in elements {
        document.patch(element.id(), |target| {
            target.shape = element.shape;
            target.rotation = element.rotation;
        });
    }
}

fn reset_transient(canvas: &mut Canvas) {
    canvas.set_flags(InteractionFlags::default());
    canvas.set_guides(Vec::new());
    canvas.set_selection_box(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rotated_corners;
    use crate::input::Modifier;
    use crate::settings::SnapSettings;
    use crate::snap::SmartGuide;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn canvas_without_snapping() -> Canvas {
        let mut canvas = Canvas::new();
        canvas.settings_mut().snap = SnapSettings::disabled();
        canvas
    }

    fn down(m: &mut InteractionMachine, c: &mut Canvas, x: f64, y: f64, modifiers: Modifiers) {
        m.pointer_down(c, Point::new(x, y), MouseButton::Left, modifiers);
    }

    fn drag_to(m: &mut InteractionMachine, c: &mut Canvas, x: f64, y: f64) {
        m.pointer_move(c, Point::new(x, y), Modifiers::NONE);
    }

    fn up(m: &mut InteractionMachine, c: &mut Canvas, x: f64, y: f64) {
        m.pointer_up(c, Point::new(x, y));
    }

    fn position_of(canvas: &Canvas, id: ElementId) -> Point {
        canvas.document().get(id).unwrap().shape.local_box().unwrap().origin()
    }

    #[test]
    fn test_drag_delta_purity() {
        let mut canvas = canvas_without_snapping();
        let id = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        assert!(matches!(m.gesture(), Gesture::Dragging(_)));
        assert_eq!(canvas.selection(), &[id]);
        assert!(canvas.flags().is_dragging);

        drag_to(&mut m, &mut canvas, 15.0, 10.0);
        drag_to(&mut m, &mut canvas, 20.0, 10.0);
        assert_eq!(position_of(&canvas, id), Point::new(10.0, 0.0));

        // Repeating a tick changes nothing.
        drag_to(&mut m, &mut canvas, 20.0, 10.0);
        assert_eq!(position_of(&canvas, id), Point::new(10.0, 0.0));

        up(&mut m, &mut canvas, 20.0, 10.0);
        assert!(m.is_idle());
        assert!(!canvas.flags().any());
    }

    #[test]
    fn test_drag_uses_world_coordinates() {
        let mut canvas = canvas_without_snapping();
        canvas.set_viewport(crate::viewport::Viewport::new(100.0, 0.0, 2.0));
        let id = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let mut m = InteractionMachine::new();
        down(&mut m, &mut canvas, 120.0, 20.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 140.0, 20.0);
        assert_eq!(position_of(&canvas, id), Point::new(10.0, 0.0));
    }

    #[test]
    fn test_drag_snaps_and_clears_guides() {
        let mut canvas = Canvas::new();
        canvas.settings_mut().snap = SnapSettings {
            snap_to_objects: true,
            ..SnapSettings::disabled()
        };
        canvas.add(Element::rect(0.0, 0.0, 100.0, 100.0));
        let moving = canvas.add(Element::rect(200.0, 300.0, 50.0, 37.0));
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 210.0, 310.0, Modifiers::NONE);
        // Raw left edge lands at 104, four units right of the other box.
        drag_to(&mut m, &mut canvas, 114.0, 310.0);
        assert!((position_of(&canvas, moving).x - 100.0).abs() < EPS);
        assert!(
            canvas
                .guides()
                .iter()
                .any(|g| matches!(g, SmartGuide::Alignment { .. }))
        );

        up(&mut m, &mut canvas, 114.0, 310.0);
        assert!(canvas.guides().is_empty());
    }

    #[test]
    fn test_locked_blocks_drag_but_selects() {
        let mut canvas = canvas_without_snapping();
        let a = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let b = canvas.add(Element::rect(100.0, 0.0, 50.0, 50.0));
        canvas.set_selection([a, b]);
        let group = canvas.group_selected().unwrap();
        canvas.clear_selection();
        canvas.patch(b, |e| e.locked = true);
        let mut m = InteractionMachine::new();

        // The free child is hit and its group selected, but the locked
        // sibling keeps the group from moving.
        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        assert_eq!(canvas.selection(), &[group]);
        assert!(m.is_idle());
        drag_to(&mut m, &mut canvas, 100.0, 100.0);
        up(&mut m, &mut canvas, 100.0, 100.0);
        assert_eq!(position_of(&canvas, a), Point::new(0.0, 0.0));

        // Locked elements are not hit at all.
        down(&mut m, &mut canvas, 110.0, 10.0, Modifiers::NONE);
        assert!(matches!(m.gesture(), Gesture::MarqueeSelecting { .. }));
        assert!(canvas.selection().is_empty());
        up(&mut m, &mut canvas, 110.0, 10.0);
    }

    #[test]
    fn test_shift_click_toggles_without_drag() {
        let mut canvas = canvas_without_snapping();
        let a = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let b = canvas.add(Element::rect(100.0, 0.0, 50.0, 50.0));
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        up(&mut m, &mut canvas, 10.0, 10.0);
        down(&mut m, &mut canvas, 110.0, 10.0, Modifiers::shift());
        assert!(m.is_idle());
        assert_eq!(canvas.selection(), &[a, b]);

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE.with(Modifier::Ctrl));
        assert_eq!(canvas.selection(), &[b]);
    }

    #[test]
    fn test_drag_moves_group_children() {
        let mut canvas = canvas_without_snapping();
        let a = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let b = canvas.add(Element::ellipse(100.0, 25.0, 25.0, 25.0));
        canvas.set_selection([a, b]);
        let group = canvas.group_selected().unwrap();
        canvas.clear_selection();
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        assert_eq!(canvas.selection(), &[group]);
        drag_to(&mut m, &mut canvas, 20.0, 30.0);
        up(&mut m, &mut canvas, 20.0, 30.0);

        assert_eq!(position_of(&canvas, a), Point::new(10.0, 20.0));
        assert_eq!(
            canvas.document().get(b).unwrap().shape.center(),
            Some(Point::new(110.0, 45.0))
        );
    }

    #[test]
    fn test_marquee_selects_and_unions() {
        let mut canvas = canvas_without_snapping();
        let a = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let b = canvas.add(Element::rect(200.0, 0.0, 50.0, 50.0));
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, -10.0, -10.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 60.0, 60.0);
        assert_eq!(canvas.selection_box(), Some(Rect::new(-10.0, -10.0, 60.0, 60.0)));
        assert!(canvas.flags().is_marquee_selecting);
        up(&mut m, &mut canvas, 60.0, 60.0);
        assert_eq!(canvas.selection(), &[a]);
        assert!(canvas.selection_box().is_none());

        down(&mut m, &mut canvas, 190.0, -10.0, Modifiers::shift());
        up(&mut m, &mut canvas, 260.0, 60.0);
        assert_eq!(canvas.selection(), &[a, b]);

        // Plain press on empty space clears; a tiny marquee selects nothing.
        down(&mut m, &mut canvas, 100.0, 100.0, Modifiers::NONE);
        up(&mut m, &mut canvas, 101.0, 101.0);
        assert!(canvas.selection().is_empty());
    }

    #[test]
    fn test_resize_rotated_keeps_anchor() {
        for degrees in [0.0_f64, 45.0, 170.0] {
            let mut canvas = canvas_without_snapping();
            let id = canvas.add(
                Element::rect(100.0, 100.0, 100.0, 60.0).with_rotation(degrees.to_radians()),
            );
            canvas.select(id);
            let se = rotated_corners(canvas.document().get(id).unwrap())[2];
            let nw_before = rotated_corners(canvas.document().get(id).unwrap())[0];
            let mut m = InteractionMachine::new();

            down(&mut m, &mut canvas, se.x, se.y, Modifiers::NONE);
            assert!(matches!(m.gesture(), Gesture::Resizing(_)));
            drag_to(&mut m, &mut canvas, se.x + 30.0, se.y + 15.0);
            up(&mut m, &mut canvas, se.x + 30.0, se.y + 15.0);

            let nw_after = rotated_corners(canvas.document().get(id).unwrap())[0];
            assert!((nw_before.x - nw_after.x).abs() < EPS);
            assert!((nw_before.y - nw_after.y).abs() < EPS);
        }
    }

    #[test]
    fn test_resize_multiple_is_proportional() {
        let mut canvas = canvas_without_snapping();
        let a = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let b = canvas.add(Element::rect(150.0, 50.0, 50.0, 50.0));
        canvas.set_selection([a, b]);
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 200.0, 100.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 400.0, 200.0);
        up(&mut m, &mut canvas, 400.0, 200.0);

        assert_eq!(
            canvas.document().get(a).unwrap().shape.local_box(),
            Some(Rect::new(0.0, 0.0, 100.0, 100.0))
        );
        assert_eq!(
            canvas.document().get(b).unwrap().shape.local_box(),
            Some(Rect::new(300.0, 100.0, 400.0, 200.0))
        );
    }

    #[test]
    fn test_resize_line_endpoint() {
        let mut canvas = canvas_without_snapping();
        let id = canvas.add(Element::line(Point::new(0.0, 0.0), Point::new(100.0, 0.0)));
        canvas.select(id);
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 100.0, 0.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 100.0, 50.0);
        up(&mut m, &mut canvas, 100.0, 50.0);

        let line = canvas.document().get(id).unwrap().shape.as_line().cloned().unwrap();
        assert_eq!(line.start, Point::new(0.0, 0.0));
        assert_eq!(line.end, Point::new(100.0, 50.0));
    }

    #[test]
    fn test_alt_corner_rotates() {
        let mut canvas = canvas_without_snapping();
        let id = canvas.add(Element::rect(0.0, 0.0, 100.0, 100.0));
        canvas.select(id);
        let mut m = InteractionMachine::new();
        let alt = Modifiers::NONE.with(Modifier::Alt);

        // Start at the se corner (angle 45 degrees about the center), move to
        // directly below the center (90 degrees).
        down(&mut m, &mut canvas, 100.0, 100.0, alt);
        assert!(matches!(m.gesture(), Gesture::Rotating(_)));
        drag_to(&mut m, &mut canvas, 50.0, 150.0);
        let element = canvas.document().get(id).unwrap();
        assert!((element.rotation - FRAC_PI_2 / 2.0).abs() < EPS);
        assert_eq!(element.shape.center(), Some(Point::new(50.0, 50.0)));

        // Shift snaps to 15 degree steps.
        m.pointer_move(&mut canvas, Point::new(60.0, 150.0), Modifiers::shift());
        let rotation = canvas.document().get(id).unwrap().rotation.to_degrees();
        assert!((rotation / 15.0 - (rotation / 15.0).round()).abs() < 1e-9);
        up(&mut m, &mut canvas, 60.0, 150.0);
    }

    #[test]
    fn test_rotate_group_updates_bookkeeping() {
        let mut canvas = canvas_without_snapping();
        let a = canvas.add(Element::rect(0.0, 0.0, 40.0, 40.0));
        let b = canvas.add(Element::line(Point::new(60.0, 20.0), Point::new(100.0, 20.0)));
        canvas.set_selection([a, b]);
        let group = canvas.group_selected().unwrap();
        let mut m = InteractionMachine::new();
        let alt = Modifiers::NONE.with(Modifier::Alt);

        // Group frame is (0,0)-(100,40), center (50,20). Rotate a quarter turn.
        down(&mut m, &mut canvas, 100.0, 40.0, alt);
        assert!(matches!(m.gesture(), Gesture::Rotating(_)));
        let target = Point::new(50.0, 20.0) + crate::geometry::rotate_vec(Vec2::new(50.0, 20.0), FRAC_PI_2);
        drag_to(&mut m, &mut canvas, target.x, target.y);
        up(&mut m, &mut canvas, target.x, target.y);

        let doc = canvas.document();
        assert!((doc.get(group).unwrap().rotation - FRAC_PI_2).abs() < 1e-9);
        assert!((doc.get(a).unwrap().rotation - FRAC_PI_2).abs() < 1e-9);
        let line = doc.get(b).unwrap().shape.as_line().unwrap();
        assert!((line.start.x - 50.0).abs() < 1e-9 && (line.start.y - 30.0).abs() < 1e-9);

        let obb = doc.group_oriented_box(group).unwrap();
        assert!((obb.width - 100.0).abs() < 1e-6);
        assert!((obb.height - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_pan_with_space_and_middle() {
        let mut canvas = canvas_without_snapping();
        let mut m = InteractionMachine::new();

        m.handle_key(&mut canvas, &KeyEvent::Pressed(" ".to_string()));
        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        assert!(canvas.flags().is_panning);
        drag_to(&mut m, &mut canvas, 30.0, 50.0);
        up(&mut m, &mut canvas, 30.0, 50.0);
        assert_eq!(canvas.viewport().offset(), Vec2::new(20.0, 40.0));
        m.handle_key(&mut canvas, &KeyEvent::Released(" ".to_string()));

        m.pointer_down(&mut canvas, Point::ZERO, MouseButton::Middle, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, -20.0, 0.0);
        up(&mut m, &mut canvas, -20.0, 0.0);
        assert_eq!(canvas.viewport().offset(), Vec2::new(0.0, 40.0));
    }

    #[test]
    fn test_cancel_restores_originals() {
        let mut canvas = canvas_without_snapping();
        let id = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 60.0, 60.0);
        m.blur(&mut canvas);
        assert!(m.is_idle());
        assert!(!canvas.flags().any());
        assert_eq!(position_of(&canvas, id), Point::new(0.0, 0.0));

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 20.0, 10.0);
        m.handle_key(&mut canvas, &KeyEvent::Pressed("Escape".to_string()));
        assert_eq!(position_of(&canvas, id), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_lost_mouse_up_settles_on_next_press() {
        let mut canvas = canvas_without_snapping();
        let id = canvas.add(Element::rect(0.0, 0.0, 50.0, 50.0));
        let mut m = InteractionMachine::new();

        down(&mut m, &mut canvas, 10.0, 10.0, Modifiers::NONE);
        drag_to(&mut m, &mut canvas, 20.0, 10.0);
        // No mouse-up; the next press keeps the moved geometry.
        down(&mut m, &mut canvas, 500.0, 500.0, Modifiers::NONE);
        assert_eq!(position_of(&canvas, id), Point::new(10.0, 0.0));
        assert!(matches!(m.gesture(), Gesture::MarqueeSelecting { .. }));
    }

    #[test]
    fn test_hover_cursor() {
        let mut canvas = canvas_without_snapping();
        let id = canvas.add(Element::rect(0.0, 0.0, 100.0, 100.0));
        let m = InteractionMachine::new();
        assert_eq!(m.hover_cursor(&canvas, Point::new(50.0, 50.0), Modifiers::NONE), Cursor::Move);
        assert_eq!(m.hover_cursor(&canvas, Point::new(500.0, 50.0), Modifiers::NONE), Cursor::Default);

        canvas.select(id);
        match m.hover_cursor(&canvas, Point::new(100.0, 100.0), Modifiers::NONE) {
            Cursor::Resize { angle } => assert!((angle - FRAC_PI_2 / 2.0).abs() < EPS),
            other => panic!("unexpected cursor {other:?}"),
        }
        assert_eq!(
            m.hover_cursor(&canvas, Point::new(100.0, 100.0), Modifiers::NONE.with(Modifier::Alt)),
            Cursor::Rotate
        );
        canvas.set_tool(Tool::Pan);
        assert_eq!(m.hover_cursor(&canvas, Point::new(50.0, 50.0), Modifiers::NONE), Cursor::Grab);
    }
}
