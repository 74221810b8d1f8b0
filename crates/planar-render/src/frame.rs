//! Frame building: turns a [`RenderState`] into an ordered list of draw
//! commands in screen space.
//!
//! Order is fixed: background, grid, elements in paint order, selection
//! affordances, smart guides, marquee.

use crate::cache::{DecodedImage, RenderCaches};
use crate::renderer::{GridStyle, RenderState, RenderStyle};
use crate::tessellate::{
    Mesh, dash_polyline, ellipse_points, fill_ellipse, fill_rect, fill_rounded_rect, marker_mesh,
    marker_size, rect_outline, rounded_rect_outline, stroke_polyline, stroke_polylines,
};
use kurbo::{Affine, Point, Rect, Vec2};
use peniko::Color;
use planar_core::geometry::{element_bounds, rect_corners, rects_overlap, rotated_corners};
use planar_core::selection::{HandleFrame, SelectionFrame, selection_frame};
use planar_core::shapes::{Element, ElementId, SerializableColor, Shape, Stroke};
use planar_core::snap::{Axis, SmartGuide};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::sync::Arc;

/// Grids denser than this many pixels are skipped.
const MIN_GRID_SPACING_PX: f64 = 4.0;
/// Alpha applied to the box standing in for text glyphs.
const TEXT_PLACEHOLDER_ALPHA: f32 = 0.25;
/// Half-length of guide tick marks, in pixels.
const GUIDE_TICK_PX: f64 = 4.0;
const MARQUEE_DASH_PX: f64 = 4.0;

/// One drawing operation. Geometry is in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    /// Transparency checkerboard with square cells of `cell` pixels.
    Checkerboard {
        light: Color,
        dark: Color,
        cell: f64,
    },
    /// Infinite grid, evaluated per pixel. Lines sit at `origin + k * spacing`.
    Grid {
        style: GridStyle,
        spacing: f64,
        origin: Point,
        color: Color,
    },
    Mesh {
        mesh: Mesh,
        color: Color,
    },
    /// An image mapped onto a parallelogram given as nw, ne, se, sw corners.
    TexturedQuad {
        corners: [Point; 4],
        image: Arc<DecodedImage>,
        opacity: f32,
    },
}

/// Commands for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn mesh_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Mesh { .. }))
            .count()
    }
}

/// Build the frame for `state`.
pub fn build_frame(state: &RenderState, style: &RenderStyle, caches: &mut RenderCaches) -> Frame {
    let document = &state.document;
    caches.paths.retain(|id| document.get(*id).is_some());

    let mut builder = FrameBuilder {
        state,
        style,
        caches,
        transform: state.viewport.transform(),
        scale: state.viewport.scale,
        visible: state.visible_world_rect(),
        commands: Vec::new(),
    };
    builder.draw_background();
    builder.draw_grid();
    let mut visiting = HashSet::new();
    for id in document.root_order() {
        builder.draw_element(*id, 1.0, &mut visiting);
    }
    builder.draw_selection();
    builder.draw_guides();
    builder.draw_marquee();

    Frame {
        width: state.viewport_size.width.max(0.0).round() as u32,
        height: state.viewport_size.height.max(0.0).round() as u32,
        commands: builder.commands,
    }
}

fn paint(color: SerializableColor, opacity: f64) -> Color {
    Color::from(color).multiply_alpha(opacity.clamp(0.0, 1.0) as f32)
}

struct FrameBuilder<'a> {
    state: &'a RenderState,
    style: &'a RenderStyle,
    caches: &'a mut RenderCaches,
    /// World to screen.
    transform: Affine,
    scale: f64,
    visible: Rect,
    commands: Vec<DrawCommand>,
}

impl FrameBuilder<'_> {
    fn draw_background(&mut self) {
        let command = if self.state.background_visible {
            DrawCommand::Clear(self.state.background)
        } else {
            DrawCommand::Checkerboard {
                light: self.style.checker_light,
                dark: self.style.checker_dark,
                cell: self.style.checker_size,
            }
        };
        self.commands.push(command);
    }

    fn draw_grid(&mut self) {
        let spacing = self.style.grid_size * self.scale;
        if self.style.grid_style == GridStyle::None || spacing < MIN_GRID_SPACING_PX {
            return;
        }
        self.commands.push(DrawCommand::Grid {
            style: self.style.grid_style,
            spacing,
            origin: self.transform * Point::ZERO,
            color: self.style.grid_color,
        });
    }

    /// Push a mesh given in coordinates that `to_world` maps into world space.
    fn push_mesh(&mut self, mesh: Mesh, color: Color, to_world: Affine) {
        let to_screen = self.transform * to_world;
        self.push_screen_mesh(mesh.transformed(to_screen), color);
    }

    /// Push a mesh already in screen space.
    fn push_screen_mesh(&mut self, mesh: Mesh, color: Color) {
        if mesh.is_empty() || color.components[3] <= 0.0 {
            return;
        }
        self.commands.push(DrawCommand::Mesh { mesh, color });
    }

    fn draw_element(&mut self, id: ElementId, opacity: f64, visiting: &mut HashSet<ElementId>) {
        let state = self.state;
        let Some(element) = state.document.get(id) else {
            return;
        };
        if !element.visible {
            return;
        }
        let opacity = opacity * element.opacity.clamp(0.0, 1.0);

        if let Some(group) = element.shape.as_group() {
            if !visiting.insert(id) {
                if self.caches.reported_cycles.insert(id) {
                    log::warn!("Group {id} contains itself; skipping the repeated branch");
                }
                return;
            }
            for child in &group.child_ids {
                self.draw_element(*child, opacity, visiting);
            }
            visiting.remove(&id);
            return;
        }

        if !self.is_on_screen(element) {
            return;
        }
        self.draw_shape(element, opacity);
    }

    fn is_on_screen(&self, element: &Element) -> bool {
        let Some(bounds) = element_bounds(element) else {
            return false;
        };
        let mut margin = element.stroke_width() / 2.0;
        if element.shape.as_line().is_some() {
            margin += marker_size(element.stroke_width());
        }
        rects_overlap(bounds.inflate(margin, margin), self.visible)
    }

    /// Curve tolerance in world units for the current zoom.
    fn tolerance(&self) -> f64 {
        self.style.curve_tolerance / self.scale
    }

    fn draw_shape(&mut self, element: &Element, opacity: f64) {
        let fill = element.fill.as_ref().map(|f| paint(f.resolved_color(), opacity));
        let stroke = element.stroke.as_ref().filter(|s| s.width > 0.0);
        let rotation = match element.shape.center() {
            Some(center) if element.shape.as_line().is_none() => {
                Affine::rotate_about(element.rotation, center)
            }
            _ => Affine::IDENTITY,
        };
        let tolerance = self.tolerance();

        match &element.shape {
            Shape::Rect(rect) => {
                let local = Rect::new(
                    rect.position.x,
                    rect.position.y,
                    rect.position.x + rect.width,
                    rect.position.y + rect.height,
                );
                let (rx, ry) = rect.corner_radii();
                if let Some(color) = fill {
                    self.push_mesh(fill_rounded_rect(local, rx, ry, tolerance), color, rotation);
                }
                if let Some(stroke) = stroke {
                    let outline = rounded_rect_outline(local, rx, ry, tolerance);
                    self.stroke_outline(&outline, true, stroke, opacity, rotation);
                }
            }
            Shape::Ellipse(ellipse) => {
                let (c, rx, ry) = (ellipse.center, ellipse.radius_x, ellipse.radius_y);
                if let Some(color) = fill {
                    self.push_mesh(fill_ellipse(c, rx, ry, tolerance), color, rotation);
                }
                if let Some(stroke) = stroke {
                    let outline = ellipse_points(c, rx, ry, tolerance);
                    self.stroke_outline(&outline, true, stroke, opacity, rotation);
                }
            }
            Shape::Line(line) => {
                let Some(stroke) = stroke else {
                    return;
                };
                self.stroke_outline(&[line.start, line.end], false, stroke, opacity, Affine::IDENTITY);
                if line.length() > 0.0 {
                    let color = stroke_paint(stroke, opacity);
                    let angle = line.angle();
                    let start = marker_mesh(line.start_marker, line.start, angle + PI, stroke.width, tolerance);
                    let end = marker_mesh(line.end_marker, line.end, angle, stroke.width, tolerance);
                    self.push_mesh(start, color, Affine::IDENTITY);
                    self.push_mesh(end, color, Affine::IDENTITY);
                }
            }
            Shape::Path(path) => {
                let to_world = rotation * Affine::translate(path.position.to_vec2());
                let Some(cached) = self
                    .caches
                    .paths
                    .get(element.id(), path, self.style.curve_tolerance / 4.0)
                else {
                    return;
                };
                let fill_mesh = fill.map(|color| (cached.fill.clone(), color));
                let outline = stroke.map(|s| (stroke_polylines(&cached.outlines, s.width), s));
                if let Some((mesh, color)) = fill_mesh {
                    self.push_mesh(mesh, color, to_world);
                }
                if let Some((mesh, stroke)) = outline {
                    self.push_mesh(mesh, stroke_paint(stroke, opacity), to_world);
                }
            }
            Shape::Text(_) => {
                let Some(local) = element.shape.local_box() else {
                    return;
                };
                let base = element
                    .fill
                    .as_ref()
                    .map(|f| f.resolved_color())
                    .or(element.stroke.as_ref().map(|s| s.color))
                    .unwrap_or(SerializableColor::black());
                let color = paint(base, opacity).multiply_alpha(TEXT_PLACEHOLDER_ALPHA);
                self.push_mesh(fill_rect(local), color, rotation);
            }
            Shape::Image(image) => {
                let Some(local) = element.shape.local_box() else {
                    return;
                };
                match self.caches.images.resolve(&image.href) {
                    Some(decoded) => {
                        let to_screen = self.transform * rotation;
                        let corners = rect_corners(local).map(|p| to_screen * p);
                        self.commands.push(DrawCommand::TexturedQuad {
                            corners,
                            image: decoded,
                            opacity: opacity as f32,
                        });
                    }
                    None => self.draw_image_placeholder(local, opacity, rotation),
                }
            }
            Shape::Group(_) => {}
        }
    }

    /// Gray box with an X, for images that are not decoded.
    fn draw_image_placeholder(&mut self, local: Rect, opacity: f64, rotation: Affine) {
        let color = self.style.placeholder_color.multiply_alpha(opacity as f32);
        let mark = Color::from_rgba8(150, 150, 150, 255).multiply_alpha(opacity as f32);
        let width = 2.0 / self.scale;
        self.push_mesh(fill_rect(local), color, rotation);
        let [nw, ne, se, sw] = rect_corners(local);
        let mut cross = stroke_polyline(&[nw, se], width, false);
        cross.append(&stroke_polyline(&[ne, sw], width, false));
        self.push_mesh(cross, mark, rotation);
    }

    fn stroke_outline(&mut self, points: &[Point], closed: bool, stroke: &Stroke, opacity: f64, to_world: Affine) {
        let mut mesh = Mesh::new();
        match stroke.dash_array.as_deref() {
            Some(dashes) if !dashes.is_empty() => {
                let mut run = points.to_vec();
                if closed {
                    run.extend(points.first().copied());
                }
                for dash in dash_polyline(&run, dashes) {
                    mesh.append(&stroke_polyline(&dash, stroke.width, false));
                }
            }
            _ => mesh = stroke_polyline(points, stroke.width, closed),
        }
        self.push_mesh(mesh, stroke_paint(stroke, opacity), to_world);
    }

    // Overlays. Everything below is sized in screen pixels.

    fn screen_outline(&mut self, world_points: &[Point], closed: bool, color: Color) {
        let points: Vec<Point> = world_points.iter().map(|p| self.transform * *p).collect();
        let mesh = stroke_polyline(&points, self.style.outline_width, closed);
        self.push_screen_mesh(mesh, color);
    }

    fn outline_element(&mut self, id: ElementId) {
        let state = self.state;
        let Some(element) = state.document.get(id) else {
            return;
        };
        let corners = rotated_corners(element);
        let closed = corners.len() > 2;
        self.screen_outline(&corners, closed, self.style.selection_color);
    }

    fn draw_handle(&mut self, world: Point) {
        let center = self.transform * world;
        let half = self.style.handle_size / 2.0;
        let square = Rect::from_center_size(center, (half * 2.0, half * 2.0));
        self.push_screen_mesh(fill_rect(square), self.style.handle_fill);
        let border = stroke_polyline(&rect_outline(square), self.style.outline_width, true);
        self.push_screen_mesh(border, self.style.selection_color);
    }

    fn draw_selection(&mut self) {
        let state = self.state;
        let document = &state.document;
        let Some(frame) = selection_frame(document, &state.selected) else {
            return;
        };
        let color = self.style.selection_color;

        match frame {
            SelectionFrame::Single(_, HandleFrame::Segment { start, end }) => {
                self.screen_outline(&[start, end], false, color);
            }
            SelectionFrame::Single(_, HandleFrame::Box(obb)) => {
                self.screen_outline(&obb.corners(), true, color);
            }
            SelectionFrame::Group(id, obb) => {
                for leaf in document.flatten_ids(&[id]) {
                    self.outline_element(leaf);
                }
                self.screen_outline(&obb.corners(), true, color);
            }
            SelectionFrame::Multiple(rect) => {
                for id in &state.selected {
                    match document.group_oriented_box(*id) {
                        Some(obb) => self.screen_outline(&obb.corners(), true, color),
                        None => self.outline_element(*id),
                    }
                }
                self.screen_outline(&rect_corners(rect), true, color);
            }
        }

        if !state.marquee_active {
            for (_, position) in frame.handle_frame().visible_handles() {
                self.draw_handle(position);
            }
        }
    }

    fn draw_guides(&mut self) {
        let state = self.state;
        let color = self.style.guide_color;
        let tick = GUIDE_TICK_PX / self.scale;
        for guide in &state.guides {
            match *guide {
                SmartGuide::Alignment {
                    axis,
                    position,
                    start,
                    end,
                } => {
                    let (a, b) = match axis {
                        Axis::X => (Point::new(position, start), Point::new(position, end)),
                        Axis::Y => (Point::new(start, position), Point::new(end, position)),
                    };
                    self.screen_outline(&[a, b], false, color);
                }
                SmartGuide::Spacing {
                    axis, from, to, cross, ..
                } => {
                    let (a, b, normal) = match axis {
                        Axis::X => (Point::new(from, cross), Point::new(to, cross), Vec2::new(0.0, tick)),
                        Axis::Y => (Point::new(cross, from), Point::new(cross, to), Vec2::new(tick, 0.0)),
                    };
                    self.screen_outline(&[a, b], false, color);
                    self.screen_outline(&[a - normal, a + normal], false, color);
                    self.screen_outline(&[b - normal, b + normal], false, color);
                }
                SmartGuide::Vertex { point } => {
                    let (dx, dy) = (Vec2::new(tick, 0.0), Vec2::new(0.0, tick));
                    self.screen_outline(&[point - dx - dy, point + dx + dy], false, color);
                    self.screen_outline(&[point - dx + dy, point + dx - dy], false, color);
                }
            }
        }
    }

    fn draw_marquee(&mut self) {
        let Some(rect) = self.state.selection_box else {
            return;
        };
        let screen = self.transform.transform_rect_bbox(rect.abs());
        self.push_screen_mesh(fill_rect(screen), self.style.marquee_fill);

        let mut outline = rect_outline(screen);
        outline.push(outline[0]);
        let mut mesh = Mesh::new();
        for dash in dash_polyline(&outline, &[MARQUEE_DASH_PX, MARQUEE_DASH_PX]) {
            mesh.append(&stroke_polyline(&dash, self.style.outline_width, false));
        }
        self.push_screen_mesh(mesh, self.style.selection_color);
    }
}

fn stroke_paint(stroke: &Stroke, opacity: f64) -> Color {
    paint(stroke.color, opacity * stroke.opacity.unwrap_or(1.0))
}
