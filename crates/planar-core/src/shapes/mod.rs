//! Element definitions for the canvas.
//!
//! An [`Element`] carries the fields every canvas item shares (identity,
//! rotation, visibility, styling, group membership) and a [`Shape`] holding
//! the kind-specific geometry.

mod ellipse;
mod group;
mod image;
mod line;
mod path;
mod rectangle;
mod text;

pub use ellipse::Ellipse;
pub use group::{Group, HierarchyError};
pub use image::Image;
pub use line::{Line, Marker};
pub use path::PathShape;
pub use rectangle::Rectangle;
pub use text::Text;

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Gray used wherever a fill reference cannot be resolved.
    pub fn neutral_gray() -> Self {
        Self::new(160, 160, 160, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Interior paint of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// Plain color.
    Solid(SerializableColor),
    /// Reference to a gradient or pattern resource by id.
    Reference(String),
}

impl Fill {
    /// Color to paint with. References resolve to a neutral gray.
    pub fn resolved_color(&self) -> SerializableColor {
        match self {
            Fill::Solid(color) => *color,
            Fill::Reference(_) => SerializableColor::neutral_gray(),
        }
    }
}

/// Outline paint of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: SerializableColor,
    pub width: f64,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub dash_array: Option<Vec<f64>>,
}

impl Stroke {
    pub fn new(color: SerializableColor, width: f64) -> Self {
        Self {
            color,
            width,
            opacity: None,
            dash_array: None,
        }
    }

    pub fn with_dashes(mut self, dashes: Vec<f64>) -> Self {
        self.dash_array = Some(dashes);
        self
    }
}

/// Geometry of shapes that live in an axis-aligned local box which is then
/// rotated about its center.
pub trait BoxGeometry {
    /// The unrotated box, in world units.
    fn local_box(&self) -> Rect;

    /// Move and resize so that the unrotated box becomes `rect`.
    fn set_local_box(&mut self, rect: Rect);
}

/// Kind-specific geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Rect(Rectangle),
    Ellipse(Ellipse),
    Line(Line),
    Path(PathShape),
    Text(Text),
    Image(Image),
    Group(Group),
}

impl Shape {
    /// Short lowercase name of the kind, used for default element names.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Rect(_) => "rectangle",
            Shape::Ellipse(_) => "ellipse",
            Shape::Line(_) => "line",
            Shape::Path(_) => "path",
            Shape::Text(_) => "text",
            Shape::Image(_) => "image",
            Shape::Group(_) => "group",
        }
    }

    /// Unrotated local box for box-like shapes. Lines and groups have none.
    pub fn local_box(&self) -> Option<Rect> {
        match self {
            Shape::Rect(s) => Some(s.local_box()),
            Shape::Ellipse(s) => Some(s.local_box()),
            Shape::Path(s) => Some(s.local_box()),
            Shape::Text(s) => Some(s.local_box()),
            Shape::Image(s) => Some(s.local_box()),
            Shape::Line(_) | Shape::Group(_) => None,
        }
    }

    /// Replace the unrotated local box. No-op for lines and groups.
    pub fn set_local_box(&mut self, rect: Rect) {
        match self {
            Shape::Rect(s) => s.set_local_box(rect),
            Shape::Ellipse(s) => s.set_local_box(rect),
            Shape::Path(s) => s.set_local_box(rect),
            Shape::Text(s) => s.set_local_box(rect),
            Shape::Image(s) => s.set_local_box(rect),
            Shape::Line(_) | Shape::Group(_) => {}
        }
    }

    /// Geometric center: box center, or line midpoint. Groups have none.
    pub fn center(&self) -> Option<Point> {
        match self {
            Shape::Line(line) => Some(line.midpoint()),
            Shape::Group(_) => None,
            _ => self.local_box().map(|b| b.center()),
        }
    }

    /// Translate the geometry. Groups carry no geometry and are unaffected.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Rect(s) => s.position += delta,
            Shape::Ellipse(s) => s.center += delta,
            Shape::Line(s) => {
                s.start += delta;
                s.end += delta;
            }
            Shape::Path(s) => s.position += delta,
            Shape::Text(s) => s.position += delta,
            Shape::Image(s) => s.position += delta,
            Shape::Group(_) => {}
        }
    }

    /// Move so that the geometric center lands on `center`.
    pub fn set_center(&mut self, center: Point) {
        if let Some(current) = self.center() {
            self.translate(center - current);
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Shape::Group(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Shape::Line(l) => Some(l),
            _ => None,
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

/// A canvas element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub(crate) id: ElementId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Rotation in radians about the element's own center.
    #[serde(default)]
    pub rotation: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    /// Owning group, if any. The group's `child_ids` is authoritative.
    #[serde(default)]
    pub parent_id: Option<ElementId>,
    #[serde(default)]
    pub fill: Option<Fill>,
    #[serde(default)]
    pub stroke: Option<Stroke>,
    pub shape: Shape,
}

impl Element {
    /// Create an element with a fresh id and default styling.
    pub fn new(shape: Shape) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: shape.kind_name().to_string(),
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
            locked: false,
            parent_id: None,
            fill: None,
            stroke: Some(Stroke::new(SerializableColor::black(), 1.0)),
            shape,
        }
    }

    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Shape::Rect(Rectangle::new(Point::new(x, y), width, height)))
    }

    pub fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64) -> Self {
        Self::new(Shape::Ellipse(Ellipse::new(Point::new(cx, cy), rx, ry)))
    }

    pub fn line(start: Point, end: Point) -> Self {
        Self::new(Shape::Line(Line::new(start, end)))
    }

    pub fn path(d: impl Into<String>) -> Self {
        Self::new(Shape::Path(PathShape::new(d)))
    }

    pub fn text(position: Point, content: impl Into<String>) -> Self {
        Self::new(Shape::Text(Text::new(position, content)))
    }

    pub fn image(x: f64, y: f64, width: f64, height: f64, href: impl Into<String>) -> Self {
        Self::new(Shape::Image(Image::new(Point::new(x, y), width, height, href)))
    }

    /// An empty group. Children are attached through the document.
    pub fn group() -> Self {
        let mut element = Self::new(Shape::Group(Group::default()));
        element.stroke = None;
        element
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Replace the id with a fresh one (duplicate/paste).
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_fill(mut self, fill: Option<Fill>) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_stroke(mut self, stroke: Option<Stroke>) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn is_group(&self) -> bool {
        self.shape.is_group()
    }

    /// Stroke width, or zero without a stroke.
    pub fn stroke_width(&self) -> f64 {
        self.stroke.as_ref().map_or(0.0, |s| s.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_missing() {
        let json = r#"{
            "id": "7a1f2c1e-5b4e-4c8b-9f53-0d4b8b3c2a10",
            "shape": { "rect": { "position": { "x": 1.0, "y": 2.0 }, "width": 3.0, "height": 4.0 } }
        }"#;
        let element: Element = serde_json::from_str(json).unwrap();
        assert!(element.visible);
        assert!(!element.locked);
        assert!((element.opacity - 1.0).abs() < f64::EPSILON);
        assert!(element.parent_id.is_none());
        assert_eq!(element.shape.local_box(), Some(Rect::new(1.0, 2.0, 4.0, 6.0)));
    }

    #[test]
    fn test_reference_fill_resolves_to_gray() {
        let fill = Fill::Reference("gradient-1".to_string());
        assert_eq!(fill.resolved_color(), SerializableColor::neutral_gray());
        let solid = Fill::Solid(SerializableColor::white());
        assert_eq!(solid.resolved_color(), SerializableColor::white());
    }

    #[test]
    fn test_translate_and_center() {
        let mut shape = Shape::Ellipse(Ellipse::new(Point::new(10.0, 10.0), 5.0, 3.0));
        shape.translate(Vec2::new(5.0, -5.0));
        assert_eq!(shape.center(), Some(Point::new(15.0, 5.0)));

        let mut line = Shape::Line(Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        line.set_center(Point::new(0.0, 0.0));
        let l = line.as_line().unwrap();
        assert_eq!(l.start, Point::new(-5.0, 0.0));
        assert_eq!(l.end, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_group_has_no_geometry() {
        let mut group = Element::group();
        assert!(group.shape.local_box().is_none());
        assert!(group.shape.center().is_none());
        group.shape.translate(Vec2::new(10.0, 10.0));
        assert!(group.shape.as_group().unwrap().child_ids.is_empty());
    }
}
