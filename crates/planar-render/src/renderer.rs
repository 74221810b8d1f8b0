//! Renderer types shared by the frame builder and every surface.

use kurbo::{Rect, Size};
use peniko::Color;
use planar_core::canvas::{Canvas, Document};
use planar_core::shapes::ElementId;
use planar_core::snap::SmartGuide;
use planar_core::viewport::Viewport;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Could not decode image {href}: {reason}")]
    ImageDecode { href: String, reason: String },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// No grid.
    None,
    /// Full grid lines.
    #[default]
    Lines,
    /// Only dots at intersections.
    Dots,
}

impl GridStyle {
    /// Cycle to the next grid style.
    pub fn next(self) -> Self {
        match self {
            GridStyle::None => GridStyle::Lines,
            GridStyle::Lines => GridStyle::Dots,
            GridStyle::Dots => GridStyle::None,
        }
    }

    /// Display name for this grid style.
    pub fn name(self) -> &'static str {
        match self {
            GridStyle::None => "None",
            GridStyle::Lines => "Lines",
            GridStyle::Dots => "Dots",
        }
    }
}

/// Colors and sizes used for everything the renderer draws on its own:
/// grid, background checkerboard, selection affordances, guides and the
/// marquee. Screen-space sizes are in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub grid_style: GridStyle,
    /// Grid spacing in world units.
    pub grid_size: f64,
    pub grid_color: Color,
    pub checker_light: Color,
    pub checker_dark: Color,
    pub checker_size: f64,
    pub selection_color: Color,
    pub handle_fill: Color,
    pub handle_size: f64,
    pub outline_width: f64,
    pub guide_color: Color,
    pub marquee_fill: Color,
    /// Fill for images that are not decoded (yet).
    pub placeholder_color: Color,
    /// Flattening tolerance for curves, in screen pixels. Cached paths are
    /// flattened once, at a quarter of this in world units.
    pub curve_tolerance: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            grid_style: GridStyle::Lines,
            grid_size: 20.0,
            grid_color: Color::from_rgba8(200, 200, 200, 100),
            checker_light: Color::from_rgba8(255, 255, 255, 255),
            checker_dark: Color::from_rgba8(220, 220, 220, 255),
            checker_size: 8.0,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            handle_fill: Color::WHITE,
            handle_size: planar_core::selection::HANDLE_SIZE,
            outline_width: 1.0,
            guide_color: Color::from_rgba8(236, 72, 153, 255), // Pink
            marquee_fill: Color::from_rgba8(59, 130, 246, 25),
            placeholder_color: Color::from_rgba8(200, 200, 200, 255),
            curve_tolerance: 0.25,
        }
    }
}

/// Everything a frame is drawn from, captured from the store.
///
/// The renderer only ever reads this snapshot, so a frame never observes a
/// half-applied gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub viewport: Viewport,
    /// Surface size in pixels.
    pub viewport_size: Size,
    pub document: Document,
    pub selected: Vec<ElementId>,
    /// Live marquee rectangle in world space.
    pub selection_box: Option<Rect>,
    pub background: Color,
    /// When false a checkerboard is drawn instead of the background color.
    pub background_visible: bool,
    pub marquee_active: bool,
    pub guides: Vec<SmartGuide>,
    /// Store revision the snapshot was taken at.
    pub revision: u64,
}

impl RenderState {
    /// Snapshot the parts of a canvas the renderer needs.
    pub fn capture(canvas: &Canvas) -> Self {
        Self {
            viewport: canvas.viewport(),
            viewport_size: canvas.viewport_size(),
            document: canvas.document().clone(),
            selected: canvas.selection().to_vec(),
            selection_box: canvas.selection_box(),
            background: canvas.background().into(),
            background_visible: canvas.background_visible(),
            marquee_active: canvas.flags().is_marquee_selecting,
            guides: canvas.guides().to_vec(),
            revision: canvas.revision(),
        }
    }

    /// World rectangle covered by the surface.
    pub fn visible_world_rect(&self) -> Rect {
        self.viewport.visible_world_rect(self.viewport_size)
    }
}
