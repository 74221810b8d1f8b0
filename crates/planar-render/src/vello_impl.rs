//! Vello backend: encodes frames into a [`vello::Scene`].
//!
//! The host owns the GPU side (device, `vello::Renderer`, swapchain) and
//! renders [`VelloSurface::scene`] after each present.

use crate::cache::DecodedImage;
use crate::frame::{DrawCommand, Frame};
use crate::renderer::{GridStyle, RenderResult, RendererError};
use crate::surface::{Surface, SurfaceTarget};
use crate::tessellate::Mesh;
use kurbo::{Affine, BezPath, Point, Rect, Stroke};
use peniko::{Blob, Color, Fill, ImageAlphaType, ImageBrush, ImageData, ImageFormat};
use std::collections::HashMap;
use std::sync::Arc;
use vello::Scene;

/// Creates [`VelloSurface`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelloTarget;

impl SurfaceTarget for VelloTarget {
    type Surface = VelloSurface;

    fn create_surface(&mut self, width: u32, height: u32) -> RenderResult<VelloSurface> {
        VelloSurface::new(width, height)
    }
}

/// Surface that records each frame as a vello scene.
pub struct VelloSurface {
    width: u32,
    height: u32,
    scene: Scene,
    /// Uploaded images keyed by the address of their decoded pixels.
    images: HashMap<usize, ImageData>,
}

impl VelloSurface {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RendererError::InitFailed(format!(
                "cannot create a {width}x{height} surface"
            )));
        }
        Ok(Self {
            width,
            height,
            scene: Scene::new(),
            images: HashMap::new(),
        })
    }

    /// Scene for the last presented frame.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene, leaving an empty one.
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    fn fill_mesh(&mut self, mesh: &Mesh, color: Color) {
        let path = mesh_path(mesh);
        if path.elements().is_empty() {
            return;
        }
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, color, None, &path);
    }

    fn checkerboard(&mut self, light: Color, dark: Color, cell: f64) {
        let bounds = self.bounds();
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, light, None, &bounds);

        let cell = cell.max(1.0);
        let mut path = BezPath::new();
        let mut row = 0usize;
        let mut y = 0.0;
        while y < bounds.y1 {
            let mut x = if row % 2 == 0 { cell } else { 0.0 };
            while x < bounds.x1 {
                push_square(&mut path, Rect::new(x, y, x + cell, y + cell));
                x += cell * 2.0;
            }
            y += cell;
            row += 1;
        }
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, dark, None, &path);
    }

    fn grid(&mut self, style: GridStyle, spacing: f64, origin: Point, color: Color) {
        if spacing <= 0.0 {
            return;
        }
        let bounds = self.bounds();
        let start_x = origin.x.rem_euclid(spacing);
        let start_y = origin.y.rem_euclid(spacing);
        let mut path = BezPath::new();

        match style {
            GridStyle::None => return,
            GridStyle::Lines => {
                let mut x = start_x;
                while x <= bounds.x1 {
                    path.move_to(Point::new(x, bounds.y0));
                    path.line_to(Point::new(x, bounds.y1));
                    x += spacing;
                }
                let mut y = start_y;
                while y <= bounds.y1 {
                    path.move_to(Point::new(bounds.x0, y));
                    path.line_to(Point::new(bounds.x1, y));
                    y += spacing;
                }
                self.scene
                    .stroke(&Stroke::new(1.0), Affine::IDENTITY, color, None, &path);
            }
            GridStyle::Dots => {
                let dot = 1.0;
                let mut x = start_x;
                while x <= bounds.x1 {
                    let mut y = start_y;
                    while y <= bounds.y1 {
                        push_square(&mut path, Rect::new(x - dot, y - dot, x + dot, y + dot));
                        y += spacing;
                    }
                    x += spacing;
                }
                self.scene
                    .fill(Fill::NonZero, Affine::IDENTITY, color, None, &path);
            }
        }
    }

    fn textured_quad(&mut self, corners: &[Point; 4], image: &Arc<DecodedImage>, opacity: f32) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let key = Arc::as_ptr(image) as usize;
        let data = self
            .images
            .entry(key)
            .or_insert_with(|| ImageData {
                data: Blob::new(Arc::new(image.rgba.clone())),
                format: ImageFormat::Rgba8,
                width: image.width,
                height: image.height,
                alpha_type: ImageAlphaType::Alpha,
            })
            .clone();

        // Maps the image's pixel grid onto the parallelogram nw, ne, sw.
        let [nw, ne, _, sw] = *corners;
        let u = (ne - nw) / image.width as f64;
        let v = (sw - nw) / image.height as f64;
        let transform = Affine::new([u.x, u.y, v.x, v.y, nw.x, nw.y]);

        let brush = ImageBrush::new(data).with_alpha(opacity);
        self.scene.draw_image(&brush, transform);
    }
}

impl Surface for VelloSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RendererError::Surface(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> RenderResult<()> {
        self.scene.reset();
        let mut used = Vec::new();
        for command in &frame.commands {
            match command {
                DrawCommand::Clear(color) => {
                    let bounds = self.bounds();
                    self.scene
                        .fill(Fill::NonZero, Affine::IDENTITY, *color, None, &bounds);
                }
                DrawCommand::Checkerboard { light, dark, cell } => {
                    self.checkerboard(*light, *dark, *cell)
                }
                DrawCommand::Grid {
                    style,
                    spacing,
                    origin,
                    color,
                } => self.grid(*style, *spacing, *origin, *color),
                DrawCommand::Mesh { mesh, color } => self.fill_mesh(mesh, *color),
                DrawCommand::TexturedQuad {
                    corners,
                    image,
                    opacity,
                } => {
                    used.push(Arc::as_ptr(image) as usize);
                    self.textured_quad(corners, image, *opacity);
                }
            }
        }
        self.images.retain(|key, _| used.contains(key));
        Ok(())
    }
}

/// One closed subpath per triangle, all wound the same way so non-zero
/// filling covers overlaps once.
fn mesh_path(mesh: &Mesh) -> BezPath {
    let mut path = BezPath::new();
    for [a, b, c] in mesh.triangles() {
        let (b, c) = if (b - a).cross(c - a) < 0.0 { (c, b) } else { (b, c) };
        path.move_to(a);
        path.line_to(b);
        path.line_to(c);
        path.close_path();
    }
    path
}

fn push_square(path: &mut BezPath, rect: Rect) {
    path.move_to(Point::new(rect.x0, rect.y0));
    path.line_to(Point::new(rect.x1, rect.y0));
    path.line_to(Point::new(rect.x1, rect.y1));
    path.line_to(Point::new(rect.x0, rect.y1));
    path.close_path();
}
