//! Render targets.
//!
//! A [`SurfaceTarget`] creates a [`Surface`]; a surface presents finished
//! frames. [`HeadlessSurface`] rasterizes on the CPU into an RGBA8 buffer and
//! is what tests and offscreen hosts use.

use crate::cache::DecodedImage;
use crate::frame::{DrawCommand, Frame};
use crate::renderer::{GridStyle, RenderResult, RendererError};
use crate::tessellate::Mesh;
use kurbo::{Point, Vec2};
use peniko::Color;

/// Something frames can be presented to.
pub trait Surface {
    /// Size in pixels.
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Draw a frame. Commands run in order; geometry outside the surface is
    /// clipped.
    fn present(&mut self, frame: &Frame) -> RenderResult<()>;
}

/// Creates surfaces, e.g. from a window or a canvas element.
pub trait SurfaceTarget {
    type Surface: Surface;

    fn create_surface(&mut self, width: u32, height: u32) -> RenderResult<Self::Surface>;
}

/// Target for offscreen rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessTarget;

impl SurfaceTarget for HeadlessTarget {
    type Surface = HeadlessSurface;

    fn create_surface(&mut self, width: u32, height: u32) -> RenderResult<HeadlessSurface> {
        HeadlessSurface::new(width, height)
    }
}

/// CPU rasterizer into straight-alpha RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    frames_presented: u64,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RendererError::InitFailed(format!(
                "cannot create a {width}x{height} surface"
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            frames_presented: 0,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn set(&mut self, x: u32, y: u32, color: [u8; 4]) {
        let i = self.index(x, y);
        self.pixels[i..i + 4].copy_from_slice(&color);
    }

    /// Source-over blend of a straight-alpha color.
    fn blend(&mut self, x: u32, y: u32, src: [f32; 4]) {
        let sa = src[3].clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        let i = self.index(x, y);
        let dst = &mut self.pixels[i..i + 4];
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for c in 0..3 {
            let d = dst[c] as f32 / 255.0;
            let out = (src[c] * sa + d * da * (1.0 - sa)) / out_a;
            dst[c] = to_u8(out);
        }
        dst[3] = to_u8(out_a);
    }

    fn fill_all(&mut self, color: Color) {
        let rgba = to_rgba8(color);
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn checkerboard(&mut self, light: Color, dark: Color, cell: f64) {
        let cell = cell.max(1.0);
        let (light, dark) = (to_rgba8(light), to_rgba8(dark));
        for y in 0..self.height {
            for x in 0..self.width {
                let parity = ((x as f64 / cell).floor() + (y as f64 / cell).floor()) as i64;
                self.set(x, y, if parity % 2 == 0 { light } else { dark });
            }
        }
    }

    fn grid(&mut self, style: GridStyle, spacing: f64, origin: Point, color: Color) {
        if style == GridStyle::None || spacing <= 0.0 {
            return;
        }
        let src = color.components;
        let distance = |p: f64, o: f64| {
            let r = (p - o).rem_euclid(spacing);
            r.min(spacing - r)
        };
        for y in 0..self.height {
            let dy = distance(y as f64 + 0.5, origin.y);
            for x in 0..self.width {
                let dx = distance(x as f64 + 0.5, origin.x);
                let on = match style {
                    GridStyle::Lines => dx <= 0.5 || dy <= 0.5,
                    GridStyle::Dots => dx <= 1.0 && dy <= 1.0,
                    GridStyle::None => false,
                };
                if on {
                    self.blend(x, y, src);
                }
            }
        }
    }

    /// Fill a mesh. Coverage is collected first so overlapping triangles
    /// blend each pixel once.
    fn mesh(&mut self, mesh: &Mesh, color: Color) {
        let Some(bounds) = mesh.bounds() else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.clip(bounds.x0, bounds.y0, bounds.x1, bounds.y1) else {
            return;
        };
        let w = (x1 - x0) as usize;
        let mut coverage = vec![false; w * (y1 - y0) as usize];

        for [a, b, c] in mesh.triangles() {
            let tx0 = a.x.min(b.x).min(c.x);
            let ty0 = a.y.min(b.y).min(c.y);
            let tx1 = a.x.max(b.x).max(c.x);
            let ty1 = a.y.max(b.y).max(c.y);
            let Some((sx0, sy0, sx1, sy1)) = self.clip(tx0, ty0, tx1, ty1) else {
                continue;
            };
            for y in sy0..sy1 {
                for x in sx0..sx1 {
                    let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    if in_triangle(p, a, b, c) {
                        coverage[(y - y0) as usize * w + (x - x0) as usize] = true;
                    }
                }
            }
        }

        let src = color.components;
        for (i, covered) in coverage.into_iter().enumerate() {
            if covered {
                let x = x0 + (i % w) as u32;
                let y = y0 + (i / w) as u32;
                self.blend(x, y, src);
            }
        }
    }

    fn textured_quad(&mut self, corners: &[Point; 4], image: &DecodedImage, opacity: f32) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let [nw, ne, _, sw] = *corners;
        let u_axis = ne - nw;
        let v_axis = sw - nw;
        let det = u_axis.cross(v_axis);
        if det.abs() < f64::EPSILON {
            return;
        }
        let xs = corners.iter().map(|p| p.x);
        let ys = corners.iter().map(|p| p.y);
        let (min_x, max_x) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let (min_y, max_y) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let Some((x0, y0, x1, y1)) = self.clip(min_x, min_y, max_x, max_y) else {
            return;
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let d = Point::new(x as f64 + 0.5, y as f64 + 0.5) - nw;
                let u = d.cross(v_axis) / det;
                let v = u_axis.cross(d) / det;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let px = image.pixel(
                    (u * image.width as f64) as u32,
                    (v * image.height as f64) as u32,
                );
                let src = [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0 * opacity,
                ];
                self.blend(x, y, src);
            }
        }
    }

    /// Pixel range `[x0, x1) x [y0, y1)` covering a float box, clipped to the
    /// surface.
    fn clip(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<(u32, u32, u32, u32)> {
        let cx0 = x0.floor().max(0.0);
        let cy0 = y0.floor().max(0.0);
        let cx1 = x1.ceil().min(self.width as f64);
        let cy1 = y1.ceil().min(self.height as f64);
        if !(cx0 < cx1 && cy0 < cy1) {
            return None;
        }
        Some((cx0 as u32, cy0 as u32, cx1 as u32, cy1 as u32))
    }
}

impl Surface for HeadlessSurface {
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
        self.pixels = vec![0; width as usize * height as usize * 4];
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> RenderResult<()> {
        for command in &frame.commands {
            match command {
                DrawCommand::Clear(color) => self.fill_all(*color),
                DrawCommand::Checkerboard { light, dark, cell } => {
                    self.checkerboard(*light, *dark, *cell)
                }
                DrawCommand::Grid {
                    style,
                    spacing,
                    origin,
                    color,
                } => self.grid(*style, *spacing, *origin, *color),
                DrawCommand::Mesh { mesh, color } => self.mesh(mesh, *color),
                DrawCommand::TexturedQuad {
                    corners,
                    image,
                    opacity,
                } => self.textured_quad(corners, image, *opacity),
            }
        }
        self.frames_presented += 1;
        Ok(())
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_rgba8(color: Color) -> [u8; 4] {
    color.components.map(to_u8)
}

/// Inclusive point-in-triangle test for either winding.
fn in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let edge = |from: Point, to: Point| -> f64 { Vec2::cross(to - from, p - from) };
    let (d1, d2, d3) = (edge(a, b), edge(b, c), edge(c, a));
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
