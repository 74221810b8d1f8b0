//! Frame scheduling: draw when the store changed, skip otherwise.

use crate::cache::{ImageCache, RenderCaches};
use crate::frame::build_frame;
use crate::renderer::{RenderResult, RenderState, RenderStyle, RendererError};
use crate::surface::{Surface, SurfaceTarget};
use kurbo::Size;
use log::{debug, trace};
use planar_core::canvas::Canvas;
use planar_core::viewport::Viewport;
use std::cell::RefCell;
use std::rc::Rc;

/// Where the render loop reads state from.
///
/// The cheap accessors are polled every tick; `capture` only runs when one of
/// them changed.
pub trait StateSource {
    fn revision(&self) -> u64;
    fn viewport(&self) -> Viewport;
    fn viewport_size(&self) -> Size;
    fn capture(&self) -> RenderState;
}

impl StateSource for Canvas {
    fn revision(&self) -> u64 {
        Canvas::revision(self)
    }

    fn viewport(&self) -> Viewport {
        Canvas::viewport(self)
    }

    fn viewport_size(&self) -> Size {
        Canvas::viewport_size(self)
    }

    fn capture(&self) -> RenderState {
        RenderState::capture(self)
    }
}

impl<T: StateSource> StateSource for Rc<RefCell<T>> {
    fn revision(&self) -> u64 {
        self.borrow().revision()
    }

    fn viewport(&self) -> Viewport {
        self.borrow().viewport()
    }

    fn viewport_size(&self) -> Size {
        self.borrow().viewport_size()
    }

    fn capture(&self) -> RenderState {
        self.borrow().capture()
    }
}

/// What the last frame was drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameKey {
    revision: u64,
    viewport: Viewport,
    size: Size,
}

impl FrameKey {
    fn of(state: &RenderState) -> Self {
        Self {
            revision: state.revision,
            viewport: state.viewport,
            size: state.viewport_size,
        }
    }
}

/// Draws canvas state onto a surface.
pub struct CanvasRenderer<S: Surface> {
    surface: Option<S>,
    style: RenderStyle,
    caches: RenderCaches,
    source: Option<Box<dyn StateSource>>,
    last: Option<FrameKey>,
    dirty: bool,
    frames_drawn: u64,
}

impl<S: Surface> CanvasRenderer<S> {
    pub fn new<T>(target: &mut T, width: u32, height: u32) -> RenderResult<Self>
    where
        T: SurfaceTarget<Surface = S>,
    {
        let surface = target.create_surface(width, height)?;
        debug!("Renderer initialized at {width}x{height}");
        Ok(Self {
            surface: Some(surface),
            style: RenderStyle::default(),
            caches: RenderCaches::new(),
            source: None,
            last: None,
            dirty: true,
            frames_drawn: 0,
        })
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        self.style = style;
        self.dirty = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.surface_mut()?.resize(width, height)?;
        debug!("Surface resized to {width}x{height}");
        self.dirty = true;
        Ok(())
    }

    /// Force the next tick to draw.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Start drawing from `source` on every [`tick`](Self::tick).
    pub fn start_render_loop(&mut self, source: impl StateSource + 'static) {
        debug!("Render loop started");
        self.source = Some(Box::new(source));
        self.dirty = true;
    }

    pub fn stop_render_loop(&mut self) {
        if self.source.take().is_some() {
            debug!("Render loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    /// One iteration of the loop. Returns whether a frame was drawn.
    pub fn tick(&mut self) -> RenderResult<bool> {
        let Some(source) = &self.source else {
            return Ok(false);
        };
        let key = FrameKey {
            revision: source.revision(),
            viewport: source.viewport(),
            size: source.viewport_size(),
        };
        if !self.dirty && self.last == Some(key) {
            return Ok(false);
        }
        let state = source.capture();
        self.render(&state)?;
        Ok(true)
    }

    /// Draw one frame from `state`.
    pub fn render(&mut self, state: &RenderState) -> RenderResult<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(RendererError::RenderFailed(
                "renderer has been destroyed".to_string(),
            ));
        };
        let frame = build_frame(state, &self.style, &mut self.caches);
        surface.present(&frame)?;
        trace!(
            "Frame {} at revision {}: {} commands",
            self.frames_drawn,
            state.revision,
            frame.commands.len()
        );
        self.last = Some(FrameKey::of(state));
        self.dirty = false;
        self.frames_drawn += 1;
        Ok(())
    }

    /// Release the surface and caches. Later renders fail.
    pub fn destroy(&mut self) {
        self.stop_render_loop();
        self.surface = None;
        self.caches.clear();
        self.last = None;
        debug!("Renderer destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.surface.is_none()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    fn surface_mut(&mut self) -> RenderResult<&mut S> {
        self.surface
            .as_mut()
            .ok_or_else(|| RendererError::Surface("renderer has been destroyed".to_string()))
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn caches_mut(&mut self) -> &mut RenderCaches {
        &mut self.caches
    }

    /// Image cache, for hosts that fetch non-`data:` images themselves.
    /// Call [`mark_dirty`](Self::mark_dirty) after inserting bytes.
    pub fn image_cache_mut(&mut self) -> &mut ImageCache {
        &mut self.caches.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{HeadlessSurface, HeadlessTarget};
    use planar_core::shapes::Element;

    fn setup() -> (Rc<RefCell<Canvas>>, CanvasRenderer<HeadlessSurface>) {
        let mut canvas = Canvas::new();
        canvas.set_viewport_size(40.0, 30.0);
        canvas.add(Element::rect(5.0, 5.0, 10.0, 10.0));
        let renderer = CanvasRenderer::new(&mut HeadlessTarget, 40, 30).unwrap();
        (Rc::new(RefCell::new(canvas)), renderer)
    }

    #[test]
    fn test_tick_skips_when_unchanged() {
        let (canvas, mut renderer) = setup();
        assert!(!renderer.tick().unwrap());

        renderer.start_render_loop(canvas.clone());
        assert!(renderer.tick().unwrap());
        assert!(!renderer.tick().unwrap());
        assert_eq!(renderer.frames_drawn(), 1);

        canvas.borrow_mut().add(Element::ellipse(20.0, 10.0, 5.0, 5.0));
        assert!(renderer.tick().unwrap());
        assert!(!renderer.tick().unwrap());

        canvas
            .borrow_mut()
            .set_viewport(Viewport::new(3.0, 0.0, 1.0));
        assert!(renderer.tick().unwrap());

        canvas.borrow_mut().set_viewport_size(20.0, 20.0);
        assert!(renderer.tick().unwrap());

        renderer.mark_dirty();
        assert!(renderer.tick().unwrap());
        assert_eq!(renderer.frames_drawn(), 5);

        renderer.stop_render_loop();
        canvas.borrow_mut().add(Element::rect(0.0, 0.0, 1.0, 1.0));
        assert!(!renderer.tick().unwrap());
    }

    #[test]
    fn test_render_is_deterministic() {
        let (canvas, mut renderer) = setup();
        let state = RenderState::capture(&canvas.borrow());
        renderer.render(&state).unwrap();
        let first = renderer.surface().unwrap().pixels().to_vec();
        renderer.render(&state).unwrap();
        assert_eq!(renderer.surface().unwrap().pixels(), first.as_slice());
        assert_eq!(renderer.surface().unwrap().frames_presented(), 2);
    }

    #[test]
    fn test_resize_and_destroy() {
        let (canvas, mut renderer) = setup();
        renderer.start_render_loop(canvas.clone());
        renderer.tick().unwrap();

        renderer.resize(64, 48).unwrap();
        assert_eq!(renderer.surface().unwrap().size(), (64, 48));
        assert!(renderer.tick().unwrap());

        renderer.destroy();
        assert!(renderer.is_destroyed());
        assert!(!renderer.is_running());
        let state = RenderState::capture(&canvas.borrow());
        assert!(matches!(
            renderer.render(&state),
            Err(RendererError::RenderFailed(_))
        ));
        assert!(renderer.resize(10, 10).is_err());
    }

    #[test]
    fn test_new_propagates_target_error() {
        let result = CanvasRenderer::new(&mut HeadlessTarget, 0, 0);
        assert!(matches!(result, Err(RendererError::InitFailed(_))));
    }
}
