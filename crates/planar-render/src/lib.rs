//! Planar Render Library
//!
//! Turns canvas state into frames of screen-space draw commands and presents
//! them on a surface. [`HeadlessSurface`] rasterizes on the CPU; the optional
//! Vello backend encodes the same frames into a GPU scene.

pub mod cache;
pub mod frame;
pub mod render_loop;
mod renderer;
pub mod surface;
pub mod tessellate;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use cache::{DecodedImage, ImageCache, PathCache, RenderCaches};
pub use frame::{DrawCommand, Frame, build_frame};
pub use render_loop::{CanvasRenderer, StateSource};
pub use renderer::{GridStyle, RenderResult, RenderState, RenderStyle, RendererError};
pub use surface::{HeadlessSurface, HeadlessTarget, Surface, SurfaceTarget};
pub use tessellate::{Mesh, Polyline};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::{VelloSurface, VelloTarget};
