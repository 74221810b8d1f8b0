//! Renderer-owned caches. The document stays plain data; anything derived
//! and expensive (flattened paths, decoded images) lives here.

use crate::renderer::{RenderResult, RendererError};
use crate::tessellate::{Mesh, Polyline, fill_polylines, flatten_path};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kurbo::Shape as _;
use planar_core::shapes::{ElementId, PathShape};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Tessellated path in the path's own coordinates (before `position`).
#[derive(Debug, Clone)]
pub struct CachedPath {
    d: String,
    pub outlines: Vec<Polyline>,
    pub fill: Mesh,
}

/// Flattening never goes finer than this fraction of the path's extent, which
/// bounds the vertex count handed to ear clipping for very large paths.
const MIN_RELATIVE_TOLERANCE: f64 = 1e-4;

/// Path tessellations keyed by element id, invalidated when `d` changes.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<ElementId, CachedPath>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tessellation for `path`, rebuilt if its `d` differs from the cached
    /// one. Unparseable data yields `None`.
    pub fn get(&mut self, id: ElementId, path: &PathShape, tolerance: f64) -> Option<&CachedPath> {
        let stale = self.entries.get(&id).is_none_or(|cached| cached.d != path.d);
        if stale {
            let Some(bez) = path.parse() else {
                self.entries.remove(&id);
                return None;
            };
            let extent = bez.bounding_box().size();
            let tolerance = tolerance.max(extent.width.hypot(extent.height) * MIN_RELATIVE_TOLERANCE);
            let outlines = flatten_path(&bez, tolerance);
            let fill = fill_polylines(&outlines);
            log::trace!("Tessellated path {id} ({} subpaths)", outlines.len());
            self.entries.insert(
                id,
                CachedPath {
                    d: path.d.clone(),
                    outlines,
                    fill,
                },
            );
        }
        self.entries.get(&id)
    }

    /// Drop entries for elements that no longer exist.
    pub fn retain(&mut self, mut live: impl FnMut(&ElementId) -> bool) {
        self.entries.retain(|id, _| live(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Decode PNG, JPEG or WebP bytes.
    pub fn decode(href: &str, bytes: &[u8]) -> RenderResult<Self> {
        let decoded = image::load_from_memory(bytes).map_err(|err| RendererError::ImageDecode {
            href: href.to_string(),
            reason: err.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    /// Pixel at `(x, y)`, clamped to the image.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let i = (y as usize * self.width as usize + x as usize) * 4;
        match self.rgba.get(i..i + 4) {
            Some(p) => [p[0], p[1], p[2], p[3]],
            None => [0, 0, 0, 0],
        }
    }
}

#[derive(Debug, Clone)]
enum ImageEntry {
    Ready(Arc<DecodedImage>),
    Failed,
}

/// Decoded images keyed by `href`.
///
/// `data:` URLs are decoded on first use. Other hrefs stay pending until the
/// host supplies their bytes with [`ImageCache::insert_bytes`]; until then
/// the renderer draws a placeholder.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, ImageEntry>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and store bytes for `href`. A failure is remembered so the
    /// image is not retried every frame.
    pub fn insert_bytes(&mut self, href: &str, bytes: &[u8]) -> RenderResult<Arc<DecodedImage>> {
        match DecodedImage::decode(href, bytes) {
            Ok(image) => {
                let image = Arc::new(image);
                self.entries
                    .insert(href.to_string(), ImageEntry::Ready(image.clone()));
                Ok(image)
            }
            Err(err) => {
                log::warn!("{err}");
                self.entries.insert(href.to_string(), ImageEntry::Failed);
                Err(err)
            }
        }
    }

    /// Decoded image for `href`, if available.
    pub fn resolve(&mut self, href: &str) -> Option<Arc<DecodedImage>> {
        match self.entries.get(href) {
            Some(ImageEntry::Ready(image)) => return Some(image.clone()),
            Some(ImageEntry::Failed) => return None,
            None => {}
        }
        match decode_data_url(href)? {
            Ok(bytes) => self.insert_bytes(href, &bytes).ok(),
            Err(reason) => {
                log::warn!("Bad data URL for image: {reason}");
                self.entries.insert(href.to_string(), ImageEntry::Failed);
                None
            }
        }
    }

    pub fn is_failed(&self, href: &str) -> bool {
        matches!(self.entries.get(href), Some(ImageEntry::Failed))
    }

    pub fn remove(&mut self, href: &str) {
        self.entries.remove(href);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Everything the renderer keeps between frames.
#[derive(Debug, Default)]
pub struct RenderCaches {
    pub paths: PathCache,
    pub images: ImageCache,
    /// Cyclic groups already warned about.
    pub(crate) reported_cycles: HashSet<ElementId>,
}

impl RenderCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.images.clear();
        self.reported_cycles.clear();
    }
}

/// Payload of a `data:` URL. `None` for any other scheme.
fn decode_data_url(href: &str) -> Option<Result<Vec<u8>, String>> {
    let rest = href.strip_prefix("data:")?;
    let Some((meta, payload)) = rest.split_once(',') else {
        return Some(Err("missing ','".to_string()));
    };
    if meta.ends_with(";base64") {
        Some(STANDARD.decode(payload.trim()).map_err(|e| e.to_string()))
    } else {
        Some(Ok(payload.as_bytes().to_vec()))
    }
}
