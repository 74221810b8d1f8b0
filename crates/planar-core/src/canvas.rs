//! Canvas document and state management.
//!
//! [`Document`] owns the elements and the group hierarchy. [`Canvas`] wraps it
//! with everything else the interaction machine writes and the renderer reads:
//! selection, viewport, interaction flags, snap settings and guides.

use crate::geometry::{
    OrientedBox, axis_aligned_bounding_box, element_bounds, group_oriented_bounding_box,
};
use crate::settings::EditorSettings;
use crate::shapes::{Element, ElementId, HierarchyError, SerializableColor};
use crate::snap::SmartGuide;
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Padding in screen pixels around content for fit-to-screen.
const FIT_PADDING: f64 = 50.0;

/// All elements of a canvas and their hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    /// All elements, keyed by ID.
    elements: HashMap<ElementId, Element>,
    /// Paint order of top-level elements (back to front).
    root_order: Vec<ElementId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            elements: HashMap::new(),
            root_order: Vec::new(),
        }
    }

    /// Add an element on top of its parent's children (or of the root when
    /// it has no parent). A `parent_id` that is not a group is cleared.
    pub fn add(&mut self, mut element: Element) -> ElementId {
        let id = element.id;
        match element.parent_id {
            Some(parent_id) => {
                match self
                    .elements
                    .get_mut(&parent_id)
                    .and_then(|p| p.shape.as_group_mut())
                {
                    Some(group) => group.child_ids.push(id),
                    None => {
                        log::warn!("Parent {parent_id} of {id} is not a group; adding at root");
                        element.parent_id = None;
                        self.root_order.push(id);
                    }
                }
            }
            None => self.root_order.push(id),
        }
        self.elements.insert(id, element);
        id
    }

    /// Add an element as the topmost child of `group_id`.
    pub fn add_child(&mut self, group_id: ElementId, mut element: Element) -> Option<ElementId> {
        if !self.get(group_id).is_some_and(Element::is_group) {
            return None;
        }
        element.parent_id = Some(group_id);
        Some(self.add(element))
    }

    /// Get an element by ID.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Get a mutable reference to an element by ID.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Apply `f` to an element. Returns false if the element does not exist.
    pub fn patch(&mut self, id: ElementId, f: impl FnOnce(&mut Element)) -> bool {
        match self.elements.get_mut(&id) {
            Some(element) => {
                f(element);
                true
            }
            None => false,
        }
    }

    /// Remove an element. Removing a group removes its whole subtree.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.detach(id);
        let element = self.elements.remove(&id)?;
        if let Some(group) = element.shape.as_group() {
            let mut visited = HashSet::from([id]);
            let mut stack = group.child_ids.clone();
            while let Some(child) = stack.pop() {
                if !visited.insert(child) {
                    continue;
                }
                let removed = self.elements.remove(&child);
                if let Some(g) = removed.as_ref().and_then(|e| e.shape.as_group()) {
                    stack.extend(g.child_ids.iter().copied());
                }
            }
        }
        Some(element)
    }

    /// Take an element out of its parent's (or the root's) ordering.
    fn detach(&mut self, id: ElementId) {
        if let Some(siblings) = self.siblings_mut(id) {
            siblings.retain(|&s| s != id);
        }
    }

    fn siblings_mut(&mut self, id: ElementId) -> Option<&mut Vec<ElementId>> {
        let parent_id = self.elements.get(&id)?.parent_id;
        match parent_id {
            Some(parent_id) => self
                .elements
                .get_mut(&parent_id)
                .and_then(|p| p.shape.as_group_mut())
                .map(|g| &mut g.child_ids),
            None => Some(&mut self.root_order),
        }
    }

    /// Move an element to `index` within its parent. Returns false if the
    /// element does not exist.
    pub fn reorder(&mut self, id: ElementId, index: usize) -> bool {
        let Some(siblings) = self.siblings_mut(id) else {
            return false;
        };
        let Some(pos) = siblings.iter().position(|&s| s == id) else {
            return false;
        };
        siblings.remove(pos);
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        true
    }

    /// Bring an element to the front of its parent.
    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.reorder(id, usize::MAX)
    }

    /// Send an element to the back of its parent.
    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.reorder(id, 0)
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Top-level element ids, back to front.
    pub fn root_order(&self) -> &[ElementId] {
        &self.root_order
    }

    /// Iterate over all elements in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Child ids of a group; empty for anything else.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id)
            .and_then(|e| e.shape.as_group())
            .map(|g| g.child_ids.as_slice())
            .unwrap_or_default()
    }

    /// Every element in paint order (back to front), each group immediately
    /// followed by its subtree. Elements reached through a cycle are listed
    /// once.
    pub fn paint_order(&self) -> Vec<ElementId> {
        let mut order = Vec::with_capacity(self.elements.len());
        let mut visited = HashSet::new();
        for &id in &self.root_order {
            self.collect_paint_order(id, &mut visited, &mut order);
        }
        order
    }

    /// An element followed by everything under it, in paint order.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        self.collect_paint_order(id, &mut HashSet::new(), &mut order);
        order
    }

    fn collect_paint_order(
        &self,
        id: ElementId,
        visited: &mut HashSet<ElementId>,
        order: &mut Vec<ElementId>,
    ) {
        if !self.elements.contains_key(&id) || !visited.insert(id) {
            return;
        }
        order.push(id);
        for &child in self.children(id) {
            self.collect_paint_order(child, visited, order);
        }
    }

    /// Leaf descendants of a group, in paint order.
    pub fn flatten_group(&self, id: ElementId) -> Result<Vec<ElementId>, HierarchyError> {
        if !self.elements.contains_key(&id) {
            return Err(HierarchyError::MissingElement(id));
        }
        let mut leaves = Vec::new();
        let mut path = Vec::new();
        self.flatten_into(id, &mut path, &mut leaves)?;
        Ok(leaves)
    }

    fn flatten_into(
        &self,
        id: ElementId,
        path: &mut Vec<ElementId>,
        leaves: &mut Vec<ElementId>,
    ) -> Result<(), HierarchyError> {
        let Some(element) = self.get(id) else {
            return Ok(());
        };
        let Some(group) = element.shape.as_group() else {
            leaves.push(id);
            return Ok(());
        };
        if path.contains(&id) {
            return Err(HierarchyError::Cycle(id));
        }
        path.push(id);
        for &child in &group.child_ids {
            self.flatten_into(child, path, leaves)?;
        }
        path.pop();
        Ok(())
    }

    /// Expand groups in `ids` into their leaves. Cyclic groups are skipped
    /// with a warning.
    pub fn flatten_ids(&self, ids: &[ElementId]) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &id in ids {
            let leaves = match self.get(id) {
                Some(e) if e.is_group() => match self.flatten_group(id) {
                    Ok(leaves) => leaves,
                    Err(err) => {
                        log::warn!("Skipping group {id}: {err}");
                        continue;
                    }
                },
                Some(_) => vec![id],
                None => continue,
            };
            for leaf in leaves {
                if seen.insert(leaf) {
                    out.push(leaf);
                }
            }
        }
        out
    }

    /// Ancestors of an element, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|e| e.parent_id);
        while let Some(parent) = current {
            if parent == id || out.contains(&parent) {
                break;
            }
            out.push(parent);
            current = self.get(parent).and_then(|e| e.parent_id);
        }
        out
    }

    /// Outermost group containing the element, or the element itself.
    pub fn top_level_ancestor(&self, id: ElementId) -> ElementId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// Visible itself and under no hidden group.
    pub fn is_effectively_visible(&self, id: ElementId) -> bool {
        self.get(id).is_some_and(|e| e.visible)
            && self
                .ancestors(id)
                .iter()
                .all(|a| self.get(*a).is_none_or(|e| e.visible))
    }

    /// Locked itself or under a locked group.
    pub fn is_effectively_locked(&self, id: ElementId) -> bool {
        self.get(id).is_some_and(|e| e.locked)
            || self
                .ancestors(id)
                .iter()
                .any(|a| self.get(*a).is_some_and(|e| e.locked))
    }

    /// Leaf elements of a group, resolved.
    pub fn group_leaves(&self, id: ElementId) -> Result<Vec<&Element>, HierarchyError> {
        Ok(self
            .flatten_group(id)?
            .into_iter()
            .filter_map(|leaf| self.get(leaf))
            .collect())
    }

    /// Oriented bounds of a group in its own rotated frame.
    pub fn group_oriented_box(&self, id: ElementId) -> Option<OrientedBox> {
        let rotation = self.get(id)?.rotation;
        match self.group_leaves(id) {
            Ok(leaves) => group_oriented_bounding_box(leaves, rotation),
            Err(err) => {
                log::warn!("Treating group {id} as empty: {err}");
                None
            }
        }
    }

    /// World-space axis-aligned bounds of any element. Group bounds are
    /// derived from their leaves.
    pub fn world_bounds(&self, id: ElementId) -> Option<Rect> {
        let element = self.get(id)?;
        if !element.is_group() {
            return element_bounds(element);
        }
        match self.group_leaves(id) {
            Ok(leaves) => axis_aligned_bounding_box(leaves),
            Err(err) => {
                log::warn!("Treating group {id} as empty: {err}");
                None
            }
        }
    }

    /// Bounds of all visible content.
    pub fn bounds(&self) -> Option<Rect> {
        let leaves = self.flatten_ids(&self.root_order);
        axis_aligned_bounding_box(
            leaves
                .iter()
                .filter(|id| self.is_effectively_visible(**id))
                .filter_map(|id| self.get(*id)),
        )
    }

    /// Group sibling elements into a new group placed at the position of the
    /// frontmost one. Returns `None` unless at least one of `ids` exists and
    /// all of them share a parent.
    pub fn group_elements(&mut self, ids: &[ElementId]) -> Option<ElementId> {
        let first = self.get(*ids.first()?)?;
        let parent_id = first.parent_id;
        if ids
            .iter()
            .any(|id| self.get(*id).is_none_or(|e| e.parent_id != parent_id))
        {
            return None;
        }

        let mut group = Element::group();
        group.parent_id = parent_id;
        let group_id = group.id;

        let siblings = self.siblings_mut(ids[0])?;
        let members: Vec<ElementId> = siblings
            .iter()
            .copied()
            .filter(|s| ids.contains(s))
            .collect();
        let insert_at = siblings.iter().rposition(|s| ids.contains(s))? + 1 - members.len();
        siblings.retain(|s| !ids.contains(s));
        siblings.insert(insert_at, group_id);

        for member in &members {
            if let Some(e) = self.elements.get_mut(member) {
                e.parent_id = Some(group_id);
            }
        }
        if let Some(g) = group.shape.as_group_mut() {
            g.child_ids = members;
        }
        self.elements.insert(group_id, group);
        Some(group_id)
    }

    /// Dissolve a group, putting its children where it was.
    pub fn ungroup(&mut self, group_id: ElementId) -> Option<Vec<ElementId>> {
        let group = self.get(group_id)?;
        let children = group.shape.as_group()?.child_ids.clone();
        let parent_id = group.parent_id;

        let siblings = self.siblings_mut(group_id)?;
        let pos = siblings.iter().position(|&s| s == group_id)?;
        siblings.splice(pos..=pos, children.iter().copied());

        for child in &children {
            if let Some(e) = self.elements.get_mut(child) {
                e.parent_id = parent_id;
            }
        }
        self.elements.remove(&group_id);
        Some(children)
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Active canvas tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Select,
    /// Every primary-button drag pans.
    Pan,
}

/// Gesture flags written by the interaction machine, read by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionFlags {
    pub is_panning: bool,
    pub is_dragging: bool,
    pub is_resizing: bool,
    pub is_rotating: bool,
    pub is_marquee_selecting: bool,
}

impl InteractionFlags {
    pub fn any(&self) -> bool {
        self.is_panning
            || self.is_dragging
            || self.is_resizing
            || self.is_rotating
            || self.is_marquee_selecting
    }
}

/// Runtime canvas state (not persisted).
///
/// Every content change bumps [`Canvas::revision`], which the renderer uses
/// to decide when a frame is dirty. Viewport changes are detected by the
/// renderer on its own.
#[derive(Debug, Clone)]
pub struct Canvas {
    document: Document,
    selection: Vec<ElementId>,
    viewport: Viewport,
    viewport_size: Size,
    flags: InteractionFlags,
    settings: EditorSettings,
    guides: Vec<SmartGuide>,
    selection_box: Option<Rect>,
    tool: Tool,
    background: SerializableColor,
    background_visible: bool,
    revision: u64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create a new canvas with an empty document.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// Create a canvas with an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            selection: Vec::new(),
            viewport: Viewport::default(),
            viewport_size: Size::new(800.0, 600.0),
            flags: InteractionFlags::default(),
            settings: EditorSettings::default(),
            guides: Vec::new(),
            selection_box: None,
            tool: Tool::Select,
            background: SerializableColor::white(),
            background_visible: true,
            revision: 0,
        }
    }

    pub fn with_settings(mut self, settings: EditorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Content revision; changes whenever anything but the viewport does.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable document access. Counts as a content change.
    pub fn document_mut(&mut self) -> &mut Document {
        self.touch();
        &mut self.document
    }

    /// Add an element.
    pub fn add(&mut self, element: Element) -> ElementId {
        self.touch();
        self.document.add(element)
    }

    /// Patch an element by ID.
    pub fn patch(&mut self, id: ElementId, f: impl FnOnce(&mut Element)) -> bool {
        self.touch();
        self.document.patch(id, f)
    }

    /// Remove an element (and its subtree) and drop it from the selection.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.touch();
        let removed = self.document.remove(id);
        let document = &self.document;
        self.selection.retain(|s| document.get(*s).is_some());
        removed
    }

    /// Move an element within its parent.
    pub fn reorder(&mut self, id: ElementId, index: usize) -> bool {
        self.touch();
        self.document.reorder(id, index)
    }

    /// Group the current selection and select the new group.
    pub fn group_selected(&mut self) -> Option<ElementId> {
        let group_id = self.document.group_elements(&self.selection)?;
        self.touch();
        self.selection = vec![group_id];
        Some(group_id)
    }

    /// Ungroup every selected group, selecting the released children.
    pub fn ungroup_selected(&mut self) -> Vec<ElementId> {
        let mut released = Vec::new();
        let mut selection = Vec::new();
        for id in std::mem::take(&mut self.selection) {
            match self.document.ungroup(id) {
                Some(children) => {
                    released.extend(children.iter().copied());
                    selection.extend(children);
                }
                None => selection.push(id),
            }
        }
        self.selection = selection;
        self.touch();
        released
    }

    // Selection

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    /// Replace the selection. Unknown ids are dropped.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        let mut selection: Vec<ElementId> = Vec::new();
        for id in ids {
            if self.document.get(id).is_some() && !selection.contains(&id) {
                selection.push(id);
            }
        }
        if selection != self.selection {
            self.selection = selection;
            self.touch();
        }
    }

    /// Add or remove a single id from the selection.
    pub fn toggle_selection(&mut self, id: ElementId) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
        } else if self.document.get(id).is_some() {
            self.selection.push(id);
        }
        self.touch();
    }

    /// Add ids to the selection, keeping the existing ones.
    pub fn extend_selection(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        let current = self.selection.clone();
        self.set_selection(current.into_iter().chain(ids));
    }

    pub fn select(&mut self, id: ElementId) {
        self.set_selection([id]);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection([]);
    }

    pub fn select_all(&mut self) {
        let ids = self.document.root_order().to_vec();
        self.set_selection(ids);
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    // Viewport

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    /// Set the viewport size in pixels.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
    }

    pub fn screen_to_world(&self, point: Point) -> Point {
        self.viewport.screen_to_world(point)
    }

    pub fn world_to_screen(&self, point: Point) -> Point {
        self.viewport.world_to_screen(point)
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.viewport_size);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(self.viewport_size);
    }

    pub fn zoom_to(&mut self, scale: f64) {
        self.viewport.zoom_to(scale, self.viewport_size);
    }

    /// Fit the view to show all visible content.
    pub fn fit_to_screen(&mut self) {
        if let Some(bounds) = self.document.bounds() {
            self.viewport
                .fit_to_bounds(bounds, self.viewport_size, FIT_PADDING);
        }
    }

    // Interaction state

    pub fn flags(&self) -> InteractionFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: InteractionFlags) {
        if flags != self.flags {
            self.flags = flags;
            self.touch();
        }
    }

    pub fn guides(&self) -> &[SmartGuide] {
        &self.guides
    }

    pub fn set_guides(&mut self, guides: Vec<SmartGuide>) {
        if guides != self.guides {
            self.guides = guides;
            self.touch();
        }
    }

    /// Live marquee rectangle in world space.
    pub fn selection_box(&self) -> Option<Rect> {
        self.selection_box
    }

    pub fn set_selection_box(&mut self, rect: Option<Rect>) {
        if rect != self.selection_box {
            self.selection_box = rect;
            self.touch();
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    // Background

    pub fn background(&self) -> SerializableColor {
        self.background
    }

    pub fn set_background(&mut self, color: SerializableColor) {
        self.background = color;
        self.touch();
    }

    pub fn background_visible(&self) -> bool {
        self.background_visible
    }

    pub fn set_background_visible(&mut self, visible: bool) {
        self.background_visible = visible;
        self.touch();
    }

    // Settings

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EditorSettings {
        &mut self.settings
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.settings.snap.snap_to_grid = enabled;
    }

    pub fn set_snap_to_objects(&mut self, enabled: bool) {
        self.settings.snap.snap_to_objects = enabled;
    }

    pub fn set_snap_to_geometry(&mut self, enabled: bool) {
        self.settings.snap.snap_to_geometry = enabled;
    }

    /// Whether an element is part of the current selection, directly or via
    /// a selected ancestor group.
    pub fn is_covered_by_selection(&self, id: ElementId) -> bool {
        self.is_selected(id)
            || self
                .document
                .ancestors(id)
                .iter()
                .any(|a| self.is_selected(*a))
    }

    /// Whether any selected element (or anything under a selected group) is
    /// locked.
    pub fn selection_has_locked(&self) -> bool {
        self.selection.iter().any(|id| {
            self.document.is_effectively_locked(*id)
                || self
                    .document
                    .flatten_ids(&[*id])
                    .iter()
                    .any(|leaf| self.document.is_effectively_locked(*leaf))
        })
    }
}
