//! Group shape for combining multiple elements.

use super::ElementId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from walking the group hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// A group (directly or indirectly) contains itself.
    #[error("group {0} contains itself")]
    Cycle(ElementId),
    /// An id that is not an element of the document.
    #[error("element {0} not found")]
    MissingElement(ElementId),
}

/// An ordered set of child element ids.
///
/// Groups have no geometry of their own. Their bounds are always derived from
/// the flattened children, and child order is z-order within the group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub child_ids: Vec<ElementId>,
}

impl Group {
    pub fn new(child_ids: Vec<ElementId>) -> Self {
        Self { child_ids }
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.child_ids.contains(&id)
    }

    /// Remove a child id. Returns whether it was present.
    pub fn remove_child(&mut self, id: ElementId) -> bool {
        let before = self.child_ids.len();
        self.child_ids.retain(|child| *child != id);
        self.child_ids.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.child_ids.is_empty()
    }
}
