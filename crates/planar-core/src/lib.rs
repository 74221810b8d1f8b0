//! Planar Core Library
//!
//! Platform-agnostic document model, geometry, hit-testing, snapping and
//! interaction logic for the Planar vector design canvas.

pub mod canvas;
pub mod geometry;
pub mod input;
pub mod interaction;
pub mod manipulation;
pub mod selection;
pub mod settings;
pub mod shapes;
pub mod snap;
pub mod viewport;

pub use canvas::{Canvas, Document, InteractionFlags, Tool};
pub use geometry::{OrientedBox, axis_aligned_bounding_box, group_oriented_bounding_box};
pub use hit_test::{hit_test_handle, hit_test_marquee, hit_test_point};
pub use input::{KeyEvent, KeyState, Modifier, Modifiers, MouseButton, PointerEvent};
pub use interaction::{Cursor, Gesture, InteractionMachine};
pub use selection::{HandleFrame, ResizeHandle, SelectionFrame, selection_frame};
pub use settings::{EditorSettings, InteractionSettings, SnapSettings};
pub use shapes::{Element, ElementId, SerializableColor, Shape};
pub use snap::{SmartGuide, SnapCandidate, SnapResult, snap_angle, snap_bounds, snap_point};
pub use viewport::Viewport;

pub use kurbo;
pub use peniko;
