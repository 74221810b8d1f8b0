//! Editor settings: snapping toggles and interaction tolerances.
//!
//! Every field has a default, so partial JSON documents load cleanly.

use crate::input::Modifier;
use serde::{Deserialize, Serialize};

/// Snapping toggles and tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    pub snap_to_grid: bool,
    pub snap_to_objects: bool,
    pub snap_to_geometry: bool,
    /// Snap distance in screen pixels.
    pub threshold_px: f64,
    /// Grid spacing in world units.
    pub grid_size: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            snap_to_grid: false,
            snap_to_objects: true,
            snap_to_geometry: false,
            threshold_px: 10.0,
            grid_size: 10.0,
        }
    }
}

impl SnapSettings {
    /// All passes off.
    pub fn disabled() -> Self {
        Self {
            snap_to_grid: false,
            snap_to_objects: false,
            snap_to_geometry: false,
            ..Self::default()
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.snap_to_grid || self.snap_to_objects || self.snap_to_geometry
    }
}

/// Gesture tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Smallest width/height a resize can produce, in world units.
    pub min_size: f64,
    /// Modifier that turns a corner-handle press into a rotation.
    pub rotate_modifier: Modifier,
    /// Rotation step used while Shift is held, in degrees.
    pub angle_snap_degrees: f64,
    /// Snap resize edges to objects and the grid as well as drags.
    pub snap_while_resizing: bool,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            min_size: 20.0,
            rotate_modifier: Modifier::Alt,
            angle_snap_degrees: 15.0,
            snap_while_resizing: false,
        }
    }
}

/// All editor settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub snap: SnapSettings,
    pub interaction: InteractionSettings,
}

impl EditorSettings {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EditorSettings::default();
        assert!((settings.snap.threshold_px - 10.0).abs() < f64::EPSILON);
        assert!((settings.snap.grid_size - 10.0).abs() < f64::EPSILON);
        assert!((settings.interaction.min_size - 20.0).abs() < f64::EPSILON);
        assert_eq!(settings.interaction.rotate_modifier, Modifier::Alt);
    }

    #[test]
    fn test_partial_json() {
        let settings =
            EditorSettings::from_json(r#"{ "snap": { "snap_to_grid": true, "grid_size": 25 } }"#)
                .unwrap();
        assert!(settings.snap.snap_to_grid);
        assert!(settings.snap.snap_to_objects);
        assert!((settings.snap.grid_size - 25.0).abs() < f64::EPSILON);
        assert_eq!(settings.interaction, InteractionSettings::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut settings = EditorSettings::default();
        settings.interaction.rotate_modifier = Modifier::Ctrl;
        let restored = EditorSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_disabled() {
        assert!(!SnapSettings::disabled().any_enabled());
        assert!(SnapSettings::default().any_enabled());
    }
}
