//! Deployment settings, loaded from an optional JSON file.
//!
//! Every field has a default so a partial file (or none at all) works.
//! Command line flags are applied on top by the binary.

use crate::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::Result;
use crate::regions::{ClassifySettings, GeoPoint, DEFAULT_ORIGIN};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Initial map center
    pub center: GeoPoint,
    /// Initial zoom level
    pub zoom: f64,
    pub classify: ClassifySettings,
    pub editor: EditorSettings,
    pub feed: FeedSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_WIDTH,
            canvas_height: DEFAULT_HEIGHT,
            center: DEFAULT_ORIGIN,
            zoom: 14.0,
            classify: ClassifySettings::default(),
            editor: EditorSettings::default(),
            feed: FeedSettings::default(),
        }
    }
}

/// Map editor interaction tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Fee given to regions closed with auto-generated metadata
    pub default_fee: f64,
    /// Prefix for auto-generated region names (`zone_1`, `zone_2`, ...)
    pub name_prefix: String,
    /// Pixel radius around the first vertex that closes a drawing
    pub snap_distance: f64,
    /// Pixel radius for grabbing a vertex handle
    pub vertex_handle_size: f64,
    /// Pixel tolerance when clicking near a region outline
    pub hit_tolerance: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_fee: 0.0,
            name_prefix: "zone".to_string(),
            snap_distance: 12.0,
            vertex_handle_size: 8.0,
            hit_tolerance: 3.0,
        }
    }
}

/// MQTT change feed for region snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 1883,
            topic: "zonefence/regions".to_string(),
            client_id: "zonefence".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings = serde_json::from_str(&json)?;
        info!(path = %path.as_ref().display(), "settings loaded");
        Ok(settings)
    }

    /// Load settings, or fall back to defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{"zoom": 12, "classify": {"fallback_radius_km": 10}, "editor": {"default_fee": 990}}"#,
        )
        .unwrap();
        assert_eq!(settings.zoom, 12.0);
        assert_eq!(settings.classify.fallback_radius_km, 10.0);
        assert_eq!(settings.classify.fallback_fee, 3500.0);
        assert_eq!(settings.editor.default_fee, 990.0);
        assert_eq!(settings.editor.snap_distance, 12.0);
        assert_eq!(settings.canvas_width, DEFAULT_WIDTH);
    }

    #[test]
    fn test_center_is_a_pair() {
        let settings: Settings = serde_json::from_str(r#"{"center": [-33.45, -70.66]}"#).unwrap();
        assert_eq!(settings.center, GeoPoint::new(-33.45, -70.66));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.feed.enabled = true;
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
