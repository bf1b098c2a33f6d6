mod classify;
mod import;
mod polygon;
mod registry;

pub use classify::{classify, Classification, ClassifySettings, ZoneMatch, DEFAULT_ORIGIN};
pub use import::{export_regions, import_regions};
pub use polygon::Polygon;
pub use registry::ZoneRegistry;

use crate::error::{Result, ZoneError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default overlay color for regions created without one
pub const DEFAULT_COLOR: &str = "#3388ff";

/// A geographic coordinate in degrees.
///
/// Serialized as a `[lat, lng]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Shift by the given deltas in degrees
    pub fn offset(&self, dlat: f64, dlng: f64) -> Self {
        Self::new(self.lat + dlat, self.lng + dlng)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lat, p.lng]
    }
}

/// A named delivery coverage area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub polygon: Polygon,
    pub fee: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub eta_label: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Higher priority wins when regions overlap
    #[serde(default)]
    pub priority: i32,
}

fn default_active() -> bool {
    true
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Region {
    /// Create an active region with a freshly generated id
    pub fn new(name: impl Into<String>, polygon: Polygon, fee: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            polygon,
            fee,
            active: true,
            eta_label: String::new(),
            color: default_color(),
            description: None,
            priority: 0,
        }
    }

    pub fn with_eta(mut self, eta: impl Into<String>) -> Self {
        self.eta_label = eta.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn contains(&self, point: GeoPoint, tolerance: f64) -> bool {
        self.polygon.contains(point, tolerance)
    }

    /// Check the invariants every region in a registry must hold
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| ZoneError::InvalidRegion {
            name: self.name.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(fail("empty id".into()));
        }
        if self.name.trim().is_empty() {
            return Err(fail("empty name".into()));
        }
        if !self.fee.is_finite() || self.fee < 0.0 {
            return Err(fail(format!("fee must be a non-negative amount, got {}", self.fee)));
        }
        if !self.polygon.is_closed() {
            return Err(fail(format!(
                "polygon needs at least 3 vertices, got {}",
                self.polygon.len()
            )));
        }
        if let Some(i) = self.polygon.vertices.iter().position(|v| !v.is_finite()) {
            return Err(fail(format!("vertex {} is not a finite coordinate", i)));
        }
        Ok(())
    }

    /// Replace the editable metadata fields; geometry and id are untouched
    pub fn apply_edit(&mut self, edit: RegionEdit) {
        if let Some(name) = edit.name {
            self.name = name;
        }
        if let Some(fee) = edit.fee {
            self.fee = fee;
        }
        if let Some(active) = edit.active {
            self.active = active;
        }
        if let Some(eta) = edit.eta_label {
            self.eta_label = eta;
        }
        if let Some(color) = edit.color {
            self.color = color;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(priority) = edit.priority {
            self.priority = priority;
        }
    }
}

/// Metadata supplied when a drawn polygon is committed.
///
/// `name` and `fee` are required; everything else has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionMetadata {
    pub name: Option<String>,
    pub fee: Option<f64>,
    pub active: Option<bool>,
    pub eta_label: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
}

impl RegionMetadata {
    pub fn named(name: impl Into<String>, fee: f64) -> Self {
        Self {
            name: Some(name.into()),
            fee: Some(fee),
            ..Self::default()
        }
    }

    /// Build a region from these fields and the captured geometry
    pub fn into_region(self, polygon: Polygon) -> Result<Region> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(ZoneError::IncompleteMetadata { field: "name" })?;
        let fee = self.fee.ok_or(ZoneError::IncompleteMetadata { field: "fee" })?;

        let mut region = Region::new(name, polygon, fee);
        region.apply_edit(RegionEdit {
            active: self.active,
            eta_label: self.eta_label,
            color: self.color,
            description: self.description.map(Some),
            priority: self.priority,
            ..RegionEdit::default()
        });
        Ok(region)
    }
}

/// Partial update of a region's editable fields
#[derive(Debug, Clone, Default)]
pub struct RegionEdit {
    pub name: Option<String>,
    pub fee: Option<f64>,
    pub active: Option<bool>,
    pub eta_label: Option<String>,
    pub color: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub priority: Option<i32>,
}
