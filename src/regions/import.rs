//! Bulk import/export in the serialized region format:
//! `[{"id": "...", "name": "...", "fee": 1500, "polygon": [[lat, lng], ...]}, ...]`
//!
//! Optional fields (`active`, `eta_label`, `color`, `description`,
//! `priority`) fall back to region defaults. A batch is accepted only if every
//! record is valid.

use super::{GeoPoint, Polygon, Region, DEFAULT_COLOR};
use crate::error::{Result, ZoneError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

#[derive(Deserialize)]
struct RegionRecord {
    id: String,
    name: String,
    fee: f64,
    polygon: Vec<Vec<f64>>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default, alias = "etaLabel")]
    eta_label: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<i32>,
}

/// Parse and validate a serialized batch; the first structural violation
/// rejects the whole batch
pub fn import_regions(json: &str) -> Result<Vec<Region>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(ZoneError::InvalidRegionFormat {
            index: 0,
            reason: "top level must be an array of regions".into(),
        });
    };

    let mut seen = HashSet::new();
    let mut regions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let fail = |reason: String| ZoneError::InvalidRegionFormat { index, reason };

        let record: RegionRecord = serde_json::from_value(item).map_err(|e| fail(e.to_string()))?;
        let region = record_to_region(record).map_err(fail)?;
        if !seen.insert(region.id.clone()) {
            return Err(fail(format!("duplicate id '{}'", region.id)));
        }
        regions.push(region);
    }

    info!(count = regions.len(), "region batch imported");
    Ok(regions)
}

fn record_to_region(record: RegionRecord) -> std::result::Result<Region, String> {
    if record.id.trim().is_empty() {
        return Err("empty id".into());
    }
    if record.name.trim().is_empty() {
        return Err("empty name".into());
    }
    if !record.fee.is_finite() || record.fee < 0.0 {
        return Err(format!("fee must be a non-negative amount, got {}", record.fee));
    }
    if record.polygon.len() < 3 {
        return Err(format!("polygon has {} vertices, need at least 3", record.polygon.len()));
    }

    let mut vertices = Vec::with_capacity(record.polygon.len());
    for (i, pair) in record.polygon.iter().enumerate() {
        match pair.as_slice() {
            [lat, lng] if lat.is_finite() && lng.is_finite() => vertices.push(GeoPoint::new(*lat, *lng)),
            _ => return Err(format!("vertex {} is not a [lat, lng] pair", i)),
        }
    }

    Ok(Region {
        id: record.id,
        name: record.name,
        polygon: Polygon::from_vertices(vertices),
        fee: record.fee,
        active: record.active.unwrap_or(true),
        eta_label: record.eta_label.unwrap_or_default(),
        color: record.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        description: record.description,
        priority: record.priority.unwrap_or(0),
    })
}

/// Serialize regions in the import format
pub fn export_regions(regions: &[Region]) -> Result<String> {
    Ok(serde_json::to_string_pretty(regions)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[
        {"id": "z1", "name": "Centro", "fee": 1500,
         "polygon": [[-32.83, -70.605], [-32.84, -70.605], [-32.84, -70.59], [-32.83, -70.59]]},
        {"id": "z2", "name": "Norte", "fee": 2000.5, "active": false, "etaLabel": "45-60 min",
         "polygon": [[-32.80, -70.60], [-32.81, -70.60], [-32.81, -70.59]]}
    ]"#;

    #[test]
    fn test_import_valid_batch() {
        let regions = import_regions(VALID).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, "z1");
        assert_eq!(regions[0].polygon.len(), 4);
        assert!(regions[0].active);
        assert!(!regions[1].active);
        assert_eq!(regions[1].eta_label, "45-60 min");
        assert_eq!(regions[1].color, DEFAULT_COLOR);
    }

    #[test]
    fn test_rejects_batch_with_two_vertex_polygon() {
        let json = r#"[
            {"id": "ok", "name": "ok", "fee": 1, "polygon": [[0, 0], [0, 1], [1, 1]]},
            {"id": "bad", "name": "bad", "fee": 1, "polygon": [[0, 0], [0, 1]]}
        ]"#;
        match import_regions(json) {
            Err(ZoneError::InvalidRegionFormat { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidRegionFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_structural_violations() {
        let cases = [
            r#"{"id": "x"}"#,
            r#"[{"id": "a", "name": "a", "fee": 1, "polygon": [[0, 0], [0, 1], [1]]}]"#,
            r#"[{"id": "a", "name": "a", "fee": 1, "polygon": [[0, 0], [0, 1], [1, 1, 1]]}]"#,
            r#"[{"id": "a", "name": "a", "fee": 1, "polygon": [[0, 0], [0, "x"], [1, 1]]}]"#,
            r#"[{"id": "a", "name": "a", "fee": -1, "polygon": [[0, 0], [0, 1], [1, 1]]}]"#,
            r#"[{"id": "", "name": "a", "fee": 1, "polygon": [[0, 0], [0, 1], [1, 1]]}]"#,
            r#"[{"name": "a", "fee": 1, "polygon": [[0, 0], [0, 1], [1, 1]]}]"#,
        ];
        for json in cases {
            assert!(
                matches!(import_regions(json), Err(ZoneError::InvalidRegionFormat { .. })),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"[
            {"id": "a", "name": "a", "fee": 1, "polygon": [[0, 0], [0, 1], [1, 1]]},
            {"id": "a", "name": "b", "fee": 1, "polygon": [[0, 0], [0, 1], [1, 1]]}
        ]"#;
        assert!(import_regions(json).is_err());
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        assert!(matches!(import_regions("[{"), Err(ZoneError::Json(_))));
    }

    #[test]
    fn test_export_is_importable() {
        let regions = import_regions(VALID).unwrap();
        let json = export_regions(&regions).unwrap();
        assert_eq!(import_regions(&json).unwrap(), regions);
    }
}
