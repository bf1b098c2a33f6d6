//! Extract a coordinate from loosely-shaped location payloads
//!
//! Checkout and courier payloads spell coordinates in many ways
//! (`lat`/`lng`, `latitude`/`longitude`, `lon`, nested under `location`,
//! numbers as strings). Everything is funnelled into one [`GeoPoint`].

use crate::error::{Result, ZoneError};
use crate::regions::GeoPoint;
use serde_json::{Map, Value};

const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "lon", "long", "longitude"];
const NESTED_KEYS: &[&str] = &["location", "coords", "coordinates", "position", "address"];

/// Read a finite coordinate pair out of `value`.
///
/// Accepts an object with latitude/longitude keys (any case), a `[lat, lng]`
/// array, or either of those nested one level under a container key.
pub fn normalize_location(value: &Value) -> Result<GeoPoint> {
    if let Some(point) = extract(value)? {
        return Ok(point);
    }
    if let Value::Object(map) = value {
        for key in NESTED_KEYS {
            if let Some(inner) = lookup(map, &[*key]) {
                if let Some(point) = extract(inner)? {
                    return Ok(point);
                }
            }
        }
    }
    Err(ZoneError::InvalidCoordinates(format!("no coordinates in {}", value)))
}

fn extract(value: &Value) -> Result<Option<GeoPoint>> {
    match value {
        Value::Object(map) => {
            let (Some(lat), Some(lng)) = (lookup(map, LAT_KEYS), lookup(map, LNG_KEYS)) else {
                return Ok(None);
            };
            Ok(Some(point(number(lat)?, number(lng)?)?))
        }
        Value::Array(items) if items.len() == 2 => Ok(Some(point(number(&items[0])?, number(&items[1])?)?)),
        _ => Ok(None),
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| keys.iter().any(|want| k.eq_ignore_ascii_case(want)))
        .map(|(_, v)| v)
}

fn number(value: &Value) -> Result<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.ok_or_else(|| ZoneError::InvalidCoordinates(format!("not a number: {}", value)))
}

fn point(lat: f64, lng: f64) -> Result<GeoPoint> {
    let p = GeoPoint::new(lat, lng);
    if !p.is_finite() {
        return Err(ZoneError::InvalidCoordinates(format!("({}, {})", lat, lng)));
    }
    if lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(ZoneError::InvalidCoordinates(format!("({}, {}) out of range", lat, lng)));
    }
    Ok(p)
}
