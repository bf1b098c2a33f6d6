//! Reverse geocoding against a local gazetteer.

use crate::error::{Result, ZoneError};
use crate::geometry::haversine_km;
use crate::regions::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default search radius for [`Gazetteer`] lookups
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 5.0;

/// Resolves a coordinate to a human-readable place name
pub trait ReverseGeocoder {
    fn reverse(&self, point: GeoPoint) -> Result<Option<String>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Named places; lookup returns the nearest one within the search radius
#[derive(Debug, Clone)]
pub struct Gazetteer {
    places: Vec<Place>,
    radius_km: f64,
}

impl Gazetteer {
    pub fn new(places: Vec<Place>) -> Self {
        Self {
            places,
            radius_km: DEFAULT_SEARCH_RADIUS_KM,
        }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    /// Parse `[{"name": ..., "lat": ..., "lng": ...}, ...]`
    pub fn from_json(json: &str) -> Result<Self> {
        let places: Vec<Place> = serde_json::from_str(json)?;
        if let Some(bad) = places.iter().find(|p| !p.location().is_finite()) {
            return Err(ZoneError::InvalidCoordinates(format!("place '{}'", bad.name)));
        }
        Ok(Self::new(places))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let gazetteer = Self::from_json(&json)?;
        info!(path = %path.as_ref().display(), places = gazetteer.len(), "gazetteer loaded");
        Ok(gazetteer)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Nearest place and its distance, ignoring the search radius
    pub fn nearest(&self, point: GeoPoint) -> Option<(&Place, f64)> {
        self.places
            .iter()
            .map(|p| (p, haversine_km(point, p.location())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl ReverseGeocoder for Gazetteer {
    fn reverse(&self, point: GeoPoint) -> Result<Option<String>> {
        if !point.is_finite() {
            return Err(ZoneError::InvalidCoordinates(format!("({}, {})", point.lat, point.lng)));
        }
        let found = self
            .nearest(point)
            .filter(|(_, distance)| *distance <= self.radius_km)
            .map(|(place, distance)| {
                debug!(place = %place.name, distance_km = distance, "reverse geocoded");
                place.name.clone()
            });
        Ok(found)
    }
}

/// Best-effort place name from a gazetteer file; any failure is logged and
/// yields `None`
pub fn lookup_place(path: impl AsRef<Path>, point: GeoPoint) -> Option<String> {
    let path = path.as_ref();
    match Gazetteer::load(path).and_then(|g| g.reverse(point)) {
        Ok(place) => place,
        Err(e) => {
            warn!(path = %path.display(), "reverse geocoding skipped: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACES: &str = r#"[
        {"name": "Los Andes", "lat": -32.8347, "lng": -70.5983},
        {"name": "San Esteban", "lat": -32.7990, "lng": -70.5800},
        {"name": "Calle Larga", "lat": -32.8600, "lng": -70.6300}
    ]"#;

    #[test]
    fn test_nearest_place_within_radius() {
        let g = Gazetteer::from_json(PLACES).unwrap();
        assert_eq!(g.len(), 3);
        let name = g.reverse(GeoPoint::new(-32.80, -70.58)).unwrap();
        assert_eq!(name.as_deref(), Some("San Esteban"));
    }

    #[test]
    fn test_nothing_beyond_radius() {
        let g = Gazetteer::from_json(PLACES).unwrap().with_radius(1.0);
        assert_eq!(g.reverse(GeoPoint::new(-33.45, -70.66)).unwrap(), None);
    }

    #[test]
    fn test_empty_gazetteer() {
        let g = Gazetteer::new(Vec::new());
        assert!(g.is_empty());
        assert_eq!(g.reverse(GeoPoint::new(0.0, 0.0)).unwrap(), None);
    }

    #[test]
    fn test_invalid_input() {
        let g = Gazetteer::from_json(PLACES).unwrap();
        assert!(matches!(
            g.reverse(GeoPoint::new(f64::NAN, 0.0)),
            Err(ZoneError::InvalidCoordinates(_))
        ));
        assert!(Gazetteer::from_json("{}").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.json");
        fs::write(&path, PLACES).unwrap();
        assert_eq!(Gazetteer::load(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_lookup_place_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let point = GeoPoint::new(-32.80, -70.58);

        assert_eq!(lookup_place(dir.path().join("missing.json"), point), None);

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "[{\"name\": ").unwrap();
        assert_eq!(lookup_place(&corrupt, point), None);

        let good = dir.path().join("places.json");
        fs::write(&good, PLACES).unwrap();
        assert_eq!(lookup_place(&good, point).as_deref(), Some("San Esteban"));
        assert_eq!(lookup_place(&good, GeoPoint::new(f64::NAN, 0.0)), None);
    }
}
