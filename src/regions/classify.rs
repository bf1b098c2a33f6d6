//! Delivery eligibility for a single geographic point.
//!
//! Three tiers run in order, each only when the previous one found nothing in
//! any region:
//! 1. strict polygon containment of the point or one of its noise samples
//! 2. the same samples against each polygon's edge tolerance band
//! 3. a haversine radius around a reference origin with a flat fee

use super::{GeoPoint, Region};
use crate::error::{Result, ZoneError};
use crate::geometry::{self, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Offset of the four cardinal noise samples, in degrees
pub const DEFAULT_NOISE_EPSILON: f64 = 0.0001;
pub const DEFAULT_FALLBACK_RADIUS_KM: f64 = 7.0;
pub const DEFAULT_FALLBACK_FEE: f64 = 3500.0;
pub const DEFAULT_ORIGIN: GeoPoint = GeoPoint {
    lat: -32.8347,
    lng: -70.5983,
};

/// Tunables for [`classify`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifySettings {
    pub tolerance: f64,
    pub noise_epsilon: f64,
    pub fallback_origin: GeoPoint,
    pub fallback_radius_km: f64,
    pub fallback_fee: f64,
}

impl Default for ClassifySettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            noise_epsilon: DEFAULT_NOISE_EPSILON,
            fallback_origin: DEFAULT_ORIGIN,
            fallback_radius_km: DEFAULT_FALLBACK_RADIUS_KM,
            fallback_fee: DEFAULT_FALLBACK_FEE,
        }
    }
}

/// What a point matched
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneMatch<'a> {
    Region { region: &'a Region },
    /// Outside every mapped zone but within the fallback radius
    Fallback { distance_km: f64 },
    Outside,
}

/// Result of classifying one point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification<'a> {
    pub zone: ZoneMatch<'a>,
    pub fee_applicable: f64,
    pub serviceable: bool,
}

impl<'a> Classification<'a> {
    pub fn region(&self) -> Option<&'a Region> {
        match self.zone {
            ZoneMatch::Region { region } => Some(region),
            _ => None,
        }
    }

    fn matched(region: &'a Region) -> Self {
        Self {
            zone: ZoneMatch::Region { region },
            fee_applicable: if region.active { region.fee } else { 0.0 },
            serviceable: region.active,
        }
    }
}

/// Classify a point against regions in slice order; the first match wins
pub fn classify<'a>(
    lat: f64,
    lng: f64,
    regions: &'a [Region],
    settings: &ClassifySettings,
) -> Result<Classification<'a>> {
    classify_in_order(lat, lng, regions.iter(), settings)
}

pub(crate) fn classify_in_order<'a, I>(
    lat: f64,
    lng: f64,
    regions: I,
    settings: &ClassifySettings,
) -> Result<Classification<'a>>
where
    I: Iterator<Item = &'a Region> + Clone,
{
    if !lat.is_finite() || !lng.is_finite() {
        return Err(ZoneError::InvalidCoordinates(format!("lat={}, lng={}", lat, lng)));
    }

    let point = GeoPoint::new(lat, lng);
    let samples = noise_samples(point, settings.noise_epsilon);

    for tolerance in [0.0, settings.tolerance] {
        let hit = regions
            .clone()
            .find(|r| samples.iter().any(|p| geometry::point_in_polygon(*p, &r.polygon.vertices, tolerance)));
        if let Some(region) = hit {
            debug!(region = %region.name, tolerance, "point matched region");
            return Ok(Classification::matched(region));
        }
    }

    let distance_km = geometry::haversine_km(settings.fallback_origin, point);
    if distance_km <= settings.fallback_radius_km {
        debug!(distance_km, "point outside mapped zones, inside fallback radius");
        return Ok(Classification {
            zone: ZoneMatch::Fallback { distance_km },
            fee_applicable: settings.fallback_fee,
            serviceable: true,
        });
    }

    Ok(Classification {
        zone: ZoneMatch::Outside,
        fee_applicable: 0.0,
        serviceable: false,
    })
}

/// The point itself plus one sample per cardinal direction
fn noise_samples(point: GeoPoint, epsilon: f64) -> [GeoPoint; 5] {
    [
        point,
        point.offset(epsilon, 0.0),
        point.offset(-epsilon, 0.0),
        point.offset(0.0, epsilon),
        point.offset(0.0, -epsilon),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::Polygon;

    fn polygon(pairs: &[[f64; 2]]) -> Polygon {
        Polygon::from_vertices(pairs.iter().copied().map(GeoPoint::from).collect())
    }

    fn los_andes() -> Region {
        Region::new(
            "centro",
            polygon(&[
                [-32.83, -70.605],
                [-32.84, -70.605],
                [-32.84, -70.59],
                [-32.83, -70.59],
            ]),
            1500.0,
        )
    }

    /// Far from the default origin so the fallback tier stays out of the way
    fn far_settings() -> ClassifySettings {
        ClassifySettings {
            fallback_origin: GeoPoint::new(60.0, 60.0),
            ..ClassifySettings::default()
        }
    }

    #[test]
    fn test_scenario_active_region() {
        let regions = vec![los_andes()];
        let result = classify(-32.835, -70.5975, &regions, &ClassifySettings::default()).unwrap();
        assert_eq!(result.region().map(|r| r.id.as_str()), Some(regions[0].id.as_str()));
        assert_eq!(result.fee_applicable, 1500.0);
        assert!(result.serviceable);
    }

    #[test]
    fn test_inactive_region_reported_but_not_serviceable() {
        let regions = vec![los_andes().with_active(false)];
        let result = classify(-32.835, -70.5975, &regions, &ClassifySettings::default()).unwrap();
        assert!(result.region().is_some());
        assert!(!result.serviceable);
        assert_eq!(result.fee_applicable, 0.0);
    }

    #[test]
    fn test_invalid_coordinates() {
        let regions = vec![los_andes()];
        let settings = ClassifySettings::default();
        assert!(matches!(
            classify(f64::NAN, -70.5, &regions, &settings),
            Err(ZoneError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            classify(-32.8, f64::INFINITY, &regions, &settings),
            Err(ZoneError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_fallback_radius() {
        let settings = ClassifySettings::default();
        let near = DEFAULT_ORIGIN.offset(0.01, 0.0);
        let result = classify(near.lat, near.lng, &[], &settings).unwrap();
        assert!(result.serviceable);
        assert_eq!(result.fee_applicable, DEFAULT_FALLBACK_FEE);
        assert!(matches!(result.zone, ZoneMatch::Fallback { .. }));
        assert!(result.region().is_none());

        // ~11 km north of the origin
        let far = DEFAULT_ORIGIN.offset(0.1, 0.0);
        let result = classify(far.lat, far.lng, &[], &settings).unwrap();
        assert!(!result.serviceable);
        assert_eq!(result.fee_applicable, 0.0);
        assert_eq!(result.zone, ZoneMatch::Outside);
    }

    #[test]
    fn test_noise_sample_catches_near_miss() {
        // 0.00105 outside the west edge: beyond the tolerance band, but one
        // sample shifted east by epsilon lands inside it
        let regions = vec![los_andes()];
        let result = classify(-32.835, -70.60605, &regions, &far_settings()).unwrap();
        assert!(result.region().is_some());

        let result = classify(-32.835, -70.607, &regions, &far_settings()).unwrap();
        assert_eq!(result.zone, ZoneMatch::Outside);
    }

    #[test]
    fn test_first_match_wins_in_slice_order() {
        let a = los_andes();
        let mut b = los_andes();
        b.name = "overlap".into();
        b.id = "b".into();
        let regions = vec![a.clone(), b];
        let result = classify(-32.835, -70.5975, &regions, &far_settings()).unwrap();
        assert_eq!(result.region().map(|r| r.name.as_str()), Some("centro"));
    }

    #[test]
    fn test_strict_tier_beats_earlier_tolerance_band() {
        // `edge` only reaches the point through its tolerance band; `core`
        // strictly contains it and must win despite coming second
        let edge = Region::new("edge", polygon(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]), 10.0);
        let core = Region::new("core", polygon(&[[0.0, 1.0], [0.0, 2.0], [1.0, 2.0], [1.0, 1.0]]), 20.0);
        let regions = vec![edge, core];
        let result = classify(0.5, 1.0005, &regions, &far_settings()).unwrap();
        assert_eq!(result.region().map(|r| r.name.as_str()), Some("core"));
        assert_eq!(result.fee_applicable, 20.0);
    }
}
