//! Planar geometry for zone containment and tolerance checks
//!
//! Geographic points are treated as planar `(x = lng, y = lat)` coordinates in
//! degree space. This is only valid at city scale; the haversine distance is
//! the one exception and is used for the coarse radius fallback.

use crate::regions::GeoPoint;

/// Default edge tolerance in degrees (~100m at mid-latitudes)
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Coordinates are scaled by this factor before the crossing test
const COORD_SCALE: f64 = 1_000_000.0;

/// Mean Earth radius used by [`haversine_km`]
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Check if a geographic point is inside a polygon, including a tolerance band
/// around its edges.
///
/// Polygons with fewer than 3 vertices contain nothing. NaN input is the
/// caller's responsibility.
pub fn point_in_polygon(point: GeoPoint, polygon: &[GeoPoint], tolerance: f64) -> bool {
    let at = |i: usize| (polygon[i].lng, polygon[i].lat);
    contains_with_tolerance(point.lng, point.lat, polygon.len(), at, tolerance)
}

/// Same test as [`point_in_polygon`] over plain `(x, y)` vertices, used for
/// pixel-space hit testing
pub fn point_in_ring(px: f64, py: f64, ring: &[(f64, f64)], tolerance: f64) -> bool {
    contains_with_tolerance(px, py, ring.len(), |i| ring[i], tolerance)
}

fn contains_with_tolerance<F>(px: f64, py: f64, n: usize, at: F, tolerance: f64) -> bool
where
    F: Fn(usize) -> (f64, f64),
{
    if n < 3 {
        return false;
    }
    if ray_cast(px, py, n, &at) {
        return true;
    }

    let mut j = n - 1;
    for i in 0..n {
        let (ax, ay) = at(j);
        let (bx, by) = at(i);
        if distance_point_to_segment(px, py, ax, ay, bx, by) < tolerance {
            return true;
        }
        j = i;
    }
    false
}

/// Strict even-odd ray casting on scaled coordinates
fn ray_cast<F>(px: f64, py: f64, n: usize, at: &F) -> bool
where
    F: Fn(usize) -> (f64, f64),
{
    let (px, py) = (px * COORD_SCALE, py * COORD_SCALE);
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = at(i);
        let (xj, yj) = at(j);
        let (xi, yi) = (xi * COORD_SCALE, yi * COORD_SCALE);
        let (xj, yj) = (xj * COORD_SCALE, yj * COORD_SCALE);

        // The straddle check excludes horizontal edges, so dy is never zero here
        if (yi > py) != (yj > py) {
            let x_intersect = (xj - xi) * (py - yi) / (yj - yi) + xi;
            if px < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Distance from a point to the segment `a-b` (not the infinite line)
pub fn distance_point_to_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let ex = bx - ax;
    let ey = by - ay;
    let len_sq = ex * ex + ey * ey;
    if len_sq == 0.0 {
        return distance_between_points(px, py, ax, ay);
    }

    let t = (((px - ax) * ex + (py - ay) * ey) / len_sq).clamp(0.0, 1.0);
    distance_between_points(px, py, ax + t * ex, ay + t * ey)
}

/// Planar Euclidean distance
#[inline]
pub fn distance_between_points(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Vertex average of a polygon, or None when it has no vertices
pub fn centroid(vertices: &[GeoPoint]) -> Option<GeoPoint> {
    if vertices.is_empty() {
        return None;
    }

    let n = vertices.len() as f64;
    let sum_lat: f64 = vertices.iter().map(|v| v.lat).sum();
    let sum_lng: f64 = vertices.iter().map(|v| v.lng).sum();
    Some(GeoPoint::new(sum_lat / n, sum_lng / n))
}

/// Great-circle distance in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        [[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]]
            .into_iter()
            .map(GeoPoint::from)
            .collect()
    }

    #[test]
    fn test_square_containment() {
        let sq = square();
        assert!(point_in_polygon(GeoPoint::new(1.0, 1.0), &sq, DEFAULT_TOLERANCE));
        assert!(!point_in_polygon(GeoPoint::new(3.0, 3.0), &sq, DEFAULT_TOLERANCE));
        // On an edge
        assert!(point_in_polygon(GeoPoint::new(0.0, 1.0), &sq, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_tolerance_boundary() {
        let sq = square();
        let eps = 1e-6;
        let outside = GeoPoint::new(1.0, -(DEFAULT_TOLERANCE + eps));
        let inside = GeoPoint::new(1.0, -(DEFAULT_TOLERANCE - eps));
        assert!(!point_in_polygon(outside, &sq, DEFAULT_TOLERANCE));
        assert!(point_in_polygon(inside, &sq, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_zero_tolerance_is_strict() {
        let sq = square();
        assert!(!point_in_polygon(GeoPoint::new(1.0, -0.0005), &sq, 0.0));
        assert!(point_in_polygon(GeoPoint::new(1.0, 0.0005), &sq, 0.0));
    }

    #[test]
    fn test_degenerate_polygons_contain_nothing() {
        let two = &square()[..2];
        assert!(!point_in_polygon(GeoPoint::new(0.0, 1.0), two, 1.0));
        assert!(!point_in_polygon(GeoPoint::new(0.0, 0.0), &[], 1.0));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening north
        let u: Vec<GeoPoint> = [
            [0.0, 0.0],
            [0.0, 3.0],
            [3.0, 3.0],
            [3.0, 2.0],
            [1.0, 2.0],
            [1.0, 1.0],
            [3.0, 1.0],
            [3.0, 0.0],
        ]
        .into_iter()
        .map(GeoPoint::from)
        .collect();
        assert!(point_in_polygon(GeoPoint::new(2.0, 0.5), &u, 0.0));
        assert!(!point_in_polygon(GeoPoint::new(2.0, 1.5), &u, 0.0));
    }

    #[test]
    fn test_point_in_ring_pixels() {
        let ring = [(10.0, 10.0), (50.0, 10.0), (50.0, 50.0), (10.0, 50.0)];
        assert!(point_in_ring(30.0, 30.0, &ring, 0.0));
        assert!(!point_in_ring(60.0, 30.0, &ring, 0.0));
        assert!(point_in_ring(52.0, 30.0, &ring, 3.0));
    }

    #[test]
    fn test_distance_point_to_segment_clamps() {
        // Perpendicular foot inside the segment
        assert!((distance_point_to_segment(1.0, 1.0, 0.0, 0.0, 2.0, 0.0) - 1.0).abs() < 1e-12);
        // Beyond the end: distance to the endpoint, not the line
        let d = distance_point_to_segment(5.0, 0.0, 0.0, 0.0, 2.0, 0.0);
        assert!((d - 3.0).abs() < 1e-12);
        // Zero-length segment
        let d = distance_point_to_segment(3.0, 4.0, 0.0, 0.0, 0.0, 0.0);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&square()).unwrap();
        assert_eq!(c, GeoPoint::new(1.0, 1.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_haversine() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        // One degree of longitude at the equator
        assert!((haversine_km(a, b) - 111.19).abs() < 0.1);
        assert_eq!(haversine_km(a, a), 0.0);
    }
}
