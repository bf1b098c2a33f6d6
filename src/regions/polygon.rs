use super::GeoPoint;
use crate::geometry;
use serde::{Deserialize, Serialize};

/// A ring of geographic vertices; closure back to the first vertex is implicit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub vertices: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vertices(vertices: Vec<GeoPoint>) -> Self {
        Self { vertices }
    }

    pub fn add_vertex(&mut self, point: GeoPoint) {
        self.vertices.push(point);
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Containment with an edge tolerance band in degrees
    pub fn contains(&self, point: GeoPoint, tolerance: f64) -> bool {
        geometry::point_in_polygon(point, &self.vertices, tolerance)
    }

    /// Replace one vertex; returns false if the index is out of range
    pub fn set_vertex(&mut self, index: usize, point: GeoPoint) -> bool {
        match self.vertices.get_mut(index) {
            Some(v) => {
                *v = point;
                true
            }
            None => false,
        }
    }

    /// South-west and north-east corners
    pub fn bounds(&self) -> Option<(GeoPoint, GeoPoint)> {
        let first = self.vertices.first()?;
        let mut sw = *first;
        let mut ne = *first;
        for v in &self.vertices[1..] {
            sw.lat = sw.lat.min(v.lat);
            sw.lng = sw.lng.min(v.lng);
            ne.lat = ne.lat.max(v.lat);
            ne.lng = ne.lng.max(v.lng);
        }
        Some((sw, ne))
    }

    pub fn edges(&self) -> impl Iterator<Item = (&GeoPoint, &GeoPoint)> {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }

    pub fn centroid(&self) -> Option<GeoPoint> {
        geometry::centroid(&self.vertices)
    }
}
