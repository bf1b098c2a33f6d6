use super::classify::classify_in_order;
use super::{Classification, ClassifySettings, GeoPoint, Polygon, Region, RegionEdit};
use crate::error::{Result, ZoneError};
use std::collections::HashSet;
use tracing::{debug, info};

/// Ordered, owned collection of delivery regions.
///
/// Every mutation bumps [`ZoneRegistry::revision`] so consumers holding a
/// projection of the registry can tell when it went stale.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    regions: Vec<Region>,
    revision: u64,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a snapshot, validating every region first
    pub fn from_regions(regions: Vec<Region>) -> Result<Self> {
        let mut registry = Self::new();
        registry.replace_all(regions)?;
        Ok(registry)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Region> {
        self.regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ZoneError::RegionNotFound(id.to_string()))
    }

    pub fn add(&mut self, region: Region) -> Result<&Region> {
        region.validate()?;
        if self.get(&region.id).is_some() {
            return Err(ZoneError::DuplicateRegionId(region.id));
        }
        info!(id = %region.id, name = %region.name, vertices = region.polygon.len(), "region added");
        self.regions.push(region);
        self.touch();
        Ok(&self.regions[self.regions.len() - 1])
    }

    pub fn remove(&mut self, id: &str) -> Option<Region> {
        let index = self.regions.iter().position(|r| r.id == id)?;
        let region = self.regions.remove(index);
        info!(id = %region.id, name = %region.name, "region removed");
        self.touch();
        Some(region)
    }

    /// Replace editable fields; the edit is rejected as a whole if the
    /// result would be invalid
    pub fn update(&mut self, id: &str, edit: RegionEdit) -> Result<()> {
        let region = self.get_mut(id)?;
        let mut edited = region.clone();
        edited.apply_edit(edit);
        edited.validate()?;
        *region = edited;
        self.touch();
        Ok(())
    }

    pub fn replace_polygon(&mut self, id: &str, polygon: Polygon) -> Result<()> {
        let region = self.get_mut(id)?;
        let mut edited = region.clone();
        edited.polygon = polygon;
        edited.validate()?;
        *region = edited;
        self.touch();
        Ok(())
    }

    /// Replace a single vertex by index (vertex drag)
    pub fn move_vertex(&mut self, id: &str, index: usize, point: GeoPoint) -> Result<()> {
        if !point.is_finite() {
            return Err(ZoneError::InvalidCoordinates(format!(
                "vertex {} of {} moved to lat={}, lng={}",
                index, id, point.lat, point.lng
            )));
        }
        let region = self.get_mut(id)?;
        if !region.polygon.set_vertex(index, point) {
            return Err(ZoneError::InvalidRegion {
                name: region.name.clone(),
                reason: format!("no vertex at index {}", index),
            });
        }
        self.touch();
        Ok(())
    }

    /// Swap in a whole snapshot (load or remote change); all-or-nothing
    pub fn replace_all(&mut self, regions: Vec<Region>) -> Result<()> {
        {
            let mut seen = HashSet::new();
            for region in &regions {
                region.validate()?;
                if !seen.insert(region.id.as_str()) {
                    return Err(ZoneError::DuplicateRegionId(region.id.clone()));
                }
            }
        }
        debug!(count = regions.len(), "registry snapshot replaced");
        self.regions = regions;
        self.touch();
        Ok(())
    }

    /// Append several regions at once; nothing is added if any is rejected
    pub fn extend(&mut self, regions: Vec<Region>) -> Result<()> {
        let mut combined = self.regions.clone();
        combined.extend(regions);
        self.replace_all(combined)
    }

    /// Regions in classification order: descending priority, ties in
    /// insertion order
    pub fn by_priority(&self) -> Vec<&Region> {
        let mut ordered: Vec<&Region> = self.regions.iter().collect();
        ordered.sort_by_key(|r| std::cmp::Reverse(r.priority));
        ordered
    }

    /// First region (in classification order) containing the point
    pub fn region_at(&self, point: GeoPoint, tolerance: f64) -> Option<&Region> {
        self.by_priority().into_iter().find(|r| r.contains(point, tolerance))
    }

    pub fn classify(&self, lat: f64, lng: f64, settings: &ClassifySettings) -> Result<Classification<'_>> {
        let ordered = self.by_priority();
        classify_in_order(lat, lng, ordered.iter().copied(), settings)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(offset: f64) -> Polygon {
        Polygon::from_vertices(vec![
            GeoPoint::new(offset, offset),
            GeoPoint::new(offset, offset + 1.0),
            GeoPoint::new(offset + 1.0, offset + 1.0),
            GeoPoint::new(offset + 1.0, offset),
        ])
    }

    fn far_settings() -> ClassifySettings {
        ClassifySettings {
            fallback_origin: GeoPoint::new(60.0, 60.0),
            ..ClassifySettings::default()
        }
    }

    #[test]
    fn test_add_rejects_invalid_and_duplicates() {
        let mut registry = ZoneRegistry::new();
        let thin = Polygon::from_vertices(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0)]);
        assert!(registry.add(Region::new("thin", thin, 1.0)).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.revision(), 0);

        let region = Region::new("a", square(0.0), 1.0);
        let dup = region.clone();
        registry.add(region).unwrap();
        assert!(matches!(registry.add(dup), Err(ZoneError::DuplicateRegionId(_))));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.revision(), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let mut registry = ZoneRegistry::new();
        let id = registry.add(Region::new("a", square(0.0), 1.0)).unwrap().id.clone();

        registry
            .update(
                &id,
                RegionEdit {
                    fee: Some(250.0),
                    active: Some(false),
                    ..RegionEdit::default()
                },
            )
            .unwrap();
        let region = registry.get(&id).unwrap();
        assert_eq!(region.fee, 250.0);
        assert!(!region.active);

        let bad = RegionEdit {
            fee: Some(-5.0),
            ..RegionEdit::default()
        };
        assert!(registry.update(&id, bad).is_err());
        assert_eq!(registry.get(&id).unwrap().fee, 250.0);

        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert!(matches!(
            registry.update(&id, RegionEdit::default()),
            Err(ZoneError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_move_vertex() {
        let mut registry = ZoneRegistry::new();
        let id = registry.add(Region::new("a", square(0.0), 1.0)).unwrap().id.clone();
        let before = registry.revision();

        registry.move_vertex(&id, 2, GeoPoint::new(3.0, 3.0)).unwrap();
        assert_eq!(registry.get(&id).unwrap().polygon.vertices[2], GeoPoint::new(3.0, 3.0));
        assert!(registry.revision() > before);

        assert!(registry.move_vertex(&id, 9, GeoPoint::new(0.0, 0.0)).is_err());
        assert!(registry.move_vertex(&id, 0, GeoPoint::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_replace_polygon_validates() {
        let mut registry = ZoneRegistry::new();
        let id = registry.add(Region::new("a", square(0.0), 1.0)).unwrap().id.clone();
        assert!(registry.replace_polygon(&id, Polygon::new()).is_err());
        registry.replace_polygon(&id, square(5.0)).unwrap();
        assert_eq!(registry.get(&id).unwrap().polygon, square(5.0));
    }

    #[test]
    fn test_extend_is_all_or_nothing() {
        let mut registry = ZoneRegistry::new();
        registry.add(Region::new("a", square(0.0), 1.0)).unwrap();
        let batch = vec![
            Region::new("b", square(2.0), 1.0),
            Region::new("c", Polygon::new(), 1.0),
        ];
        assert!(registry.extend(batch).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_priority_breaks_overlap_ties() {
        let mut registry = ZoneRegistry::new();
        registry.add(Region::new("low", square(0.0), 100.0)).unwrap();
        registry
            .add(Region::new("high", square(0.0), 200.0).with_priority(5))
            .unwrap();
        registry.add(Region::new("later", square(0.0), 300.0)).unwrap();

        let result = registry.classify(0.5, 0.5, &far_settings()).unwrap();
        assert_eq!(result.region().map(|r| r.name.as_str()), Some("high"));
        assert_eq!(result.fee_applicable, 200.0);

        let names: Vec<_> = registry.by_priority().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["high", "low", "later"]);
    }

    #[test]
    fn test_region_at() {
        let mut registry = ZoneRegistry::new();
        registry.add(Region::new("a", square(0.0), 1.0)).unwrap();
        registry.add(Region::new("b", square(10.0), 1.0)).unwrap();
        assert_eq!(
            registry.region_at(GeoPoint::new(10.5, 10.5), 0.0).map(|r| r.name.as_str()),
            Some("b")
        );
        assert!(registry.region_at(GeoPoint::new(5.0, 5.0), 0.0).is_none());
    }
}
