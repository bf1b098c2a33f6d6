use crate::error::{Result, ZoneError};
use crate::regions::{GeoPoint, Polygon, RegionMetadata, ZoneRegistry};
use crate::transform::MapView;
use crate::visibility::RegionVisibility;
use tracing::{debug, info};

/// State machine for capturing a new region polygon
#[derive(Debug, Clone, Default, PartialEq)]
enum State {
    /// No open session; clicks are not captured
    #[default]
    Idle,
    /// Capturing vertices
    Drawing { points: Vec<GeoPoint> },
}

/// Transient polygon drawing session.
///
/// Points are stored geographically, converted from pixels with the view's
/// bounds at the moment of the click, so panning mid-drawing keeps them
/// anchored to the map.
#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    state: State,
    revision: u64,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, State::Drawing { .. })
    }

    /// Captured vertices; empty when idle
    pub fn points(&self) -> &[GeoPoint] {
        match &self.state {
            State::Drawing { points } => points,
            State::Idle => &[],
        }
    }

    /// Bumped whenever the captured point list changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Open a fresh session, discarding any session already in progress and
    /// clearing the current selection
    pub fn start_drawing(&mut self, visibility: &mut RegionVisibility) {
        if let State::Drawing { points } = &self.state {
            debug!(discarded = points.len(), "previous drawing implicitly cancelled");
        }
        visibility.clear_selection();
        self.state = State::Drawing { points: Vec::new() };
        self.touch();
    }

    /// Capture a click; ignored (returns None) when idle
    pub fn add_point(&mut self, pixel_x: f64, pixel_y: f64, view: &MapView) -> Option<GeoPoint> {
        let State::Drawing { points } = &mut self.state else {
            return None;
        };
        let point = view.pixel_to_geo(pixel_x, pixel_y);
        points.push(point);
        debug!(lat = point.lat, lng = point.lng, count = points.len(), "vertex captured");
        self.touch();
        Some(point)
    }

    /// Drop the most recent vertex of the open session
    pub fn undo_last_point(&mut self) -> Option<GeoPoint> {
        let State::Drawing { points } = &mut self.state else {
            return None;
        };
        let removed = points.pop();
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Turn the captured points into a region and add it to the registry.
    ///
    /// On failure the session stays open so the operator can fix it.
    pub fn commit(&mut self, metadata: RegionMetadata, registry: &mut ZoneRegistry) -> Result<String> {
        let points = self.points();
        if points.len() < 3 {
            return Err(ZoneError::InsufficientVertices { count: points.len() });
        }

        let region = metadata.into_region(Polygon::from_vertices(points.to_vec()))?;
        let id = registry.add(region)?.id.clone();

        info!(id = %id, "drawing committed");
        self.state = State::Idle;
        self.touch();
        Ok(id)
    }

    /// Leave drawing mode, discarding captured points
    pub fn cancel(&mut self) {
        if self.is_drawing() {
            debug!(discarded = self.points().len(), "drawing cancelled");
            self.state = State::Idle;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> MapView {
        MapView::new(GeoPoint::new(-32.835, -70.5975), 14.0, 800, 600)
    }

    fn session_with(n: usize, view: &MapView) -> DrawingSession {
        let mut session = DrawingSession::new();
        session.start_drawing(&mut RegionVisibility::new());
        let corners = [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0), (100.0, 300.0)];
        for &(x, y) in corners.iter().take(n) {
            session.add_point(x, y, view);
        }
        session
    }

    #[test]
    fn test_idle_ignores_clicks() {
        let mut session = DrawingSession::new();
        assert!(session.add_point(10.0, 10.0, &view()).is_none());
        assert!(session.points().is_empty());
        assert!(!session.is_drawing());
    }

    #[test]
    fn test_commit_requires_three_points() {
        let v = view();
        for n in 0..3 {
            let mut session = session_with(n, &v);
            let mut registry = ZoneRegistry::new();
            let err = session
                .commit(RegionMetadata::named("z", 100.0), &mut registry)
                .unwrap_err();
            assert!(matches!(err, ZoneError::InsufficientVertices { count } if count == n));
            assert!(session.is_drawing());
            assert!(registry.is_empty());
        }

        let mut session = session_with(3, &v);
        let mut registry = ZoneRegistry::new();
        let id = session
            .commit(RegionMetadata::named("z", 100.0), &mut registry)
            .unwrap();
        assert!(!session.is_drawing());
        assert!(session.points().is_empty());
        assert_eq!(registry.get(&id).unwrap().polygon.len(), 3);
    }

    #[test]
    fn test_commit_from_idle_is_rejected() {
        let mut session = DrawingSession::new();
        let err = session
            .commit(RegionMetadata::named("z", 1.0), &mut ZoneRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ZoneError::InsufficientVertices { count: 0 }));
    }

    #[test]
    fn test_commit_requires_metadata() {
        let v = view();
        let mut session = session_with(4, &v);
        let mut registry = ZoneRegistry::new();
        let err = session.commit(RegionMetadata::default(), &mut registry).unwrap_err();
        assert!(matches!(err, ZoneError::IncompleteMetadata { .. }));
        assert_eq!(session.points().len(), 4);

        let no_fee = RegionMetadata {
            name: Some("z".into()),
            ..RegionMetadata::default()
        };
        assert!(matches!(
            session.commit(no_fee, &mut registry),
            Err(ZoneError::IncompleteMetadata { field: "fee" })
        ));
    }

    #[test]
    fn test_points_are_geographic() {
        let v = view();
        let session = session_with(1, &v);
        assert_eq!(session.points()[0], v.pixel_to_geo(100.0, 100.0));
    }

    #[test]
    fn test_committed_region_contains_drawn_interior() {
        let v = view();
        let mut session = session_with(4, &v);
        let mut registry = ZoneRegistry::new();
        let id = session
            .commit(RegionMetadata::named("drawn", 900.0), &mut registry)
            .unwrap();
        let inside = v.pixel_to_geo(200.0, 200.0);
        assert!(registry.get(&id).unwrap().contains(inside, 0.0));
    }

    #[test]
    fn test_restart_discards_previous_points() {
        let v = view();
        let mut session = session_with(2, &v);
        let mut vis = RegionVisibility::new();
        vis.select("something");
        session.start_drawing(&mut vis);
        assert!(session.is_drawing());
        assert!(session.points().is_empty());
        assert_eq!(vis.selected(), None);
    }

    #[test]
    fn test_cancel_and_undo() {
        let v = view();
        let mut session = session_with(3, &v);
        assert!(session.undo_last_point().is_some());
        assert_eq!(session.points().len(), 2);
        session.cancel();
        assert!(!session.is_drawing());
        assert!(session.points().is_empty());
        assert!(session.undo_last_point().is_none());
    }
}
