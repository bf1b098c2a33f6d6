//! Geographic <-> pixel conversion for the map canvas.
//!
//! The visible area is a geographic bounding box derived from the map center
//! and zoom level:
//!
//! ```text
//! degrees_per_pixel = (360 / 256) / 2^zoom
//! north/south = center.lat ± (height / 2) * degrees_per_pixel
//! east/west   = center.lng ± (width / 2)  * degrees_per_pixel
//! ```
//!
//! Latitude and longitude share one scale (no cosine correction), which is
//! acceptable for city-sized regions and drifts near the poles.

use crate::regions::GeoPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 22.0;

/// Zoom levels per wheel notch
const ZOOM_STEP: f64 = 0.5;

/// Extra room left around a polygon when fitting the view to it
const FIT_PADDING: f64 = 1.2;

/// The geographic rectangle currently visible on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBoundingBox {
    /// Inclusive containment
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat <= self.north
            && point.lat >= self.south
            && point.lng <= self.east
            && point.lng >= self.west
    }

    /// Whether the box spanned by `sw`/`ne` overlaps this one (edges count)
    pub fn intersects(&self, sw: GeoPoint, ne: GeoPoint) -> bool {
        sw.lat <= self.north && ne.lat >= self.south && sw.lng <= self.east && ne.lng >= self.west
    }
}

/// A position on the canvas in pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        crate::geometry::distance_between_points(self.x, self.y, other.x, other.y)
    }
}

/// Degrees covered by one pixel at the given zoom level
pub fn degrees_per_pixel(zoom: f64) -> f64 {
    (360.0 / 256.0) / 2f64.powf(zoom)
}

pub fn compute_bounds(center: GeoPoint, zoom: f64, canvas_width: f64, canvas_height: f64) -> GeoBoundingBox {
    let dpp = degrees_per_pixel(zoom);
    let half_h = canvas_height / 2.0 * dpp;
    let half_w = canvas_width / 2.0 * dpp;
    GeoBoundingBox {
        north: center.lat + half_h,
        south: center.lat - half_h,
        east: center.lng + half_w,
        west: center.lng - half_w,
    }
}

/// Project onto the canvas. North maps to y = 0; points outside the box are
/// clamped to the nearest canvas edge.
pub fn geo_to_pixel(
    lat: f64,
    lng: f64,
    bounds: &GeoBoundingBox,
    canvas_width: f64,
    canvas_height: f64,
) -> PixelPoint {
    let x = (lng - bounds.west) / (bounds.east - bounds.west) * canvas_width;
    let y = (bounds.north - lat) / (bounds.north - bounds.south) * canvas_height;
    PixelPoint::new(x.clamp(0.0, canvas_width), y.clamp(0.0, canvas_height))
}

/// Exact inverse of [`geo_to_pixel`] for on-canvas pixels; not clamped
pub fn pixel_to_geo(
    x: f64,
    y: f64,
    bounds: &GeoBoundingBox,
    canvas_width: f64,
    canvas_height: f64,
) -> GeoPoint {
    let lng = bounds.west + x / canvas_width * (bounds.east - bounds.west);
    let lat = bounds.north - y / canvas_height * (bounds.north - bounds.south);
    GeoPoint::new(lat, lng)
}

/// Map view state: center, zoom and canvas size, with bounds kept in sync.
///
/// Every mutator recomputes the bounds before returning, so projections made
/// through the view can never use bounds older than the current center/zoom.
/// [`MapView::revision`] changes whenever the bounds do.
#[derive(Debug, Clone)]
pub struct MapView {
    center: GeoPoint,
    zoom: f64,
    canvas_width: f64,
    canvas_height: f64,
    bounds: GeoBoundingBox,
    revision: u64,
}

impl MapView {
    pub fn new(center: GeoPoint, zoom: f64, canvas_width: u32, canvas_height: u32) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let (w, h) = (canvas_width as f64, canvas_height as f64);
        Self {
            center,
            zoom,
            canvas_width: w,
            canvas_height: h,
            bounds: compute_bounds(center, zoom, w, h),
            revision: 0,
        }
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn bounds(&self) -> &GeoBoundingBox {
        &self.bounds
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn degrees_per_pixel(&self) -> f64 {
        degrees_per_pixel(self.zoom)
    }

    pub fn set_center(&mut self, center: GeoPoint) {
        if center.is_finite() {
            self.center = center;
            self.recompute();
        }
    }

    /// Set the zoom level, clamped to [`MIN_ZOOM`, `MAX_ZOOM`]
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            self.recompute();
        }
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_width = width as f64;
        self.canvas_height = height as f64;
        self.recompute();
    }

    /// Drag the map by a pixel delta; content follows the pointer
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64) {
        let dpp = self.degrees_per_pixel();
        let center = self.center.offset(dy * dpp, -dx * dpp);
        self.set_center(center);
    }

    /// Zoom by `steps` wheel notches keeping the location under `anchor` fixed
    pub fn zoom_at(&mut self, anchor: PixelPoint, steps: f64) {
        let pinned = self.pixel_to_geo(anchor.x, anchor.y);
        self.zoom = (self.zoom + steps * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);

        let dpp = self.degrees_per_pixel();
        self.center = GeoPoint::new(
            pinned.lat + (anchor.y - self.canvas_height / 2.0) * dpp,
            pinned.lng - (anchor.x - self.canvas_width / 2.0) * dpp,
        );
        self.recompute();
    }

    /// Center on the box spanned by `sw`/`ne` and pick the deepest zoom
    /// that still shows all of it
    pub fn fit_to(&mut self, sw: GeoPoint, ne: GeoPoint) {
        let span_lat = (ne.lat - sw.lat).abs();
        let span_lng = (ne.lng - sw.lng).abs();
        let needed = (span_lng / self.canvas_width).max(span_lat / self.canvas_height) * FIT_PADDING;

        self.center = GeoPoint::new((sw.lat + ne.lat) / 2.0, (sw.lng + ne.lng) / 2.0);
        if needed > 0.0 {
            self.zoom = ((360.0 / 256.0) / needed).log2().clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.recompute();
    }

    pub fn geo_to_pixel(&self, point: GeoPoint) -> PixelPoint {
        geo_to_pixel(point.lat, point.lng, &self.bounds, self.canvas_width, self.canvas_height)
    }

    /// Linear projection without clamping; off-canvas points land off-canvas.
    /// Use for picking, never for drawing.
    pub fn geo_to_pixel_unclamped(&self, point: GeoPoint) -> PixelPoint {
        let b = &self.bounds;
        PixelPoint::new(
            (point.lng - b.west) / (b.east - b.west) * self.canvas_width,
            (b.north - point.lat) / (b.north - b.south) * self.canvas_height,
        )
    }

    pub fn pixel_to_geo(&self, x: f64, y: f64) -> GeoPoint {
        pixel_to_geo(x, y, &self.bounds, self.canvas_width, self.canvas_height)
    }

    fn recompute(&mut self) {
        self.bounds = compute_bounds(self.center, self.zoom, self.canvas_width, self.canvas_height);
        self.revision += 1;
        debug!(
            lat = self.center.lat,
            lng = self.center.lng,
            zoom = self.zoom,
            "map view changed"
        );
    }
}
