//! Pixel-space projection of the zone registry for the editor canvas.
//!
//! The overlay caches one projected polygon per visible region plus the
//! in-progress drawing. The cache is keyed on the revisions of everything it
//! was built from (registry, visibility/selection, map view, drawing session);
//! if any of them moved, [`Overlay::refresh`] re-projects before anything is
//! drawn or hit-tested.

use crate::display::{PixelBuffer, Rgb};
use crate::geometry;
use crate::input::DrawingSession;
use crate::regions::{ZoneRegistry, DEFAULT_COLOR};
use crate::transform::{MapView, PixelPoint};
use crate::visibility::RegionVisibility;
use tracing::trace;

const FILL_ALPHA: u8 = 70;
const SELECTED_FILL_ALPHA: u8 = 110;
const HANDLE_HALF: i32 = 4;
const DRAFT_COLOR: Rgb = Rgb::new(255, 220, 0);
const DRAFT_CURSOR_COLOR: Rgb = Rgb::new(255, 220, 100);
const FIRST_VERTEX_COLOR: Rgb = Rgb::new(255, 100, 100);
const CLOSE_COLOR: Rgb = Rgb::new(0, 255, 100);
const GRID_COLOR: Rgb = Rgb::new(48, 56, 64);
const BACKGROUND: Rgb = Rgb::new(24, 28, 32);

/// A visible region in canvas coordinates
#[derive(Debug, Clone)]
pub struct ProjectedRegion {
    pub id: String,
    /// Canvas-clamped vertices, for drawing
    pub pixels: Vec<PixelPoint>,
    /// Unclamped vertices, for picking
    pub outline: Vec<PixelPoint>,
    /// Per vertex: inside the view, so it can be grabbed as a handle
    pub on_canvas: Vec<bool>,
    pub color: Rgb,
    pub active: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    registry: u64,
    visibility: u64,
    view: u64,
    drawing: u64,
}

impl Stamp {
    fn of(registry: &ZoneRegistry, visibility: &RegionVisibility, view: &MapView, drawing: &DrawingSession) -> Self {
        Self {
            registry: registry.revision(),
            visibility: visibility.revision(),
            view: view.revision(),
            drawing: drawing.revision(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Overlay {
    /// Paint order: bottom first. Highest classification priority is on top.
    regions: Vec<ProjectedRegion>,
    draft: Vec<PixelPoint>,
    stamp: Option<Stamp>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(
        &self,
        registry: &ZoneRegistry,
        visibility: &RegionVisibility,
        view: &MapView,
        drawing: &DrawingSession,
    ) -> bool {
        self.stamp != Some(Stamp::of(registry, visibility, view, drawing))
    }

    /// Re-project if any input changed; returns whether it did
    pub fn refresh(
        &mut self,
        registry: &ZoneRegistry,
        visibility: &RegionVisibility,
        view: &MapView,
        drawing: &DrawingSession,
    ) -> bool {
        if !self.is_stale(registry, visibility, view, drawing) {
            return false;
        }

        let selected = visibility.selected();
        let bounds = view.bounds();
        self.regions = registry
            .by_priority()
            .into_iter()
            .rev()
            .filter(|r| visibility.is_visible(&r.id))
            .filter(|r| r.polygon.bounds().is_some_and(|(sw, ne)| bounds.intersects(sw, ne)))
            .map(|r| ProjectedRegion {
                id: r.id.clone(),
                pixels: r.polygon.vertices.iter().map(|v| view.geo_to_pixel(*v)).collect(),
                outline: r.polygon.vertices.iter().map(|v| view.geo_to_pixel_unclamped(*v)).collect(),
                on_canvas: r.polygon.vertices.iter().map(|v| bounds.contains(*v)).collect(),
                color: Rgb::from_hex(&r.color)
                    .or_else(|| Rgb::from_hex(DEFAULT_COLOR))
                    .unwrap_or(Rgb::WHITE),
                active: r.active,
                selected: selected == Some(r.id.as_str()),
            })
            .collect();
        self.draft = drawing.points().iter().map(|p| view.geo_to_pixel(*p)).collect();
        self.stamp = Some(Stamp::of(registry, visibility, view, drawing));

        trace!(regions = self.regions.len(), draft = self.draft.len(), "overlay re-projected");
        true
    }

    pub fn regions(&self) -> &[ProjectedRegion] {
        &self.regions
    }

    pub fn draft(&self) -> &[PixelPoint] {
        &self.draft
    }

    /// Topmost visible region under a canvas position
    pub fn hit_test(&self, at: PixelPoint, tolerance_px: f64) -> Option<&str> {
        self.regions
            .iter()
            .rev()
            .find(|r| {
                let ring: Vec<(f64, f64)> = r.outline.iter().map(|p| (p.x, p.y)).collect();
                geometry::point_in_ring(at.x, at.y, &ring, tolerance_px)
            })
            .map(|r| r.id.as_str())
    }

    /// Index of an on-canvas vertex handle of `id` within `radius` pixels
    pub fn vertex_at(&self, id: &str, at: PixelPoint, radius: f64) -> Option<usize> {
        let region = self.regions.iter().find(|r| r.id == id)?;
        region
            .outline
            .iter()
            .zip(&region.on_canvas)
            .position(|(p, on_canvas)| *on_canvas && p.distance_to(&at) < radius)
    }

    /// Whether a click at `at` would close the draft polygon
    pub fn can_close_draft(&self, at: PixelPoint, snap_distance: f64) -> bool {
        self.draft.len() >= 3 && self.draft[0].distance_to(&at) < snap_distance
    }

    /// Rasterize regions, handles and the draft polygon
    pub fn render(&self, buffer: &mut PixelBuffer, cursor: PixelPoint, snap_distance: f64) {
        for region in &self.regions {
            let base = if region.active { region.color } else { region.color.greyed() };
            let alpha = if region.selected { SELECTED_FILL_ALPHA } else { FILL_ALPHA };
            buffer.fill_polygon_blend(&region.pixels, base, alpha);

            let stroke = if region.selected { base.lighten() } else { base };
            let n = region.pixels.len();
            for i in 0..n {
                buffer.line_between(region.pixels[i], region.pixels[(i + 1) % n], stroke);
            }

            if region.selected {
                for (v, _) in region.pixels.iter().zip(&region.on_canvas).filter(|(_, on)| **on) {
                    let hovered = v.distance_to(&cursor) < snap_distance;
                    let half = if hovered { HANDLE_HALF + 1 } else { HANDLE_HALF };
                    buffer.fill_square(*v, half, Rgb::WHITE);
                }
            }
        }

        self.render_draft(buffer, cursor, snap_distance);
    }

    fn render_draft(&self, buffer: &mut PixelBuffer, cursor: PixelPoint, snap_distance: f64) {
        for pair in self.draft.windows(2) {
            buffer.line_between(pair[0], pair[1], DRAFT_COLOR);
        }
        if let Some(last) = self.draft.last() {
            buffer.line_between(*last, cursor, DRAFT_CURSOR_COLOR);
        }

        let can_close = self.can_close_draft(cursor, snap_distance);
        for (i, v) in self.draft.iter().enumerate() {
            let (half, color) = match i {
                0 if can_close => (HANDLE_HALF + 2, CLOSE_COLOR),
                0 => (HANDLE_HALF, FIRST_VERTEX_COLOR),
                _ => (HANDLE_HALF - 1, DRAFT_COLOR),
            };
            buffer.fill_square(*v, half, color);
        }
    }
}

/// Stand-in for map imagery: a lat/lng graticule that pans and zooms with
/// the view
pub fn render_graticule(buffer: &mut PixelBuffer, view: &MapView) {
    buffer.clear(BACKGROUND);

    let b = view.bounds();
    let span = (b.east - b.west).max(b.north - b.south);
    let step = graticule_step(span);
    let (w, h) = view.canvas_size();

    let mut lng = (b.west / step).ceil() * step;
    while lng <= b.east {
        let x = ((lng - b.west) / (b.east - b.west) * w) as i32;
        buffer.line(x, 0, x, h as i32 - 1, GRID_COLOR);
        lng += step;
    }

    let mut lat = (b.south / step).ceil() * step;
    while lat <= b.north {
        let y = ((b.north - lat) / (b.north - b.south) * h) as i32;
        buffer.line(0, y, w as i32 - 1, y, GRID_COLOR);
        lat += step;
    }
}

/// Power-of-ten spacing giving roughly 4-40 lines across the view
fn graticule_step(span: f64) -> f64 {
    if span <= 0.0 || !span.is_finite() {
        return 1.0;
    }
    10f64.powi((span / 4.0).log10().floor() as i32)
}
