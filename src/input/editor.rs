use super::DrawingSession;
use crate::config::EditorSettings;
use crate::display::{InputEvent, MouseButtonKind, PixelBuffer};
use crate::error::Result;
use crate::overlay::{self, Overlay};
use crate::regions::{Region, RegionEdit, RegionMetadata, ZoneRegistry};
use crate::transform::{MapView, PixelPoint};
use crate::visibility::RegionVisibility;
use sdl2::keyboard::Keycode;
use tracing::{debug, info, warn};

/// Pointer gesture in progress
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    None,
    /// Dragging a vertex of the selected region
    DraggingVertex { region_id: String, vertex_index: usize },
    /// Middle-button drag of the map
    Panning { last: PixelPoint },
}

/// Interactive zone editor.
///
/// Owns every piece of mutable editing state (registry, view, drawing
/// session, visibility and the overlay projection) and updates it between
/// event-loop turns. Drawing and selection are exclusive: while a drawing
/// session is open, clicks capture vertices and never select.
pub struct MapEditor {
    registry: ZoneRegistry,
    view: MapView,
    drawing: DrawingSession,
    visibility: RegionVisibility,
    overlay: Overlay,
    gesture: Gesture,
    mouse_pos: PixelPoint,
    next_region_name: String,
    settings: EditorSettings,
    dirty: bool,
}

impl MapEditor {
    pub fn new(registry: ZoneRegistry, view: MapView, settings: EditorSettings) -> Self {
        let next_region_name = format!("{}_{}", settings.name_prefix, registry.len() + 1);
        Self {
            registry,
            view,
            drawing: DrawingSession::new(),
            visibility: RegionVisibility::new(),
            overlay: Overlay::new(),
            gesture: Gesture::None,
            mouse_pos: PixelPoint::new(0.0, 0.0),
            next_region_name,
            settings,
            dirty: false,
        }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut MapView {
        &mut self.view
    }

    pub fn drawing(&self) -> &DrawingSession {
        &self.drawing
    }

    pub fn visibility(&self) -> &RegionVisibility {
        &self.visibility
    }

    pub fn visibility_mut(&mut self) -> &mut RegionVisibility {
        &mut self.visibility
    }

    /// Unsaved local changes since the last [`MapEditor::mark_saved`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.visibility.selected().and_then(|id| self.registry.get(id))
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::MouseMove { x, y } => {
                self.mouse_pos = PixelPoint::new(*x as f64, *y as f64);
                self.on_mouse_move();
            }
            InputEvent::MouseDown { x, y, button } => {
                self.mouse_pos = PixelPoint::new(*x as f64, *y as f64);
                match button {
                    MouseButtonKind::Left => self.on_left_click(),
                    MouseButtonKind::Right => self.on_right_click(),
                    MouseButtonKind::Middle => {
                        self.gesture = Gesture::Panning { last: self.mouse_pos };
                    }
                }
            }
            InputEvent::MouseUp { button, .. } => self.on_mouse_up(*button),
            InputEvent::Wheel { steps } => self.view.zoom_at(self.mouse_pos, *steps as f64),
            InputEvent::KeyDown(key) => self.on_key(*key),
            InputEvent::KeyUp(_) | InputEvent::Quit => {}
        }
    }

    fn on_key(&mut self, key: Keycode) {
        match key {
            Keycode::D => self.start_drawing(),
            Keycode::Return | Keycode::KpEnter => {
                if let Err(e) = self.commit_with_defaults() {
                    warn!("Cannot close region: {}", e);
                }
            }
            Keycode::Backspace => {
                self.drawing.undo_last_point();
            }
            Keycode::Escape => {
                if self.drawing.is_drawing() {
                    self.drawing.cancel();
                } else {
                    self.visibility.clear_selection();
                }
            }
            Keycode::H => self.hide_selected(),
            Keycode::V => self.visibility.show_all(),
            Keycode::A => self.toggle_selected_active(),
            Keycode::F => self.focus_selected(),
            Keycode::Delete => {
                self.delete_selected();
            }
            _ => {}
        }
    }

    fn on_mouse_move(&mut self) {
        match &mut self.gesture {
            Gesture::DraggingVertex {
                region_id,
                vertex_index,
            } => {
                let point = self.view.pixel_to_geo(self.mouse_pos.x, self.mouse_pos.y);
                match self.registry.move_vertex(region_id, *vertex_index, point) {
                    Ok(()) => self.dirty = true,
                    Err(e) => {
                        warn!("Vertex drag aborted: {}", e);
                        self.gesture = Gesture::None;
                    }
                }
            }
            Gesture::Panning { last } => {
                let (dx, dy) = (self.mouse_pos.x - last.x, self.mouse_pos.y - last.y);
                *last = self.mouse_pos;
                self.view.pan_by_pixels(dx, dy);
            }
            Gesture::None => {}
        }
    }

    fn on_left_click(&mut self) {
        self.refresh();
        let click = self.mouse_pos;

        if self.drawing.is_drawing() {
            if self.overlay.can_close_draft(click, self.settings.snap_distance) {
                if let Err(e) = self.commit_with_defaults() {
                    warn!("Cannot close region: {}", e);
                }
            } else {
                self.drawing.add_point(click.x, click.y, &self.view);
            }
            return;
        }

        // Grab a handle of the selected region before considering reselection
        if let Some(selected) = self.visibility.selected() {
            if let Some(vertex_index) = self
                .overlay
                .vertex_at(selected, click, self.settings.vertex_handle_size)
            {
                self.gesture = Gesture::DraggingVertex {
                    region_id: selected.to_string(),
                    vertex_index,
                };
                return;
            }
        }

        match self.overlay.hit_test(click, self.settings.hit_tolerance) {
            Some(id) => {
                let id = id.to_string();
                self.visibility.select(&id);
            }
            None => self.visibility.clear_selection(),
        }
    }

    fn on_right_click(&mut self) {
        self.gesture = Gesture::None;
        if self.drawing.is_drawing() {
            self.drawing.cancel();
        } else {
            self.visibility.clear_selection();
        }
    }

    fn on_mouse_up(&mut self, button: MouseButtonKind) {
        match (&self.gesture, button) {
            (Gesture::DraggingVertex { region_id, vertex_index }, MouseButtonKind::Left) => {
                debug!(region = %region_id, vertex = vertex_index, "vertex drag finished");
                self.gesture = Gesture::None;
            }
            (Gesture::Panning { .. }, MouseButtonKind::Middle) => self.gesture = Gesture::None,
            _ => {}
        }
    }

    pub fn start_drawing(&mut self) {
        self.gesture = Gesture::None;
        self.drawing.start_drawing(&mut self.visibility);
    }

    /// Commit the open drawing with explicit metadata
    pub fn commit_drawing(&mut self, metadata: RegionMetadata) -> Result<String> {
        let id = self.drawing.commit(metadata, &mut self.registry)?;
        self.dirty = true;
        Ok(id)
    }

    /// Commit the open drawing under the next auto-generated name
    pub fn commit_with_defaults(&mut self) -> Result<String> {
        let metadata = RegionMetadata::named(self.next_region_name.clone(), self.settings.default_fee);
        let id = self.commit_drawing(metadata)?;
        self.auto_increment_name();
        self.visibility.select(&id);
        Ok(id)
    }

    pub fn cancel_drawing(&mut self) {
        self.drawing.cancel();
    }

    /// Delete the currently selected region
    pub fn delete_selected(&mut self) -> Option<Region> {
        let id = self.visibility.selected()?.to_string();
        let removed = self.registry.remove(&id)?;
        self.gesture = Gesture::None;
        self.visibility.retain(&self.registry);
        self.dirty = true;
        Some(removed)
    }

    pub fn hide_selected(&mut self) {
        if let Some(id) = self.visibility.selected().map(str::to_string) {
            self.visibility.hide(&id);
        }
    }

    pub fn toggle_selected_active(&mut self) {
        let Some(region) = self.selected_region() else {
            return;
        };
        let (id, active) = (region.id.clone(), !region.active);
        let edit = RegionEdit {
            active: Some(active),
            ..RegionEdit::default()
        };
        match self.registry.update(&id, edit) {
            Ok(()) => {
                info!(id = %id, active, "region availability changed");
                self.dirty = true;
            }
            Err(e) => warn!("Cannot update region: {}", e),
        }
    }

    /// Pan and zoom so the selected region fills the view
    pub fn focus_selected(&mut self) {
        if let Some((sw, ne)) = self.selected_region().and_then(|r| r.polygon.bounds()) {
            self.view.fit_to(sw, ne);
        }
    }

    /// Swap in a snapshot from storage or a remote change
    pub fn replace_regions(&mut self, regions: Vec<Region>) -> Result<()> {
        self.registry.replace_all(regions)?;
        self.gesture = Gesture::None;
        self.visibility.retain(&self.registry);
        self.dirty = false;
        Ok(())
    }

    /// Bring the overlay projection up to date with the current state
    pub fn refresh(&mut self) -> bool {
        self.overlay
            .refresh(&self.registry, &self.visibility, &self.view, &self.drawing)
    }

    pub fn render(&mut self, buffer: &mut PixelBuffer) {
        self.refresh();
        overlay::render_graticule(buffer, &self.view);
        self.overlay
            .render(buffer, self.mouse_pos, self.settings.snap_distance);
    }

    /// Window title summarizing the editor state
    pub fn status_line(&self) -> String {
        let mode = if self.drawing.is_drawing() {
            format!("drawing ({} points)", self.drawing.points().len())
        } else if let Some(region) = self.selected_region() {
            format!(
                "{} | fee {} | {}",
                region.name,
                region.fee,
                if region.active { "active" } else { "inactive" }
            )
        } else {
            "idle".to_string()
        };
        format!(
            "zonefence | {} regions | zoom {:.1} | {}{}",
            self.registry.len(),
            self.view.zoom(),
            mode,
            if self.dirty { " *" } else { "" }
        )
    }

    fn auto_increment_name(&mut self) {
        if let Some(pos) = self.next_region_name.rfind('_') {
            if let Ok(num) = self.next_region_name[pos + 1..].parse::<u32>() {
                self.next_region_name = format!("{}{}", &self.next_region_name[..=pos], num + 1);
                return;
            }
        }
        self.next_region_name = format!("{}_{}", self.settings.name_prefix, self.registry.len() + 1);
    }
}
