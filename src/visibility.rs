//! Which regions are shown, hidden or selected in the editor.
//!
//! Pure presentation state: nothing here is persisted. Regions are visible
//! unless hidden, so freshly drawn or imported regions show up immediately.

use crate::regions::ZoneRegistry;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct RegionVisibility {
    hidden: HashSet<String>,
    selected: Option<String>,
    revision: u64,
}

impl RegionVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every visibility or selection change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_visible(&self, id: &str) -> bool {
        !self.hidden.contains(id)
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    /// Hide a region; a hidden region cannot stay selected
    pub fn hide(&mut self, id: &str) {
        if self.hidden.insert(id.to_string()) {
            if self.selected.as_deref() == Some(id) {
                self.selected = None;
            }
            self.touch();
        }
    }

    pub fn show(&mut self, id: &str) {
        if self.hidden.remove(id) {
            self.touch();
        }
    }

    /// Flip visibility; returns the new state
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.is_visible(id) {
            self.hide(id);
            false
        } else {
            self.show(id);
            true
        }
    }

    pub fn show_all(&mut self) {
        if !self.hidden.is_empty() {
            self.hidden.clear();
            self.touch();
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a region; hidden regions cannot be selected
    pub fn select(&mut self, id: &str) -> bool {
        if !self.is_visible(id) {
            return false;
        }
        if self.selected.as_deref() != Some(id) {
            self.selected = Some(id.to_string());
            self.touch();
        }
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.touch();
        }
    }

    /// Forget ids that are no longer in the registry
    pub fn retain(&mut self, registry: &ZoneRegistry) {
        let before = (self.hidden.len(), self.selected.is_some());
        self.hidden.retain(|id| registry.get(id).is_some());
        if self
            .selected
            .as_deref()
            .is_some_and(|id| registry.get(id).is_none())
        {
            self.selected = None;
        }
        if before != (self.hidden.len(), self.selected.is_some()) {
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
