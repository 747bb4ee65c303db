use std::collections::HashSet;

use crate::record::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    None,
    Partial,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<RecordId>,
}

impl Selection {
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn toggle_all(&mut self, select: bool, visible: impl IntoIterator<Item = RecordId>) {
        self.ids.clear();
        if select {
            self.ids.extend(visible);
        }
    }

    pub fn remove(&mut self, id: RecordId) {
        self.ids.remove(&id);
    }

    pub fn retain_visible(&mut self, visible: &HashSet<RecordId>) {
        self.ids.retain(|id| visible.contains(id));
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.ids.iter().copied()
    }

    pub fn state(&self, visible_count: usize) -> SelectionState {
        match self.count() {
            0 => SelectionState::None,
            n if n < visible_count => SelectionState::Partial,
            _ => SelectionState::All,
        }
    }
}
