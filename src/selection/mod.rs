//! Item selection that survives (or doesn't) page and filter transitions.

use crate::core::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// How long a selection lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionPolicy {
    /// Only ids on the visible page stay selected.
    #[default]
    Page,
    /// Ids stay selected across pages until the filter changes.
    AllMatchingFilter,
}

/// Derived state of the "select all" header checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    None,
    Some,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    selected: BTreeSet<ItemId>,
    visible: Vec<ItemId>,
    retention: RetentionPolicy,
}

impl SelectionSet {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            selected: BTreeSet::new(),
            visible: Vec::new(),
            retention,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn toggle(&mut self, id: &ItemId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    pub fn select(&mut self, id: ItemId) {
        self.selected.insert(id);
    }

    pub fn deselect(&mut self, id: &ItemId) {
        self.selected.remove(id);
    }

    pub fn select_all_visible<'a>(&mut self, ids: impl IntoIterator<Item = &'a ItemId>) {
        self.selected.extend(ids.into_iter().cloned());
    }

    /// Header checkbox click: clears the visible ids when all are selected,
    /// otherwise selects every visible id.
    pub fn toggle_all_visible(&mut self) {
        if self.header_state() == SelectAllState::All {
            for id in &self.visible {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(self.visible.iter().cloned());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selected.contains(id)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in stable (sorted) order.
    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.selected.iter().cloned().collect()
    }

    pub fn visible_ids(&self) -> &[ItemId] {
        &self.visible
    }

    /// Records the ids of a newly applied page.
    ///
    /// Under [`RetentionPolicy::Page`] anything not on the new page is
    /// dropped from the selection.
    pub fn reconcile(&mut self, visible: Vec<ItemId>) {
        if self.retention == RetentionPolicy::Page {
            let on_page: HashSet<&ItemId> = visible.iter().collect();
            self.selected.retain(|id| on_page.contains(id));
        }
        self.visible = visible;
    }

    /// Called when the filter set changes. A selection scoped to "all
    /// matching the filter" no longer means anything afterwards.
    pub fn on_filter_changed(&mut self) {
        if self.retention == RetentionPolicy::AllMatchingFilter {
            self.selected.clear();
        }
    }

    pub fn header_state(&self) -> SelectAllState {
        if self.selected.is_empty() {
            return SelectAllState::None;
        }
        if !self.visible.is_empty() && self.visible.iter().all(|id| self.selected.contains(id)) {
            SelectAllState::All
        } else {
            SelectAllState::Some
        }
    }
}
