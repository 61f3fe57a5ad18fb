// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page edit store: at-rest overlay snapshots keyed by page number.
//
// `commit_current` takes the live overlay by value: once a page's overlay is
// committed it cannot be touched again, so edits can't be made after the
// snapshot was taken and then lost.

use std::collections::BTreeMap;

use tracing::debug;

use crate::overlay::{LiveOverlay, OverlaySnapshot};

/// Per-page overlay state that survives navigation.
#[derive(Debug, Default)]
pub struct PageEditStore {
    entries: BTreeMap<u32, OverlaySnapshot>,
}

impl PageEditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `live` into `page` and release it.
    pub fn commit_current(&mut self, page: u32, live: LiveOverlay) {
        self.checkpoint(page, &live);
    }

    /// Snapshot `live` into `page` while it stays attached (after a bake,
    /// before an export).
    pub fn checkpoint(&mut self, page: u32, live: &LiveOverlay) {
        let snapshot = live.to_snapshot();
        debug!(page, objects = snapshot.len(), "Overlay committed");
        self.entries.insert(page, snapshot);
    }

    /// Store an at-rest snapshot for a page that is not live.
    pub fn insert(&mut self, page: u32, snapshot: OverlaySnapshot) {
        self.entries.insert(page, snapshot);
    }

    /// The stored snapshot for `page`. A first visit creates an empty entry.
    pub fn load_into(&mut self, page: u32) -> OverlaySnapshot {
        self.entries.entry(page).or_default().clone()
    }

    /// The stored snapshot without creating an entry.
    pub fn get(&self, page: u32) -> Option<&OverlaySnapshot> {
        self.entries.get(&page)
    }

    /// Pages that have an entry, ascending.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything. Only a new document calls this.
    pub fn clear_all(&mut self) {
        debug!(pages = self.entries.len(), "Edit store cleared");
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{OverlayObject, RedactionMarker};
    use blattwerk_core::types::Rect;

    fn overlay_with_marker() -> LiveOverlay {
        let mut overlay = LiveOverlay::new(50, 50);
        overlay.add(OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(
            1.0, 2.0, 3.0, 4.0,
        ))));
        overlay
    }

    #[test]
    fn first_visit_yields_empty_entry() {
        let mut store = PageEditStore::new();
        assert!(store.get(3).is_none());
        assert!(store.load_into(3).is_empty());
        assert_eq!(store.pages().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn commit_then_load_returns_snapshot() {
        let mut store = PageEditStore::new();
        let overlay = overlay_with_marker();
        let expected = overlay.to_snapshot();
        store.commit_current(1, overlay);
        assert_eq!(store.load_into(1), expected);
    }

    #[test]
    fn checkpoint_overwrites_previous_commit() {
        let mut store = PageEditStore::new();
        let mut overlay = overlay_with_marker();
        store.checkpoint(1, &overlay);
        overlay.add(OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(
            9.0, 9.0, 1.0, 1.0,
        ))));
        store.checkpoint(1, &overlay);
        assert_eq!(store.get(1).map(OverlaySnapshot::len), Some(2));
    }

    #[test]
    fn clear_all_forgets_every_page() {
        let mut store = PageEditStore::new();
        store.commit_current(1, overlay_with_marker());
        store.commit_current(2, overlay_with_marker());
        store.clear_all();
        assert!(store.is_empty());
        assert!(store.load_into(1).is_empty());
    }
}
