// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live overlay: the editable object graph attached to the current page.
//
// Each object gets an `ObjectId` for selection and manipulation. Ids are
// session-local and never written into snapshots.

use std::fmt;

use blattwerk_core::error::Result;
use blattwerk_core::types::Scale;
use tracing::debug;
use uuid::Uuid;

use crate::overlay::object::OverlayObject;
use crate::overlay::snapshot::OverlaySnapshot;

/// Session-local handle to a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Uuid);

impl ObjectId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An object together with its live handle.
#[derive(Debug, Clone)]
pub struct LiveObject {
    pub id: ObjectId,
    pub object: OverlayObject,
}

/// The editable surface for one page. Its dimensions always mirror the
/// page's base raster.
#[derive(Debug, Clone)]
pub struct LiveOverlay {
    width: u32,
    height: u32,
    objects: Vec<LiveObject>,
}

impl LiveOverlay {
    /// An empty surface of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            objects: Vec::new(),
        }
    }

    /// Build a surface from a snapshot, validating it first.
    pub fn restore(width: u32, height: u32, snapshot: &OverlaySnapshot) -> Result<Self> {
        let mut overlay = Self::new(width, height);
        overlay.load_snapshot(snapshot)?;
        Ok(overlay)
    }

    /// Replace every object with the snapshot's contents. On error the
    /// overlay is left as it was.
    pub fn load_snapshot(&mut self, snapshot: &OverlaySnapshot) -> Result<()> {
        snapshot.validate()?;
        self.objects = snapshot
            .objects
            .iter()
            .cloned()
            .map(|object| LiveObject {
                id: ObjectId::new(),
                object,
            })
            .collect();
        debug!(objects = self.objects.len(), "Overlay restored from snapshot");
        Ok(())
    }

    /// Capture the current object graph. Does not modify the overlay.
    pub fn to_snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot::from_objects(self.objects.iter().map(|o| o.object.clone()).collect())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &LiveObject> {
        self.objects.iter()
    }

    pub fn get(&self, id: ObjectId) -> Option<&OverlayObject> {
        self.objects.iter().find(|o| o.id == id).map(|o| &o.object)
    }

    /// Z-index of `id`, 0 being the bottom.
    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    /// Ids of all pending redaction markers, bottom to top.
    pub fn pending_markers(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.object.is_pending_marker())
            .map(|o| o.id)
            .collect()
    }

    // -- Editing --------------------------------------------------------------

    /// Add on top of the z-order.
    pub fn add(&mut self, object: OverlayObject) -> ObjectId {
        let id = ObjectId::new();
        debug!(%id, kind = object.kind(), "Object added");
        self.objects.push(LiveObject { id, object });
        id
    }

    /// Add beneath every existing object.
    pub fn add_to_back(&mut self, object: OverlayObject) -> ObjectId {
        let id = ObjectId::new();
        debug!(%id, kind = object.kind(), "Object added at the back");
        self.objects.insert(0, LiveObject { id, object });
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<OverlayObject> {
        let index = self.index_of(id)?;
        Some(self.objects.remove(index).object)
    }

    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let entry = self.objects.remove(index);
        self.objects.push(entry);
        true
    }

    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let entry = self.objects.remove(index);
        self.objects.insert(0, entry);
        true
    }

    pub fn move_to(&mut self, id: ObjectId, x: f32, y: f32) -> bool {
        match self.objects.iter_mut().find(|o| o.id == id) {
            Some(entry) => {
                entry.object.set_origin(x, y);
                true
            }
            None => false,
        }
    }

    /// Apply a live resize transform. Fails for objects that cannot be
    /// resized and for unknown ids.
    pub fn set_scale(&mut self, id: ObjectId, scale: Scale) -> bool {
        self.objects
            .iter_mut()
            .find(|o| o.id == id)
            .is_some_and(|entry| entry.object.set_scale(scale))
    }

    /// Topmost object under `(x, y)`.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.object.bounds().contains(x, y))
            .map(|o| o.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::object::{EraseMarker, RedactionMarker};
    use blattwerk_core::types::{Color, Rect};

    fn marker(x: f32) -> OverlayObject {
        OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(x, 0.0, 10.0, 10.0)))
    }

    #[test]
    fn snapshot_round_trip_preserves_order() {
        let mut overlay = LiveOverlay::new(100, 100);
        overlay.add(marker(1.0));
        overlay.add(marker(2.0));
        overlay.add_to_back(OverlayObject::EraseMarker(EraseMarker::new(
            Rect::new(0.0, 0.0, 5.0, 5.0),
            Color::WHITE,
        )));

        let snapshot = overlay.to_snapshot();
        let restored = LiveOverlay::restore(100, 100, &snapshot).unwrap();
        assert_eq!(restored.to_snapshot(), snapshot);
        assert_eq!(snapshot.objects[0].kind(), "erase_marker");
    }

    #[test]
    fn restore_issues_fresh_ids() {
        let mut overlay = LiveOverlay::new(10, 10);
        let id = overlay.add(marker(0.0));
        let restored = LiveOverlay::restore(10, 10, &overlay.to_snapshot()).unwrap();
        assert!(restored.get(id).is_none());
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn failed_load_leaves_overlay_untouched() {
        let mut overlay = LiveOverlay::new(10, 10);
        overlay.add(marker(0.0));
        let mut bad = OverlaySnapshot::empty();
        bad.version = 42;
        assert!(overlay.load_snapshot(&bad).is_err());
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn z_order_operations() {
        let mut overlay = LiveOverlay::new(100, 100);
        let a = overlay.add(marker(0.0));
        let b = overlay.add(marker(20.0));
        assert_eq!(overlay.index_of(a), Some(0));

        assert!(overlay.bring_to_front(a));
        assert_eq!(overlay.index_of(a), Some(1));
        assert!(overlay.send_to_back(a));
        assert_eq!(overlay.index_of(a), Some(0));

        assert!(overlay.remove(b).is_some());
        assert!(!overlay.bring_to_front(b));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn hit_test_finds_topmost() {
        let mut overlay = LiveOverlay::new(100, 100);
        let bottom = overlay.add(marker(0.0));
        let top = overlay.add(marker(5.0));
        assert_eq!(overlay.hit_test(7.0, 5.0), Some(top));
        assert_eq!(overlay.hit_test(2.0, 5.0), Some(bottom));
        assert_eq!(overlay.hit_test(50.0, 50.0), None);
    }

    #[test]
    fn move_and_scale() {
        let mut overlay = LiveOverlay::new(100, 100);
        let id = overlay.add(marker(0.0));
        assert!(overlay.move_to(id, 30.0, 40.0));
        assert!(overlay.set_scale(id, Scale::new(2.0, 3.0)));
        assert_eq!(
            overlay.get(id).unwrap().bounds(),
            Rect::new(30.0, 40.0, 20.0, 30.0)
        );
        assert_eq!(overlay.pending_markers(), vec![id]);
    }
}
