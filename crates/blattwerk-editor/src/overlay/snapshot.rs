// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay snapshots: the at-rest, portable form of one page's overlay.

use blattwerk_core::error::{BlattwerkError, Result};
use serde::{Deserialize, Serialize};

use crate::overlay::object::OverlayObject;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The full editable state of one page, objects in z-order (index 0 at the
/// bottom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    pub version: u32,
    pub objects: Vec<OverlayObject>,
}

impl Default for OverlaySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl OverlaySnapshot {
    /// The state of a page nobody has edited yet.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            objects: Vec::new(),
        }
    }

    pub fn from_objects(objects: Vec<OverlayObject>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            objects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Number of redaction markers still waiting for a bake.
    pub fn pending_markers(&self) -> usize {
        self.objects.iter().filter(|o| o.is_pending_marker()).count()
    }

    /// Check that every object can be restored onto a live overlay.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(BlattwerkError::OverlayRestore(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        for (index, object) in self.objects.iter().enumerate() {
            object.validate().map_err(|err| {
                BlattwerkError::OverlayRestore(format!("object {index} ({}): {err}", object.kind()))
            })?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a snapshot. Malformed input is an
    /// [`BlattwerkError::OverlayRestore`].
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json).map_err(|err| {
            BlattwerkError::OverlayRestore(format!("snapshot is not valid JSON: {}", err))
        })?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::object::{EraseMarker, RedactionMarker, TextAnnotation};
    use blattwerk_core::types::{Color, Point, Rect};

    fn sample() -> OverlaySnapshot {
        OverlaySnapshot::from_objects(vec![
            OverlayObject::EraseMarker(EraseMarker::new(
                Rect::new(0.0, 0.0, 20.0, 20.0),
                Color::WHITE,
            )),
            OverlayObject::Text(TextAnnotation {
                position: Point::new(5.0, 6.0),
                text: "Hello".into(),
                font_size: 16.0,
                color: Color::rgb(200, 0, 0),
            }),
            OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(
                100.0, 100.0, 100.0, 50.0,
            ))),
        ])
    }

    #[test]
    fn json_preserves_order_and_attributes() {
        let original = sample();
        let restored = OverlaySnapshot::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.pending_markers(), 1);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snapshot = sample();
        snapshot.version = 99;
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(matches!(
            OverlaySnapshot::from_json(&json),
            Err(BlattwerkError::OverlayRestore(_))
        ));
    }

    #[test]
    fn garbage_is_a_restore_error() {
        assert!(matches!(
            OverlaySnapshot::from_json("{not json"),
            Err(BlattwerkError::OverlayRestore(_))
        ));
    }

    #[test]
    fn empty_is_the_default() {
        let snapshot = OverlaySnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.validate().is_ok());
    }
}
