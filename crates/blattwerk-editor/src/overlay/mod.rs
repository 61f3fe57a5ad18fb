// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay model: annotation objects, live surfaces, and snapshots.

pub mod live;
pub mod object;
pub mod snapshot;

pub use live::{LiveObject, LiveOverlay, ObjectId};
pub use object::{BakedPatch, EraseMarker, MarkerStyle, OverlayObject, RedactionMarker, TextAnnotation};
pub use snapshot::{OverlaySnapshot, SNAPSHOT_VERSION};
