// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-editor: per-page overlay editing, redaction baking, compositing,
// and export.

pub mod bake;
pub mod composite;
pub mod export;
pub mod overlay;
pub mod render;
pub mod script;
pub mod session;
pub mod store;

pub use bake::{BakeReport, RedactionBaker};
pub use composite::{Compositor, composite_layer};
pub use export::{ExportPipeline, ExportedDocument};
pub use overlay::{LiveOverlay, ObjectId, OverlayObject, OverlaySnapshot};
pub use render::OverlayRenderer;
pub use script::{EditScript, PageEdits, ScriptReport};
pub use session::Session;
pub use store::PageEditStore;
