// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit scripts: a JSON list of per-page additions and bakes, applied to a
// session without interaction.
//
// ```json
// { "pages": [
//     { "page": 1,
//       "objects": [ { "kind": "redaction_marker",
//                      "rect": { "x": 100, "y": 100, "width": 100, "height": 50 } } ],
//       "bake": true } ] }
// ```

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::overlay::OverlayObject;
use crate::session::Session;

/// Edits for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEdits {
    pub page: u32,
    #[serde(default)]
    pub objects: Vec<OverlayObject>,
    /// Bake pending markers after adding the objects.
    #[serde(default)]
    pub bake: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    pub pages: Vec<PageEdits>,
}

/// Totals over one script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub pages_visited: usize,
    pub objects_added: usize,
    pub markers_baked: usize,
    pub markers_dropped: usize,
}

impl EditScript {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Apply every entry in ascending page order. Entries for the same page
    /// keep their relative order.
    ///
    /// Stops at the first error; edits applied before it stay in the session.
    #[instrument(skip_all, fields(entries = self.pages.len()))]
    pub fn apply(&self, session: &mut Session) -> Result<ScriptReport> {
        if !session.is_open() {
            return Err(BlattwerkError::NoDocument);
        }

        let mut entries: Vec<&PageEdits> = self.pages.iter().collect();
        entries.sort_by_key(|entry| entry.page);

        let mut report = ScriptReport::default();
        for entry in entries {
            session.go_to(entry.page)?;
            report.pages_visited += 1;

            for object in &entry.objects {
                session.add_object(object.clone())?;
                report.objects_added += 1;
            }
            if entry.bake {
                let baked = session.bake_redactions()?;
                report.markers_baked += baked.baked;
                report.markers_dropped += baked.dropped;
            }
        }

        info!(
            pages = report.pages_visited,
            objects = report.objects_added,
            baked = report.markers_baked,
            "Edit script applied"
        );
        Ok(report)
    }
}
