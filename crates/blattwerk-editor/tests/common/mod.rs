// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the editor behaviour tests.

#![allow(dead_code)]

use blattwerk_core::config::EditorConfig;
use blattwerk_core::types::Rect;
use blattwerk_document::RasterDocument;
use blattwerk_editor::overlay::RedactionMarker;
use blattwerk_editor::{OverlayObject, Session};
use image::{Rgba, RgbaImage};

/// A page with fine detail everywhere, so any blur is visible.
pub fn textured_page(width: u32, height: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let cell = ((x / 3) + (y / 3)) % 2 == 0;
        let v = if cell { 20 } else { 235 };
        Rgba([v, v.wrapping_add(seed), ((x * 3 + y) % 256) as u8, 255])
    })
}

pub fn document(pages: &[RgbaImage]) -> RasterDocument {
    RasterDocument::new(pages.to_vec()).unwrap()
}

/// A session over `pages` with the default configuration (scale 1.5).
pub fn open_session(pages: &[RgbaImage]) -> Session {
    let mut session = Session::new(EditorConfig::default()).unwrap();
    session.open_source(Box::new(document(pages))).unwrap();
    session
}

pub fn marker(x: f32, y: f32, width: f32, height: f32) -> OverlayObject {
    OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(x, y, width, height)))
}
