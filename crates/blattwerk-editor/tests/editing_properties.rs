// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay lifecycle properties: snapshot round trips, edits surviving
// navigation, and bake behaviour.

mod common;

use blattwerk_core::types::{Color, Point, Rect, Scale};
use blattwerk_editor::overlay::{BakedPatch, EraseMarker, RedactionMarker, TextAnnotation};
use blattwerk_editor::{
    Compositor, LiveOverlay, OverlayObject, OverlaySnapshot, RedactionBaker,
};
use common::{marker, open_session, textured_page};
use image::RgbaImage;

fn every_kind() -> OverlaySnapshot {
    OverlaySnapshot::from_objects(vec![
        OverlayObject::EraseMarker(EraseMarker::new(Rect::new(0.0, 0.0, 40.0, 40.0), Color::WHITE)),
        OverlayObject::Text(TextAnnotation {
            position: Point::new(12.5, 30.0),
            text: "Approved".into(),
            font_size: 18.0,
            color: Color::rgb(10, 120, 10),
        }),
        OverlayObject::BakedPatch(BakedPatch {
            rect: Rect::new(50.0, 60.0, 4.0, 3.0),
            pixels: textured_page(4, 3, 9),
        }),
        OverlayObject::RedactionMarker(RedactionMarker {
            rect: Rect::new(100.0, 100.0, 100.0, 50.0),
            scale: Scale::new(1.25, 0.5),
            style: Default::default(),
        }),
    ])
}

fn baked_patches(snapshot: &OverlaySnapshot) -> Vec<&BakedPatch> {
    snapshot
        .objects
        .iter()
        .filter_map(|object| match object {
            OverlayObject::BakedPatch(patch) => Some(patch),
            _ => None,
        })
        .collect()
}

#[test]
fn snapshot_restore_round_trip_is_structural_identity() {
    let snapshot = every_kind();
    let live = LiveOverlay::restore(600, 900, &snapshot).unwrap();
    assert_eq!(live.to_snapshot(), snapshot);

    let through_json = OverlaySnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
    let live = LiveOverlay::restore(600, 900, &through_json).unwrap();
    assert_eq!(live.to_snapshot(), snapshot);
}

#[test]
fn snapshot_does_not_disturb_the_live_overlay() {
    let live = LiveOverlay::restore(600, 900, &every_kind()).unwrap();
    let ids: Vec<_> = live.iter().map(|o| o.id).collect();
    let _ = live.to_snapshot();
    assert_eq!(live.iter().map(|o| o.id).collect::<Vec<_>>(), ids);
}

#[test]
fn edits_survive_navigating_away_and_back() {
    let mut session = open_session(&[textured_page(400, 600, 0), textured_page(400, 600, 50)]);
    session.add_text().unwrap();
    let moved = session.add_redaction_marker().unwrap();
    session.add_erase_patch().unwrap();
    {
        let overlay = session.overlay_mut().unwrap();
        overlay.move_to(moved, 300.0, 400.0);
        overlay.set_scale(moved, Scale::new(2.0, 1.5));
    }
    let before = session.page_snapshot(1).unwrap();

    assert!(session.next_page().unwrap());
    assert!(session.overlay().unwrap().is_empty());
    assert!(session.prev_page().unwrap());

    assert_eq!(session.current_page(), Some(1));
    assert_eq!(session.overlay().unwrap().to_snapshot(), before);
}

#[test]
fn each_page_keeps_its_own_edits() {
    let mut session = open_session(&[
        textured_page(200, 200, 0),
        textured_page(200, 200, 1),
        textured_page(200, 200, 2),
    ]);
    session.add_object(marker(10.0, 10.0, 20.0, 20.0)).unwrap();
    session.go_to(3).unwrap();
    session.add_text().unwrap();
    session.add_text().unwrap();
    session.go_to(2).unwrap();

    assert_eq!(session.page_snapshot(1).unwrap().len(), 1);
    assert!(session.page_snapshot(2).unwrap().is_empty());
    assert_eq!(session.page_snapshot(3).unwrap().len(), 2);
}

#[test]
fn unrestorable_page_opens_empty_without_touching_others() {
    let mut session = open_session(&[textured_page(100, 100, 0), textured_page(100, 100, 1)]);
    session.add_object(marker(5.0, 5.0, 10.0, 10.0)).unwrap();

    let mut corrupt = every_kind();
    corrupt.version = 99;
    session.import_snapshot(2, corrupt).unwrap();

    session.go_to(2).unwrap();
    assert_eq!(session.current_page(), Some(2));
    assert!(session.overlay().unwrap().is_empty());

    session.go_to(1).unwrap();
    assert_eq!(session.overlay().unwrap().len(), 1);
}

#[test]
fn baking_twice_yields_one_patch() {
    let mut session = open_session(&[textured_page(400, 600, 0)]);
    session.add_object(marker(100.0, 100.0, 100.0, 50.0)).unwrap();

    let first = session.bake_redactions().unwrap();
    let after_first = session.page_snapshot(1).unwrap();
    let second = session.bake_redactions().unwrap();

    assert_eq!(first.baked, 1);
    assert_eq!(second.baked, 0);
    let snapshot = session.page_snapshot(1).unwrap();
    assert_eq!(snapshot, after_first);
    assert_eq!(baked_patches(&snapshot).len(), 1);
    assert_eq!(snapshot.pending_markers(), 0);
}

#[test]
fn overlapping_markers_blur_the_original_pixels_independently() {
    let mut session = open_session(&[textured_page(400, 600, 0)]);
    let first = RedactionMarker::new(Rect::new(100.0, 100.0, 120.0, 80.0));
    let second = RedactionMarker::new(Rect::new(150.0, 130.0, 120.0, 80.0));
    session.add_object(OverlayObject::RedactionMarker(first.clone())).unwrap();
    session.add_object(OverlayObject::RedactionMarker(second.clone())).unwrap();

    let base: RgbaImage = session.base_raster().unwrap().clone();
    let baker = RedactionBaker::from_config(session.config());
    let expected_first = baker.bake_patch(&base, &first).unwrap();
    let expected_second = baker.bake_patch(&base, &second).unwrap();

    let report = session.bake_redactions().unwrap();
    assert_eq!(report.baked, 2);

    let snapshot = session.page_snapshot(1).unwrap();
    let patches = baked_patches(&snapshot);
    assert_eq!(patches.len(), 2);
    assert_eq!(*patches[0], expected_first);
    assert_eq!(*patches[1], expected_second);
    assert_eq!(session.base_raster().unwrap(), &base);
}

#[test]
fn composite_always_matches_base_dimensions() {
    let compositor = Compositor::default();
    let mut far_out = every_kind();
    far_out.objects.push(OverlayObject::EraseMarker(EraseMarker::new(
        Rect::new(-500.0, -500.0, 5000.0, 5000.0),
        Color::rgba(255, 0, 0, 128),
    )));
    far_out.objects.push(OverlayObject::BakedPatch(BakedPatch {
        rect: Rect::new(95.0, 95.0, 10.0, 10.0),
        pixels: textured_page(10, 10, 3),
    }));

    for (width, height) in [(1, 1), (37, 53), (100, 100), (600, 900)] {
        let base = textured_page(width, height, 0);
        for snapshot in [OverlaySnapshot::empty(), every_kind(), far_out.clone()] {
            let out = compositor.composite(&base, &snapshot).unwrap();
            assert_eq!(out.dimensions(), base.dimensions());
        }
    }
}
