// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compositor: flattens a page's rendered overlay onto its base raster.
//
// Buffers are straight (non-premultiplied) RGBA8. Fully transparent overlay
// pixels leave the base byte-for-byte unchanged and fully opaque ones replace
// it, so unedited regions survive export exactly.

use blattwerk_core::error::{BlattwerkError, Result};
use image::RgbaImage;
use tracing::{debug, instrument};

use crate::overlay::{LiveOverlay, OverlaySnapshot};
use crate::render::OverlayRenderer;

pub type Rgba8 = [u8; 4];

/// Straight-alpha "over": `src` on top of `dst`.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    // Output alpha scaled by 255 to keep the colour division exact.
    let out_a_255 = sa * 255 + da * inv;
    if out_a_255 == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * sa * 255 + u32::from(dst[i]) * da * inv;
        out[i] = ((num + out_a_255 / 2) / out_a_255).min(255) as u8;
    }
    out[3] = ((out_a_255 + 127) / 255).min(255) as u8;
    out
}

/// Merges base rasters with rendered overlays.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    renderer: OverlayRenderer,
}

impl Compositor {
    pub fn new(renderer: OverlayRenderer) -> Self {
        Self { renderer }
    }

    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    /// Render `snapshot` at the base raster's size and flatten it onto a copy
    /// of `base`.
    #[instrument(skip_all, fields(width = base.width(), height = base.height(), objects = snapshot.len()))]
    pub fn composite(&self, base: &RgbaImage, snapshot: &OverlaySnapshot) -> Result<RgbaImage> {
        if snapshot.is_empty() {
            debug!("Empty overlay, base copied");
            return Ok(base.clone());
        }
        let layer = self.renderer.render(snapshot, base.width(), base.height());
        composite_layer(base, &layer)
    }

    /// Flatten a live overlay onto `base`, the way it is shown while editing.
    pub fn composite_live(&self, base: &RgbaImage, overlay: &LiveOverlay) -> Result<RgbaImage> {
        check_dimensions(base, overlay.dimensions())?;
        let layer = self.renderer.render_live(overlay);
        composite_layer(base, &layer)
    }
}

/// Blend an already-rendered overlay `layer` over `base`. Both must have the
/// same dimensions. `base` is not modified.
pub fn composite_layer(base: &RgbaImage, layer: &RgbaImage) -> Result<RgbaImage> {
    check_dimensions(base, layer.dimensions())?;
    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(layer.pixels()) {
        dst.0 = over(dst.0, src.0);
    }
    Ok(out)
}

fn check_dimensions(base: &RgbaImage, actual: (u32, u32)) -> Result<()> {
    if base.dimensions() != actual {
        return Err(BlattwerkError::Composite {
            expected: base.dimensions(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{EraseMarker, OverlayObject};
    use blattwerk_core::types::{Color, Rect};
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128, 255]))
    }

    #[test]
    fn over_fast_paths_are_exact() {
        let dst = [10, 20, 30, 255];
        assert_eq!(over(dst, [200, 100, 50, 0]), dst);
        assert_eq!(over(dst, [200, 100, 50, 255]), [200, 100, 50, 255]);
    }

    #[test]
    fn over_blends_half_alpha() {
        let out = over([0, 0, 0, 255], [255, 255, 255, 128]);
        assert!((127..=129).contains(&out[0]), "{out:?}");
        assert_eq!(out[3], 255);
    }

    #[test]
    fn over_onto_transparent_keeps_source_colour() {
        assert_eq!(over([0, 0, 0, 0], [90, 60, 30, 100]), [90, 60, 30, 100]);
    }

    #[test]
    fn empty_overlay_leaves_base_identical() {
        let base = gradient(30, 20);
        let out = Compositor::default().composite(&base, &OverlaySnapshot::empty()).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn output_matches_base_dimensions() {
        let base = gradient(31, 17);
        let snapshot = OverlaySnapshot::from_objects(vec![OverlayObject::EraseMarker(
            EraseMarker::new(Rect::new(-10.0, -10.0, 100.0, 100.0), Color::WHITE),
        )]);
        let out = Compositor::default().composite(&base, &snapshot).unwrap();
        assert_eq!(out.dimensions(), base.dimensions());
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn untouched_pixels_are_unchanged_and_base_is_not_mutated() {
        let base = gradient(40, 40);
        let before = base.clone();
        let snapshot = OverlaySnapshot::from_objects(vec![OverlayObject::EraseMarker(
            EraseMarker::new(Rect::new(10.0, 10.0, 5.0, 5.0), Color::rgb(255, 0, 0)),
        )]);
        let out = Compositor::default().composite(&base, &snapshot).unwrap();
        assert_eq!(base, before);
        assert_eq!(out.get_pixel(12, 12).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 0), base.get_pixel(0, 0));
        assert_eq!(out.get_pixel(15, 15), base.get_pixel(15, 15));
    }

    #[test]
    fn layer_size_mismatch_is_a_composite_error() {
        let base = gradient(10, 10);
        let layer = RgbaImage::new(10, 11);
        assert!(matches!(
            composite_layer(&base, &layer),
            Err(BlattwerkError::Composite {
                expected: (10, 10),
                actual: (10, 11)
            })
        ));
    }

    #[test]
    fn live_overlay_must_mirror_base() {
        let base = gradient(10, 10);
        let overlay = LiveOverlay::new(20, 10);
        assert!(Compositor::default().composite_live(&base, &overlay).is_err());
    }
}
