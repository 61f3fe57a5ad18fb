// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Redaction baker: turns pending markers into blurred raster patches cut from
// the page's base raster.

use blattwerk_core::config::EditorConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_document::ImageProcessor;
use image::RgbaImage;
use tracing::{debug, info, instrument, warn};

use crate::overlay::{BakedPatch, LiveOverlay, OverlayObject, RedactionMarker};

/// Blur sigma per unit of intensity, relative to the patch's shorter side.
const BLUR_FRACTION: f32 = 0.12;

/// Smallest sigma applied, so tiny patches are still obscured.
const MIN_SIGMA: f32 = 1.0;

/// Outcome of one bake pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakeReport {
    /// Markers replaced by a patch.
    pub baked: usize,
    /// Markers entirely outside the raster, removed without a patch.
    pub dropped: usize,
}

/// Blurs the base raster under each redaction marker.
#[derive(Debug, Clone, Copy)]
pub struct RedactionBaker {
    intensity: f32,
}

impl RedactionBaker {
    pub fn new(intensity: f32) -> Self {
        Self { intensity }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.blur_intensity)
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Gaussian sigma for a `width` x `height` patch.
    pub fn sigma_for(&self, width: u32, height: u32) -> f32 {
        (self.intensity * BLUR_FRACTION * width.min(height) as f32).max(MIN_SIGMA)
    }

    /// Blur the pixels of `base` under `marker`, clipped to the raster.
    ///
    /// Returns `None` when nothing of the marker lies on the raster. Only
    /// `base` is read, so markers bake independently of one another.
    pub fn bake_patch(&self, base: &RgbaImage, marker: &RedactionMarker) -> Option<BakedPatch> {
        let region = marker
            .effective_rect()
            .to_pixel_rect(base.width(), base.height())?;
        let sigma = self.sigma_for(region.width, region.height);
        let mut pixels = ImageProcessor::region_of(base, region)
            .gaussian_blur(sigma)
            .into_rgba();
        // Base rasters are opaque; blur rounding must not let them show through.
        for pixel in pixels.pixels_mut() {
            pixel.0[3] = 255;
        }
        debug!(
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            sigma,
            "Patch blurred"
        );
        Some(BakedPatch {
            rect: region.to_rect(),
            pixels,
        })
    }

    /// Bake every pending marker on `overlay` against `base`.
    ///
    /// Markers are processed bottom to top. Each becomes a patch on top of
    /// the z-order; a marker with no on-raster area is removed. Calling this
    /// again without new markers changes nothing.
    #[instrument(skip_all, fields(intensity = self.intensity))]
    pub fn bake(&self, overlay: &mut LiveOverlay, base: &RgbaImage) -> Result<BakeReport> {
        if overlay.dimensions() != base.dimensions() {
            return Err(BlattwerkError::Composite {
                expected: base.dimensions(),
                actual: overlay.dimensions(),
            });
        }

        let mut report = BakeReport::default();
        for id in overlay.pending_markers() {
            let Some(OverlayObject::RedactionMarker(marker)) = overlay.remove(id) else {
                continue;
            };
            match self.bake_patch(base, &marker) {
                Some(patch) => {
                    overlay.add(OverlayObject::BakedPatch(patch));
                    report.baked += 1;
                }
                None => {
                    warn!(rect = ?marker.effective_rect(), "Marker lies outside the page, dropped");
                    report.dropped += 1;
                }
            }
        }

        if report.baked + report.dropped > 0 {
            info!(baked = report.baked, dropped = report.dropped, "Redactions baked");
        }
        Ok(report)
    }
}

impl Default for RedactionBaker {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::{Rect, Scale};
    use image::Rgba;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    fn marker(x: f32, y: f32, w: f32, h: f32) -> OverlayObject {
        OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(x, y, w, h)))
    }

    fn patches(overlay: &LiveOverlay) -> Vec<BakedPatch> {
        overlay
            .iter()
            .filter_map(|o| match &o.object {
                OverlayObject::BakedPatch(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn marker_becomes_blurred_patch_at_same_rect() {
        let base = checker(60, 60);
        let mut overlay = LiveOverlay::new(60, 60);
        overlay.add(marker(10.0, 10.0, 20.0, 10.0));

        let report = RedactionBaker::new(0.8).bake(&mut overlay, &base).unwrap();
        assert_eq!(report, BakeReport { baked: 1, dropped: 0 });

        let baked = patches(&overlay);
        assert_eq!(baked.len(), 1);
        assert_eq!(baked[0].rect, Rect::new(10.0, 10.0, 20.0, 10.0));
        assert_eq!(baked[0].pixels.dimensions(), (20, 10));
        let original = image::imageops::crop_imm(&base, 10, 10, 20, 10).to_image();
        assert_ne!(baked[0].pixels, original);
    }

    #[test]
    fn live_scale_widens_the_patch() {
        let base = checker(60, 60);
        let mut overlay = LiveOverlay::new(60, 60);
        let id = overlay.add(marker(0.0, 0.0, 10.0, 10.0));
        overlay.set_scale(id, Scale::new(2.0, 1.5));

        RedactionBaker::new(0.8).bake(&mut overlay, &base).unwrap();
        assert_eq!(patches(&overlay)[0].pixels.dimensions(), (20, 15));
    }

    #[test]
    fn second_bake_is_a_noop() {
        let base = checker(40, 40);
        let mut overlay = LiveOverlay::new(40, 40);
        overlay.add(marker(5.0, 5.0, 10.0, 10.0));
        let baker = RedactionBaker::new(0.8);

        baker.bake(&mut overlay, &base).unwrap();
        let after_first = overlay.to_snapshot();
        let report = baker.bake(&mut overlay, &base).unwrap();
        assert_eq!(report, BakeReport::default());
        assert_eq!(overlay.to_snapshot(), after_first);
    }

    #[test]
    fn partially_outside_marker_is_clipped() {
        let base = checker(30, 30);
        let mut overlay = LiveOverlay::new(30, 30);
        overlay.add(marker(20.0, -5.0, 20.0, 15.0));

        RedactionBaker::new(0.8).bake(&mut overlay, &base).unwrap();
        let baked = patches(&overlay);
        assert_eq!(baked[0].rect, Rect::new(20.0, 0.0, 10.0, 10.0));
        assert_eq!(baked[0].pixels.dimensions(), (10, 10));
    }

    #[test]
    fn fully_outside_marker_is_dropped() {
        let base = checker(30, 30);
        let mut overlay = LiveOverlay::new(30, 30);
        overlay.add(marker(100.0, 100.0, 10.0, 10.0));

        let report = RedactionBaker::new(0.8).bake(&mut overlay, &base).unwrap();
        assert_eq!(report, BakeReport { baked: 0, dropped: 1 });
        assert!(overlay.is_empty());
    }

    #[test]
    fn mismatched_overlay_is_rejected() {
        let base = checker(30, 30);
        let mut overlay = LiveOverlay::new(31, 30);
        overlay.add(marker(0.0, 0.0, 5.0, 5.0));
        assert!(matches!(
            RedactionBaker::new(0.8).bake(&mut overlay, &base),
            Err(BlattwerkError::Composite { .. })
        ));
        assert_eq!(overlay.pending_markers().len(), 1);
    }

    #[test]
    fn sigma_scales_with_patch_and_has_a_floor() {
        let baker = RedactionBaker::new(0.8);
        assert!((baker.sigma_for(100, 50) - 4.8).abs() < 1e-4);
        assert_eq!(baker.sigma_for(2, 2), MIN_SIGMA);
    }
}
