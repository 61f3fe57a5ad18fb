// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay renderer: rasterizes overlay objects onto a transparent canvas
// using `imageproc` drawing and `ab_glyph` fonts.

use std::fmt;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use blattwerk_core::config::EditorConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{Color, PixelRect};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut};
use tracing::{debug, info, instrument, warn};

use crate::overlay::{
    BakedPatch, EraseMarker, LiveOverlay, OverlayObject, OverlaySnapshot, RedactionMarker,
    TextAnnotation,
};

/// Line advance relative to the font size for multi-line text.
const LINE_SPACING: f32 = 1.2;

/// Draws overlay objects in z-order. Text needs a font; without one, text
/// objects are skipped.
#[derive(Clone, Default)]
pub struct OverlayRenderer {
    font: Option<FontArc>,
}

impl fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl OverlayRenderer {
    /// A renderer without a font.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Load a TrueType/OpenType font file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| {
            BlattwerkError::Font(format!("cannot read {}: {}", path.display(), err))
        })?;
        let font = FontArc::try_from_vec(data).map_err(|err| {
            BlattwerkError::Font(format!("{} is not a usable font: {}", path.display(), err))
        })?;
        info!("Font loaded");
        Ok(Self::with_font(font))
    }

    /// Use the configured font, if any.
    pub fn from_config(config: &EditorConfig) -> Result<Self> {
        match &config.font_path {
            Some(path) => Self::from_font_file(path),
            None => Ok(Self::new()),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Render `snapshot` onto a transparent `width` x `height` canvas.
    pub fn render(&self, snapshot: &OverlaySnapshot, width: u32, height: u32) -> RgbaImage {
        self.render_objects(snapshot.objects.iter(), width, height)
    }

    /// Render a live overlay at its own dimensions.
    pub fn render_live(&self, overlay: &LiveOverlay) -> RgbaImage {
        let (width, height) = overlay.dimensions();
        self.render_objects(overlay.iter().map(|o| &o.object), width, height)
    }

    fn render_objects<'a>(
        &self,
        objects: impl Iterator<Item = &'a OverlayObject>,
        width: u32,
        height: u32,
    ) -> RgbaImage {
        let mut canvas = Blend(RgbaImage::from_pixel(
            width,
            height,
            to_rgba(Color::TRANSPARENT),
        ));
        let mut drawn = 0usize;
        for object in objects {
            match object {
                OverlayObject::Text(text) => self.draw_text(&mut canvas, text),
                OverlayObject::RedactionMarker(marker) => draw_marker(&mut canvas, marker),
                OverlayObject::BakedPatch(patch) => draw_patch(&mut canvas, patch),
                OverlayObject::EraseMarker(erase) => draw_erase(&mut canvas, erase),
            }
            drawn += 1;
        }
        debug!(objects = drawn, width, height, "Overlay rendered");
        canvas.0
    }

    fn draw_text(&self, canvas: &mut Blend<RgbaImage>, text: &TextAnnotation) {
        let Some(font) = &self.font else {
            warn!(text = %text.text, "No font configured, text annotation not drawn");
            return;
        };
        let scale = PxScale::from(text.font_size);
        let color = to_rgba(text.color);
        let x = text.position.x.round() as i32;
        for (line_no, line) in text.text.lines().enumerate() {
            let y = (text.position.y + line_no as f32 * text.font_size * LINE_SPACING).round() as i32;
            draw_text_mut(canvas, color, x, y, scale, font, line);
        }
    }
}

fn draw_marker(canvas: &mut Blend<RgbaImage>, marker: &RedactionMarker) {
    let (width, height) = canvas.0.dimensions();
    let Some(region) = marker.effective_rect().to_pixel_rect(width, height) else {
        return;
    };
    draw_filled_rect_mut(canvas, to_imageproc_rect(region), to_rgba(marker.style.fill));
    draw_dashed_outline(canvas, region, to_rgba(marker.style.stroke), marker.style.dash);
}

fn draw_erase(canvas: &mut Blend<RgbaImage>, erase: &EraseMarker) {
    let (width, height) = canvas.0.dimensions();
    if let Some(region) = erase.effective_rect().to_pixel_rect(width, height) {
        draw_filled_rect_mut(canvas, to_imageproc_rect(region), to_rgba(erase.fill));
    }
}

/// Patches are opaque pixels and overwrite whatever is beneath them.
fn draw_patch(canvas: &mut Blend<RgbaImage>, patch: &BakedPatch) {
    image::imageops::replace(
        &mut canvas.0,
        &patch.pixels,
        patch.rect.x.round() as i64,
        patch.rect.y.round() as i64,
    );
}

/// Outline `region` with `[dash, gap]` segments. A non-positive dash draws a
/// solid line.
fn draw_dashed_outline(
    canvas: &mut Blend<RgbaImage>,
    region: PixelRect,
    color: Rgba<u8>,
    dash: [f32; 2],
) {
    let left = region.x as f32;
    let top = region.y as f32;
    let right = (region.right() - 1) as f32;
    let bottom = (region.bottom() - 1) as f32;
    let edges = [
        ((left, top), (right, top)),
        ((right, top), (right, bottom)),
        ((right, bottom), (left, bottom)),
        ((left, bottom), (left, top)),
    ];
    for (from, to) in edges {
        draw_dashed_segment(canvas, from, to, color, dash);
    }
}

fn draw_dashed_segment(
    canvas: &mut Blend<RgbaImage>,
    from: (f32, f32),
    to: (f32, f32),
    color: Rgba<u8>,
    [dash, gap]: [f32; 2],
) {
    let length = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
    if !dash.is_finite() || !gap.is_finite() || dash <= 0.0 || length <= 0.0 {
        draw_line_segment_mut(canvas, from, to, color);
        return;
    }
    let period = dash + gap.max(0.0);
    let point_at = |t: f32| {
        let f = t / length;
        (from.0 + (to.0 - from.0) * f, from.1 + (to.1 - from.1) * f)
    };
    let mut t = 0.0;
    while t < length {
        let end = (t + dash).min(length);
        draw_line_segment_mut(canvas, point_at(t), point_at(end), color);
        t += period;
    }
}

fn to_imageproc_rect(region: PixelRect) -> imageproc::rect::Rect {
    imageproc::rect::Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height)
}

fn to_rgba(color: Color) -> Rgba<u8> {
    Rgba(color.to_array())
}
