// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay objects: the annotation variants a page can carry.
//
// The variant is the discriminant: a redaction marker is never confused with a
// plain rectangle because there is no plain rectangle.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{Color, Point, Rect, Scale};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Width of one glyph cell relative to the font size, used only for
/// hit-testing text whose exact advance is unknown without a font.
const APPROX_GLYPH_WIDTH: f32 = 0.55;

/// Line height relative to the font size.
const APPROX_LINE_HEIGHT: f32 = 1.2;

/// One annotation on a page overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayObject {
    Text(TextAnnotation),
    RedactionMarker(RedactionMarker),
    BakedPatch(BakedPatch),
    EraseMarker(EraseMarker),
}

/// Free text drawn at `position` (top-left of the text box).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub position: Point,
    pub text: String,
    pub font_size: f32,
    #[serde(default)]
    pub color: Color,
}

/// A rectangle awaiting a bake. Only this variant is ever blurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionMarker {
    pub rect: Rect,
    /// Live resize transform; the effective extent is `rect.scaled(scale)`.
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub style: MarkerStyle,
}

impl RedactionMarker {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            scale: Scale::IDENTITY,
            style: MarkerStyle::default(),
        }
    }

    /// The area the marker covers once its live transform is applied.
    pub fn effective_rect(&self) -> Rect {
        self.rect.scaled(self.scale)
    }
}

/// How a pending marker is drawn: a faint fill and a dashed outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub fill: Color,
    pub stroke: Color,
    /// `[dash, gap]` lengths in pixels.
    pub dash: [f32; 2],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            fill: Color::rgba(0, 0, 0, 26),
            stroke: Color::BLACK,
            dash: [5.0, 5.0],
        }
    }
}

/// Blurred pixels that permanently replaced a redaction marker.
///
/// `rect` is the clipped pixel rectangle the patch was cut from, so
/// `rect.width`/`rect.height` always equal the pixel dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedPatch {
    pub rect: Rect,
    #[serde(with = "png_base64")]
    pub pixels: RgbaImage,
}

/// A solid rectangle painted over content, white by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraseMarker {
    pub rect: Rect,
    #[serde(default)]
    pub scale: Scale,
    pub fill: Color,
}

impl EraseMarker {
    pub fn new(rect: Rect, fill: Color) -> Self {
        Self {
            rect,
            scale: Scale::IDENTITY,
            fill,
        }
    }

    pub fn effective_rect(&self) -> Rect {
        self.rect.scaled(self.scale)
    }
}

impl OverlayObject {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::RedactionMarker(_) => "redaction_marker",
            Self::BakedPatch(_) => "baked_patch",
            Self::EraseMarker(_) => "erase_marker",
        }
    }

    pub fn is_pending_marker(&self) -> bool {
        matches!(self, Self::RedactionMarker(_))
    }

    /// Area the object occupies on the page, live transform included.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Text(text) => {
                let longest = text.text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                let lines = text.text.lines().count().max(1);
                Rect::new(
                    text.position.x,
                    text.position.y,
                    longest as f32 * text.font_size * APPROX_GLYPH_WIDTH,
                    lines as f32 * text.font_size * APPROX_LINE_HEIGHT,
                )
            }
            Self::RedactionMarker(marker) => marker.effective_rect(),
            Self::BakedPatch(patch) => patch.rect,
            Self::EraseMarker(erase) => erase.effective_rect(),
        }
    }

    /// Move the object's origin to `(x, y)`.
    pub fn set_origin(&mut self, x: f32, y: f32) {
        match self {
            Self::Text(text) => text.position = Point::new(x, y),
            Self::RedactionMarker(marker) => (marker.rect.x, marker.rect.y) = (x, y),
            Self::BakedPatch(patch) => (patch.rect.x, patch.rect.y) = (x, y),
            Self::EraseMarker(erase) => (erase.rect.x, erase.rect.y) = (x, y),
        }
    }

    /// Set the live transform. Only resizable rectangles carry one; returns
    /// `false` for text and baked patches.
    pub fn set_scale(&mut self, scale: Scale) -> bool {
        match self {
            Self::RedactionMarker(marker) => {
                marker.scale = scale;
                true
            }
            Self::EraseMarker(erase) => {
                erase.scale = scale;
                true
            }
            Self::Text(_) | Self::BakedPatch(_) => false,
        }
    }

    /// Reject geometry and payloads a renderer cannot draw.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(BlattwerkError::InvalidObject(reason));
        match self {
            Self::Text(text) => {
                if !text.position.is_finite() {
                    return invalid("text position is not finite".into());
                }
                if !text.font_size.is_finite() || text.font_size <= 0.0 {
                    return invalid(format!("text font size {} is not positive", text.font_size));
                }
            }
            Self::RedactionMarker(marker) => {
                check_rect(&marker.rect, marker.scale)?;
            }
            Self::EraseMarker(erase) => {
                check_rect(&erase.rect, erase.scale)?;
            }
            Self::BakedPatch(patch) => {
                check_rect(&patch.rect, Scale::IDENTITY)?;
                let expected = (patch.rect.width.round(), patch.rect.height.round());
                let actual = (patch.pixels.width() as f32, patch.pixels.height() as f32);
                if expected != actual || patch.pixels.width() == 0 || patch.pixels.height() == 0 {
                    return invalid(format!(
                        "baked patch pixels are {}x{} but its rectangle is {}x{}",
                        actual.0, actual.1, expected.0, expected.1
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_rect(rect: &Rect, scale: Scale) -> Result<()> {
    if !rect.is_finite() || !scale.x.is_finite() || !scale.y.is_finite() {
        return Err(BlattwerkError::InvalidObject(
            "rectangle geometry is not finite".into(),
        ));
    }
    Ok(())
}

/// Serde adapter embedding patch pixels as a base64 PNG string.
mod png_base64 {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use blattwerk_document::ImageProcessor;
    use image::RgbaImage;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pixels: &RgbaImage, serializer: S) -> Result<S::Ok, S::Error> {
        let png = ImageProcessor::from_rgba(pixels.clone())
            .to_png_bytes()
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&STANDARD.encode(png))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RgbaImage, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let png = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|err| D::Error::custom(format!("patch pixels are not base64: {err}")))?;
        ImageProcessor::from_bytes(&png)
            .map(ImageProcessor::into_rgba)
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn patch(w: u32, h: u32) -> BakedPatch {
        BakedPatch {
            rect: Rect::new(10.0, 20.0, w as f32, h as f32),
            pixels: RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8 * 40, y as u8 * 60, 7, 255])),
        }
    }

    #[test]
    fn variants_are_tagged_by_kind() {
        let json = serde_json::to_value(OverlayObject::RedactionMarker(RedactionMarker::new(
            Rect::new(1.0, 2.0, 3.0, 4.0),
        )))
        .unwrap();
        assert_eq!(json["kind"], "redaction_marker");
        assert_eq!(json["rect"]["width"], 3.0);
    }

    #[test]
    fn marker_defaults_fill_in_when_omitted() {
        let object: OverlayObject = serde_json::from_str(
            r#"{"kind":"redaction_marker","rect":{"x":1,"y":2,"width":3,"height":4}}"#,
        )
        .unwrap();
        let OverlayObject::RedactionMarker(marker) = object else {
            panic!("wrong variant");
        };
        assert_eq!(marker.scale, Scale::IDENTITY);
        assert_eq!(marker.style, MarkerStyle::default());
    }

    #[test]
    fn patch_pixels_survive_json() {
        let original = OverlayObject::BakedPatch(patch(5, 3));
        let json = serde_json::to_string(&original).unwrap();
        let back: OverlayObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn patch_with_bad_base64_fails_to_parse() {
        let json = r#"{"kind":"baked_patch","rect":{"x":0,"y":0,"width":1,"height":1},"pixels":"***"}"#;
        assert!(serde_json::from_str::<OverlayObject>(json).is_err());
    }

    #[test]
    fn patch_size_must_match_its_rect() {
        let mut bad = patch(5, 3);
        bad.rect.width = 6.0;
        assert!(matches!(
            OverlayObject::BakedPatch(bad).validate(),
            Err(BlattwerkError::InvalidObject(_))
        ));
        assert!(OverlayObject::BakedPatch(patch(5, 3)).validate().is_ok());
    }

    #[test]
    fn non_finite_geometry_is_invalid() {
        let marker = RedactionMarker::new(Rect::new(f32::NAN, 0.0, 1.0, 1.0));
        assert!(OverlayObject::RedactionMarker(marker).validate().is_err());

        let text = TextAnnotation {
            position: Point::new(0.0, 0.0),
            text: "x".into(),
            font_size: 0.0,
            color: Color::BLACK,
        };
        assert!(OverlayObject::Text(text).validate().is_err());
    }

    #[test]
    fn scale_applies_only_to_rectangles() {
        let mut marker = OverlayObject::RedactionMarker(RedactionMarker::new(Rect::new(
            0.0, 0.0, 10.0, 10.0,
        )));
        assert!(marker.set_scale(Scale::new(2.0, 0.5)));
        assert_eq!(marker.bounds(), Rect::new(0.0, 0.0, 20.0, 5.0));

        let mut baked = OverlayObject::BakedPatch(patch(2, 2));
        assert!(!baked.set_scale(Scale::new(2.0, 2.0)));
    }

    #[test]
    fn set_origin_moves_every_variant() {
        let mut erase = OverlayObject::EraseMarker(EraseMarker::new(
            Rect::new(0.0, 0.0, 4.0, 4.0),
            Color::WHITE,
        ));
        erase.set_origin(7.0, 8.0);
        assert_eq!(erase.bounds(), Rect::new(7.0, 8.0, 4.0, 4.0));
    }
}
