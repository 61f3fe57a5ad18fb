// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{BlattwerkError, Result};
use crate::types::{Color, Rect};

/// Persistent editor settings.
///
/// Every field has a default, so a configuration file only needs to name the
/// settings it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Scale applied to PDF points when rasterizing a page. Used both while
    /// authoring overlays and when exporting, so overlay coordinates always
    /// line up with the base raster.
    pub render_scale: f32,
    /// Redaction blur strength. `1.0` is the baseline blur; the default is
    /// a slightly lighter `0.8`.
    pub blur_intensity: f32,
    /// `/Title` written into exported documents.
    pub export_title: String,
    /// File name offered for the exported document.
    pub export_file_name: String,
    /// TrueType/OpenType font for rasterizing text annotations. Without one,
    /// text annotations are kept in the overlay but not drawn.
    pub font_path: Option<PathBuf>,
    /// Defaults for newly added text annotations.
    pub text_defaults: TextDefaults,
    /// Placement of newly added redaction markers.
    pub marker_rect: Rect,
    /// Placement and fill of newly added erase patches.
    pub erase_rect: Rect,
    pub erase_fill: Color,
}

/// Defaults for the "add text" action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: Color,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            text: "Your Text Here".into(),
            x: 100.0,
            y: 100.0,
            font_size: 16.0,
            color: Color::BLACK,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            blur_intensity: 0.8,
            export_title: "Edited Document".into(),
            export_file_name: "edited.pdf".into(),
            font_path: None,
            text_defaults: TextDefaults::default(),
            marker_rect: Rect::new(100.0, 100.0, 100.0, 50.0),
            erase_rect: Rect::new(100.0, 100.0, 100.0, 50.0),
            erase_fill: Color::WHITE,
        }
    }
}

impl EditorConfig {
    /// Load settings from a JSON file and validate them.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: EditorConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Reject settings that would make overlay geometry or blur meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.render_scale.is_finite() || self.render_scale <= 0.0 {
            return Err(BlattwerkError::InvalidConfig(format!(
                "render_scale must be a positive number, got {}",
                self.render_scale
            )));
        }
        if !self.blur_intensity.is_finite()
            || self.blur_intensity <= 0.0
            || self.blur_intensity > 4.0
        {
            return Err(BlattwerkError::InvalidConfig(format!(
                "blur_intensity must be in (0, 4], got {}",
                self.blur_intensity
            )));
        }
        if !self.text_defaults.font_size.is_finite() || self.text_defaults.font_size <= 0.0 {
            return Err(BlattwerkError::InvalidConfig(format!(
                "text font size must be positive, got {}",
                self.text_defaults.font_size
            )));
        }
        if !self.marker_rect.is_finite() || !self.erase_rect.is_finite() {
            return Err(BlattwerkError::InvalidConfig(
                "default placement rectangles must be finite".into(),
            ));
        }
        Ok(())
    }
}
