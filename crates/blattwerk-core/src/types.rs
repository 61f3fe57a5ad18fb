// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometry and colour types shared by the document and editor crates.
//
// All overlay coordinates are expressed in the pixel space of a page's base
// raster at the session's render scale.

use serde::{Deserialize, Serialize};

/// A position in page-raster pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Per-axis scale factors from a live transform (a resize handle drag, for
/// example). `1.0` on both axes is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_identity(&self) -> bool {
        self.x == 1.0 && self.y == 1.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An axis-aligned rectangle in page-raster pixel space. `width` and `height`
/// are the untransformed extents; see [`Rect::scaled`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Apply a live transform: the origin stays put, the extents are
    /// multiplied by the per-axis scale.
    pub fn scaled(&self, scale: Scale) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width * scale.x,
            height: self.height * scale.y,
        }
    }

    /// Whether `(px, py)` lies inside the rectangle (half-open on the far edges).
    pub fn contains(&self, px: f32, py: f32) -> bool {
        let (x0, x1) = ordered(self.x, self.x + self.width);
        let (y0, y1) = ordered(self.y, self.y + self.height);
        px >= x0 && px < x1 && py >= y0 && py < y1
    }

    /// Snap to whole pixels and clip to a `bounds_width` x `bounds_height`
    /// raster.
    ///
    /// Returns `None` when the rectangle is non-finite or the clipped area is
    /// empty, so callers never see a zero- or negative-sized region.
    pub fn to_pixel_rect(&self, bounds_width: u32, bounds_height: u32) -> Option<PixelRect> {
        if !self.is_finite() {
            return None;
        }

        let (x0, x1) = ordered(self.x.round(), (self.x + self.width).round());
        let (y0, y1) = ordered(self.y.round(), (self.y + self.height).round());

        let x0 = x0.clamp(0.0, bounds_width as f32) as u32;
        let x1 = x1.clamp(0.0, bounds_width as f32) as u32;
        let y0 = y0.clamp(0.0, bounds_height as f32) as u32;
        let y1 = y1.clamp(0.0, bounds_height as f32) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A non-empty rectangle of whole pixels inside a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Back to floating-point page coordinates.
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

/// Straight (non-premultiplied) RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Largest raster side, in pixels, that a page source will allocate.
pub const MAX_RASTER_SIDE: u32 = 16_384;

/// Size of a source page in PDF points (1/72 inch), before any render scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// US Letter, the fallback when a page declares no usable MediaBox.
    pub const LETTER: PageSize = PageSize {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    /// Raster dimensions in pixels at `scale`, never smaller than 1x1.
    pub fn pixel_dimensions(&self, scale: f32) -> (u32, u32) {
        let w = (self.width_pt * scale).round().max(1.0) as u32;
        let h = (self.height_pt * scale).round().max(1.0) as u32;
        (w, h)
    }

    /// Like [`PageSize::pixel_dimensions`], but `None` when a side is not
    /// finite or would exceed [`MAX_RASTER_SIDE`].
    pub fn checked_pixel_dimensions(&self, scale: f32) -> Option<(u32, u32)> {
        let (w, h) = (self.width_pt * scale, self.height_pt * scale);
        let limit = MAX_RASTER_SIDE as f32;
        if !(w.is_finite() && h.is_finite()) || w.round() > limit || h.round() > limit {
            return None;
        }
        Some((w.round().max(1.0) as u32, h.round().max(1.0) as u32))
    }
}

// -- Tests --------------------------------------------------------------------
