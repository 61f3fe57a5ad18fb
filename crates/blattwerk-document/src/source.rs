// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page sources: anything that can report a page count and rasterize a page
// at a given scale.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{MAX_RASTER_SIDE, PageSize};
use image::RgbaImage;
use image::imageops::FilterType;
use tracing::{debug, instrument};

/// A decoded source document.
///
/// Pages are numbered from 1. Implementations must be deterministic: two
/// renders of the same page at the same scale yield identical pixels.
pub trait PageSource: Send {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Size of `page` in PDF points.
    fn page_size(&self, page: u32) -> Result<PageSize>;

    /// Rasterize `page` at `scale`. The result is
    /// `page_size(page).pixel_dimensions(scale)` pixels, fully opaque.
    /// A raster wider or taller than `MAX_RASTER_SIDE` is a render error.
    fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage>;
}

/// Validate a 1-based page number against a page count.
pub(crate) fn check_page(page: u32, page_count: u32) -> Result<()> {
    if page == 0 || page > page_count {
        return Err(BlattwerkError::PageOutOfRange { page, page_count });
    }
    Ok(())
}

/// Validate a render scale.
pub(crate) fn check_scale(page: u32, scale: f32) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(BlattwerkError::Render {
            page,
            reason: format!("render scale must be positive, got {scale}"),
        });
    }
    Ok(())
}

/// Pixel size of a page at `scale`, refusing rasters too large to allocate.
pub(crate) fn raster_dimensions(page: u32, size: PageSize, scale: f32) -> Result<(u32, u32)> {
    size.checked_pixel_dimensions(scale).ok_or_else(|| BlattwerkError::Render {
        page,
        reason: format!(
            "{}x{}pt at scale {scale} exceeds {MAX_RASTER_SIDE} pixels a side",
            size.width_pt, size.height_pt
        ),
    })
}

/// An in-memory document made of page bitmaps.
///
/// Each bitmap is treated as a 72 dpi page, so a 400x600 bitmap is a
/// 400x600pt page and renders to 600x900 pixels at scale 1.5.
#[derive(Debug, Clone)]
pub struct RasterDocument {
    pages: Vec<RgbaImage>,
}

impl RasterDocument {
    /// Build a document from one bitmap per page.
    pub fn new(pages: Vec<RgbaImage>) -> Result<Self> {
        if pages.is_empty() {
            return Err(BlattwerkError::Decode("document has no pages".into()));
        }
        if pages.iter().any(|p| p.width() == 0 || p.height() == 0) {
            return Err(BlattwerkError::Decode("page bitmap has zero area".into()));
        }
        Ok(Self { pages })
    }

    /// Decode a single image file (PNG, JPEG, ...) as a one-page document.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_image_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            BlattwerkError::Decode(format!("failed to decode image: {}", err))
        })?;
        debug!(width = img.width(), height = img.height(), "Image page decoded");
        Self::new(vec![img.to_rgba8()])
    }
}

impl PageSource for RasterDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        check_page(page, self.page_count())?;
        let bitmap = &self.pages[page as usize - 1];
        Ok(PageSize {
            width_pt: bitmap.width() as f32,
            height_pt: bitmap.height() as f32,
        })
    }

    #[instrument(skip(self), fields(page, scale))]
    fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage> {
        check_page(page, self.page_count())?;
        check_scale(page, scale)?;

        let bitmap = &self.pages[page as usize - 1];
        let (width, height) = raster_dimensions(page, self.page_size(page)?, scale)?;
        if (width, height) == bitmap.dimensions() {
            return Ok(bitmap.clone());
        }

        debug!(width, height, "Resampling page bitmap");
        Ok(image::imageops::resize(
            bitmap,
            width,
            height,
            FilterType::Lanczos3,
        ))
    }
}
