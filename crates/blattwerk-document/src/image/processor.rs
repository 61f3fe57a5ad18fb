// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: region extraction, Gaussian blur, and PNG encoding for
// page rasters. Operates on in-memory images using the `image` and `imageproc`
// crates.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::PixelRect;
use image::{DynamicImage, ImageFormat, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory RGBA image.
///
/// All operations are non-destructive: each method consumes `self` and returns a
/// new `ImageProcessor` wrapping the transformed image, enabling method chaining.
///
/// ```ignore
/// let patch = ImageProcessor::region_of(&base, rect)
///     .gaussian_blur(4.8)
///     .into_rgba();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: RgbaImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Wrap an already-decoded RGBA image.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Copy exactly `rect` out of `source`. The source is never modified.
    ///
    /// `rect` must lie inside `source`; use [`PixelRect`]s produced by
    /// `Rect::to_pixel_rect` against the source dimensions.
    pub fn region_of(source: &RgbaImage, rect: PixelRect) -> Self {
        let image = image::imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height)
            .to_image();
        debug!(
            x = rect.x,
            y = rect.y,
            width = image.width(),
            height = image.height(),
            "Region extracted"
        );
        Self { image }
    }

    /// Decode a PNG (or any format the `image` crate recognises).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            BlattwerkError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self {
            image: img.to_rgba8(),
        })
    }

    // -- Accessors ------------------------------------------------------------

    /// Consume the processor and return the underlying image.
    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Gaussian blur with standard deviation `sigma` pixels. Edges are
    /// clamped to this image only; nothing outside it contributes.
    ///
    /// A non-positive or non-finite sigma is a no-op.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn gaussian_blur(self, sigma: f32) -> Self {
        if !sigma.is_finite() || sigma <= 0.0 {
            return self;
        }
        debug!(sigma, "Applying Gaussian blur");
        Self {
            image: gaussian_blur_f32(&self.image, sigma),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        DynamicImage::ImageRgba8(self.image.clone())
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| BlattwerkError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}
