// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: assemble a new document of full-page raster images using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use blattwerk_core::error::{BlattwerkError, Result};
use image::{Rgb, RgbImage, RgbaImage};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Images are placed at 72 dpi so one raster pixel is one PDF point.
const POINTS_PER_INCH: f32 = 72.0;

/// Millimetres per PDF point.
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Builds a PDF whose pages are each a single flattened raster.
///
/// Page size in points equals the requested pixel size, so re-opening the
/// output at scale 1.0 reproduces the raster dimensions.
pub struct PdfWriter {
    document: PdfDocument,
    pages: Vec<PdfPage>,
}

impl PdfWriter {
    /// Start a new document with the given `/Title`.
    pub fn new(title: &str) -> Self {
        Self {
            document: PdfDocument::new(title),
            pages: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a `width` x `height` page with `image` drawn at the origin,
    /// stretched to cover the full page.
    ///
    /// Alpha is flattened onto white; PDF page images here are opaque RGB.
    #[instrument(skip(self, image), fields(page = self.pages.len() + 1, width, height))]
    pub fn add_page(&mut self, image: &RgbaImage, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
            return Err(BlattwerkError::PdfError(format!(
                "cannot add a {}x{} page from a {}x{} image",
                width,
                height,
                image.width(),
                image.height()
            )));
        }

        let rgb = flatten_onto_white(image);
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: image.width() as usize,
            height: image.height() as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = self.document.add_image(&raw);

        let scale_x = width as f32 / image.width() as f32;
        let scale_y = height as f32 / image.height() as f32;
        if (scale_x - 1.0).abs() > f32::EPSILON || (scale_y - 1.0).abs() > f32::EPSILON {
            warn!(scale_x, scale_y, "Page image does not match page size, stretching");
        }

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                dpi: Some(POINTS_PER_INCH),
                rotate: None,
            },
        }];

        let page_w = Mm(width as f32 * MM_PER_PT);
        let page_h = Mm(height as f32 * MM_PER_PT);
        self.pages.push(PdfPage::new(page_w, page_h, ops));

        debug!(pages = self.pages.len(), "Page appended");
        Ok(())
    }

    /// Serialise the document.
    #[instrument(skip(self), fields(pages = self.pages.len()))]
    pub fn finalize(mut self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(BlattwerkError::PdfError("document has no pages".into()));
        }

        let page_count = self.pages.len();
        self.document.with_pages(self.pages);

        // Page rasters are stored losslessly: no JPEG re-encoding, no downscaling.
        let options = PdfSaveOptions {
            image_optimization: None,
            ..PdfSaveOptions::default()
        };
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = self.document.save(&options, &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        info!(pages = page_count, bytes = output.len(), "PDF assembled");
        Ok(output)
    }
}

/// Composite straight-alpha RGBA over white and drop the alpha channel.
fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        if a == 255 {
            return Rgb([r, g, b]);
        }
        let a = a as u16;
        let over_white = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}
