// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export pipeline: renders, composites, and reassembles every page into a
// new PDF, strictly in page order.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_document::{PageSource, PdfWriter};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::composite::Compositor;
use crate::overlay::OverlaySnapshot;
use crate::store::PageEditStore;

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    /// Serialized PDF.
    pub bytes: Vec<u8>,
    /// Pixel dimensions of each output page, in page order. Each page is as
    /// many points wide and high as its raster is pixels.
    pub page_sizes: Vec<(u32, u32)>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
    pub exported_at: DateTime<Utc>,
    /// Suggested download name.
    pub file_name: String,
}

impl ExportedDocument {
    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    /// Write the PDF to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        info!(path = %path.as_ref().display(), bytes = self.bytes.len(), "Export written");
        Ok(())
    }
}

/// Drives one export over a page source and its edit store.
pub struct ExportPipeline<'a> {
    compositor: &'a Compositor,
    scale: f32,
    title: &'a str,
    file_name: &'a str,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(compositor: &'a Compositor, scale: f32, title: &'a str, file_name: &'a str) -> Self {
        Self {
            compositor,
            scale,
            title,
            file_name,
        }
    }

    /// Render `page` and composite its stored overlay onto it.
    ///
    /// A stored snapshot that fails validation is flattened as an empty
    /// overlay, the same way navigation restores it.
    pub fn flatten_page(
        &self,
        source: &dyn PageSource,
        store: &mut PageEditStore,
        page: u32,
    ) -> Result<RgbaImage> {
        let base = source.render_page(page, self.scale)?;
        let mut snapshot = store.load_into(page);
        if let Err(err) = snapshot.validate() {
            warn!(page, error = %err, "Stored edits could not be restored, exporting the page unedited");
            snapshot = OverlaySnapshot::empty();
        }
        let flattened = self.compositor.composite(&base, &snapshot)?;
        debug!(
            page,
            width = flattened.width(),
            height = flattened.height(),
            objects = snapshot.len(),
            "Page flattened"
        );
        Ok(flattened)
    }

    /// Export every page of `source` with the overlays in `store`.
    ///
    /// The caller commits the live page first. Any page failure aborts the
    /// export with [`BlattwerkError::ExportFailed`] naming that page; no
    /// document is produced.
    #[instrument(skip_all, fields(pages = source.page_count(), scale = self.scale))]
    pub fn run(&self, source: &dyn PageSource, store: &mut PageEditStore) -> Result<ExportedDocument> {
        let page_count = source.page_count();
        let mut writer = PdfWriter::new(self.title);
        let mut page_sizes = Vec::with_capacity(page_count as usize);

        for page in 1..=page_count {
            let flattened = self
                .flatten_page(source, store, page)
                .map_err(|err| BlattwerkError::export_failed(page, err))?;
            let (width, height) = flattened.dimensions();
            writer
                .add_page(&flattened, width, height)
                .map_err(|err| BlattwerkError::export_failed(page, err))?;
            page_sizes.push((width, height));
        }

        let bytes = writer.finalize()?;
        let sha256 = hex::encode(Sha256::digest(&bytes));
        info!(pages = page_sizes.len(), bytes = bytes.len(), %sha256, "Export complete");

        Ok(ExportedDocument {
            bytes,
            page_sizes,
            sha256,
            exported_at: Utc::now(),
            file_name: self.file_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::PageSize;
    use blattwerk_document::{PdfReader, RasterDocument};
    use image::Rgba;

    fn page(w: u32, h: u32, tint: u8) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([tint, (x % 256) as u8, (y % 256) as u8, 255]))
    }

    /// Fails to render one chosen page.
    struct BrokenPage {
        inner: RasterDocument,
        broken: u32,
    }

    impl PageSource for BrokenPage {
        fn page_count(&self) -> u32 {
            self.inner.page_count()
        }

        fn page_size(&self, page: u32) -> Result<PageSize> {
            self.inner.page_size(page)
        }

        fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage> {
            if page == self.broken {
                return Err(BlattwerkError::Render {
                    page,
                    reason: "synthetic failure".into(),
                });
            }
            self.inner.render_page(page, scale)
        }
    }

    #[test]
    fn one_output_page_per_source_page() {
        let source = RasterDocument::new(vec![page(40, 60, 0), page(50, 30, 90), page(20, 20, 200)])
            .unwrap();
        let compositor = Compositor::default();
        let mut store = PageEditStore::new();

        let exported = ExportPipeline::new(&compositor, 1.5, "Test", "edited.pdf")
            .run(&source, &mut store)
            .unwrap();
        assert_eq!(exported.page_sizes, vec![(60, 90), (75, 45), (30, 30)]);
        assert_eq!(exported.sha256.len(), 64);
        assert_eq!(exported.file_name, "edited.pdf");

        let reader = PdfReader::from_bytes(&exported.bytes).unwrap();
        assert_eq!(reader.page_count(), 3);
        let second = reader.page_size(2).unwrap();
        assert!((second.width_pt - 75.0).abs() < 0.5 && (second.height_pt - 45.0).abs() < 0.5);
    }

    #[test]
    fn failing_page_aborts_with_its_index() {
        let source = BrokenPage {
            inner: RasterDocument::new(vec![page(10, 10, 0), page(10, 10, 0), page(10, 10, 0)])
                .unwrap(),
            broken: 2,
        };
        let compositor = Compositor::default();
        let err = ExportPipeline::new(&compositor, 1.0, "Test", "edited.pdf")
            .run(&source, &mut PageEditStore::new())
            .unwrap_err();
        assert!(matches!(err, BlattwerkError::ExportFailed { page: 2, .. }));
        assert_eq!(err.page(), Some(2));
    }

    #[test]
    fn invalid_stored_snapshot_flattens_as_empty() {
        use crate::overlay::{BakedPatch, OverlayObject};
        use blattwerk_core::types::Rect;

        let source = RasterDocument::new(vec![page(20, 20, 40)]).unwrap();
        let compositor = Compositor::default();
        let mut store = PageEditStore::new();
        // Pixels are 2x2 but the rect claims 10x10.
        store.insert(
            1,
            OverlaySnapshot::from_objects(vec![OverlayObject::BakedPatch(BakedPatch {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                pixels: RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])),
            })]),
        );

        let flattened = ExportPipeline::new(&compositor, 1.0, "Test", "edited.pdf")
            .flatten_page(&source, &mut store, 1)
            .unwrap();
        assert_eq!(flattened, page(20, 20, 40));
    }

    #[test]
    fn written_file_matches_bytes() {
        let source = RasterDocument::new(vec![page(10, 10, 0)]).unwrap();
        let compositor = Compositor::default();
        let exported = ExportPipeline::new(&compositor, 1.0, "Test", "edited.pdf")
            .run(&source, &mut PageEditStore::new())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(&exported.file_name);
        exported.write_to(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), exported.bytes);
    }
}
