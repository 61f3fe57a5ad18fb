// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open existing PDF documents with `lopdf`, report page geometry,
// and rasterize pages through the built-in renderer.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::PageSize;
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use crate::pdf::raster::{PageRasterizer, resolve_dict};
use crate::source::{PageSource, check_page, check_scale, raster_dimensions};

/// How far into the file the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Page-tree attributes may be inherited through at most this many `/Parent` hops.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and exposes it as a [`PageSource`].
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object IDs in page order.
    pages: Vec<ObjectId>,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let data = std::fs::read(path_ref)?;
        let mut reader = Self::from_bytes(&data)?;
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Create a reader from raw PDF bytes already in memory.
    ///
    /// Anything that is not a PDF with at least one page is a
    /// [`BlattwerkError::Decode`].
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !looks_like_pdf(data) {
            return Err(BlattwerkError::Decode("missing %PDF- header".into()));
        }

        let document = Document::load_mem(data).map_err(|err| {
            BlattwerkError::Decode(format!("failed to load PDF from memory: {}", err))
        })?;

        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(BlattwerkError::Decode("document has no pages".into()));
        }

        debug!(pages = pages.len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            pages,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        check_page(page, self.page_count())?;
        Ok(self.pages[page as usize - 1])
    }

    /// MediaBox `[x0, y0, x1, y1]`, normalised so x0 < x1 and y0 < y1.
    fn media_box(&self, page: u32) -> Result<[f32; 4]> {
        let page_id = self.page_id(page)?;
        let Some(raw) = inherited_attribute(&self.document, page_id, b"MediaBox") else {
            warn!(page, "Page has no MediaBox, assuming US Letter");
            return Ok([0.0, 0.0, PageSize::LETTER.width_pt, PageSize::LETTER.height_pt]);
        };

        let values: Option<Vec<f32>> = self
            .document
            .dereference(raw)
            .ok()
            .and_then(|(_, obj)| obj.as_array().ok())
            .map(|arr| arr.iter().filter_map(|v| v.as_float().ok()).collect());

        match values.as_deref() {
            Some([a, b, c, d]) if a != c && b != d => {
                Ok([a.min(*c), b.min(*d), a.max(*c), b.max(*d)])
            }
            _ => Err(BlattwerkError::Render {
                page,
                reason: "MediaBox is not four distinct numbers".into(),
            }),
        }
    }
}

impl PageSource for PdfReader {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        let [x0, y0, x1, y1] = self.media_box(page)?;
        Ok(PageSize {
            width_pt: x1 - x0,
            height_pt: y1 - y0,
        })
    }

    #[instrument(skip(self), fields(page, scale))]
    fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage> {
        check_scale(page, scale)?;
        let page_id = self.page_id(page)?;
        let media_box = self.media_box(page)?;
        let (width, height) = raster_dimensions(page, self.page_size(page)?, scale)?;

        let content = self.document.get_page_content(page_id).map_err(|err| {
            BlattwerkError::Render {
                page,
                reason: format!("cannot read content stream: {}", err),
            }
        })?;
        let resources = inherited_attribute(&self.document, page_id, b"Resources")
            .and_then(|obj| resolve_dict(&self.document, obj));

        let raster = PageRasterizer::new(&self.document, page, media_box, scale, width, height)
            .paint(&content, resources)?;

        debug!(page, width, height, "Page rasterized");
        Ok(raster)
    }
}

/// Whether `data` carries a `%PDF-` marker near its start.
fn looks_like_pdf(data: &[u8]) -> bool {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Look up `key` on a page dictionary, falling back to its ancestors in the
/// page tree.
fn inherited_attribute<'d>(document: &'d Document, page_id: ObjectId, key: &[u8]) -> Option<&'d Object> {
    let mut node: &Dictionary = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node = resolve_dict(document, node.get(b"Parent").ok()?)?;
    }
    None
}

// -- Tests --------------------------------------------------------------------
