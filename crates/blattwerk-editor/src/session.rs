// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editing session: one open document, its per-page edits, and the live page.
//
// Every state change goes through `&mut self`, so a page switch (commit, load,
// restore) can never interleave with another edit.

use blattwerk_core::config::EditorConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::Point;
use blattwerk_document::{PageSource, PdfReader};
use image::RgbaImage;
use tracing::{debug, info, instrument, warn};

use crate::bake::{BakeReport, RedactionBaker};
use crate::composite::Compositor;
use crate::export::{ExportPipeline, ExportedDocument};
use crate::overlay::{
    EraseMarker, LiveOverlay, ObjectId, OverlayObject, OverlaySnapshot, RedactionMarker,
    TextAnnotation,
};
use crate::render::OverlayRenderer;
use crate::store::PageEditStore;

/// Everything that belongs to a loaded document.
struct OpenDocument {
    source: Box<dyn PageSource>,
    current_page: u32,
    /// Base raster of `current_page` at the session's render scale.
    base: RgbaImage,
    live: LiveOverlay,
    store: PageEditStore,
}

/// An editing session.
pub struct Session {
    config: EditorConfig,
    compositor: Compositor,
    baker: RedactionBaker,
    document: Option<OpenDocument>,
}

impl Session {
    /// Create a session with no document. Fails if the configuration is
    /// invalid or its font cannot be loaded.
    pub fn new(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        let renderer = OverlayRenderer::from_config(&config)?;
        Ok(Self::with_renderer(config, renderer))
    }

    /// Create a session with an already-built renderer. The configuration is
    /// assumed valid.
    pub fn with_renderer(config: EditorConfig, renderer: OverlayRenderer) -> Self {
        Self {
            baker: RedactionBaker::from_config(&config),
            compositor: Compositor::new(renderer),
            config,
            document: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // -- Document lifecycle ---------------------------------------------------

    /// Open PDF bytes. Non-PDF input is rejected with
    /// [`BlattwerkError::Decode`] and the current document stays open.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn open(&mut self, data: &[u8]) -> Result<()> {
        let reader = PdfReader::from_bytes(data)?;
        self.open_source(Box::new(reader))
    }

    /// Open any page source. The first page is rendered before anything is
    /// replaced, so a failure leaves the session as it was.
    #[instrument(skip_all, fields(pages = source.page_count()))]
    pub fn open_source(&mut self, source: Box<dyn PageSource>) -> Result<()> {
        if source.page_count() == 0 {
            return Err(BlattwerkError::Decode("document has no pages".into()));
        }
        let base = source.render_page(1, self.config.render_scale)?;
        let (width, height) = base.dimensions();

        let mut store = self.document.take().map(|doc| doc.store).unwrap_or_default();
        store.clear_all();

        info!(pages = source.page_count(), width, height, "Document opened");
        self.document = Some(OpenDocument {
            source,
            current_page: 1,
            base,
            live: LiveOverlay::new(width, height),
            store,
        });
        Ok(())
    }

    /// Drop the document and all of its edits.
    pub fn close(&mut self) {
        if self.document.take().is_some() {
            info!("Document closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn page_count(&self) -> Option<u32> {
        self.document.as_ref().map(|doc| doc.source.page_count())
    }

    pub fn current_page(&self) -> Option<u32> {
        self.document.as_ref().map(|doc| doc.current_page)
    }

    // -- Navigation -----------------------------------------------------------

    /// Switch the live page to `page`.
    ///
    /// The new page is rendered first; if that fails nothing changes. Then the
    /// outgoing overlay is committed and the stored one for `page` restored.
    /// A snapshot that cannot be restored is replaced by an empty overlay.
    #[instrument(skip(self))]
    pub fn go_to(&mut self, page: u32) -> Result<()> {
        let scale = self.config.render_scale;
        let doc = self.document.as_mut().ok_or(BlattwerkError::NoDocument)?;
        check_range(page, doc.source.page_count())?;
        if page == doc.current_page {
            return Ok(());
        }

        let base = doc.source.render_page(page, scale)?;
        let (width, height) = base.dimensions();

        let previous = doc.current_page;
        let outgoing = std::mem::replace(&mut doc.live, LiveOverlay::new(width, height));
        doc.store.commit_current(previous, outgoing);

        let snapshot = doc.store.load_into(page);
        doc.live = match LiveOverlay::restore(width, height, &snapshot) {
            Ok(live) => live,
            Err(err) => {
                warn!(page, error = %err, "Stored edits could not be restored, starting empty");
                LiveOverlay::new(width, height)
            }
        };
        doc.base = base;
        doc.current_page = page;

        info!(from = previous, to = page, objects = doc.live.len(), "Page switched");
        Ok(())
    }

    /// Move to the next page. Returns `false` on the last page.
    pub fn next_page(&mut self) -> Result<bool> {
        let doc = self.document.as_ref().ok_or(BlattwerkError::NoDocument)?;
        if doc.current_page >= doc.source.page_count() {
            return Ok(false);
        }
        let next = doc.current_page + 1;
        self.go_to(next)?;
        Ok(true)
    }

    /// Move to the previous page. Returns `false` on the first page.
    pub fn prev_page(&mut self) -> Result<bool> {
        let doc = self.document.as_ref().ok_or(BlattwerkError::NoDocument)?;
        if doc.current_page <= 1 {
            return Ok(false);
        }
        let prev = doc.current_page - 1;
        self.go_to(prev)?;
        Ok(true)
    }

    // -- Live page ------------------------------------------------------------

    pub fn overlay(&self) -> Result<&LiveOverlay> {
        Ok(&self.doc()?.live)
    }

    pub fn overlay_mut(&mut self) -> Result<&mut LiveOverlay> {
        Ok(&mut self.doc_mut()?.live)
    }

    /// Base raster of the current page.
    pub fn base_raster(&self) -> Result<&RgbaImage> {
        Ok(&self.doc()?.base)
    }

    pub fn store(&self) -> Result<&PageEditStore> {
        Ok(&self.doc()?.store)
    }

    /// Current objects of `page`: the live overlay for the current page, the
    /// stored snapshot otherwise.
    pub fn page_snapshot(&self, page: u32) -> Result<OverlaySnapshot> {
        let doc = self.doc()?;
        check_range(page, doc.source.page_count())?;
        if page == doc.current_page {
            return Ok(doc.live.to_snapshot());
        }
        Ok(doc.store.get(page).cloned().unwrap_or_default())
    }

    /// Replace the edits of `page`.
    ///
    /// For the current page the snapshot is validated and loaded at once. For
    /// other pages it is stored as-is and restored on the next visit.
    pub fn import_snapshot(&mut self, page: u32, snapshot: OverlaySnapshot) -> Result<()> {
        let doc = self.doc_mut()?;
        check_range(page, doc.source.page_count())?;
        if page == doc.current_page {
            doc.live.load_snapshot(&snapshot)?;
            doc.store.checkpoint(page, &doc.live);
        } else {
            doc.store.insert(page, snapshot);
        }
        debug!(page, "Snapshot imported");
        Ok(())
    }

    // -- Authoring ------------------------------------------------------------

    /// Add `object` to the current page. Erase patches go beneath every other
    /// object; everything else goes on top.
    pub fn add_object(&mut self, object: OverlayObject) -> Result<ObjectId> {
        object.validate()?;
        let live = &mut self.doc_mut()?.live;
        let id = match object {
            OverlayObject::EraseMarker(_) => live.add_to_back(object),
            _ => live.add(object),
        };
        Ok(id)
    }

    /// Add the default text annotation.
    pub fn add_text(&mut self) -> Result<ObjectId> {
        let defaults = &self.config.text_defaults;
        let text = TextAnnotation {
            position: Point::new(defaults.x, defaults.y),
            text: defaults.text.clone(),
            font_size: defaults.font_size,
            color: defaults.color,
        };
        self.add_object(OverlayObject::Text(text))
    }

    /// Add a redaction marker at the default rectangle.
    pub fn add_redaction_marker(&mut self) -> Result<ObjectId> {
        let marker = RedactionMarker::new(self.config.marker_rect);
        self.add_object(OverlayObject::RedactionMarker(marker))
    }

    /// Add an erase patch at the default rectangle.
    pub fn add_erase_patch(&mut self) -> Result<ObjectId> {
        let erase = EraseMarker::new(self.config.erase_rect, self.config.erase_fill);
        self.add_object(OverlayObject::EraseMarker(erase))
    }

    /// Bake every pending marker on the current page, then commit the page.
    #[instrument(skip(self))]
    pub fn bake_redactions(&mut self) -> Result<BakeReport> {
        let doc = self.document.as_mut().ok_or(BlattwerkError::NoDocument)?;
        let report = self.baker.bake(&mut doc.live, &doc.base)?;
        doc.store.checkpoint(doc.current_page, &doc.live);
        Ok(report)
    }

    /// The current page as it looks with its edits applied.
    pub fn preview(&self) -> Result<RgbaImage> {
        let doc = self.doc()?;
        self.compositor.composite_live(&doc.base, &doc.live)
    }

    // -- Export ---------------------------------------------------------------

    /// Commit the live page and export every page.
    #[instrument(skip(self))]
    pub fn export(&mut self) -> Result<ExportedDocument> {
        let doc = self.document.as_mut().ok_or(BlattwerkError::NoDocument)?;
        let pending = doc.live.pending_markers().len();
        if pending > 0 {
            warn!(page = doc.current_page, pending, "Unbaked redaction markers are exported as outlines");
        }
        doc.store.checkpoint(doc.current_page, &doc.live);
        pipeline(&self.compositor, &self.config).run(doc.source.as_ref(), &mut doc.store)
    }

    /// `page` exactly as [`Session::export`] would write it.
    pub fn flattened_page(&mut self, page: u32) -> Result<RgbaImage> {
        let doc = self.document.as_mut().ok_or(BlattwerkError::NoDocument)?;
        check_range(page, doc.source.page_count())?;
        doc.store.checkpoint(doc.current_page, &doc.live);
        pipeline(&self.compositor, &self.config).flatten_page(
            doc.source.as_ref(),
            &mut doc.store,
            page,
        )
    }

    // -- Helpers --------------------------------------------------------------

    fn doc(&self) -> Result<&OpenDocument> {
        self.document.as_ref().ok_or(BlattwerkError::NoDocument)
    }

    fn doc_mut(&mut self) -> Result<&mut OpenDocument> {
        self.document.as_mut().ok_or(BlattwerkError::NoDocument)
    }
}

fn pipeline<'a>(compositor: &'a Compositor, config: &'a EditorConfig) -> ExportPipeline<'a> {
    ExportPipeline::new(
        compositor,
        config.render_scale,
        &config.export_title,
        &config.export_file_name,
    )
}

fn check_range(page: u32, page_count: u32) -> Result<()> {
    if page == 0 || page > page_count {
        return Err(BlattwerkError::PageOutOfRange { page, page_count });
    }
    Ok(())
}
