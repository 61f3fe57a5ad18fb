// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Document errors --
    #[error("not a readable PDF document: {0}")]
    Decode(String),

    #[error("page {page} failed to render: {reason}")]
    Render { page: u32, reason: String },

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("no document is loaded")]
    NoDocument,

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Overlay / compositing errors --
    #[error("overlay snapshot could not be restored: {0}")]
    OverlayRestore(String),

    #[error("invalid overlay object: {0}")]
    InvalidObject(String),

    #[error(
        "overlay is {}x{} but base raster is {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    Composite {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("export failed on page {page}: {source}")]
    ExportFailed {
        page: u32,
        #[source]
        source: Box<BlattwerkError>,
    },

    #[error("font could not be loaded: {0}")]
    Font(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Wrap a per-page failure so the caller learns which page aborted an export.
    pub fn export_failed(page: u32, source: BlattwerkError) -> Self {
        Self::ExportFailed {
            page,
            source: Box::new(source),
        }
    }

    /// The page an error refers to, if it is page-scoped.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Render { page, .. }
            | Self::PageOutOfRange { page, .. }
            | Self::ExportFailed { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_failure_names_page_and_cause() {
        let err = BlattwerkError::export_failed(
            3,
            BlattwerkError::Render {
                page: 3,
                reason: "unsupported filter".into(),
            },
        );
        assert_eq!(err.page(), Some(3));
        let text = err.to_string();
        assert!(text.contains("page 3"), "{text}");
        assert!(text.contains("unsupported filter"), "{text}");
    }

    #[test]
    fn composite_message_lists_both_sizes() {
        let err = BlattwerkError::Composite {
            expected: (600, 900),
            actual: (300, 450),
        };
        assert_eq!(err.to_string(), "overlay is 300x450 but base raster is 600x900");
        assert_eq!(err.page(), None);
    }
}
