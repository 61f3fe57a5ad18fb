// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: Document I/O for the Blattwerk editor.
//
// Provides page sources (PDF decoding and rasterization, in-memory bitmaps),
// PDF assembly from flattened page rasters, and region image operations
// (extraction, Gaussian blur, PNG encoding).

pub mod image;
pub mod pdf;
pub mod source;

// Re-export the primary structs so callers can use `blattwerk_document::PdfReader` etc.
pub use image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use source::{PageSource, RasterDocument};
