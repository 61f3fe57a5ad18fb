// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations. Each opens the input, drives a `Session`, and
// writes its output.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use blattwerk_core::config::EditorConfig;
use blattwerk_document::{ImageProcessor, PageSource, PdfReader};
use blattwerk_editor::{EditScript, Session};
use tracing::info;

use crate::config_dir::load_config;

/// Print the page count and each page's size in points and in pixels at the
/// configured render scale.
pub fn info(pdf: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let reader = PdfReader::open(pdf).with_context(|| format!("open '{}'", pdf.display()))?;

    println!("{}: {} page(s)", pdf.display(), reader.page_count());
    for page in 1..=reader.page_count() {
        let size = reader.page_size(page)?;
        let (width, height) = size.pixel_dimensions(config.render_scale);
        println!(
            "  page {page}: {:.1} x {:.1} pt, {width} x {height} px at scale {}",
            size.width_pt, size.height_pt, config.render_scale
        );
    }
    Ok(())
}

/// Apply `edits` to `pdf` and write the export.
pub fn apply(
    pdf: &Path,
    edits: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.export_file_name));

    let mut session = open_session(pdf, config)?;
    let script =
        EditScript::load(edits).with_context(|| format!("load edit script '{}'", edits.display()))?;
    let report = script.apply(&mut session)?;
    if report.markers_dropped > 0 {
        println!(
            "{} redaction(s) were outside their page and skipped",
            report.markers_dropped
        );
    }

    let exported = session.export()?;
    exported
        .write_to(&output)
        .with_context(|| format!("write '{}'", output.display()))?;

    println!(
        "Wrote {} ({} page(s), sha256 {})",
        output.display(),
        exported.page_count(),
        exported.sha256
    );
    Ok(())
}

/// Render one page with edits applied and save it as PNG.
pub fn preview(
    pdf: &Path,
    page: u32,
    edits: Option<&Path>,
    output: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let mut session = open_session(pdf, config)?;
    if let Some(edits) = edits {
        let script = EditScript::load(edits)
            .with_context(|| format!("load edit script '{}'", edits.display()))?;
        script.apply(&mut session)?;
    }

    let raster = session.flattened_page(page)?;
    let png = ImageProcessor::from_rgba(raster).to_png_bytes()?;
    std::fs::write(output, png).with_context(|| format!("write '{}'", output.display()))?;

    println!("Wrote page {page} to {}", output.display());
    Ok(())
}

fn open_session(pdf: &Path, config: EditorConfig) -> anyhow::Result<Session> {
    let data = std::fs::read(pdf).with_context(|| format!("read '{}'", pdf.display()))?;
    let mut session = Session::new(config)?;
    session.open(&data)?;
    info!(pdf = %pdf.display(), pages = session.page_count().unwrap_or(0), "Document ready");
    Ok(session)
}
