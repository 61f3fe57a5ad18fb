// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in page rasterizer.
//
// Walks a page's content stream with `lopdf`, tracks the current
// transformation matrix through `q`/`Q`/`cm`, and paints every image XObject
// drawn with `Do` onto a white page canvas. This covers scanned documents and
// flattened exports (one full-page image per page). Vector paths and text are
// not painted.

use blattwerk_core::error::{BlattwerkError, Result};
use image::imageops::FilterType;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, warn};

/// Form XObjects may nest; anything deeper than this is treated as a cycle.
const MAX_FORM_DEPTH: usize = 8;

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
pub(crate) type Matrix = [f32; 6];

pub(crate) const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied first, then `n`.
pub(crate) fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn transform_point(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Paints one page into a raster.
pub(crate) struct PageRasterizer<'a> {
    document: &'a Document,
    page: u32,
    /// Maps PDF user space to raster pixels (flips y, applies scale and the
    /// MediaBox origin).
    device: Matrix,
    canvas: RgbaImage,
    skipped_text: bool,
}

impl<'a> PageRasterizer<'a> {
    /// `media_box` is `[x0, y0, x1, y1]` in points.
    pub(crate) fn new(
        document: &'a Document,
        page: u32,
        media_box: [f32; 4],
        scale: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let [x0, _y0, _x1, y1] = media_box;
        let device = [scale, 0.0, 0.0, -scale, -x0 * scale, y1 * scale];
        Self {
            document,
            page,
            device,
            canvas: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
            skipped_text: false,
        }
    }

    /// Run `content` with `resources` and return the finished raster.
    pub(crate) fn paint(mut self, content: &[u8], resources: Option<&Dictionary>) -> Result<RgbaImage> {
        self.run(content, resources, IDENTITY, 0)?;
        if self.skipped_text {
            debug!(page = self.page, "Text operators present but not rasterized");
        }
        Ok(self.canvas)
    }

    fn render_error(&self, reason: impl Into<String>) -> BlattwerkError {
        BlattwerkError::Render {
            page: self.page,
            reason: reason.into(),
        }
    }

    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&Dictionary>,
        base: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|err| self.render_error(format!("malformed content stream: {}", err)))?;

        let mut ctm = base;
        let mut stack: Vec<Matrix> = Vec::new();

        for op in &content.operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => ctm = stack.pop().unwrap_or(base),
                "cm" => {
                    let m = matrix_operands(&op.operands)
                        .ok_or_else(|| self.render_error("cm expects six numbers"))?;
                    ctm = multiply(&m, &ctm);
                }
                "Do" => {
                    let name = op
                        .operands
                        .first()
                        .and_then(|o| o.as_name().ok())
                        .ok_or_else(|| self.render_error("Do without an XObject name"))?;
                    self.draw_xobject(name, resources, &ctm, depth)?;
                }
                "Tj" | "TJ" | "'" | "\"" => self.skipped_text = true,
                _ => {}
            }
        }
        Ok(())
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&Dictionary>,
        ctm: &Matrix,
        depth: usize,
    ) -> Result<()> {
        let document = self.document;
        let Some(stream) = resources.and_then(|res| lookup_xobject(document, res, name)) else {
            warn!(
                page = self.page,
                name = %String::from_utf8_lossy(name),
                "XObject not found in page resources"
            );
            return Ok(());
        };

        match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Image") => self.draw_image(stream, ctm),
            Ok(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    warn!(page = self.page, "Form XObjects nested too deeply, skipping");
                    return Ok(());
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|arr| matrix_operands(arr))
                    .unwrap_or(IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(document, r))
                    .or(resources);
                let body = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                self.run(&body, form_resources, multiply(&matrix, ctm), depth + 1)
            }
            _ => Ok(()),
        }
    }

    fn draw_image(&mut self, stream: &Stream, ctm: &Matrix) -> Result<()> {
        let Some(decoded) = decode_image_xobject(Some(self.document), stream, self.page)? else {
            return Ok(());
        };

        if ctm[1].abs() > f32::EPSILON || ctm[2].abs() > f32::EPSILON {
            warn!(page = self.page, "Rotated or skewed image placement, drawing its bounding box");
        }

        // Image space is the unit square; sample row 0 sits at y = 1.
        let to_device = multiply(ctm, &self.device);
        let corners = [
            transform_point(&to_device, 0.0, 0.0),
            transform_point(&to_device, 1.0, 0.0),
            transform_point(&to_device, 0.0, 1.0),
            transform_point(&to_device, 1.0, 1.0),
        ];
        let left = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min).round();
        let right = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max).round();
        let top = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min).round();
        let bottom = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max).round();

        if ![left, right, top, bottom].iter().all(|v| v.is_finite()) {
            return Err(self.render_error("image placement is not finite"));
        }
        if right - left < 1.0 || bottom - top < 1.0 {
            return Ok(());
        }

        // Unit-square x running right-to-left, or sample row 0 landing at the
        // bottom of the device box, means the placement mirrors the image.
        let (origin_x, row0_y) = transform_point(&to_device, 0.0, 1.0);
        let (far_x, _) = transform_point(&to_device, 1.0, 1.0);
        let (_, row_last_y) = transform_point(&to_device, 0.0, 0.0);
        let flip_h = far_x < origin_x;
        let flip_v = row0_y > row_last_y;

        debug!(
            page = self.page,
            x = left,
            y = top,
            width = right - left,
            height = bottom - top,
            "Image XObject painted"
        );

        let (canvas_w, canvas_h) = self.canvas.dimensions();
        let inside = left >= 0.0
            && top >= 0.0
            && right <= canvas_w as f32
            && bottom <= canvas_h as f32;
        if !inside {
            self.paint_clipped(&decoded, [left, top, right, bottom], flip_h, flip_v);
            return Ok(());
        }

        let (dest_w, dest_h) = ((right - left) as u32, (bottom - top) as u32);
        let mut placed = if decoded.dimensions() == (dest_w, dest_h) {
            decoded
        } else {
            image::imageops::resize(&decoded, dest_w, dest_h, FilterType::Triangle)
        };
        if flip_h {
            image::imageops::flip_horizontal_in_place(&mut placed);
        }
        if flip_v {
            image::imageops::flip_vertical_in_place(&mut placed);
        }
        image::imageops::replace(&mut self.canvas, &placed, left as i64, top as i64);
        Ok(())
    }

    /// Paint the part of device box `[left, top, right, bottom]` that lands on
    /// the canvas, sampling `image` nearest-neighbour. Work is bounded by the
    /// canvas size however large the box is.
    fn paint_clipped(&mut self, image: &RgbaImage, bounds: [f32; 4], flip_h: bool, flip_v: bool) {
        let [left, top, right, bottom] = bounds;
        let (canvas_w, canvas_h) = self.canvas.dimensions();
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 {
            return;
        }

        let x0 = left.max(0.0) as u32;
        let y0 = top.max(0.0) as u32;
        let x1 = right.min(canvas_w as f32).max(0.0) as u32;
        let y1 = bottom.min(canvas_h as f32).max(0.0) as u32;
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let (left, top) = (f64::from(left), f64::from(top));
        let box_w = f64::from(right) - left;
        let box_h = f64::from(bottom) - top;
        let sample = |offset: f64, extent: f64, len: u32, flip: bool| {
            let i = ((offset / extent) * f64::from(len)) as u32;
            let i = i.min(len - 1);
            if flip { len - 1 - i } else { i }
        };

        for y in y0..y1 {
            let sy = sample(f64::from(y) + 0.5 - top, box_h, src_h, flip_v);
            for x in x0..x1 {
                let sx = sample(f64::from(x) + 0.5 - left, box_w, src_w, flip_h);
                self.canvas.put_pixel(x, y, *image.get_pixel(sx, sy));
            }
        }
    }
}

/// Read six numeric operands as a matrix.
fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut m = [0.0f32; 6];
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = operand.as_float().ok()?;
    }
    Some(m)
}

/// Follow a reference (if any) to a dictionary.
pub(crate) fn resolve_dict<'d>(document: &'d Document, object: &'d Object) -> Option<&'d Dictionary> {
    let (_, resolved) = document.dereference(object).ok()?;
    resolved.as_dict().ok()
}

fn lookup_xobject<'d>(document: &'d Document, resources: &'d Dictionary, name: &[u8]) -> Option<&'d Stream> {
    let xobjects = resolve_dict(document, resources.get(b"XObject").ok()?)?;
    let (_, object) = document.dereference(xobjects.get(name).ok()?).ok()?;
    object.as_stream().ok()
}

/// Names of the filters applied to a stream, outermost first.
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of colour components, or `None` for colour spaces we cannot paint.
fn color_components(dict: &Dictionary) -> Option<u32> {
    match dict.get(b"ColorSpace").ok()? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        Object::Array(items) => match items.first().and_then(|f| f.as_name().ok()) {
            // Checked by the caller for the component count stored in the ICC stream.
            Some(b"ICCBased") => Some(0),
            Some(b"CalRGB") => Some(3),
            Some(b"CalGray") => Some(1),
            _ => None,
        },
        _ => None,
    }
}

fn icc_components(document: Option<&Document>, dict: &Dictionary) -> Option<u32> {
    let items = dict.get(b"ColorSpace").ok()?.as_array().ok()?;
    let profile = items.get(1)?;
    let stream = match (profile, document) {
        (Object::Stream(s), _) => s,
        (other, Some(doc)) => doc.dereference(other).ok()?.1.as_stream().ok()?,
        _ => return None,
    };
    let n = stream.dict.get(b"N").ok()?.as_i64().ok()?;
    u32::try_from(n).ok()
}

/// Decode an image XObject to RGBA.
///
/// Returns `Ok(None)` for encodings the built-in renderer does not handle (a
/// warning is logged and the image is skipped), and an error when the data
/// claims a supported encoding but is corrupt.
fn decode_image_xobject(
    document: Option<&Document>,
    stream: &Stream,
    page: u32,
) -> Result<Option<RgbaImage>> {
    let dict = &stream.dict;
    let filters = filter_names(dict);
    let render_error = |reason: String| BlattwerkError::Render { page, reason };

    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        if filters.len() > 1 {
            warn!(page, "Chained filters around DCTDecode are not supported, skipping image");
            return Ok(None);
        }
        let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| render_error(format!("corrupt JPEG image: {}", err)))?;
        return Ok(Some(img.to_rgba8()));
    }

    let unsupported = filters
        .iter()
        .find(|f| !matches!(f.as_slice(), b"FlateDecode" | b"Fl"));
    if let Some(filter) = unsupported {
        warn!(
            page,
            filter = %String::from_utf8_lossy(filter),
            "Unsupported image filter, skipping image"
        );
        return Ok(None);
    }

    let dimension = |key: &[u8]| -> Option<u32> {
        dict.get(key)
            .ok()
            .and_then(|v| v.as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
    };
    let (Some(width), Some(height)) = (dimension(b"Width"), dimension(b"Height")) else {
        return Err(render_error("image XObject without valid Width/Height".into()));
    };

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|v| v.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        warn!(page, bits, "Only 8-bit image samples are supported, skipping image");
        return Ok(None);
    }

    let components = match color_components(dict) {
        Some(0) => icc_components(document, dict),
        other => other,
    };
    let Some(components) = components.filter(|n| matches!(n, 1 | 3 | 4)) else {
        warn!(page, "Unsupported image colour space, skipping image");
        return Ok(None);
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|err| render_error(format!("cannot inflate image data: {}", err)))?
    };

    let expected = width as usize * height as usize * components as usize;
    if samples.len() < expected {
        return Err(render_error(format!(
            "image data too short: {} bytes for {}x{}x{}",
            samples.len(),
            width,
            height,
            components
        )));
    }

    let stride = components as usize;
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let i = (y as usize * width as usize + x as usize) * stride;
        match components {
            1 => {
                let g = samples[i];
                Rgba([g, g, g, 255])
            }
            3 => Rgba([samples[i], samples[i + 1], samples[i + 2], 255]),
            _ => {
                // Naive CMYK -> RGB.
                let k = 255 - samples[i + 3] as u16;
                let channel = |c: u8| ((255 - c as u16) * k / 255) as u8;
                Rgba([channel(samples[i]), channel(samples[i + 1]), channel(samples[i + 2]), 255])
            }
        }
    });
    Ok(Some(img))
}
