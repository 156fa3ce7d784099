//! Raster capture and slicing.
//!
//! The capture itself happens elsewhere (a headless browser screenshot, a
//! canvas export). This module only acquires the resulting bitmap, scales it
//! into raster space, and cuts it into per-page slices.

use std::io::Cursor;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};

use crate::boundary::RasterSize;
use crate::error::{ExportError, Result};
use crate::snapshot::LayoutElement;
use crate::style::Color;

/// A fully materialised capture in raster space.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn size(&self) -> RasterSize {
        RasterSize::new(self.pixels.width(), self.pixels.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Apply the capture multiplier. A factor of 1 is a no-op.
    pub fn scaled(self, factor: f32) -> Self {
        if (factor - 1.0).abs() < f32::EPSILON || self.size().is_empty() {
            return self;
        }
        let w = ((self.pixels.width() as f32) * factor).round().max(1.0) as u32;
        let h = ((self.pixels.height() as f32) * factor).round().max(1.0) as u32;
        log::debug!(
            "Scaling raster {}x{} by {factor} to {w}x{h}",
            self.pixels.width(),
            self.pixels.height()
        );
        Self {
            pixels: imageops::resize(&self.pixels, w, h, FilterType::Lanczos3),
        }
    }

    /// Copy rows `[y, y + height)` into a new image of full width.
    pub fn slice_rows(&self, y: u32, height: u32) -> RgbaImage {
        let y = y.min(self.pixels.height());
        let height = height.min(self.pixels.height() - y);
        imageops::crop_imm(&self.pixels, 0, y, self.pixels.width(), height).to_image()
    }
}

/// Composite `img` over an opaque `background`.
pub fn flatten(img: &RgbaImage, background: Color) -> RgbImage {
    let [br, bg, bb] = background.to_rgb8();
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y).0;
        let a = p[3] as u32;
        let mix = |c: u8, b: u8| ((c as u32 * a + b as u32 * (255 - a) + 127) / 255) as u8;
        Rgb([mix(p[0], br), mix(p[1], bg), mix(p[2], bb)])
    })
}

/// JPEG-encode an opaque image.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.encode_image(img)?;
    Ok(buf)
}

/// PNG-encode an image, keeping alpha.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Row indices at which slices begin and end: `0`, each break rounded to a
/// whole row, then `height`. Consecutive differences tile the raster.
pub fn pixel_edges(breaks: &[f32], height: u32) -> Vec<u32> {
    let mut edges = Vec::with_capacity(breaks.len() + 2);
    edges.push(0);
    let mut last = 0u32;
    for b in breaks {
        let row = (b.round().max(0.0) as u32).clamp(last, height);
        edges.push(row);
        last = row;
    }
    edges.push(height);
    edges
}

// ---------------------------------------------------------------------------
// Capture sources
// ---------------------------------------------------------------------------

/// Something that can produce the raster for a content root.
pub trait Capture {
    fn capture(&self, root: &LayoutElement) -> Result<RasterImage>;
}

/// A capture that was taken ahead of time.
#[derive(Debug, Clone)]
pub enum RasterSource {
    /// PNG or JPEG file on disk.
    Path(PathBuf),
    /// `data:image/...;base64,` URI.
    DataUri(String),
    /// Already-decoded pixels.
    Memory(RgbaImage),
}

impl Capture for RasterSource {
    fn capture(&self, _root: &LayoutElement) -> Result<RasterImage> {
        let bytes = match self {
            RasterSource::Memory(img) => return Ok(RasterImage::new(img.clone())),
            RasterSource::Path(path) => std::fs::read(path).map_err(|e| {
                ExportError::Capture(format!("cannot read '{}': {e}", path.display()))
            })?,
            RasterSource::DataUri(uri) => parse_data_uri(uri).map_err(ExportError::Capture)?,
        };
        decode_raster(&bytes)
    }
}

/// Decode PNG/JPEG bytes into a raster.
pub fn decode_raster(bytes: &[u8]) -> Result<RasterImage> {
    let img: DynamicImage = image::load_from_memory(bytes)
        .map_err(|e| ExportError::Capture(format!("decode error: {e}")))?;
    Ok(RasterImage::new(img.to_rgba8()))
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
///
/// Returns `Err` if `src` is not a data URI or does not use base64 encoding.
pub fn parse_data_uri(src: &str) -> std::result::Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!("raster must be a base64 data URI (e.g. `data:image/png;base64,...`). Got: {preview:?}")
    })?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "Invalid data URI: missing `,` separator between header and data".to_string())?;
    if !header.contains(";base64") {
        return Err("Only base64-encoded data URIs are supported. \
             The header must contain `;base64`."
            .to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("Base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Rect;
    use base64::Engine as _;
    use image::Rgba;

    fn striped(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |_, y| Rgba([(y % 256) as u8, 0, 0, 255]))
    }

    fn root() -> LayoutElement {
        LayoutElement::new("main", Rect::new(0.0, 10.0, 0.0, 10.0))
    }

    #[test]
    fn edges_tile_the_raster() {
        assert_eq!(pixel_edges(&[290.4, 590.6], 1000), vec![0, 290, 591, 1000]);
        assert_eq!(pixel_edges(&[], 42), vec![0, 42]);
    }

    #[test]
    fn edges_never_exceed_height() {
        assert_eq!(pixel_edges(&[999.7], 1000), vec![0, 1000, 1000]);
    }

    #[test]
    fn slice_rows_copies_the_requested_band() {
        let raster = RasterImage::new(striped(4, 300));
        let slice = raster.slice_rows(100, 50);
        assert_eq!(slice.dimensions(), (4, 50));
        assert_eq!(slice.get_pixel(0, 0).0[0], 100);
        assert_eq!(slice.get_pixel(3, 49).0[0], 149);
    }

    #[test]
    fn flatten_blends_alpha_over_background() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let flat = flatten(&img, Color::from_hex("#102030").unwrap());
        assert_eq!(flat.get_pixel(0, 0).0, [16, 32, 48]);
    }

    #[test]
    fn scale_doubles_dimensions() {
        let raster = RasterImage::new(striped(10, 20)).scaled(2.0);
        assert_eq!(raster.size(), RasterSize::new(20, 40));
    }

    #[test]
    fn data_uri_roundtrip() {
        let png = encode_png(&striped(3, 5)).unwrap();
        let uri = format!("data:image/png;base64,{}", BASE64_STD.encode(&png));
        let raster = RasterSource::DataUri(uri).capture(&root()).unwrap();
        assert_eq!(raster.size(), RasterSize::new(3, 5));
    }

    #[test]
    fn bad_sources_are_capture_errors() {
        let err = RasterSource::DataUri("https://example.com/a.png".into())
            .capture(&root())
            .unwrap_err();
        assert!(err.is_resource_failure());
        let err = RasterSource::Path("/nonexistent/raster.png".into())
            .capture(&root())
            .unwrap_err();
        assert!(err.is_resource_failure());
    }

    #[test]
    fn jpeg_encoding_produces_jfif() {
        let rgb = flatten(&striped(8, 8), Color::WHITE);
        let bytes = encode_jpeg(&rgb, 92).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }
}
