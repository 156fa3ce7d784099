//! Page plan – the intermediate representation between break planning and
//! PDF rendering. This is the "frozen" structure that encodes exactly which
//! raster rows go on each page and where they land.

use serde::{Deserialize, Serialize};

use crate::boundary::RasterSize;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::raster::pixel_edges;
use crate::style::Color;

/// A complete paged document ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Width of each page in millimetres.
    pub page_width_mm: f32,
    /// Height of each page in millimetres.
    pub page_height_mm: f32,
    /// Left offset of every slice.
    pub image_left_mm: f32,
    /// Top offset of every slice.
    pub image_top_mm: f32,
    /// Rendered slice width (the content width).
    pub image_width_mm: f32,
    /// Page fill colour, opaque 8-bit RGB.
    pub background: [u8; 3],
    /// Raster the slices are cut from.
    pub raster: RasterSize,
    /// Ordered list of pages.
    pub pages: Vec<PageSlice>,
}

/// One page: a band of raster rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSlice {
    pub page_index: usize,
    /// First raster row of the slice.
    pub source_y: u32,
    /// Number of raster rows; 0 yields a background-only page.
    pub source_height: u32,
    /// Placed height of the slice on the page.
    pub target_height_mm: f32,
}

impl PagePlan {
    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn background_color(&self) -> Color {
        let [r, g, b] = self.background;
        Color {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }
}

/// Lay out one page per gap between consecutive breaks, plus the trailing
/// page from the last break to the raster bottom.
pub fn build_page_plan(
    config: &ExportConfig,
    raster: RasterSize,
    breaks: &[f32],
    background: Color,
) -> PagePlan {
    let scale = config.scale_for(raster.width);
    let edges = pixel_edges(breaks, raster.height);
    let pages = edges
        .windows(2)
        .enumerate()
        .map(|(page_index, w)| {
            let source_height = w[1] - w[0];
            PageSlice {
                page_index,
                source_y: w[0],
                source_height,
                target_height_mm: source_height as f32 * scale,
            }
        })
        .collect();

    PagePlan {
        title: config.title.clone(),
        page_width_mm: config.effective_width_mm(),
        page_height_mm: config.effective_height_mm(),
        image_left_mm: config.padding_mm,
        image_top_mm: config.image_top_mm(),
        image_width_mm: config.content_width_mm(),
        background: background.to_rgb8(),
        raster,
        pages,
    }
}
