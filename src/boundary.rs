//! Boundary extraction – maps element boxes from layout space into raster
//! space and classifies them for the break planner.

use serde::{Deserialize, Serialize};

use crate::snapshot::{LayoutElement, BLOCK_SELECTORS, HEADING_SELECTORS};

/// Pixel dimensions of the captured raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One scanned element, in raster-space units relative to the content top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBoundary {
    pub top: f32,
    pub bottom: f32,
    pub is_heading: bool,
}

impl ElementBoundary {
    pub fn block(top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            is_heading: false,
        }
    }

    pub fn heading(top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            is_heading: true,
        }
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Scale factor from layout pixels to raster pixels.
///
/// `root` must have a non-zero width; callers check this before exporting.
pub fn layout_to_raster_ratio(root: &LayoutElement, raster_width: u32) -> f32 {
    raster_width as f32 / root.rect.width()
}

/// Collect block and heading boundaries under `root`, sorted by `top`.
///
/// Blocks at least `page_height` tall are dropped: they span a page no matter
/// where the break lands. Headings are always kept. The sort is stable, so
/// blocks precede headings that start on the same row.
pub fn extract_boundaries(
    root: &LayoutElement,
    raster: RasterSize,
    page_height: f32,
) -> Vec<ElementBoundary> {
    let ratio = layout_to_raster_ratio(root, raster.width);
    let origin = root.rect.top;
    let to_raster = |el: &LayoutElement| {
        (
            (el.rect.top - origin) * ratio,
            (el.rect.bottom - origin) * ratio,
        )
    };

    let mut boundaries: Vec<ElementBoundary> = root
        .query_all(BLOCK_SELECTORS)
        .map(to_raster)
        .filter(|(top, bottom)| bottom - top < page_height)
        .map(|(top, bottom)| ElementBoundary::block(top, bottom))
        .collect();

    let blocks = boundaries.len();
    boundaries.extend(
        root.query_all(HEADING_SELECTORS)
            .map(to_raster)
            .map(|(top, bottom)| ElementBoundary::heading(top, bottom)),
    );

    boundaries.sort_by(|a, b| a.top.total_cmp(&b.top));

    log::debug!(
        "Extracted {} boundaries ({} blocks, {} headings, ratio {:.3})",
        boundaries.len(),
        blocks,
        boundaries.len() - blocks,
        ratio
    );
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Rect;

    fn el(tag: &str, top: f32, bottom: f32) -> LayoutElement {
        LayoutElement::new(tag, Rect::new(top, bottom, 10.0, 210.0))
    }

    fn root(children: Vec<LayoutElement>) -> LayoutElement {
        // Content root starts 50px down the viewport and is 200px wide.
        LayoutElement::new("article", Rect::new(50.0, 2050.0, 10.0, 210.0)).with_children(children)
    }

    #[test]
    fn ratio_maps_layout_width_onto_raster_width() {
        let r = root(vec![]);
        assert_eq!(layout_to_raster_ratio(&r, 400), 2.0);
    }

    #[test]
    fn coordinates_are_relative_to_content_top_and_scaled() {
        let r = root(vec![el("p", 150.0, 170.0)]);
        let b = extract_boundaries(&r, RasterSize::new(400, 4000), 300.0);
        assert_eq!(b, vec![ElementBoundary::block(200.0, 240.0)]);
    }

    #[test]
    fn oversized_blocks_are_dropped_but_headings_kept() {
        let r = root(vec![
            // 175 layout px * 2 = 350 raster px >= 300
            el("pre", 50.0, 225.0),
            el("h1", 300.0, 500.0),
            el("p", 600.0, 610.0),
        ]);
        let b = extract_boundaries(&r, RasterSize::new(400, 4000), 300.0);
        assert_eq!(
            b,
            vec![
                ElementBoundary::heading(500.0, 900.0),
                ElementBoundary::block(1100.0, 1120.0),
            ]
        );
    }

    #[test]
    fn block_exactly_one_page_tall_is_dropped() {
        let r = root(vec![el("table", 50.0, 200.0)]);
        let b = extract_boundaries(&r, RasterSize::new(400, 4000), 300.0);
        assert!(b.is_empty());
    }

    #[test]
    fn output_is_sorted_with_blocks_before_headings_on_ties() {
        let r = root(vec![
            el("h2", 100.0, 110.0),
            el("p", 80.0, 90.0),
            el("figure", 100.0, 130.0),
            el("div", 0.0, 10.0),
        ]);
        let b = extract_boundaries(&r, RasterSize::new(200, 4000), 300.0);
        assert_eq!(
            b,
            vec![
                ElementBoundary::block(30.0, 40.0),
                ElementBoundary::block(50.0, 80.0),
                ElementBoundary::heading(50.0, 60.0),
            ]
        );
    }

    #[test]
    fn nested_matches_are_all_reported() {
        let r = root(vec![el("table", 50.0, 100.0).with_children(vec![
            el("tr", 50.0, 75.0),
            el("tr", 75.0, 100.0),
        ])]);
        let b = extract_boundaries(&r, RasterSize::new(200, 4000), 300.0);
        assert_eq!(b.len(), 3);
        assert!(b.iter().all(|x| !x.is_heading));
    }
}
