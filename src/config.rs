//! Export configuration – physical page format and the tunables of the
//! paginate → slice → assemble pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::pagination::{HEADING_KEEP_THRESHOLD, MIN_PAGE_ADVANCE};

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Configuration for PDF and image export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Page width in millimetres (default: A4 = 210).
    pub page_width_mm: f32,
    /// Page height in millimetres (default: A4 = 297).
    pub page_height_mm: f32,
    /// Padding in millimetres. Left/right use one unit, the top 1.5 and the
    /// bottom 1.5, so the content box is `height - 3 * padding` tall.
    pub padding_mm: f32,
    /// Page orientation; swaps effective width/height when `Landscape`.
    pub orientation: PageOrientation,
    /// Multiplier from capture pixels to raster pixels.
    pub capture_scale: f32,
    /// JPEG quality (1–100) for PDF page slices.
    pub jpeg_quality: u8,
    /// JPEG quality (1–100) for whole-document image export.
    pub image_quality: u8,
    /// Heading-orphan distance in layout pixels.
    pub heading_keep_threshold: f32,
    /// Minimum advance of an adjusted break, in raster pixels.
    pub min_page_advance: f32,
    /// Default file name for saved PDFs.
    pub pdf_file_name: String,
    /// Default file name stem for saved images.
    pub image_file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "bm.md".to_string(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            padding_mm: 8.0,
            orientation: PageOrientation::Portrait,
            capture_scale: 1.0,
            jpeg_quality: 92,
            image_quality: 99,
            heading_keep_threshold: HEADING_KEEP_THRESHOLD,
            min_page_advance: MIN_PAGE_ADVANCE,
            pdf_file_name: "bm.md.pdf".to_string(),
            image_file_stem: "bm.md".to_string(),
        }
    }
}

impl ExportConfig {
    /// Create an A4 landscape config.
    pub fn a4_landscape() -> Self {
        Self {
            orientation: PageOrientation::Landscape,
            ..Self::default()
        }
    }

    /// Deserialise from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Effective page width after applying orientation.
    pub fn effective_width_mm(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_width_mm,
            PageOrientation::Landscape => self.page_height_mm,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height_mm(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_height_mm,
            PageOrientation::Landscape => self.page_width_mm,
        }
    }

    /// Width available to the page image.
    pub fn content_width_mm(&self) -> f32 {
        self.effective_width_mm() - self.padding_mm * 2.0
    }

    /// Height available to the page image.
    pub fn content_height_mm(&self) -> f32 {
        self.effective_height_mm() - self.padding_mm * 3.0
    }

    /// Distance from the page top to the image top.
    pub fn image_top_mm(&self) -> f32 {
        self.padding_mm * 1.5
    }

    /// Millimetres per raster pixel when the raster fills the content width.
    pub fn scale_for(&self, raster_width: u32) -> f32 {
        self.content_width_mm() / raster_width as f32
    }

    /// Nominal page height in raster pixels.
    pub fn page_height_px(&self, raster_width: u32) -> f32 {
        self.content_height_mm() / self.scale_for(raster_width)
    }

    /// Reject configurations that leave no printable area.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            self.page_width_mm,
            self.page_height_mm,
            self.padding_mm,
            self.capture_scale,
        ];
        if dims.iter().any(|v| !v.is_finite()) {
            return Err(ExportError::InvalidPageGeometry(
                "page dimensions must be finite".into(),
            ));
        }
        if self.content_width_mm() <= 0.0 || self.content_height_mm() <= 0.0 {
            return Err(ExportError::InvalidPageGeometry(format!(
                "padding {}mm leaves no content area on a {}×{}mm page",
                self.padding_mm,
                self.effective_width_mm(),
                self.effective_height_mm()
            )));
        }
        if self.capture_scale <= 0.0 {
            return Err(ExportError::InvalidPageGeometry(format!(
                "capture scale must be positive, got {}",
                self.capture_scale
            )));
        }
        let thresholds = [
            ("heading_keep_threshold", self.heading_keep_threshold),
            ("min_page_advance", self.min_page_advance),
        ];
        for (name, v) in thresholds {
            if !v.is_finite() || v < 0.0 {
                return Err(ExportError::InvalidPageGeometry(format!(
                    "{name} must be a finite, non-negative value, got {v}"
                )));
            }
        }
        Ok(())
    }
}
