//! Error types for the export pipeline.

use std::io;
use thiserror::Error;

/// Result type alias for pagecut operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that can abort an export.
///
/// The boundary extractor and break planner never produce these themselves;
/// everything here originates from the snapshot, the capture, or assembly.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The layout snapshot is malformed or carries invalid geometry.
    #[error("Invalid layout snapshot: {0}")]
    Snapshot(String),

    /// The captured raster could not be acquired or decoded.
    #[error("Raster capture failed: {0}")]
    Capture(String),

    /// Page size, padding or raster dimensions leave no room for content.
    #[error("Invalid page geometry: {0}")]
    InvalidPageGeometry(String),

    /// Slicing, encoding, or PDF assembly failed.
    #[error("Rendering error: {0}")]
    Render(String),

    /// I/O error when reading inputs or saving output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialisation failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// Whether the failure came from acquiring the raster rather than from
    /// the pipeline itself. Drives the "component failed to load" notice.
    pub fn is_resource_failure(&self) -> bool {
        matches!(self, ExportError::Capture(_))
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Render(e.to_string())
    }
}
