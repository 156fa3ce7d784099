//! # pagecut – paged PDF export for a captured HTML document
//!
//! The document has already been rendered and captured as one tall raster.
//! This crate decides where to cut that raster into pages so that no block
//! is sliced mid-element and no heading is stranded at the bottom of a page,
//! then assembles the slices into a PDF. The pipeline stages are:
//!
//! 1. **Snapshot** – element geometry of the rendered document ([`snapshot`])
//! 2. **Extract** – element boxes mapped into raster space ([`boundary`])
//! 3. **Paginate** – conflict-aware break offsets ([`pagination`])
//! 4. **Slice** – capture acquisition and per-page rows ([`raster`], [`page_plan`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! [`pipeline::Exporter`] runs the stages end to end and allows one PDF
//! export at a time. A C-compatible FFI surface is exposed via [`ffi`].

pub mod boundary;
pub mod config;
pub mod error;
pub mod ffi;
pub mod page_plan;
pub mod pagination;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod snapshot;
pub mod style;

// Re-exports for convenience
pub use boundary::{extract_boundaries, ElementBoundary, RasterSize};
pub use config::{ExportConfig, PageOrientation};
pub use error::{ExportError, Result};
pub use pagination::{plan_breaks, resolve_break, PlanParams};
pub use pipeline::{ExportOutcome, Exporter, ImageFormat, LogNotifier, Notice, Notifier};
pub use snapshot::LayoutSnapshot;
