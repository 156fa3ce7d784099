//! Pipeline – ties together capture, boundary extraction, break planning,
//! slicing and PDF assembly into a single call, and serialises exports.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::boundary::{extract_boundaries, layout_to_raster_ratio, RasterSize};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::page_plan::{build_page_plan, PagePlan};
use crate::pagination::{plan_breaks, PlanParams};
use crate::raster::{encode_jpeg, encode_png, flatten, Capture, RasterSource};
use crate::render::render_pdf;
use crate::snapshot::{LayoutElement, LayoutSnapshot};
use crate::style::Color;

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// User-facing status updates raised by an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// A PDF export has started.
    Progress,
    /// The PDF is ready.
    Success,
    /// Another PDF export holds the export slot; this call was dropped.
    AlreadyRunning,
    /// The capture was empty.
    NothingToExport,
    /// The raster could not be acquired.
    ComponentLoadFailed,
    /// Any other PDF failure.
    ExportFailed,
    ImageExported,
    ImageFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::Progress => "Generating PDF...",
            Notice::Success => "PDF exported",
            Notice::AlreadyRunning => "An export is already in progress, please wait",
            Notice::NothingToExport => "Nothing to export",
            Notice::ComponentLoadFailed => "PDF component failed to load, please retry",
            Notice::ExportFailed => "PDF export failed",
            Notice::ImageExported => "Image exported",
            Notice::ImageFailed => "Image export failed",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::NothingToExport
                | Notice::ComponentLoadFailed
                | Notice::ExportFailed
                | Notice::ImageFailed
        )
    }
}

/// Receives notices; a UI would show them as toasts.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::warn!("{}", notice.message());
        } else {
            log::info!("{}", notice.message());
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Break offsets for `root` captured at `raster`, using `config`'s page format.
pub fn paginate(config: &ExportConfig, root: &LayoutElement, raster: RasterSize) -> Vec<f32> {
    let ratio = layout_to_raster_ratio(root, raster.width);
    let page_height = config.page_height_px(raster.width);
    let boundaries = extract_boundaries(root, raster, page_height);

    let params = PlanParams {
        page_height,
        total_height: raster.height as f32,
        heading_threshold: config.heading_keep_threshold * ratio,
        min_page_advance: config.min_page_advance,
    };
    let breaks = plan_breaks(&boundaries, &params);
    log::info!(
        "Planned {} page(s) for a {}x{} raster (page height {:.1}px)",
        breaks.len() + 1,
        raster.width,
        raster.height,
        page_height
    );
    breaks
}

/// The raster embedded in a snapshot, if any.
pub fn embedded_raster(snapshot: &LayoutSnapshot) -> Option<RasterSource> {
    snapshot.raster.clone().map(RasterSource::DataUri)
}

// ---------------------------------------------------------------------------
// Export slot
// ---------------------------------------------------------------------------

/// Holds the export slot; released when dropped.
#[derive(Debug)]
pub struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Why an export returned without producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Busy,
    NothingToExport,
}

/// Result of a PDF export call that did not fail.
#[derive(Debug)]
pub enum ExportOutcome {
    Exported(PdfExport),
    Skipped(SkipReason),
}

/// An assembled PDF, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct PdfExport {
    pub bytes: Vec<u8>,
    pub breaks: Vec<f32>,
    pub plan: PagePlan,
    pub file_name: String,
}

/// Output format for whole-document image export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// Guess from a file extension, defaulting to JPEG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => ImageFormat::Png,
            _ => ImageFormat::Jpeg,
        }
    }
}

/// An encoded full-document image.
#[derive(Debug, Clone)]
pub struct ImageExport {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub file_name: String,
}

/// Write `bytes` to `target`, or to `target/file_name` when `target` is a
/// directory.
fn save_bytes(bytes: &[u8], target: &Path, file_name: &str) -> Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(file_name)
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, bytes)?;
    Ok(path)
}

impl PdfExport {
    pub fn page_count(&self) -> usize {
        self.plan.pages.len()
    }

    pub fn save(&self, target: &Path) -> Result<PathBuf> {
        save_bytes(&self.bytes, target, &self.file_name)
    }
}

impl ImageExport {
    pub fn save(&self, target: &Path) -> Result<PathBuf> {
        save_bytes(&self.bytes, target, &self.file_name)
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Runs exports with a given configuration, one PDF at a time.
#[derive(Debug, Default)]
pub struct Exporter {
    config: ExportConfig,
    busy: AtomicBool,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn is_exporting(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the export slot, or `None` if an export is in flight.
    pub fn try_begin(&self) -> Option<ExportGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard { flag: &self.busy })
    }

    /// Capture, paginate and assemble a PDF for `snapshot`.
    ///
    /// Concurrent calls are dropped with [`SkipReason::Busy`]. Failures are
    /// logged, reported through `notifier`, and returned.
    pub fn export_pdf(
        &self,
        snapshot: &LayoutSnapshot,
        capture: &dyn Capture,
        notifier: &dyn Notifier,
    ) -> Result<ExportOutcome> {
        let Some(_guard) = self.try_begin() else {
            notifier.notify(Notice::AlreadyRunning);
            return Ok(ExportOutcome::Skipped(SkipReason::Busy));
        };
        notifier.notify(Notice::Progress);

        match self.assemble_pdf(snapshot, capture) {
            Ok(Some(export)) => {
                notifier.notify(Notice::Success);
                Ok(ExportOutcome::Exported(export))
            }
            Ok(None) => {
                notifier.notify(Notice::NothingToExport);
                Ok(ExportOutcome::Skipped(SkipReason::NothingToExport))
            }
            Err(e) => {
                log::error!("PDF export failed: {e}");
                notifier.notify(if e.is_resource_failure() {
                    Notice::ComponentLoadFailed
                } else {
                    Notice::ExportFailed
                });
                Err(e)
            }
        }
    }

    fn assemble_pdf(
        &self,
        snapshot: &LayoutSnapshot,
        capture: &dyn Capture,
    ) -> Result<Option<PdfExport>> {
        self.config.validate()?;
        snapshot.validate()?;

        let raster = capture
            .capture(&snapshot.root)?
            .scaled(self.config.capture_scale);
        let size = raster.size();
        if size.is_empty() || snapshot.root.rect.width() <= 0.0 {
            log::warn!(
                "Empty capture ({}x{}, content width {})",
                size.width,
                size.height,
                snapshot.root.rect.width()
            );
            return Ok(None);
        }

        let breaks = paginate(&self.config, &snapshot.root, size);
        let background = Color::page_background(snapshot.background_color.as_deref());
        let plan = build_page_plan(&self.config, size, &breaks, background);
        let bytes = render_pdf(&plan, &raster, self.config.jpeg_quality)?;

        Ok(Some(PdfExport {
            bytes,
            breaks,
            plan,
            file_name: self.config.pdf_file_name.clone(),
        }))
    }

    /// Encode the whole capture as one image. Does not take the PDF slot.
    pub fn export_image(
        &self,
        snapshot: &LayoutSnapshot,
        capture: &dyn Capture,
        format: ImageFormat,
        notifier: &dyn Notifier,
    ) -> Result<ImageExport> {
        let result = self.encode_image(snapshot, capture, format);
        match &result {
            Ok(_) => notifier.notify(Notice::ImageExported),
            Err(e) => {
                log::error!("Image export failed: {e}");
                notifier.notify(Notice::ImageFailed);
            }
        }
        result
    }

    fn encode_image(
        &self,
        snapshot: &LayoutSnapshot,
        capture: &dyn Capture,
        format: ImageFormat,
    ) -> Result<ImageExport> {
        self.config.validate()?;
        let raster = capture
            .capture(&snapshot.root)?
            .scaled(self.config.capture_scale);
        if raster.size().is_empty() {
            return Err(ExportError::Render("capture is empty".into()));
        }
        let bytes = match format {
            ImageFormat::Png => encode_png(raster.pixels())?,
            ImageFormat::Jpeg => {
                let background = Color::page_background(snapshot.background_color.as_deref());
                encode_jpeg(&flatten(raster.pixels(), background), self.config.image_quality)?
            }
        };
        Ok(ImageExport {
            bytes,
            format,
            file_name: format!("{}.{}", self.config.image_file_stem, format.extension()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Rect;

    #[test]
    fn guard_releases_on_drop() {
        let exporter = Exporter::default();
        {
            let _guard = exporter.try_begin().unwrap();
            assert!(exporter.is_exporting());
            assert!(exporter.try_begin().is_none());
        }
        assert!(!exporter.is_exporting());
        assert!(exporter.try_begin().is_some());
    }

    #[test]
    fn paginate_uses_config_page_height() {
        // 194px wide raster → 1mm per px → 273px pages.
        let root = LayoutElement::new("main", Rect::new(0.0, 600.0, 0.0, 194.0));
        let breaks = paginate(&ExportConfig::default(), &root, RasterSize::new(194, 600));
        assert_eq!(breaks, vec![273.0, 546.0]);
    }

    #[test]
    fn paginate_scales_heading_threshold() {
        // Layout is half the raster width, so ratio 2 and threshold 100px.
        let root = LayoutElement::new("main", Rect::new(0.0, 300.0, 0.0, 97.0)).with_children(
            vec![LayoutElement::new("h3", Rect::new(80.0, 95.0, 0.0, 97.0))],
        );
        let breaks = paginate(&ExportConfig::default(), &root, RasterSize::new(194, 600));
        // Heading spans 160..190, 83px above the 273 line.
        assert_eq!(breaks[0], 160.0);
    }

    #[test]
    fn notice_severity() {
        assert!(Notice::ComponentLoadFailed.is_error());
        assert!(!Notice::AlreadyRunning.is_error());
        assert!(!Notice::Success.is_error());
    }

    #[test]
    fn image_format_from_extension() {
        assert_eq!(ImageFormat::from_path(Path::new("a/b.PNG")), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path(Path::new("out.jpeg")), ImageFormat::Jpeg);
    }
}
