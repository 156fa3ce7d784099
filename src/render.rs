//! PDF renderer – takes a [`PagePlan`] and the raster it was planned for and
//! produces PDF bytes using `printpdf` (v0.8 ops-based API).

use printpdf::{
    Color as PdfColor, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage, Rgb, WindingOrder, XObjectTransform,
};

use crate::error::{ExportError, Result};
use crate::page_plan::{PagePlan, PageSlice};
use crate::raster::{encode_jpeg, flatten, RasterImage};

const MM_TO_PT: f32 = 2.834_646;

/// Render a PagePlan into PDF bytes.
///
/// Every page is filled with the plan's background before its slice is
/// placed. Slices are JPEG-encoded at `jpeg_quality`.
pub fn render_pdf(plan: &PagePlan, raster: &RasterImage, jpeg_quality: u8) -> Result<Vec<u8>> {
    if raster.size() != plan.raster {
        return Err(ExportError::Render(format!(
            "plan was built for a {}x{} raster, got {}x{}",
            plan.raster.width,
            plan.raster.height,
            raster.size().width,
            raster.size().height
        )));
    }

    let page_w = Mm(plan.page_width_mm);
    let page_h = Mm(plan.page_height_mm);
    let background = plan.background_color();

    let mut doc = PdfDocument::new(&plan.title);
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let mut pages = Vec::with_capacity(plan.pages.len());

    for slice in &plan.pages {
        let mut ops = vec![
            Op::SetFillColor {
                col: PdfColor::Rgb(Rgb {
                    r: background.r,
                    g: background.g,
                    b: background.b,
                    icc_profile: None,
                }),
            },
            fill_rect(0.0, 0.0, plan.page_width_mm, plan.page_height_mm),
        ];

        if slice.source_height == 0 {
            log::debug!("Page {} has an empty slice", slice.page_index);
        } else {
            let pixels = raster.slice_rows(slice.source_y, slice.source_height);
            let jpeg = encode_jpeg(&flatten(&pixels, background), jpeg_quality)?;
            let image = RawImage::decode_from_bytes(&jpeg, &mut warnings)
                .map_err(|e| ExportError::Render(format!("page {}: {e}", slice.page_index)))?;
            let xobj_id = doc.add_image(&image);
            ops.push(Op::UseXobject {
                id: xobj_id,
                transform: slice_transform(plan, slice),
            });
        }

        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    if !warnings.is_empty() {
        log::debug!("printpdf reported {} image warnings", warnings.len());
    }

    doc.with_pages(pages);
    Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
}

/// Place a slice at the plan's image origin, stretched to the content width.
///
/// At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
fn slice_transform(plan: &PagePlan, slice: &PageSlice) -> XObjectTransform {
    let width_pt = plan.image_width_mm * MM_TO_PT;
    let height_pt = slice.target_height_mm * MM_TO_PT;
    // PDF origin is bottom-left; the plan measures from the top.
    let bottom_pt = (plan.page_height_mm - plan.image_top_mm) * MM_TO_PT - height_pt;

    XObjectTransform {
        translate_x: Some(Pt(plan.image_left_mm * MM_TO_PT)),
        translate_y: Some(Pt(bottom_pt)),
        dpi: Some(72.0),
        scale_x: Some(width_pt / plan.raster.width as f32),
        scale_y: Some(height_pt / slice.source_height as f32),
        rotate: None,
    }
}

/// A filled rectangle given in millimetres with a bottom-left origin.
fn fill_rect(x_mm: f32, y_mm: f32, w_mm: f32, h_mm: f32) -> Op {
    let (x1, y1) = (x_mm * MM_TO_PT, y_mm * MM_TO_PT);
    let (x2, y2) = ((x_mm + w_mm) * MM_TO_PT, (y_mm + h_mm) * MM_TO_PT);
    let corner = |x: f32, y: f32| LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    };

    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![corner(x1, y1), corner(x2, y1), corner(x2, y2), corner(x1, y2)],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    }
}
