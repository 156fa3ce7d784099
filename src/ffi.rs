//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Buffers returned by `pagecut_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `pagecut_free_buffer`,
//!   `pagecut_free_breaks` or `pagecut_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error).
//! - Error details can be retrieved via `pagecut_last_error`.
//!
//! ## Thread safety
//! - `pagecut_last_error` uses a thread-local.
//! - `pagecut_export_pdf` shares one process-wide export slot: a call made
//!   while another is running returns [`PAGECUT_BUSY`] immediately.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;
use std::sync::OnceLock;

use crate::boundary::{ElementBoundary, RasterSize};
use crate::config::ExportConfig;
use crate::pagination::{plan_breaks, PlanParams};
use crate::page_plan::build_page_plan;
use crate::pipeline::{
    embedded_raster, paginate, ExportOutcome, Exporter, LogNotifier, SkipReason,
};
use crate::raster::{decode_raster, Capture, RasterImage};
use crate::snapshot::{LayoutElement, LayoutSnapshot};
use crate::style::Color;

/// Returned by `pagecut_export_pdf` when another export holds the slot.
pub const PAGECUT_BUSY: c_int = 5;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn exporter() -> &'static Exporter {
    static EXPORTER: OnceLock<Exporter> = OnceLock::new();
    EXPORTER.get_or_init(|| Exporter::new(ExportConfig::default()))
}

/// A decoded raster handed over from the caller.
struct Decoded(RasterImage);

impl Capture for Decoded {
    fn capture(&self, _root: &LayoutElement) -> crate::error::Result<RasterImage> {
        Ok(self.0.clone())
    }
}

/// One element boundary in raster space.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PagecutBoundary {
    pub top: f32,
    pub bottom: f32,
    pub is_heading: bool,
}

/// Parse a UTF-8 snapshot from a byte buffer.
///
/// # Safety
/// `ptr` must point to `len` valid bytes.
unsafe fn snapshot_from_raw(ptr: *const u8, len: u32) -> Result<LayoutSnapshot, (c_int, String)> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    let json = std::str::from_utf8(bytes).map_err(|e| (2, format!("Invalid UTF-8: {e}")))?;
    LayoutSnapshot::from_json(json).map_err(|e| (3, e.to_string()))
}

/// # Safety
/// `out_buf` and `out_len` must be valid, non-null pointers.
unsafe fn export_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    *out_buf = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    *out_len = len;
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Plan page breaks for a list of boundaries.
///
/// `boundaries` need not be sorted. `ratio` is the layout-to-raster scale
/// used to size the heading-orphan threshold.
///
/// # Returns
/// `0` on success; `*out_breaks` then holds `*out_len` ascending offsets
/// (possibly zero, in which case `*out_breaks` is null).
///
/// # Safety
/// - `boundaries` must point to `count` valid elements (or be null with `count == 0`).
/// - `out_breaks` and `out_len` must be valid pointers.
/// - The caller must free `*out_breaks` with `pagecut_free_breaks`.
#[no_mangle]
pub unsafe extern "C" fn pagecut_plan_breaks(
    boundaries: *const PagecutBoundary,
    count: u32,
    ratio: f32,
    total_height: f32,
    page_height: f32,
    out_breaks: *mut *mut f32,
    out_len: *mut u32,
) -> c_int {
    if out_breaks.is_null() || out_len.is_null() || (boundaries.is_null() && count > 0) {
        set_last_error("Null pointer argument");
        return 1;
    }
    if page_height.is_nan() || page_height <= 0.0 || !ratio.is_finite() {
        set_last_error("page_height must be positive and ratio finite");
        return 2;
    }

    let mut list: Vec<ElementBoundary> = if count == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(boundaries, count as usize)
            .iter()
            .map(|b| ElementBoundary {
                top: b.top,
                bottom: b.bottom,
                is_heading: b.is_heading,
            })
            .collect()
    };
    list.sort_by(|a, b| a.top.total_cmp(&b.top));

    let breaks = plan_breaks(&list, &PlanParams::new(page_height, total_height, ratio));
    *out_len = breaks.len() as u32;
    *out_breaks = if breaks.is_empty() {
        ptr::null_mut()
    } else {
        Box::into_raw(breaks.into_boxed_slice()) as *mut f32
    };
    0
}

/// Compute the page plan JSON for a snapshot captured at the given size,
/// using the default A4 configuration.
///
/// # Returns
/// `0` on success.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `*out_json` must be freed with `pagecut_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pagecut_plan_json(
    json_ptr: *const u8,
    json_len: u32,
    raster_width: u32,
    raster_height: u32,
    out_json: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let snapshot = match snapshot_from_raw(json_ptr, json_len) {
        Ok(s) => s,
        Err((code, msg)) => {
            set_last_error(&msg);
            return code;
        }
    };
    let size = RasterSize::new(raster_width, raster_height);
    if size.is_empty() || snapshot.root.rect.width() <= 0.0 {
        set_last_error("Nothing to export");
        return 4;
    }

    let config = ExportConfig::default();
    let breaks = paginate(&config, &snapshot.root, size);
    let background = Color::page_background(snapshot.background_color.as_deref());
    let plan = build_page_plan(&config, size, &breaks, background);
    match CString::new(plan.to_json()) {
        Ok(cs) => {
            *out_json = cs.into_raw();
            0
        }
        Err(_) => {
            set_last_error("JSON contained null byte");
            3
        }
    }
}

/// Export a snapshot and its raster to PDF bytes.
///
/// # Parameters
/// - `json_ptr`, `json_len`: UTF-8 layout snapshot JSON
/// - `raster_ptr`, `raster_len`: PNG/JPEG bytes; pass `NULL` to use the
///   snapshot's embedded `raster` data URI
/// - `out_buf`, `out_len`: PDF output
///
/// # Returns
/// `0` on success, [`PAGECUT_BUSY`] if another export is running, `4` if
/// there was nothing to export, other non-zero values on error.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `raster_ptr`, if non-null, must point to `raster_len` valid bytes.
/// - The caller must free `*out_buf` with `pagecut_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn pagecut_export_pdf(
    json_ptr: *const u8,
    json_len: u32,
    raster_ptr: *const u8,
    raster_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let snapshot = match snapshot_from_raw(json_ptr, json_len) {
        Ok(s) => s,
        Err((code, msg)) => {
            set_last_error(&msg);
            return code;
        }
    };

    let capture: Box<dyn Capture> = if raster_ptr.is_null() {
        match embedded_raster(&snapshot) {
            Some(source) => Box::new(source),
            None => {
                set_last_error("No raster supplied and none embedded in the snapshot");
                return 6;
            }
        }
    } else {
        match decode_raster(slice::from_raw_parts(raster_ptr, raster_len as usize)) {
            Ok(raster) => Box::new(Decoded(raster)),
            Err(e) => {
                set_last_error(&e.to_string());
                return 6;
            }
        }
    };

    match exporter().export_pdf(&snapshot, capture.as_ref(), &LogNotifier) {
        Ok(ExportOutcome::Exported(export)) => {
            export_buffer(export.bytes, out_buf, out_len);
            0
        }
        Ok(ExportOutcome::Skipped(SkipReason::Busy)) => {
            set_last_error("An export is already in progress");
            PAGECUT_BUSY
        }
        Ok(ExportOutcome::Skipped(SkipReason::NothingToExport)) => {
            set_last_error("Nothing to export");
            4
        }
        Err(e) => {
            set_last_error(&e.to_string());
            if e.is_resource_failure() {
                6
            } else {
                7
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `pagecut_export_pdf`.
///
/// # Safety
/// `buf` must have been returned by `pagecut_export_pdf`, and `len` must be
/// the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn pagecut_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a break array returned by `pagecut_plan_breaks`.
///
/// # Safety
/// `breaks` and `len` must come from the same `pagecut_plan_breaks` call.
#[no_mangle]
pub unsafe extern "C" fn pagecut_free_breaks(breaks: *mut f32, len: u32) {
    if !breaks.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(breaks, len as usize));
    }
}

/// Free a string returned by `pagecut_plan_json`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn pagecut_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `pagecut_*` call on the same
/// thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn pagecut_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn pagecut_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn plan_breaks_through_ffi() {
        let boundaries = [PagecutBoundary {
            top: 290.0,
            bottom: 320.0,
            is_heading: false,
        }];
        let mut out: *mut f32 = ptr::null_mut();
        let mut len = 0u32;
        let rc = unsafe {
            pagecut_plan_breaks(boundaries.as_ptr(), 1, 1.0, 1000.0, 300.0, &mut out, &mut len)
        };
        assert_eq!(rc, 0);
        let breaks = unsafe { slice::from_raw_parts(out, len as usize) }.to_vec();
        unsafe { pagecut_free_breaks(out, len) };
        assert_eq!(breaks, vec![290.0, 590.0, 890.0]);
    }

    #[test]
    fn non_positive_page_height_is_rejected() {
        let mut out: *mut f32 = ptr::null_mut();
        let mut len = 0u32;
        let rc =
            unsafe { pagecut_plan_breaks(ptr::null(), 0, 1.0, 1000.0, 0.0, &mut out, &mut len) };
        assert_eq!(rc, 2);
        let msg = unsafe { CStr::from_ptr(pagecut_last_error()) };
        assert!(msg.to_str().unwrap().contains("page_height"));
    }

    #[test]
    fn export_without_raster_reports_error() {
        let json = br#"{ "root": { "tag": "main", "rect": { "top": 0, "bottom": 10, "left": 0, "right": 10 } } }"#;
        let mut buf: *mut u8 = ptr::null_mut();
        let mut len = 0u32;
        let rc = unsafe {
            pagecut_export_pdf(json.as_ptr(), json.len() as u32, ptr::null(), 0, &mut buf, &mut len)
        };
        assert_eq!(rc, 6);
        assert!(buf.is_null());
    }

    #[test]
    fn version_is_nul_terminated() {
        let v = unsafe { CStr::from_ptr(pagecut_version()) };
        assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
