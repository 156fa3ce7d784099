//! Pagination – chooses the raster rows at which one page ends and the next
//! begins.
//!
//! Handles:
//! - Uniform page height as the starting point for every break
//! - Pulling a break above any block that straddles it
//! - Keeping headings with the content that follows them
//! - A minimum page advance so conflicts never produce sliver pages

use serde::{Deserialize, Serialize};

use crate::boundary::ElementBoundary;

/// Gap (layout pixels) under a heading below which it counts as orphaned.
pub const HEADING_KEEP_THRESHOLD: f32 = 50.0;

/// Smallest distance (raster pixels) an adjusted break must advance.
pub const MIN_PAGE_ADVANCE: f32 = 100.0;

/// Inputs for break planning, all in raster-space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanParams {
    /// Nominal page height.
    pub page_height: f32,
    /// Height of the whole raster.
    pub total_height: f32,
    /// Heading-orphan distance, already scaled into raster space.
    pub heading_threshold: f32,
    /// Adjusted breaks closer than this to the previous one are discarded.
    pub min_page_advance: f32,
}

impl PlanParams {
    /// Default thresholds, with the heading gap scaled by the layout ratio.
    pub fn new(page_height: f32, total_height: f32, ratio: f32) -> Self {
        Self {
            page_height,
            total_height,
            heading_threshold: HEADING_KEEP_THRESHOLD * ratio,
            min_page_advance: MIN_PAGE_ADVANCE,
        }
    }

    fn is_plannable(&self) -> bool {
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        self.page_height.is_finite()
            && self.page_height > 0.0
            && self.total_height.is_finite()
            && non_negative(self.heading_threshold)
            && non_negative(self.min_page_advance)
    }
}

/// Running state of the per-break fold.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    safe: f32,
    conflict: bool,
}

/// Resolve one ideal break into the break that is actually committed.
///
/// `boundaries` must be sorted by `top`. `previous` is the last committed
/// break, or 0 for the first page.
pub fn resolve_break(
    boundaries: &[ElementBoundary],
    ideal: f32,
    previous: f32,
    params: &PlanParams,
) -> f32 {
    let start = Candidate {
        safe: ideal,
        conflict: false,
    };
    let folded = boundaries
        .iter()
        .fold(start, |c, b| apply_boundary(c, b, ideal, params));

    let mut safe = folded.safe;
    if folded.conflict && safe <= 0.0 {
        // Moving the break to the very top would empty the page.
        safe = ideal;
    }
    if safe <= previous + params.min_page_advance {
        safe = ideal;
    }
    safe
}

fn apply_boundary(
    mut c: Candidate,
    b: &ElementBoundary,
    ideal: f32,
    params: &PlanParams,
) -> Candidate {
    // Straddle: the block crosses the ideal line.
    if b.top < ideal && b.bottom > ideal {
        c.conflict = true;
        if b.top > c.safe - params.page_height {
            let floor = if c.safe == ideal { 0.0 } else { c.safe };
            c.safe = floor.max(b.top);
        }
    }

    // Orphan: a heading ending just above the ideal line.
    let orphaned =
        b.is_heading && b.bottom <= ideal && ideal - b.bottom < params.heading_threshold;
    if orphaned && (!c.conflict || b.top < c.safe) {
        c.safe = b.top;
        c.conflict = true;
    }

    c
}

/// Plan every break for a raster of `params.total_height` rows.
///
/// The result is strictly increasing and every value lies in
/// `(0, total_height)`. An empty result means a single page.
pub fn plan_breaks(boundaries: &[ElementBoundary], params: &PlanParams) -> Vec<f32> {
    let mut breaks = Vec::new();
    if !params.is_plannable() {
        log::warn!(
            "Refusing to plan breaks for page height {} / total {}",
            params.page_height,
            params.total_height
        );
        return breaks;
    }

    let mut ideal = params.page_height;
    while ideal < params.total_height {
        let previous = breaks.last().copied().unwrap_or(0.0);
        let safe = resolve_break(boundaries, ideal, previous, params);
        if safe != ideal {
            log::debug!("Break {} moved from {ideal:.1} to {safe:.1}", breaks.len());
        }
        breaks.push(safe);
        match next_ideal(safe, params.page_height) {
            Some(next) => ideal = next,
            None => {
                log::warn!(
                    "Page height {} no longer advances past {safe}; stopping after {} breaks",
                    params.page_height,
                    breaks.len()
                );
                break;
            }
        }
    }
    breaks
}

/// The next ideal break one page below `safe`, or `None` once `page_height`
/// is lost to `f32` rounding at that offset.
fn next_ideal(safe: f32, page_height: f32) -> Option<f32> {
    let next = safe + page_height;
    (next > safe).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: f32, total: f32) -> PlanParams {
        PlanParams::new(page, total, 1.0)
    }

    #[test]
    fn no_boundaries_gives_uniform_breaks() {
        assert_eq!(plan_breaks(&[], &params(300.0, 950.0)), vec![300.0, 600.0, 900.0]);
    }

    #[test]
    fn exact_multiple_does_not_add_empty_trailing_break() {
        assert_eq!(plan_breaks(&[], &params(300.0, 900.0)), vec![300.0, 600.0]);
    }

    #[test]
    fn short_document_has_no_breaks() {
        assert!(plan_breaks(&[], &params(300.0, 250.0)).is_empty());
    }

    #[test]
    fn straddling_block_pulls_break_to_its_top() {
        let b = [ElementBoundary::block(290.0, 320.0)];
        assert_eq!(
            plan_breaks(&b, &params(300.0, 1000.0)),
            vec![290.0, 590.0, 890.0]
        );
    }

    #[test]
    fn heading_near_page_bottom_moves_to_next_page() {
        let b = [ElementBoundary::heading(280.0, 295.0)];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 280.0);
    }

    #[test]
    fn heading_with_enough_room_below_stays() {
        let b = [ElementBoundary::heading(200.0, 250.0)];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 300.0);
    }

    #[test]
    fn heading_threshold_scales_with_ratio() {
        let b = [ElementBoundary::heading(500.0, 520.0)];
        // Gap of 80 raster px: orphaned at 2x (threshold 100), fine at 1x (50).
        let doubled = PlanParams::new(600.0, 2000.0, 2.0);
        assert_eq!(resolve_break(&b, 600.0, 0.0, &doubled), 500.0);
        let single = PlanParams::new(600.0, 2000.0, 1.0);
        assert_eq!(resolve_break(&b, 600.0, 0.0, &single), 600.0);
    }

    #[test]
    fn heading_then_straddle_keeps_the_straddle_top() {
        // Heading is processed first and pulls to 260; the later straddle
        // raises the candidate to its own top since it lies in the same page.
        let b = [
            ElementBoundary::heading(260.0, 270.0),
            ElementBoundary::block(280.0, 320.0),
        ];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 280.0);
    }

    #[test]
    fn straddle_and_heading_sharing_a_top_agree() {
        let b = [
            ElementBoundary::block(280.0, 320.0),
            ElementBoundary::heading(280.0, 295.0),
        ];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 280.0);
    }

    #[test]
    fn consecutive_orphan_headings_move_together() {
        let b = [
            ElementBoundary::heading(200.0, 260.0),
            ElementBoundary::heading(265.0, 290.0),
        ];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 200.0);
    }

    #[test]
    fn nested_straddles_take_the_innermost_top() {
        let b = [
            ElementBoundary::block(150.0, 350.0),
            ElementBoundary::block(250.0, 320.0),
        ];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 250.0);
    }

    #[test]
    fn heading_at_page_start_falls_back_to_ideal() {
        let b = [ElementBoundary::heading(0.0, 280.0)];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 300.0);
    }

    #[test]
    fn sliver_page_falls_back_to_ideal() {
        // Moving to 50 would leave a 50-row first page. The break stays at
        // 300 and cuts the block: the documented exception to no-straddle.
        let b = [ElementBoundary::block(50.0, 320.0)];
        assert_eq!(resolve_break(&b, 300.0, 0.0, &params(300.0, 1000.0)), 300.0);
    }

    #[test]
    fn min_advance_is_measured_from_previous_break() {
        let b = [ElementBoundary::block(640.0, 720.0)];
        assert_eq!(resolve_break(&b, 700.0, 400.0, &params(300.0, 1000.0)), 640.0);
        assert_eq!(resolve_break(&b, 700.0, 550.0, &params(300.0, 1000.0)), 700.0);
    }

    #[test]
    fn degenerate_page_height_plans_nothing() {
        assert!(plan_breaks(&[], &params(0.0, 1000.0)).is_empty());
        assert!(plan_breaks(&[], &params(f32::NAN, 1000.0)).is_empty());
    }

    #[test]
    fn invalid_thresholds_plan_nothing() {
        let mut p = params(300.0, 1000.0);
        p.min_page_advance = f32::NAN;
        assert!(plan_breaks(&[], &p).is_empty());
        p.min_page_advance = -1000.0;
        assert!(plan_breaks(&[], &p).is_empty());
        let mut p = params(300.0, 1000.0);
        p.heading_threshold = f32::INFINITY;
        assert!(plan_breaks(&[], &p).is_empty());
    }

    #[test]
    fn page_height_lost_to_rounding_stops_advancing() {
        assert_eq!(next_ideal(16384.0, 0.0005), None);
        assert_eq!(next_ideal(16777216.0, 1.0), None);
        assert_eq!(next_ideal(100.0, 0.5), Some(100.5));
    }

    #[test]
    fn tiny_page_height_terminates_with_increasing_breaks() {
        // 2^24 + 1 rounds back to 2^24 in f32.
        let breaks = plan_breaks(&[], &params(1.0, 16_777_300.0));
        assert_eq!(breaks.last().copied(), Some(16_777_216.0));
        assert!(breaks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn planning_is_repeatable() {
        let b = [
            ElementBoundary::block(120.0, 180.0),
            ElementBoundary::heading(270.0, 290.0),
            ElementBoundary::block(560.0, 640.0),
        ];
        let p = params(300.0, 2000.0);
        assert_eq!(plan_breaks(&b, &p), plan_breaks(&b, &p));
    }
}
