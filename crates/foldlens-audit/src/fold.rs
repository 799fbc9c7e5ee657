//! Fold audit math.
//!
//! The in-page program reports raw classified rects and facts; everything
//! numeric happens here, against the device's CSS viewport, so the
//! heuristics stay unit-testable without a browser.

use foldlens_protocols::{CoverageGrid, DeviceProfile, Rect, RectSets, UxAudit};
use serde::Deserialize;

use crate::overlay::OverlayOutcome;

/// Minimum tap target edge in CSS pixels.
const TAP_TARGET_MIN_PX: f64 = 44.0;
/// Bottom-right square conventionally holding a chat bubble; small targets
/// fully inside it are not counted against the page.
const CHAT_EXCLUSION_PX: f64 = 120.0;
/// Glyph rects shrink by this margin before rasterization so antialiased
/// edges do not claim whole cells.
const GLYPH_ERODE_PX: f64 = 1.0;

/// Raw facts reported by the fold audit program.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldFacts {
    #[serde(default)]
    pub glyph_rects: Vec<Rect>,
    #[serde(default)]
    pub media_rects: Vec<Rect>,
    #[serde(default)]
    pub cta_rects: Vec<Rect>,
    #[serde(default)]
    pub hero_rects: Vec<Rect>,
    #[serde(default)]
    pub actionable_rects: Vec<Rect>,
    #[serde(default)]
    pub min_font_px: Option<f64>,
    #[serde(default)]
    pub max_font_px: Option<f64>,
    #[serde(default)]
    pub has_viewport_meta: bool,
    #[serde(default)]
    pub uses_safe_area_insets: bool,
}

/// The audit block plus the artifacts the debug surfaces reuse.
#[derive(Debug, Clone)]
pub struct FoldAuditOutcome {
    pub ux: UxAudit,
    /// Clipped, eroded, capped content rects by provenance.
    pub rects: RectSets,
    /// Post-hide content grid, also the heatmap source.
    pub grid: CoverageGrid,
}

/// Compute the full audit from program facts and the overlay pass.
pub fn audit_fold(
    facts: &FoldFacts,
    overlay: &OverlayOutcome,
    device: &DeviceProfile,
    cta_cap_pct: f64,
) -> FoldAuditOutcome {
    let vw = device.width();
    let vh = device.height();

    let clip_all =
        |rects: &[Rect]| -> Vec<Rect> { rects.iter().filter_map(|r| r.clip(vw, vh)).collect() };

    let glyphs: Vec<Rect> = facts
        .glyph_rects
        .iter()
        .filter_map(|r| r.clip(vw, vh))
        .filter_map(|r| r.erode(GLYPH_ERODE_PX))
        .collect();

    let media = clip_all(&facts.media_rects);
    let hero_backgrounds = clip_all(&facts.hero_rects);

    // One oversized button must not read as a covered fold.
    let cta_cap_area = device.fold_area() * (cta_cap_pct / 100.0);
    let ctas: Vec<Rect> = facts
        .cta_rects
        .iter()
        .filter_map(|r| r.clip(vw, vh))
        .map(|r| r.cap_area(cta_cap_area))
        .collect();

    let rects = RectSets {
        glyphs,
        media,
        ctas,
        hero_backgrounds,
    };

    let mut grid = CoverageGrid::new(vw, vh);
    for (_, rect) in rects.iter_tagged() {
        grid.add(rect);
    }
    let fold_coverage_pct = grid.coverage_pct();

    // What the visitor first sees: the same content with the overlays still
    // on top of it.
    let overlay_rects = overlay.rects();
    let mut pre_grid = grid.clone();
    pre_grid.add_all(&overlay_rects);
    let pre_hide_coverage_pct = pre_grid.coverage_pct();

    // Judged on the uncapped reported rects: the cap is a coverage device,
    // not a geometry correction.
    let first_cta_in_fold = facts.cta_rects.iter().any(|r| r.inside_viewport(vw, vh));

    let ux = UxAudit {
        first_cta_in_fold,
        fold_coverage_pct,
        pre_hide_coverage_pct,
        overlay_coverage_pct: overlay.coverage_pct(device),
        overlay_blockers: overlay.blockers(),
        overlay_scan_degraded: overlay.degraded,
        min_font_px: facts.min_font_px,
        max_font_px: facts.max_font_px,
        small_tap_targets: count_small_tap_targets(&facts.actionable_rects, vw, vh),
        has_viewport_meta: facts.has_viewport_meta,
        uses_safe_area_insets: facts.uses_safe_area_insets,
    };

    FoldAuditOutcome { ux, rects, grid }
}

/// Actionable elements below the minimum tap size, ignoring those fully
/// inside the chat-bubble corner and those outside the fold.
fn count_small_tap_targets(actionables: &[Rect], vw: f64, vh: f64) -> u32 {
    let chat_zone = Rect::new(
        vw - CHAT_EXCLUSION_PX,
        vh - CHAT_EXCLUSION_PX,
        CHAT_EXCLUSION_PX,
        CHAT_EXCLUSION_PX,
    );
    actionables
        .iter()
        .filter(|r| r.width > 0.0 && r.height > 0.0)
        .filter(|r| r.clip(vw, vh).is_some())
        .filter(|r| r.width < TAP_TARGET_MIN_PX || r.height < TAP_TARGET_MIN_PX)
        .filter(|r| !r.contained_in(&chat_zone))
        .count() as u32
}

#[cfg(test)]
#[path = "fold_tests.rs"]
mod tests;
