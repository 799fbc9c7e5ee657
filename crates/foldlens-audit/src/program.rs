//! In-page audit programs.
//!
//! The JavaScript sources are embedded at compile time and parameterized by
//! plain placeholder substitution, so each render evaluates one
//! self-contained expression. Heuristic changes bump [`PROGRAM_VERSION`];
//! the version is logged with every audit so reports can be compared across
//! deployments.

use foldlens_protocols::{CoverageGrid, GRID_COLS, GRID_ROWS, Rect, RectSets, RenderError};
use serde::Serialize;

use crate::lexicon;

/// Version of the in-page heuristics, independent of the crate version.
pub const PROGRAM_VERSION: &str = "1.3";

const FOLD_AUDIT_SRC: &str = include_str!("js/fold_audit.js");
const OVERLAY_SCAN_SRC: &str = include_str!("js/overlay_scan.js");
const OVERLAY_HIDE_SRC: &str = include_str!("js/overlay_hide.js");
const BOT_CHECK_SRC: &str = include_str!("js/bot_check.js");
const SETTLE_SRC: &str = include_str!("js/settle.js");
const HEATMAP_SRC: &str = include_str!("js/heatmap.js");

const HEATMAP_REMOVE_SRC: &str =
    "(() => { const el = document.getElementById('foldlens-heatmap'); if (el) el.remove(); return true; })()";

fn json_list(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// The fold audit program for a viewport.
pub fn fold_audit(viewport_w: u32, viewport_h: u32) -> String {
    FOLD_AUDIT_SRC
        .replace("__VIEWPORT_W__", &viewport_w.to_string())
        .replace("__VIEWPORT_H__", &viewport_h.to_string())
        .replace("__CTA_PHRASES__", &json_list(lexicon::CTA_PHRASES))
        .replace("__CTA_HREF_TOKENS__", &json_list(lexicon::CTA_HREF_TOKENS))
        .replace("__NAV_TOGGLE_TOKENS__", &json_list(lexicon::NAV_TOGGLE_TOKENS))
}

/// The overlay scan program. `overlay_area_pct` is the in-fold area share
/// above which a fixed/sticky element counts as a large cover.
pub fn overlay_scan(viewport_w: u32, viewport_h: u32, overlay_area_pct: f64) -> String {
    OVERLAY_SCAN_SRC
        .replace("__VIEWPORT_W__", &viewport_w.to_string())
        .replace("__VIEWPORT_H__", &viewport_h.to_string())
        .replace("__OVERLAY_AREA_PCT__", &format!("{:.2}", overlay_area_pct))
        .replace("__CONSENT_TOKENS__", &json_list(lexicon::CONSENT_TOKENS))
}

/// Injects the hide rule for tagged overlays; returns the tagged count.
pub fn overlay_hide() -> &'static str {
    OVERLAY_HIDE_SRC
}

/// The bot challenge probe.
pub fn bot_check() -> String {
    BOT_CHECK_SRC.replace("__BOT_TOKENS__", &json_list(lexicon::BOT_CHALLENGE_TOKENS))
}

/// Waits for fonts (up to `budget_ms`) plus two paint frames.
pub fn settle(budget_ms: u64) -> String {
    SETTLE_SRC.replace("__SETTLE_BUDGET_MS__", &budget_ms.to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapData<'a> {
    cols: usize,
    rows: usize,
    cells: &'a [bool],
    sets: &'a RectSets,
    overlays: &'a [Rect],
}

/// Draws the coverage grid plus per-category rect outlines as a fixed
/// canvas. Removed again with [`heatmap_remove`] after the capture.
pub fn heatmap(
    grid: &CoverageGrid,
    sets: &RectSets,
    overlays: &[Rect],
) -> Result<String, RenderError> {
    let data = HeatmapData {
        cols: GRID_COLS,
        rows: GRID_ROWS,
        cells: grid.cells(),
        sets,
        overlays,
    };
    let json = serde_json::to_string(&data)?;
    Ok(HEATMAP_SRC.replace("__HEATMAP_DATA__", &json))
}

pub fn heatmap_remove() -> &'static str {
    HEATMAP_REMOVE_SRC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_audit_substitutes_everything() {
        let program = fold_audit(393, 852);
        assert!(!program.contains("__"), "unsubstituted placeholder left");
        assert!(program.contains("const VW = 393;"));
        assert!(program.contains("const VH = 852;"));
        assert!(program.contains("add to cart"));
        assert!(program.contains("in den warenkorb"));
    }

    #[test]
    fn test_overlay_scan_substitutes_everything() {
        let program = overlay_scan(360, 780, 20.0);
        assert!(!program.contains("__"));
        assert!(program.contains("const AREA_PCT = 20.00;"));
        assert!(program.contains("alle akzeptieren"));
        assert!(program.contains("data-foldlens-overlay"));
    }

    #[test]
    fn test_bot_check_embeds_tokens() {
        let program = bot_check();
        assert!(!program.contains("__BOT_TOKENS__"));
        assert!(program.contains("just a moment"));
        assert!(program.contains("attention required"));
    }

    #[test]
    fn test_settle_embeds_budget() {
        let program = settle(2800);
        assert!(program.contains("const budget = 2800;"));
    }

    #[test]
    fn test_heatmap_embeds_grid_dimensions() {
        let grid = CoverageGrid::new(393.0, 852.0);
        let sets = RectSets::default();
        let program = heatmap(&grid, &sets, &[]).unwrap();
        assert!(!program.contains("__HEATMAP_DATA__"));
        assert!(program.contains("\"cols\":24"));
        assert!(program.contains("\"rows\":32"));
        assert!(program.contains("heroBackgrounds"));
    }

    #[test]
    fn test_hide_program_targets_only_tagged_nodes() {
        let program = overlay_hide();
        assert!(program.contains("[data-foldlens-overlay=\"1\"]"));
        assert!(program.contains("display: none !important"));
    }

    #[test]
    fn test_program_version_is_set() {
        assert!(!PROGRAM_VERSION.is_empty());
    }
}
