//! Wire types for the render surface: request, report, stages, timings.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::DeviceProfile;
use crate::geometry::{Rect, RectSets};

/// Body of `POST /render`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub url: String,
    #[serde(default)]
    pub device: Option<String>,
    /// Correlation key supplied by a fan-out caller; copied onto the
    /// screenshot job row.
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub debug_overlay: bool,
    #[serde(default)]
    pub debug_rects: bool,
    #[serde(default)]
    pub debug_heatmap: bool,
    /// Disables per-stage watchdogs for trusted batch callers.
    #[serde(default)]
    pub relaxed: bool,
}

impl RenderRequest {
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            debug_overlay: self.debug_overlay,
            debug_rects: self.debug_rects,
            debug_heatmap: self.debug_heatmap,
            relaxed: self.relaxed,
        }
    }
}

/// Behavior switches resolved from a [`RenderRequest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub debug_overlay: bool,
    pub debug_rects: bool,
    pub debug_heatmap: bool,
    pub relaxed: bool,
}

/// Pipeline stages, in execution order. Each runs under its own watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Launch,
    Context,
    Navigate,
    Settle,
    BotCheck,
    OverlayScan,
    OverlayHide,
    Audit,
    Screenshot,
    Heatmap,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Launch => "launch",
            Stage::Context => "context",
            Stage::Navigate => "navigate",
            Stage::Settle => "settle",
            Stage::BotCheck => "botCheck",
            Stage::OverlayScan => "overlayScan",
            Stage::OverlayHide => "overlayHide",
            Stage::Audit => "audit",
            Stage::Screenshot => "screenshot",
            Stage::Heatmap => "heatmap",
        }
    }

    /// True for stages whose timeout aborts the whole request. The rest
    /// degrade: their output is skipped and the render continues.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Stage::Launch | Stage::Context | Stage::Navigate | Stage::Audit | Stage::Screenshot
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock milliseconds per executed stage. Serializes as an object
/// keyed by stage name, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings(BTreeMap<Stage, u64>);

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.0.insert(stage, elapsed.as_millis() as u64);
    }

    pub fn get(&self, stage: Stage) -> Option<u64> {
        self.0.get(&stage).copied()
    }

    pub fn total_ms(&self) -> u64 {
        self.0.values().sum()
    }
}

/// The fold quality measurements for one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UxAudit {
    /// At least one qualifying call-to-action lies entirely in the fold.
    pub first_cta_in_fold: bool,
    /// Content coverage after overlay hiding, in percent.
    pub fold_coverage_pct: f64,
    /// Coverage of everything visible before hiding, overlays included.
    pub pre_hide_coverage_pct: f64,
    /// Coverage of tagged overlays alone.
    pub overlay_coverage_pct: f64,
    /// Number of tagged overlay nodes.
    pub overlay_blockers: u32,
    /// Set when the overlay scan timed out and its metrics were zeroed.
    pub overlay_scan_degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_font_px: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_font_px: Option<f64>,
    /// Actionable elements smaller than the minimum tap size.
    pub small_tap_targets: u32,
    pub has_viewport_meta: bool,
    /// Advisory: author styles reference `env(safe-area-inset-*)`.
    pub uses_safe_area_insets: bool,
}

/// Success body of `POST /render`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub device: String,
    pub device_meta: DeviceProfile,
    /// Clean post-hide screenshot of the fold.
    pub png_base64: String,
    /// Row id of the asynchronous capture job; its stored address
    /// materializes on the row once a worker completes it.
    pub screenshot_job_id: Uuid,
    pub ux: UxAudit,
    pub timings: StageTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugArtifacts>,
}

/// Why the overlay scan flagged a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayReason {
    /// Text matched the cookie/consent vocabulary.
    ConsentText,
    /// Wide actionable bar pinned to the bottom of the viewport.
    BottomBar,
    /// Fixed/sticky element covering a large share of the fold.
    LargeCover,
}

/// One node flagged by the overlay scan, as the in-page program reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayCandidate {
    pub rect: Rect,
    pub reason: OverlayReason,
    /// Short element descriptor (tag plus id/class hints) for inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Overlay-scan debug payload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDebug {
    pub candidates: Vec<OverlayCandidate>,
    /// Pre-hide capture of the page as a visitor first sees it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_seen_png_base64: Option<String>,
}

/// Extra payloads attached when debug flags are set.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugArtifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayDebug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rects: Option<RectSets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap_png_base64: Option<String>,
}

impl DebugArtifacts {
    pub fn is_empty(&self) -> bool {
        self.overlay.is_none() && self.rects.is_none() && self.heatmap_png_base64.is_none()
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
