//! Overlay detection and hiding.
//!
//! Phase one tags dialog-like fixed/sticky elements in place and reports
//! their rects; phase two injects a single hide rule targeting the tag, so
//! only nodes the scan flagged disappear. Also home to the bot-challenge
//! probe, which runs against the same page right before the scan.

use foldlens_browser::PageSession;
use foldlens_protocols::{CoverageGrid, DeviceProfile, OverlayCandidate, Rect, RenderError};
use serde::Deserialize;
use tracing::debug;

use crate::program;

/// Result of the two-phase overlay pass.
#[derive(Debug, Clone, Default)]
pub struct OverlayOutcome {
    pub candidates: Vec<OverlayCandidate>,
    /// Nodes the hide rule affected.
    pub hidden: u64,
    /// The scan stage degraded; candidate metrics are zeroed.
    pub degraded: bool,
}

impl OverlayOutcome {
    /// Outcome representing a scan that never completed.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.candidates.iter().map(|c| c.rect).collect()
    }

    pub fn blockers(&self) -> u32 {
        self.candidates.len() as u32
    }

    /// Grid-rasterized share of the fold the candidates cover.
    pub fn coverage_pct(&self, device: &DeviceProfile) -> f64 {
        if self.candidates.is_empty() {
            return 0.0;
        }
        let mut grid = CoverageGrid::new(device.width(), device.height());
        for candidate in &self.candidates {
            grid.add(&candidate.rect);
        }
        grid.coverage_pct()
    }
}

/// Run the scan program against the page. Matching nodes come back tagged
/// with `data-foldlens-overlay="1"`.
pub async fn scan(
    session: &PageSession,
    device: &DeviceProfile,
    overlay_area_pct: f64,
) -> Result<Vec<OverlayCandidate>, RenderError> {
    let source = program::overlay_scan(
        device.viewport.width,
        device.viewport.height,
        overlay_area_pct,
    );
    let value = session.evaluate(&source).await?;
    let candidates: Vec<OverlayCandidate> = serde_json::from_value(value)?;
    debug!("Overlay scan tagged {} candidate(s)", candidates.len());
    Ok(candidates)
}

/// Inject the hide rule; returns how many tagged nodes it affects.
pub async fn hide(session: &PageSession) -> Result<u64, RenderError> {
    let value = session.evaluate(program::overlay_hide()).await?;
    Ok(value.as_u64().unwrap_or(0))
}

/// What the bot-challenge probe reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotProbe {
    pub bot_suspected: bool,
    #[serde(default)]
    pub matched: Option<String>,
}

pub async fn probe_bot_challenge(session: &PageSession) -> Result<BotProbe, RenderError> {
    let value = session.evaluate(&program::bot_check()).await?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use foldlens_protocols::{OverlayReason, default_device};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_scan_payload_deserializes() {
        let payload = json!([
            {
                "rect": {"x": 0.0, "y": 700.0, "width": 393.0, "height": 152.0},
                "reason": "bottom_bar",
                "selector": "div#cmp-banner"
            },
            {
                "rect": {"x": 20.0, "y": 100.0, "width": 350.0, "height": 400.0},
                "reason": "consent_text"
            }
        ]);
        let candidates: Vec<OverlayCandidate> = serde_json::from_value(payload).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].reason, OverlayReason::BottomBar);
        assert_eq!(candidates[0].selector.as_deref(), Some("div#cmp-banner"));
        assert_eq!(candidates[1].reason, OverlayReason::ConsentText);
        assert!(candidates[1].selector.is_none());
    }

    #[test]
    fn test_outcome_coverage_counts_candidate_rects() {
        let device = default_device();
        let outcome = OverlayOutcome {
            candidates: vec![OverlayCandidate {
                rect: Rect::new(0.0, 0.0, device.width(), device.height()),
                reason: OverlayReason::LargeCover,
                selector: None,
            }],
            hidden: 1,
            degraded: false,
        };
        assert_eq!(outcome.blockers(), 1);
        assert!((outcome.coverage_pct(device) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_outcome_covers_nothing() {
        let outcome = OverlayOutcome::default();
        assert_eq!(outcome.coverage_pct(default_device()), 0.0);
        assert_eq!(outcome.blockers(), 0);
    }

    #[test]
    fn test_degraded_outcome_is_flagged_and_empty() {
        let outcome = OverlayOutcome::degraded();
        assert!(outcome.degraded);
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.hidden, 0);
    }

    #[test]
    fn test_bot_probe_deserializes_both_shapes() {
        let hit: BotProbe =
            serde_json::from_value(json!({"botSuspected": true, "matched": "just a moment"}))
                .unwrap();
        assert!(hit.bot_suspected);
        assert_eq!(hit.matched.as_deref(), Some("just a moment"));

        let miss: BotProbe =
            serde_json::from_value(json!({"botSuspected": false, "matched": null})).unwrap();
        assert!(!miss.bot_suspected);
        assert!(miss.matched.is_none());
    }
}
