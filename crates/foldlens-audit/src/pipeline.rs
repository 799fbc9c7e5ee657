//! Staged render pipeline.
//!
//! One entry point per request: validate, then render under the
//! concurrency gate. Stage order and their watchdog policies are fixed;
//! the context is disposed on every exit path so a failed render never
//! leaks browser state into the next one.

use std::sync::Arc;
use std::time::Duration;

use foldlens_browser::{CdpClient, EngineManager, NetworkPolicy, PageSession, ScreenshotClip};
use foldlens_config::{RenderConfig, StageTimeouts};
use foldlens_protocols::{
    DebugArtifacts, DeviceProfile, OverlayDebug, RenderError, RenderOptions, RenderReport, Stage,
    StageTimings, UxAudit, resolve_device,
};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::fold::{self, FoldAuditOutcome, FoldFacts};
use crate::overlay::{self, OverlayOutcome};
use crate::program;
use crate::ssrf;
use crate::watchdog::{critical_stage, soft_stage};

/// Navigation readiness cap when watchdogs are off. Relaxed callers accept
/// slow pages, not permits held forever.
const RELAXED_NAV_CAP: Duration = Duration::from_secs(180);

pub struct RenderPipeline {
    engine: Arc<EngineManager>,
    timeouts: StageTimeouts,
    overlay_area_pct: f64,
    cta_cap_pct: f64,
    gate: Semaphore,
}

struct PageOutcome {
    png_base64: String,
    ux: UxAudit,
    debug: Option<DebugArtifacts>,
}

impl RenderPipeline {
    pub fn new(engine: Arc<EngineManager>, render: &RenderConfig) -> Self {
        Self {
            engine,
            timeouts: render.timeouts.clone(),
            overlay_area_pct: render.overlay_area_pct,
            cta_cap_pct: render.cta_cap_pct,
            gate: Semaphore::new(render.concurrency.max(1)),
        }
    }

    /// Request-shape checks that run before any resource is acquired:
    /// device lookup, URL shape, SSRF policy.
    pub async fn validate(
        &self,
        raw_url: &str,
        device_key: Option<&str>,
    ) -> Result<(Url, &'static DeviceProfile), RenderError> {
        let device = resolve_device(device_key)?;
        let url = ssrf::ensure_public_http_url(raw_url).await?;
        Ok((url, device))
    }

    /// Render and audit one page.
    ///
    /// `job_id` names the already-queued screenshot job for this render; it
    /// is echoed in the report so callers can poll for the stored copy.
    pub async fn render(
        &self,
        url: &Url,
        device: &'static DeviceProfile,
        job_id: Uuid,
        opts: RenderOptions,
    ) -> Result<RenderReport, RenderError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| RenderError::Internal("render gate closed".to_string()))?;

        let mut timings = StageTimings::new();
        let relaxed = opts.relaxed;

        info!(url = %url, device = device.key, relaxed, "Render started");

        let client = critical_stage(
            Stage::Launch,
            self.timeouts.budget(Stage::Launch),
            relaxed,
            &mut timings,
            async { Ok(self.engine.ensure().await?) },
        )
        .await?;

        let (context_id, page) = critical_stage(
            Stage::Context,
            self.timeouts.budget(Stage::Context),
            relaxed,
            &mut timings,
            self.setup_context(&client, device),
        )
        .await?;

        let result = self
            .run_page_stages(&page, device, url, opts, &mut timings)
            .await;

        // Unconditional cleanup; a cleanup failure is logged, never allowed
        // to shadow the render result.
        if let Err(e) = client.close_page(&page).await {
            warn!("Page close failed: {}", e);
        }
        if let Err(e) = client.dispose_browser_context(&context_id).await {
            warn!("Context dispose failed: {}", e);
        }

        let outcome = result?;
        let report = RenderReport {
            device: device.key.to_string(),
            device_meta: *device,
            png_base64: outcome.png_base64,
            screenshot_job_id: job_id,
            ux: outcome.ux,
            timings,
            debug: outcome.debug,
        };

        info!(
            url = %url,
            coverage = report.ux.fold_coverage_pct,
            total_ms = report.timings.total_ms(),
            "Render finished"
        );
        Ok(report)
    }

    /// Create the isolated context and a prepared page inside it. Partial
    /// failures dispose what was already created.
    async fn setup_context(
        &self,
        client: &Arc<CdpClient>,
        device: &DeviceProfile,
    ) -> Result<(String, PageSession), RenderError> {
        let context_id = client.create_browser_context().await?;

        let page = match client.create_page(&context_id).await {
            Ok(page) => page,
            Err(e) => {
                let _ = client.dispose_browser_context(&context_id).await;
                return Err(e.into());
            }
        };

        let prepared = async {
            page.emulate_device(device).await?;
            NetworkPolicy::install(&page).await
        }
        .await;

        if let Err(e) = prepared {
            let _ = client.close_page(&page).await;
            let _ = client.dispose_browser_context(&context_id).await;
            return Err(e.into());
        }

        Ok((context_id, page))
    }

    async fn run_page_stages(
        &self,
        page: &PageSession,
        device: &'static DeviceProfile,
        url: &Url,
        opts: RenderOptions,
        timings: &mut StageTimings,
    ) -> Result<PageOutcome, RenderError> {
        let relaxed = opts.relaxed;
        let t = &self.timeouts;
        let clip = ScreenshotClip::fold(device.width(), device.height());

        critical_stage(
            Stage::Navigate,
            t.budget(Stage::Navigate),
            relaxed,
            timings,
            async {
                // The inner readiness poll outlives the watchdog slightly so
                // a timeout surfaces as StageTimeout, not a poll error.
                let ready = if relaxed {
                    RELAXED_NAV_CAP
                } else {
                    t.budget(Stage::Navigate) + Duration::from_secs(1)
                };
                page.navigate(url.as_str(), ready).await?;
                check_response_status(page).await
            },
        )
        .await?;

        let settle_budget = t.budget(Stage::Settle);
        soft_stage(Stage::Settle, settle_budget, relaxed, timings, async {
            // The in-page wait undershoots the watchdog so it can finish
            // its two paint frames.
            let wait_ms = (settle_budget.as_millis() as u64).saturating_sub(200).max(50);
            page.evaluate(&program::settle(wait_ms)).await?;
            Ok(())
        })
        .await;

        // A failed probe is not a challenge; a positive one ends the render.
        let probe = soft_stage(
            Stage::BotCheck,
            t.budget(Stage::BotCheck),
            relaxed,
            timings,
            overlay::probe_bot_challenge(page),
        )
        .await;
        if let Some(probe) = probe {
            if probe.bot_suspected {
                return Err(RenderError::BotChallenge(
                    probe.matched.unwrap_or_else(|| "challenge markup".to_string()),
                ));
            }
        }

        let debug_overlay = opts.debug_overlay;
        let scanned = soft_stage(
            Stage::OverlayScan,
            t.budget(Stage::OverlayScan),
            relaxed,
            timings,
            async {
                // As-seen capture happens before anything is tagged, while
                // the overlays are still visible.
                let as_seen = if debug_overlay {
                    Some(page.screenshot_clip(clip).await?)
                } else {
                    None
                };
                let candidates = overlay::scan(page, device, self.overlay_area_pct).await?;
                Ok((candidates, as_seen))
            },
        )
        .await;

        let (mut overlay_outcome, as_seen) = match scanned {
            Some((candidates, as_seen)) => (
                OverlayOutcome {
                    candidates,
                    hidden: 0,
                    degraded: false,
                },
                as_seen,
            ),
            None => (OverlayOutcome::degraded(), None),
        };

        if !overlay_outcome.candidates.is_empty() {
            let hidden = soft_stage(
                Stage::OverlayHide,
                t.budget(Stage::OverlayHide),
                relaxed,
                timings,
                overlay::hide(page),
            )
            .await;
            overlay_outcome.hidden = hidden.unwrap_or(0);
        }

        let outcome = critical_stage(Stage::Audit, t.budget(Stage::Audit), relaxed, timings, async {
            debug!(program_version = program::PROGRAM_VERSION, "Evaluating fold audit");
            let value = page
                .evaluate(&program::fold_audit(
                    device.viewport.width,
                    device.viewport.height,
                ))
                .await?;
            let facts: FoldFacts = serde_json::from_value(value)?;
            Ok(fold::audit_fold(
                &facts,
                &overlay_outcome,
                device,
                self.cta_cap_pct,
            ))
        })
        .await?;

        let png_base64 = critical_stage(
            Stage::Screenshot,
            t.budget(Stage::Screenshot),
            relaxed,
            timings,
            async { Ok(page.screenshot_clip(clip).await?) },
        )
        .await?;

        let heatmap_png = if opts.debug_heatmap {
            soft_stage(Stage::Heatmap, t.budget(Stage::Heatmap), relaxed, timings, async {
                let draw =
                    program::heatmap(&outcome.grid, &outcome.rects, &overlay_outcome.rects())?;
                page.evaluate(&draw).await?;
                let png = page.screenshot_clip(clip).await?;
                page.evaluate(program::heatmap_remove()).await?;
                Ok(png)
            })
            .await
        } else {
            None
        };

        let debug = build_debug(opts, &overlay_outcome, as_seen, &outcome, heatmap_png);

        Ok(PageOutcome {
            png_base64,
            ux: outcome.ux,
            debug,
        })
    }
}

/// 401/403 on the main document is an auth wall, not auditable content.
async fn check_response_status(page: &PageSession) -> Result<(), RenderError> {
    let value = page
        .evaluate(
            "(() => { const e = performance.getEntriesByType('navigation'); \
             return e.length ? (e[0].responseStatus || 0) : 0; })()",
        )
        .await?;
    match value.as_u64().unwrap_or(0) {
        status @ (401 | 403) => Err(RenderError::Unauthorized(format!(
            "main document returned {}",
            status
        ))),
        _ => Ok(()),
    }
}

fn build_debug(
    opts: RenderOptions,
    overlay_outcome: &OverlayOutcome,
    as_seen: Option<String>,
    outcome: &FoldAuditOutcome,
    heatmap_png: Option<String>,
) -> Option<DebugArtifacts> {
    let mut artifacts = DebugArtifacts::default();
    if opts.debug_overlay {
        artifacts.overlay = Some(OverlayDebug {
            candidates: overlay_outcome.candidates.clone(),
            as_seen_png_base64: as_seen,
        });
    }
    if opts.debug_rects {
        artifacts.rects = Some(outcome.rects.clone());
    }
    if opts.debug_heatmap {
        artifacts.heatmap_png_base64 = heatmap_png;
    }
    if artifacts.is_empty() {
        None
    } else {
        Some(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use foldlens_protocols::{CoverageGrid, RectSets, default_device};

    use super::*;

    fn empty_outcome() -> FoldAuditOutcome {
        let device = default_device();
        FoldAuditOutcome {
            ux: UxAudit::default(),
            rects: RectSets::default(),
            grid: CoverageGrid::new(device.width(), device.height()),
        }
    }

    #[test]
    fn test_no_debug_flags_yields_no_artifacts() {
        let debug = build_debug(
            RenderOptions::default(),
            &OverlayOutcome::default(),
            None,
            &empty_outcome(),
            None,
        );
        assert!(debug.is_none());
    }

    #[test]
    fn test_overlay_flag_attaches_candidates_even_when_empty() {
        let opts = RenderOptions {
            debug_overlay: true,
            ..RenderOptions::default()
        };
        let debug = build_debug(
            opts,
            &OverlayOutcome::default(),
            Some("cGxhY2Vob2xkZXI=".to_string()),
            &empty_outcome(),
            None,
        )
        .unwrap();
        let overlay = debug.overlay.unwrap();
        assert!(overlay.candidates.is_empty());
        assert!(overlay.as_seen_png_base64.is_some());
        assert!(debug.rects.is_none());
    }

    #[test]
    fn test_heatmap_flag_without_capture_stays_empty() {
        // Heatmap requested but the soft stage degraded: nothing to attach.
        let opts = RenderOptions {
            debug_heatmap: true,
            ..RenderOptions::default()
        };
        let debug = build_debug(opts, &OverlayOutcome::default(), None, &empty_outcome(), None);
        assert!(debug.is_none());
    }

    #[test]
    fn test_rects_flag_attaches_rect_sets() {
        let opts = RenderOptions {
            debug_rects: true,
            ..RenderOptions::default()
        };
        let debug = build_debug(opts, &OverlayOutcome::default(), None, &empty_outcome(), None);
        assert!(debug.unwrap().rects.is_some());
    }
}
