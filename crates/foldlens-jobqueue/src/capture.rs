//! Page capture for leased jobs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use foldlens_audit::overlay;
use foldlens_browser::{EngineManager, NetworkPolicy, ScreenshotClip};
use foldlens_protocols::{DeviceProfile, RenderError};
use tracing::{debug, warn};

use crate::error::QueueError;

/// Produces the screenshot bytes for one claimed job.
#[async_trait]
pub trait JobRenderer: Send + Sync {
    async fn capture(&self, url: &str, device: &DeviceProfile) -> Result<Vec<u8>, QueueError>;
}

/// The worker trades audit fidelity for throughput: no settle stage, no
/// bot probe, just a short pause before the overlay pass.
const SETTLE_PAUSE: Duration = Duration::from_millis(500);

/// Captures with the shared engine: navigate, hide overlays, screenshot.
pub struct EngineJobRenderer {
    engine: Arc<EngineManager>,
    navigate_timeout: Duration,
    overlay_area_pct: f64,
}

impl EngineJobRenderer {
    pub fn new(
        engine: Arc<EngineManager>,
        navigate_timeout: Duration,
        overlay_area_pct: f64,
    ) -> Self {
        Self {
            engine,
            navigate_timeout,
            overlay_area_pct,
        }
    }

    async fn render(&self, url: &str, device: &DeviceProfile) -> Result<String, RenderError> {
        let client = self.engine.ensure().await?;
        let context_id = client.create_browser_context().await?;
        let page = match client.create_page(&context_id).await {
            Ok(page) => page,
            Err(e) => {
                let _ = client.dispose_browser_context(&context_id).await;
                return Err(e.into());
            }
        };

        let shot = async {
            page.emulate_device(device).await?;
            NetworkPolicy::install(&page).await?;
            page.navigate(url, self.navigate_timeout).await?;
            tokio::time::sleep(SETTLE_PAUSE).await;

            match overlay::scan(&page, device, self.overlay_area_pct).await {
                Ok(candidates) if !candidates.is_empty() => {
                    if let Err(e) = overlay::hide(&page).await {
                        debug!("Overlay hide skipped: {}", e);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Overlay scan skipped: {}", e),
            }

            page.screenshot_clip(ScreenshotClip::fold(device.width(), device.height()))
                .await
                .map_err(RenderError::from)
        }
        .await;

        if let Err(e) = client.close_page(&page).await {
            warn!("Worker page cleanup failed: {}", e);
        }
        if let Err(e) = client.dispose_browser_context(&context_id).await {
            warn!("Worker context cleanup failed: {}", e);
        }
        shot
    }
}

#[async_trait]
impl JobRenderer for EngineJobRenderer {
    async fn capture(&self, url: &str, device: &DeviceProfile) -> Result<Vec<u8>, QueueError> {
        let png_base64 = self
            .render(url, device)
            .await
            .map_err(|e| QueueError::Render(e.to_string()))?;
        BASE64
            .decode(png_base64.as_bytes())
            .map_err(|e| QueueError::Render(format!("undecodable screenshot payload: {e}")))
    }
}
