//! Mobile device emulation.

use foldlens_protocols::DeviceProfile;
use serde_json::json;

use crate::cdp::{CdpError, PageSession};

impl PageSession {
    /// Apply a device profile: metrics, user agent, touch.
    ///
    /// Must run before navigation so media queries and client-hint sniffing
    /// see the mobile values from the first request.
    pub async fn emulate_device(&self, device: &DeviceProfile) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": device.viewport.width,
                "height": device.viewport.height,
                "deviceScaleFactor": device.pixel_ratio,
                "mobile": device.is_mobile,
            })),
        )
        .await?;

        self.call(
            "Emulation.setUserAgentOverride",
            Some(json!({"userAgent": device.user_agent})),
        )
        .await?;

        self.call(
            "Emulation.setTouchEmulationEnabled",
            Some(json!({
                "enabled": device.has_touch,
                "maxTouchPoints": if device.has_touch { 5 } else { 0 },
            })),
        )
        .await?;

        Ok(())
    }
}
