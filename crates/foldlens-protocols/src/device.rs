//! Mobile device profiles for viewport emulation.
//!
//! The registry is a closed, static table: requests select a profile by key
//! and unknown keys are rejected before any engine resource is touched.

use serde::Serialize;

use crate::error::RenderError;

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// An emulated mobile device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub key: &'static str,
    pub label: &'static str,
    pub viewport: Viewport,
    pub pixel_ratio: f64,
    pub user_agent: &'static str,
    pub is_mobile: bool,
    pub has_touch: bool,
}

impl DeviceProfile {
    /// Viewport width as a float, for geometry math.
    pub fn width(&self) -> f64 {
        f64::from(self.viewport.width)
    }

    /// Viewport height as a float, for geometry math.
    pub fn height(&self) -> f64 {
        f64::from(self.viewport.height)
    }

    /// Fold area in CSS pixels.
    pub fn fold_area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Key of the profile used when a request names no device.
pub const DEFAULT_DEVICE_KEY: &str = "iphone_15";

const DEVICES: [DeviceProfile; 5] = [
    DeviceProfile {
        key: "iphone_15",
        label: "iPhone 15",
        viewport: Viewport { width: 393, height: 852 },
        pixel_ratio: 3.0,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
                     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 \
                     Mobile/15E148 Safari/604.1",
        is_mobile: true,
        has_touch: true,
    },
    DeviceProfile {
        key: "iphone_se",
        label: "iPhone SE",
        viewport: Viewport { width: 375, height: 667 },
        pixel_ratio: 2.0,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) \
                     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 \
                     Mobile/15E148 Safari/604.1",
        is_mobile: true,
        has_touch: true,
    },
    DeviceProfile {
        key: "pixel_8",
        label: "Pixel 8",
        viewport: Viewport { width: 412, height: 915 },
        pixel_ratio: 2.625,
        user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
                     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 \
                     Mobile Safari/537.36",
        is_mobile: true,
        has_touch: true,
    },
    DeviceProfile {
        key: "galaxy_s23",
        label: "Galaxy S23",
        viewport: Viewport { width: 360, height: 780 },
        pixel_ratio: 3.0,
        user_agent: "Mozilla/5.0 (Linux; Android 14; SM-S911B) \
                     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 \
                     Mobile Safari/537.36",
        is_mobile: true,
        has_touch: true,
    },
    DeviceProfile {
        key: "ipad_mini",
        label: "iPad Mini",
        viewport: Viewport { width: 744, height: 1133 },
        pixel_ratio: 2.0,
        user_agent: "Mozilla/5.0 (iPad; CPU OS 17_4 like Mac OS X) \
                     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 \
                     Mobile/15E148 Safari/604.1",
        is_mobile: true,
        has_touch: true,
    },
];

/// All registered profiles, in registry order.
pub fn all_devices() -> &'static [DeviceProfile] {
    &DEVICES
}

/// Case-insensitive lookup by key. Surrounding whitespace is ignored.
pub fn find_device(key: &str) -> Option<&'static DeviceProfile> {
    let wanted = key.trim();
    DEVICES.iter().find(|d| d.key.eq_ignore_ascii_case(wanted))
}

/// The profile selected when a request names no device.
pub fn default_device() -> &'static DeviceProfile {
    &DEVICES[0]
}

/// Resolves an optional request key to a profile.
///
/// `None` and blank strings select the default profile. An unknown key is an
/// input error whose message lists the available keys.
pub fn resolve_device(key: Option<&str>) -> Result<&'static DeviceProfile, RenderError> {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        None => Ok(default_device()),
        Some(k) => find_device(k).ok_or_else(|| {
            let known: Vec<&str> = DEVICES.iter().map(|d| d.key).collect();
            RenderError::input(
                "unknown_device",
                format!("unknown device '{}'; known devices: {}", k, known.join(", ")),
            )
        }),
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
