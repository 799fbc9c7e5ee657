//! Browser engine lifecycle.
//!
//! One Chrome process and one CDP connection serve the whole service.
//! [`EngineManager::ensure`] hands out the shared client, launching or
//! relaunching the browser as needed; per-render isolation comes from
//! browser contexts, not processes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use foldlens_protocols::RenderError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cdp::{CdpClient, CdpError};

/// How the browser is found and started.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit Chrome binary path; probed locations otherwise.
    pub chrome_path: Option<String>,
    /// DevTools debug port on localhost.
    pub debug_port: u16,
    /// Run with `--headless=new`.
    pub headless: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            debug_port: 9222,
            headless: true,
        }
    }
}

impl EngineConfig {
    /// HTTP endpoint of the DevTools interface.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.debug_port)
    }

    /// Profile directory, keyed by port so parallel instances never share.
    fn profile_dir(&self) -> PathBuf {
        std::env::temp_dir().join(format!("foldlens-chrome-{}", self.debug_port))
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Chrome not found: {0}")]
    ChromeNotFound(String),

    #[error("Chrome launch failed: {0}")]
    LaunchFailed(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),
}

impl From<EngineError> for RenderError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cdp(e) => e.into(),
            other => RenderError::Engine(other.to_string()),
        }
    }
}

/// Owns the Chrome process and the memoized CDP client.
pub struct EngineManager {
    config: EngineConfig,
    client: tokio::sync::Mutex<Option<Arc<CdpClient>>>,
    chrome_process: tokio::sync::Mutex<Option<tokio::process::Child>>,
}

impl EngineManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            client: tokio::sync::Mutex::new(None),
            chrome_process: tokio::sync::Mutex::new(None),
        }
    }

    /// Get the shared client, launching Chrome if necessary.
    ///
    /// The slot lock is held across the whole launch so concurrent callers
    /// wait on one launch instead of racing to spawn their own browser.
    pub async fn ensure(&self) -> Result<Arc<CdpClient>, EngineError> {
        let mut slot = self.client.lock().await;

        if let Some(client) = slot.as_ref() {
            if client.is_alive() {
                return Ok(client.clone());
            }
            warn!("Browser connection lost; relaunching");
            *slot = None;
        }

        // An externally managed Chrome on the debug port is fine too.
        if let Ok(client) = CdpClient::connect(&self.config.endpoint()).await {
            info!("Attached to running browser: {}", client.browser_version());
            let client = Arc::new(client);
            *slot = Some(client.clone());
            return Ok(client);
        }

        self.launch_chrome().await?;

        let client = Arc::new(CdpClient::connect(&self.config.endpoint()).await?);
        info!("Browser ready: {}", client.browser_version());
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn launch_chrome(&self) -> Result<(), EngineError> {
        let chrome_path = self.find_chrome()?;
        info!("Launching {} on port {}", chrome_path, self.config.debug_port);

        let mut cmd = tokio::process::Command::new(&chrome_path);
        cmd.arg(format!("--remote-debugging-port={}", self.config.debug_port))
            .arg(format!(
                "--user-data-dir={}",
                self.config.profile_dir().display()
            ))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--hide-scrollbars")
            .arg("--mute-audio")
            .arg("--force-color-profile=srgb")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        if self.config.headless {
            cmd.arg("--headless=new");
        }

        let child = cmd
            .spawn()
            .map_err(|e| EngineError::LaunchFailed(format!("{}: {}", chrome_path, e)))?;
        *self.chrome_process.lock().await = Some(child);

        // Wait for the DevTools endpoint to answer.
        let endpoint = format!("{}/json/version", self.config.endpoint());
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        loop {
            match reqwest::get(&endpoint).await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("DevTools endpoint up at {}", endpoint);
                    return Ok(());
                }
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::LaunchFailed(
                    "DevTools endpoint did not come up within 15s".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    fn find_chrome(&self) -> Result<String, EngineError> {
        if let Some(path) = &self.config.chrome_path {
            if std::path::Path::new(path).exists() {
                return Ok(path.clone());
            }
            return Err(EngineError::ChromeNotFound(format!(
                "configured path {} does not exist",
                path
            )));
        }

        #[cfg(target_os = "linux")]
        let candidates = [
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "macos")]
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];

        #[cfg(target_os = "windows")]
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        candidates
            .iter()
            .find(|p| std::path::Path::new(p).exists())
            .map(|p| p.to_string())
            .ok_or_else(|| {
                EngineError::ChromeNotFound(
                    "no Chrome or Chromium in the usual locations; set browser.chrome_path"
                        .to_string(),
                )
            })
    }

    /// Drop the client and kill the browser process we spawned.
    pub async fn shutdown(&self) {
        self.client.lock().await.take();
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
            info!("Browser process stopped");
        }
    }
}
