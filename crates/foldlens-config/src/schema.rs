//! Configuration schema definitions.

use std::time::Duration;

use foldlens_protocols::Stage;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

/// Bearer-token authentication. `next_token` is also accepted so tokens can
/// be rotated without a restart window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary; auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            debug_port: default_debug_port(),
            headless: default_headless(),
        }
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_headless() -> bool {
    true
}

/// Render pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Concurrent renders per process.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub timeouts: StageTimeouts,

    /// In-fold area share (percent) above which a fixed/sticky element is
    /// tagged as an overlay.
    #[serde(default = "default_overlay_area_pct")]
    pub overlay_area_pct: f64,

    /// Cap (percent of fold area) on a single CTA's coverage contribution.
    #[serde(default = "default_cta_cap_pct")]
    pub cta_cap_pct: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeouts: StageTimeouts::default(),
            overlay_area_pct: default_overlay_area_pct(),
            cta_cap_pct: default_cta_cap_pct(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_overlay_area_pct() -> f64 {
    20.0
}

fn default_cta_cap_pct() -> f64 {
    6.0
}

/// Per-stage watchdog budgets in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_launch_ms")]
    pub launch_ms: u64,
    #[serde(default = "default_context_ms")]
    pub context_ms: u64,
    #[serde(default = "default_navigate_ms")]
    pub navigate_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_bot_check_ms")]
    pub bot_check_ms: u64,
    #[serde(default = "default_overlay_scan_ms")]
    pub overlay_scan_ms: u64,
    #[serde(default = "default_overlay_hide_ms")]
    pub overlay_hide_ms: u64,
    #[serde(default = "default_audit_ms")]
    pub audit_ms: u64,
    #[serde(default = "default_screenshot_ms")]
    pub screenshot_ms: u64,
    #[serde(default = "default_heatmap_ms")]
    pub heatmap_ms: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            launch_ms: default_launch_ms(),
            context_ms: default_context_ms(),
            navigate_ms: default_navigate_ms(),
            settle_ms: default_settle_ms(),
            bot_check_ms: default_bot_check_ms(),
            overlay_scan_ms: default_overlay_scan_ms(),
            overlay_hide_ms: default_overlay_hide_ms(),
            audit_ms: default_audit_ms(),
            screenshot_ms: default_screenshot_ms(),
            heatmap_ms: default_heatmap_ms(),
        }
    }
}

fn default_launch_ms() -> u64 {
    30_000
}

fn default_context_ms() -> u64 {
    5_000
}

fn default_navigate_ms() -> u64 {
    25_000
}

fn default_settle_ms() -> u64 {
    3_000
}

fn default_bot_check_ms() -> u64 {
    3_000
}

fn default_overlay_scan_ms() -> u64 {
    6_000
}

fn default_overlay_hide_ms() -> u64 {
    3_000
}

fn default_audit_ms() -> u64 {
    10_000
}

fn default_screenshot_ms() -> u64 {
    15_000
}

fn default_heatmap_ms() -> u64 {
    5_000
}

impl StageTimeouts {
    pub fn budget_ms(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Launch => self.launch_ms,
            Stage::Context => self.context_ms,
            Stage::Navigate => self.navigate_ms,
            Stage::Settle => self.settle_ms,
            Stage::BotCheck => self.bot_check_ms,
            Stage::OverlayScan => self.overlay_scan_ms,
            Stage::OverlayHide => self.overlay_hide_ms,
            Stage::Audit => self.audit_ms,
            Stage::Screenshot => self.screenshot_ms,
            Stage::Heatmap => self.heatmap_ms,
        }
    }

    pub fn budget(&self, stage: Stage) -> Duration {
        Duration::from_millis(self.budget_ms(stage))
    }

    fn set(&mut self, stage: Stage, ms: u64) {
        match stage {
            Stage::Launch => self.launch_ms = ms,
            Stage::Context => self.context_ms = ms,
            Stage::Navigate => self.navigate_ms = ms,
            Stage::Settle => self.settle_ms = ms,
            Stage::BotCheck => self.bot_check_ms = ms,
            Stage::OverlayScan => self.overlay_scan_ms = ms,
            Stage::OverlayHide => self.overlay_hide_ms = ms,
            Stage::Audit => self.audit_ms = ms,
            Stage::Screenshot => self.screenshot_ms = ms,
            Stage::Heatmap => self.heatmap_ms = ms,
        }
    }

    /// Environment variable suffix for a stage, e.g. `OVERLAY_SCAN` in
    /// `FOLDLENS_TIMEOUT_OVERLAY_SCAN_MS`.
    fn env_suffix(stage: Stage) -> &'static str {
        match stage {
            Stage::Launch => "LAUNCH",
            Stage::Context => "CONTEXT",
            Stage::Navigate => "NAVIGATE",
            Stage::Settle => "SETTLE",
            Stage::BotCheck => "BOT_CHECK",
            Stage::OverlayScan => "OVERLAY_SCAN",
            Stage::OverlayHide => "OVERLAY_HIDE",
            Stage::Audit => "AUDIT",
            Stage::Screenshot => "SCREENSHOT",
            Stage::Heatmap => "HEATMAP",
        }
    }
}

const ALL_STAGES: [Stage; 10] = [
    Stage::Launch,
    Stage::Context,
    Stage::Navigate,
    Stage::Settle,
    Stage::BotCheck,
    Stage::OverlayScan,
    Stage::OverlayHide,
    Stage::Audit,
    Stage::Screenshot,
    Stage::Heatmap,
];

/// Screenshot job queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// SQLite database path. Tilde-expanded.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Worker sleep when the queue is empty.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Worker backoff after a failed lease call.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_attempts: default_max_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

fn default_db_path() -> String {
    "foldlens_jobs.db".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_error_backoff_secs() -> u64 {
    15
}

/// Object-store configuration for uploaded screenshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base endpoint for `PUT {endpoint}/{bucket}/{key}`. Required by the
    /// worker, unused by the API server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Base of the public address returned for stored screenshots.
    /// Falls back to `endpoint` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: default_bucket(),
            token: None,
            public_base: None,
        }
    }
}

fn default_bucket() -> String {
    "foldlens-screens".to_string()
}

impl Config {
    /// Applies `FOLDLENS_*` environment overrides on top of file values.
    ///
    /// Unset variables leave the file value alone; set-but-unparsable
    /// numeric variables are an error rather than a silent fallback.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(token) = std::env::var("FOLDLENS_TOKEN") {
            self.auth.token = Some(token);
        }
        if let Ok(token) = std::env::var("FOLDLENS_TOKEN_NEXT") {
            self.auth.next_token = Some(token);
        }
        if let Some(port) = parse_env("FOLDLENS_PORT")? {
            self.server.port = port;
        }
        if let Some(concurrency) = parse_env("FOLDLENS_CONCURRENCY")? {
            self.render.concurrency = concurrency;
        }
        if let Ok(db) = std::env::var("FOLDLENS_DB") {
            self.queue.db_path = db;
        }
        if let Ok(endpoint) = std::env::var("FOLDLENS_STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Ok(bucket) = std::env::var("FOLDLENS_STORAGE_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Ok(token) = std::env::var("FOLDLENS_STORAGE_TOKEN") {
            self.storage.token = Some(token);
        }
        if let Ok(base) = std::env::var("FOLDLENS_STORAGE_PUBLIC_BASE") {
            self.storage.public_base = Some(base);
        }
        for stage in ALL_STAGES {
            let name = format!("FOLDLENS_TIMEOUT_{}_MS", StageTimeouts::env_suffix(stage));
            if let Some(ms) = parse_env(&name)? {
                self.render.timeouts.set(stage, ms);
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                message: format!("cannot parse '{raw}'"),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
