//! Tracing setup, configuration loading, and the `serve` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use foldlens_api::{ApiServer, AppState, AuthTokens};
use foldlens_audit::RenderPipeline;
use foldlens_browser::{EngineConfig, EngineManager};
use foldlens_config::{Config, ConfigLoader, ConfigValidator};
use foldlens_jobqueue::{JobStore, SqliteJobStore};

/// Get the .foldlens directory path.
pub(crate) fn foldlens_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".foldlens"))
        .unwrap_or_else(|| PathBuf::from(".foldlens"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.foldlens/debug/ with daily rotation.
pub(crate) fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = foldlens_dir().join("debug");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("foldlens")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard must outlive the process or buffered lines are dropped.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer (human-readable, colored)
        .with(fmt::layer().with_target(true).with_ansi(true))
        // File layer (no colors)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Load, override, and validate configuration.
///
/// A missing file at the default location is not an error; defaults apply.
pub(crate) fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        ConfigLoader::load(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        info!("Config file {} not found, using defaults", path.display());
        Config::default()
    };
    config.apply_env_overrides()?;

    let report = ConfigValidator::validate(&config)?;
    for warning in &report.warnings {
        warn!("Config [{}]: {}", warning.path, warning.message);
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!("Config [{}]: {}", err.path, err.message);
        }
        bail!(
            "configuration failed validation with {} error(s)",
            report.errors.len()
        );
    }
    Ok(config)
}

pub(crate) fn build_engine(config: &Config) -> Arc<EngineManager> {
    Arc::new(EngineManager::new(EngineConfig {
        chrome_path: config.browser.chrome_path.clone(),
        debug_port: config.browser.debug_port,
        headless: config.browser.headless,
    }))
}

/// Resolves on SIGINT or SIGTERM.
pub(crate) async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                error!("SIGTERM handler failed to install: {}", err);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Run the API server in foreground.
pub(crate) async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!("Starting Foldlens v{}", env!("CARGO_PKG_VERSION"));

    let engine = build_engine(&config);
    let pipeline = Arc::new(RenderPipeline::new(engine.clone(), &config.render));
    let db_path = ConfigLoader::expand_path(&config.queue.db_path);
    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::open(db_path).await?);

    let auth = AuthTokens::new(config.auth.token.clone(), config.auth.next_token.clone());
    if !auth.is_enabled() {
        warn!("No auth token configured; the render endpoint is open");
    }

    let state = Arc::new(AppState::new(engine.clone(), pipeline, store, auth));
    let server = ApiServer::new(config.server.clone(), state);

    info!("Foldlens ready at http://{}", server.addr());
    info!("  POST /render  - render and audit a URL");
    info!("  GET  /health  - liveness and engine check");

    server
        .run(shutdown_signal())
        .await
        .map_err(|e| anyhow!("server error: {e}"))?;

    info!("Shutting down");
    engine.shutdown().await;
    Ok(())
}
