//! The `worker` command: asynchronous screenshot job loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::watch;
use tracing::info;

use foldlens_config::{Config, ConfigLoader};
use foldlens_jobqueue::{
    EngineJobRenderer, ObjectStoreUploader, SqliteJobStore, Worker, WorkerConfig,
};
use foldlens_protocols::Stage;

use crate::server::{build_engine, shutdown_signal};

/// Run the screenshot worker until SIGINT or SIGTERM.
pub(crate) async fn run_worker(config: Config) -> Result<()> {
    info!("Starting Foldlens worker v{}", env!("CARGO_PKG_VERSION"));

    let Some(endpoint) = config.storage.endpoint.clone() else {
        bail!("storage.endpoint must be configured for the worker");
    };

    let engine = build_engine(&config);
    let renderer = Arc::new(EngineJobRenderer::new(
        engine.clone(),
        config.render.timeouts.budget(Stage::Navigate),
        config.render.overlay_area_pct,
    ));

    let db_path = ConfigLoader::expand_path(&config.queue.db_path);
    let store = Arc::new(SqliteJobStore::open(db_path).await?);

    let uploader = ObjectStoreUploader::new(endpoint, config.storage.bucket.clone())
        .with_token(config.storage.token.clone())
        .with_public_base(config.storage.public_base.clone());

    let worker = Worker::new(
        store,
        renderer,
        uploader,
        WorkerConfig {
            max_attempts: config.queue.max_attempts,
            poll_interval: Duration::from_secs(config.queue.poll_interval_secs),
            error_backoff: Duration::from_secs(config.queue.error_backoff_secs),
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await;

    engine.shutdown().await;
    Ok(())
}
