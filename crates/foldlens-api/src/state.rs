//! Shared application state for the HTTP layer.

use std::sync::Arc;
use std::time::Instant;

use foldlens_audit::RenderPipeline;
use foldlens_browser::EngineManager;
use foldlens_jobqueue::JobStore;

use crate::auth::AuthTokens;

/// State shared across all HTTP handlers.
///
/// Everything in here is either immutable or internally synchronized, so
/// handlers clone the `Arc<AppState>` freely.
pub struct AppState {
    /// Browser engine, shared with the render pipeline.
    pub engine: Arc<EngineManager>,
    /// Validated render and audit pipeline.
    pub pipeline: Arc<RenderPipeline>,
    /// Screenshot job store; the render endpoint only enqueues.
    pub store: Arc<dyn JobStore>,
    /// Accepted bearer tokens.
    pub auth: AuthTokens,
    /// Server start time, for uptime reporting.
    start_time: Instant,
}

impl AppState {
    pub fn new(
        engine: Arc<EngineManager>,
        pipeline: Arc<RenderPipeline>,
        store: Arc<dyn JobStore>,
        auth: AuthTokens,
    ) -> Self {
        Self {
            engine,
            pipeline,
            store,
            auth,
            start_time: Instant::now(),
        }
    }

    /// Seconds since this state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use foldlens_browser::EngineConfig;
    use foldlens_config::RenderConfig;
    use foldlens_jobqueue::SqliteJobStore;

    use super::*;

    #[tokio::test]
    async fn uptime_starts_near_zero() {
        let engine = Arc::new(EngineManager::new(EngineConfig::default()));
        let pipeline = Arc::new(RenderPipeline::new(
            engine.clone(),
            &RenderConfig::default(),
        ));
        let store = SqliteJobStore::open(":memory:")
            .await
            .map(|s| Arc::new(s) as Arc<dyn JobStore>)
            .unwrap();
        let state = AppState::new(engine, pipeline, store, AuthTokens::default());
        assert!(state.uptime_seconds() < 5);
    }
}
