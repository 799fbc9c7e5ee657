//! HTTP request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use foldlens_jobqueue::ScreenshotJob;
use foldlens_protocols::{RenderReport, RenderRequest};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Overall or per-component health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub engine: EngineHealth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHealth {
    pub status: HealthStatus,
    /// Browser version when up, failure detail when not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /health`.
///
/// Always `200`; degradation is reported in the body. The engine check is
/// real: it launches the browser if nothing is running yet, so a green
/// response means renders can actually be served.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = match state.engine.ensure().await {
        Ok(client) => EngineHealth {
            status: HealthStatus::Ok,
            message: Some(client.browser_version().to_string()),
        },
        Err(err) => EngineHealth {
            status: HealthStatus::Error,
            message: Some(err.to_string()),
        },
    };
    let status = if engine.status == HealthStatus::Ok {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        engine,
    })
}

/// `POST /render`.
///
/// Auth, then validation, then a queued screenshot job, then the
/// synchronous render. The job row is written before the render starts so
/// the worker captures the page even when the interactive render fails.
pub async fn render(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderReport>, ApiError> {
    state.auth.require(&headers)?;
    let (url, device) = state
        .pipeline
        .validate(&request.url, request.device.as_deref())
        .await?;

    let job = ScreenshotJob::new(url.as_str(), device.key).with_run_id(request.run_id.clone());
    if let Err(err) = state.store.enqueue(&job).await {
        // A broken job store must not take down the interactive path.
        warn!("Screenshot job enqueue failed: {}", err);
    } else {
        debug!("Enqueued screenshot job {} for {}", job.id, url);
    }

    let report = state
        .pipeline
        .render(&url, device, job.id, request.options())
        .await?;
    Ok(Json(report))
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
