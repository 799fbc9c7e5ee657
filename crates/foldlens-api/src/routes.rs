//! HTTP route definitions.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the service router.
///
/// ```text
/// GET  /health  - liveness plus a real engine-launch check
/// POST /render  - authenticated render and fold audit
/// ```
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/render", post(handlers::render))
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
