//! # Foldlens API
//!
//! External HTTP surface of the fold audit service.
//!
//! Two endpoints:
//! - **`POST /render`**: bearer-authenticated render of a URL under a mobile
//!   device profile, returning the screenshot and fold audit report. The
//!   handler also enqueues a screenshot job for the asynchronous worker
//!   before the interactive render runs.
//! - **`GET /health`**: liveness plus a real engine-launch check. Always
//!   `200`; degradation lives in the body.
//!
//! Errors leave the service as `{error, reason, message}` with the status
//! mapping in [`error::ApiError`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::AuthTokens;
pub use error::ApiError;
pub use handlers::{EngineHealth, HealthResponse, HealthStatus};
pub use routes::router;
pub use server::ApiServer;
pub use state::AppState;
