//! HTTP error mapping.
//!
//! Every failure leaving the API is shaped as `{error, reason, message}`:
//! `error` is the coarse taxonomy bucket, `reason` the stable machine slug,
//! `message` the human-readable detail.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use foldlens_protocols::RenderError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bearer auth failed before any render work started.
    #[error("missing or invalid bearer token")]
    Unauthenticated,

    /// A render-path failure, carried through from the pipeline.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub reason: String,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Render(err) => match err {
                RenderError::Input { .. } => StatusCode::BAD_REQUEST,
                RenderError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                RenderError::Blocked(_) | RenderError::BotChallenge(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                RenderError::StageTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RenderError::Engine(_) | RenderError::Storage(_) | RenderError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Coarse taxonomy bucket for the `error` field.
    fn class(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "auth",
            Self::Render(err) => match err {
                RenderError::Input { .. } => "input",
                RenderError::Unauthorized(_) => "auth",
                RenderError::Blocked(_) | RenderError::BotChallenge(_) => "policy",
                RenderError::StageTimeout { .. } => "timeout",
                RenderError::Storage(_) => "storage",
                RenderError::Engine(_) | RenderError::Internal(_) => "upstream",
            },
        }
    }

    fn reason(&self) -> &str {
        match self {
            Self::Unauthenticated => "unauthorized",
            Self::Render(err) => err.reason(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.class(),
            reason: self.reason().to_string(),
            message: self.to_string(),
        };
        if status.is_server_error() {
            warn!("Request failed with {}: {}", status, body.message);
        }
        (status, Json(body)).into_response()
    }
}
