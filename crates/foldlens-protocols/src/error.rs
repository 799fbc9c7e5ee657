//! Error taxonomy for the render service.
//!
//! Variants correspond one-to-one to the HTTP statuses the API returns;
//! the status mapping itself lives in the API crate. Every variant carries
//! a machine-distinguishable reason slug, never only a raw engine message.

use thiserror::Error;

use crate::render::Stage;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed request content: bad URL shape, unknown device. HTTP 400.
    #[error("{message}")]
    Input {
        reason: &'static str,
        message: String,
    },

    /// Missing or wrong bearer token. HTTP 401.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Destination refused by the SSRF policy. HTTP 422.
    #[error("destination blocked: {0}")]
    Blocked(String),

    /// The page is an anti-bot challenge, not auditable content. HTTP 422.
    #[error("bot challenge detected: {0}")]
    BotChallenge(String),

    /// A critical stage exceeded its budget. HTTP 504.
    #[error("stage {stage} timed out after {budget_ms}ms")]
    StageTimeout { stage: Stage, budget_ms: u64 },

    /// Engine failure: launch, protocol, navigation. HTTP 500.
    #[error("engine error: {0}")]
    Engine(String),

    /// Object-store failure. Only the asynchronous job path sees this.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RenderError {
    pub fn input(reason: &'static str, message: impl Into<String>) -> Self {
        Self::Input {
            reason,
            message: message.into(),
        }
    }

    /// Stable reason slug for the wire error body.
    pub fn reason(&self) -> &str {
        match self {
            Self::Input { reason, .. } => reason,
            Self::Unauthorized(_) => "unauthorized",
            Self::Blocked(_) => "ssrf_blocked",
            Self::BotChallenge(_) => "bot_challenge",
            Self::StageTimeout { .. } => "stage_timeout",
            Self::Engine(_) => "engine_error",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {err}"))
    }
}
