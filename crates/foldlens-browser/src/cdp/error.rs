//! CDP error types.

use foldlens_protocols::RenderError;
use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not reachable on the debug port.
    #[error("Chrome not available at {0}")]
    ChromeNotAvailable(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// In-page script threw.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A single protocol call exceeded its internal deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The connection dropped while a call was in flight.
    #[error("Session closed")]
    SessionClosed,

    /// Response payload missing an expected field.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for RenderError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::NavigationFailed(msg) => RenderError::Engine(format!("navigation: {msg}")),
            other => RenderError::Engine(other.to_string()),
        }
    }
}
