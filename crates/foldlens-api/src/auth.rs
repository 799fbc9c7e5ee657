//! Bearer token authentication for the render endpoint.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::error::ApiError;

/// Accepted bearer tokens.
///
/// Two slots so deployments can rotate credentials without downtime: the
/// outgoing token stays in `primary` while callers migrate to `next`.
/// With neither configured the API runs open, which is the intended local
/// development mode.
#[derive(Debug, Clone, Default)]
pub struct AuthTokens {
    primary: Option<String>,
    next: Option<String>,
}

impl AuthTokens {
    pub fn new(primary: Option<String>, next: Option<String>) -> Self {
        Self { primary, next }
    }

    /// Whether any token is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.primary.is_some() || self.next.is_some()
    }

    /// Check the `Authorization: Bearer <token>` header against the
    /// configured tokens. Open mode passes every request.
    pub fn require(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let presented = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;
        let accepted = [&self.primary, &self.next]
            .into_iter()
            .flatten()
            .any(|token| token == presented);
        if accepted {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
