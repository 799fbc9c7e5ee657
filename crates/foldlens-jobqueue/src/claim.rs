//! Claim-shape normalization.
//!
//! The store hands leases back as raw JSON. Depending on the backend and
//! its driver that can be a bare object, a single-element array, or null.
//! Everything funnels through [`normalize_claim`], which either produces a
//! strict [`ClaimedJob`] or a [`ClaimRejection`] the worker can act on.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// A leased job in the one shape the worker processes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedJob {
    pub id: Uuid,

    #[serde(default)]
    pub run_id: Option<String>,

    /// Device profile key. Unknown or absent keys fall back to the
    /// default profile at capture time.
    #[serde(default)]
    pub device: Option<String>,

    pub url: String,

    #[serde(default)]
    pub attempt: u32,
}

/// A claim that cannot be turned into a usable job. Carries the row id
/// when one could be extracted so the row can be finalized instead of
/// leaking back into the queue.
#[derive(Debug, Error)]
#[error("unusable job row: {reason}")]
pub struct ClaimRejection {
    pub id: Option<Uuid>,
    pub reason: String,
}

impl ClaimRejection {
    fn new(id: Option<Uuid>, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
        }
    }
}

/// Map a raw claim response into a typed job.
///
/// `Ok(None)` means the queue was empty (null or empty-array response).
/// Rows that parse but lack an absolute http(s) URL are rejected rather
/// than retried; a relative or scheme-less URL will never become fetchable.
pub fn normalize_claim(raw: Value) -> Result<Option<ClaimedJob>, ClaimRejection> {
    let object = match raw {
        Value::Null => return Ok(None),
        Value::Array(mut items) => match items.len() {
            0 => return Ok(None),
            1 => items.remove(0),
            n => {
                let id = items.first().and_then(extract_id);
                return Err(ClaimRejection::new(id, format!("claim returned {n} rows")));
            }
        },
        object @ Value::Object(_) => object,
        other => {
            return Err(ClaimRejection::new(
                None,
                format!("claim returned a JSON {}", json_kind(&other)),
            ));
        }
    };

    let id = extract_id(&object);
    let job: ClaimedJob = serde_json::from_value(object)
        .map_err(|e| ClaimRejection::new(id, format!("row does not parse: {e}")))?;

    match Url::parse(&job.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(job)),
        Ok(url) => Err(ClaimRejection::new(
            Some(job.id),
            format!("url scheme '{}' is not fetchable", url.scheme()),
        )),
        Err(e) => Err(ClaimRejection::new(
            Some(job.id),
            format!("url '{}' is not absolute: {e}", job.url),
        )),
    }
}

fn extract_id(value: &Value) -> Option<Uuid> {
    value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
