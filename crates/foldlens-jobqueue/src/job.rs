//! Screenshot job rows.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of a screenshot job. Rows are created `queued` and finalized
/// by whichever worker leases them; `done` and `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

/// Raised when a persisted status string is not one of the known states.
#[derive(Debug, Error)]
#[error("unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "queued" => Ok(JobStatus::Queued),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One asynchronous capture job. The render path enqueues a row per request
/// regardless of whether the synchronous render succeeds; a worker later
/// leases it, captures the page on its own, and uploads the screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotJob {
    pub id: Uuid,

    /// Correlation key supplied by the caller, opaque to the queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    pub device: String,
    pub url: String,

    /// When the producing render ran.
    pub render_ts: DateTime<Utc>,

    pub status: JobStatus,
    pub attempt: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScreenshotJob {
    /// Create a fresh `queued` job for a URL under a device profile.
    pub fn new(url: impl Into<String>, device: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            run_id: None,
            device: device.into(),
            url: url.into(),
            render_ts: now,
            status: JobStatus::Queued,
            attempt: 0,
            storage_key: None,
            storage_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the caller's correlation key.
    pub fn with_run_id(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id;
        self
    }
}

/// Timestamps are persisted as fixed-width RFC 3339 UTC strings so that
/// string comparison in SQL matches chronological order.
pub(crate) fn rfc3339_micros(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
