//! Queue errors.

use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    /// Capture of the job's page failed.
    #[error("capture failed: {0}")]
    Render(String),

    /// Object-store upload failed.
    #[error("upload failed: {0}")]
    Upload(String),
}
