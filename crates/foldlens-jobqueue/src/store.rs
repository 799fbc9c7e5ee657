//! Job persistence store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde_json::{Value, json};
use tokio_rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;
use crate::job::{JobStatus, ScreenshotJob, rfc3339_micros};

/// Job store trait for persistence.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a freshly created job row.
    async fn enqueue(&self, job: &ScreenshotJob) -> Result<(), QueueError>;

    /// Lease the next claimable job, returning the raw row as JSON
    /// (`null` when nothing is claimable). [`crate::claim::normalize_claim`]
    /// maps the shape into a typed record.
    async fn claim_next(&self, max_attempts: u32) -> Result<Value, QueueError>;

    /// Finalize a leased job as `done` with its stored address.
    async fn mark_done(
        &self,
        id: Uuid,
        storage_key: &str,
        storage_url: &str,
    ) -> Result<(), QueueError>;

    /// Finalize a leased job as `error` with a message.
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), QueueError>;

    /// Load a job row by id.
    async fn load(&self, id: Uuid) -> Result<Option<ScreenshotJob>, QueueError>;
}

/// How long a leased row stays invisible to other claims. A worker that
/// dies mid-job forfeits its lease once this lapses; the attempt counter
/// caps how often a row can bounce that way.
const LEASE_VISIBILITY: Duration = Duration::from_secs(60);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS screenshot_jobs (
    id          TEXT PRIMARY KEY,
    run_id      TEXT,
    device      TEXT NOT NULL,
    url         TEXT NOT NULL,
    render_ts   TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'queued',
    attempt     INTEGER NOT NULL DEFAULT 0,
    storage_key TEXT,
    storage_url TEXT,
    error       TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_screenshot_jobs_claim
    ON screenshot_jobs (status, created_at);
";

/// The lease is one statement: bump the attempt counter, stamp the lease
/// time, and return the row. Two claims can never hand out the same row
/// at once because the second one re-evaluates the subselect after the
/// first committed, and the fresh `updated_at` hides the row.
const CLAIM_SQL: &str = "
UPDATE screenshot_jobs
   SET attempt = attempt + 1,
       updated_at = ?3
 WHERE id IN (
       SELECT id
         FROM screenshot_jobs
        WHERE status = 'queued'
          AND attempt < ?1
          AND (attempt = 0 OR updated_at <= ?2)
        ORDER BY created_at, id
        LIMIT 1)
RETURNING id, run_id, device, url, render_ts, status, attempt,
          storage_key, storage_url, error, created_at, updated_at
";

const LOAD_SQL: &str = "
SELECT id, run_id, device, url, render_ts, status, attempt,
       storage_key, storage_url, error, created_at, updated_at
  FROM screenshot_jobs
 WHERE id = ?1
";

/// SQLite-backed job store.
///
/// Every call funnels through one background connection task, so
/// statements execute serially within a process; across processes the
/// claim stays safe because it is a single UPDATE.
pub struct SqliteJobStore {
    conn: Connection,
}

impl SqliteJobStore {
    /// Open (and create if needed) the job database at `path`.
    ///
    /// `":memory:"` is accepted for throwaway stores.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path).await?;
        conn.call(|conn| {
            // journal_mode reports the resulting mode back as a row.
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    async fn claim_with_visibility(
        &self,
        max_attempts: u32,
        visibility: Duration,
    ) -> Result<Value, QueueError> {
        let now = Utc::now();
        let lapse = chrono::Duration::from_std(visibility).unwrap_or(chrono::Duration::MAX);
        let cutoff = now
            .checked_sub_signed(lapse)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let now_s = rfc3339_micros(now);
        let cutoff_s = rfc3339_micros(cutoff);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(CLAIM_SQL)?;
                let mut rows = stmt.query(params![max_attempts, cutoff_s, now_s])?;
                match rows.next()? {
                    Some(row) => Ok(claim_row_to_json(row)?),
                    None => Ok(Value::Null),
                }
            })
            .await
            .map_err(QueueError::from)
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn enqueue(&self, job: &ScreenshotJob) -> Result<(), QueueError> {
        let id = job.id;
        let job = job.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO screenshot_jobs
                         (id, run_id, device, url, render_ts, status, attempt,
                          storage_key, storage_url, error, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, NULL, ?8, ?9)",
                    params![
                        job.id.to_string(),
                        job.run_id,
                        job.device,
                        job.url,
                        rfc3339_micros(job.render_ts),
                        job.status.as_str(),
                        job.attempt,
                        rfc3339_micros(job.created_at),
                        rfc3339_micros(job.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        debug!("Enqueued screenshot job {}", id);
        Ok(())
    }

    async fn claim_next(&self, max_attempts: u32) -> Result<Value, QueueError> {
        self.claim_with_visibility(max_attempts, LEASE_VISIBILITY)
            .await
    }

    async fn mark_done(
        &self,
        id: Uuid,
        storage_key: &str,
        storage_url: &str,
    ) -> Result<(), QueueError> {
        let (key, url) = (storage_key.to_string(), storage_url.to_string());
        let affected = self
            .conn
            .call(move |conn| {
                let affected = conn.execute(
                    "UPDATE screenshot_jobs
                        SET status = 'done', storage_key = ?2, storage_url = ?3,
                            error = NULL, updated_at = ?4
                      WHERE id = ?1 AND status = 'queued'",
                    params![id.to_string(), key, url, rfc3339_micros(Utc::now())],
                )?;
                Ok(affected)
            })
            .await?;
        if affected == 0 {
            // Another worker finalized it first; their result stands.
            debug!("Job {} was already finalized", id);
        }
        Ok(())
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), QueueError> {
        let message = message.to_string();
        let affected = self
            .conn
            .call(move |conn| {
                let affected = conn.execute(
                    "UPDATE screenshot_jobs
                        SET status = 'error', error = ?2, updated_at = ?3
                      WHERE id = ?1 AND status = 'queued'",
                    params![id.to_string(), message, rfc3339_micros(Utc::now())],
                )?;
                Ok(affected)
            })
            .await?;
        if affected == 0 {
            debug!("Job {} was already finalized", id);
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<ScreenshotJob>, QueueError> {
        self.conn
            .call(move |conn| {
                let job = conn
                    .query_row(LOAD_SQL, params![id.to_string()], row_to_job)
                    .optional()?;
                Ok(job)
            })
            .await
            .map_err(QueueError::from)
    }
}

fn bad_cell(
    index: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

fn cell_ts(index: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| bad_cell(index, e))
}

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<ScreenshotJob, rusqlite::Error> {
    let id_raw: String = row.get(0)?;
    let status_raw: String = row.get(5)?;
    Ok(ScreenshotJob {
        id: Uuid::parse_str(&id_raw).map_err(|e| bad_cell(0, e))?,
        run_id: row.get(1)?,
        device: row.get(2)?,
        url: row.get(3)?,
        render_ts: cell_ts(4, row.get(4)?)?,
        status: status_raw
            .parse::<JobStatus>()
            .map_err(|e| bad_cell(5, e))?,
        attempt: row.get(6)?,
        storage_key: row.get(7)?,
        storage_url: row.get(8)?,
        error: row.get(9)?,
        created_at: cell_ts(10, row.get(10)?)?,
        updated_at: cell_ts(11, row.get(11)?)?,
    })
}

/// Claims hand back the raw row so the worker's normalization step stays
/// the single place that decides what counts as a usable job.
fn claim_row_to_json(row: &rusqlite::Row<'_>) -> Result<Value, rusqlite::Error> {
    Ok(json!({
        "id": row.get::<_, String>(0)?,
        "runId": row.get::<_, Option<String>>(1)?,
        "device": row.get::<_, String>(2)?,
        "url": row.get::<_, String>(3)?,
        "renderTs": row.get::<_, String>(4)?,
        "status": row.get::<_, String>(5)?,
        "attempt": row.get::<_, u32>(6)?,
        "storageKey": row.get::<_, Option<String>>(7)?,
        "storageUrl": row.get::<_, Option<String>>(8)?,
        "error": row.get::<_, Option<String>>(9)?,
        "createdAt": row.get::<_, String>(10)?,
        "updatedAt": row.get::<_, String>(11)?,
    }))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
