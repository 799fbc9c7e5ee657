//! Polling screenshot worker.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use foldlens_protocols::{default_device, find_device};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capture::JobRenderer;
use crate::claim::{ClaimedJob, normalize_claim};
use crate::error::QueueError;
use crate::store::JobStore;
use crate::uploader::{ObjectStoreUploader, storage_key};

/// Worker loop tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_attempts: u32,

    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,

    /// Longer sleep after the lease call itself fails.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            poll_interval: Duration::from_secs(5),
            error_backoff: Duration::from_secs(15),
        }
    }
}

/// What one poll cycle did, and therefore how long to sleep before the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A job was processed (or a bad row discarded); poll again at once.
    Worked,
    /// Queue was empty.
    Idle,
    /// The lease call itself failed.
    LeaseFailed,
}

/// Single-threaded job consumer. Runs strictly sequentially per process;
/// several worker processes may share one store because the lease is
/// atomic at the store level.
pub struct Worker {
    store: Arc<dyn JobStore>,
    renderer: Arc<dyn JobRenderer>,
    uploader: ObjectStoreUploader,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        renderer: Arc<dyn JobRenderer>,
        uploader: ObjectStoreUploader,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            renderer,
            uploader,
            config,
        }
    }

    /// Poll until `shutdown` fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Worker started (poll {:?}, backoff {:?}, max {} attempts)",
            self.config.poll_interval, self.config.error_backoff, self.config.max_attempts
        );
        loop {
            let outcome = tokio::select! {
                _ = shutdown.changed() => break,
                outcome = self.tick() => outcome,
            };
            let delay = match outcome {
                TickOutcome::Worked => continue,
                TickOutcome::Idle => self.config.poll_interval,
                TickOutcome::LeaseFailed => self.config.error_backoff,
            };
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("Worker stopped");
    }

    /// One poll cycle: lease, normalize, process. Public so tests can step
    /// the worker deterministically.
    pub async fn tick(&self) -> TickOutcome {
        let raw = match self.store.claim_next(self.config.max_attempts).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Job lease failed: {}", e);
                return TickOutcome::LeaseFailed;
            }
        };

        let job = match normalize_claim(raw) {
            Ok(Some(job)) => job,
            Ok(None) => return TickOutcome::Idle,
            Err(rejection) => {
                // Shape problems are terminal for the row, not for the loop.
                warn!("Discarding claim: {}", rejection);
                if let Some(id) = rejection.id {
                    if let Err(e) = self.store.mark_error(id, "unusable job row").await {
                        warn!("Marking unusable job {} failed: {}", id, e);
                    }
                }
                return TickOutcome::Worked;
            }
        };

        debug!("Processing job {} (attempt {})", job.id, job.attempt);
        match self.process(&job).await {
            Ok(()) => TickOutcome::Worked,
            Err(e) => {
                warn!("Job {} failed: {}", job.id, e);
                if let Err(mark) = self.store.mark_error(job.id, &e.to_string()).await {
                    warn!("Marking job {} failed: {}", job.id, mark);
                }
                TickOutcome::Worked
            }
        }
    }

    async fn process(&self, job: &ClaimedJob) -> Result<(), QueueError> {
        let device = match job.device.as_deref().and_then(find_device) {
            Some(device) => device,
            None => {
                debug!(
                    "Job {} names unknown device {:?}, using default",
                    job.id, job.device
                );
                default_device()
            }
        };

        let png = self.renderer.capture(&job.url, device).await?;
        let key = storage_key(job.id, Utc::now());
        let address = self.uploader.put_png(&key, png).await?;
        self.store.mark_done(job.id, &key, &address).await?;
        info!("Job {} stored at {}", job.id, address);
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
