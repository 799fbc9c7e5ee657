//! # Foldlens Job Queue
//!
//! Asynchronous screenshot capture, decoupled from request latency.
//!
//! The render path enqueues one job row per request. A separate polling
//! worker leases rows atomically, re-captures the page with a minimal
//! overlay hide, uploads the PNG to an object store, and finalizes the
//! row. Multiple worker processes may share one store; the lease is a
//! single atomic statement.

pub mod capture;
pub mod claim;
pub mod error;
pub mod job;
pub mod store;
pub mod uploader;
pub mod worker;

pub use capture::{EngineJobRenderer, JobRenderer};
pub use claim::{ClaimRejection, ClaimedJob, normalize_claim};
pub use error::QueueError;
pub use job::{JobStatus, ScreenshotJob};
pub use store::{JobStore, SqliteJobStore};
pub use uploader::{ObjectStoreUploader, storage_key};
pub use worker::{TickOutcome, Worker, WorkerConfig};
