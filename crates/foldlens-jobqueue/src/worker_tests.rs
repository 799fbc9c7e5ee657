use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use foldlens_protocols::DeviceProfile;
use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::job::{JobStatus, ScreenshotJob};
use crate::store::SqliteJobStore;

use super::*;

struct StubRenderer {
    result: Result<Vec<u8>, String>,
    seen: Mutex<Vec<String>>,
}

impl StubRenderer {
    fn ok(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(bytes.to_vec()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen_devices(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRenderer for StubRenderer {
    async fn capture(&self, _url: &str, device: &DeviceProfile) -> Result<Vec<u8>, QueueError> {
        self.seen.lock().unwrap().push(device.key.to_string());
        match &self.result {
            Ok(bytes) => Ok(bytes.clone()),
            Err(message) => Err(QueueError::Render(message.clone())),
        }
    }
}

/// Store stub with scripted claim responses, for shapes the SQLite store
/// cannot produce.
struct ScriptedStore {
    claims: Mutex<VecDeque<Result<Value, QueueError>>>,
    errors: Mutex<Vec<(Uuid, String)>>,
}

impl ScriptedStore {
    fn new(claims: Vec<Result<Value, QueueError>>) -> Arc<Self> {
        Arc::new(Self {
            claims: Mutex::new(claims.into()),
            errors: Mutex::new(Vec::new()),
        })
    }

    fn recorded_errors(&self) -> Vec<(Uuid, String)> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for ScriptedStore {
    async fn enqueue(&self, _job: &ScreenshotJob) -> Result<(), QueueError> {
        Ok(())
    }

    async fn claim_next(&self, _max_attempts: u32) -> Result<Value, QueueError> {
        self.claims
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }

    async fn mark_done(
        &self,
        _id: Uuid,
        _storage_key: &str,
        _storage_url: &str,
    ) -> Result<(), QueueError> {
        Ok(())
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), QueueError> {
        self.errors.lock().unwrap().push((id, message.to_string()));
        Ok(())
    }

    async fn load(&self, _id: Uuid) -> Result<Option<ScreenshotJob>, QueueError> {
        Ok(None)
    }
}

async fn sqlite_store() -> Arc<SqliteJobStore> {
    Arc::new(SqliteJobStore::open(":memory:").await.unwrap())
}

async fn accepting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn worker_with(
    store: Arc<dyn JobStore>,
    renderer: Arc<dyn JobRenderer>,
    endpoint: &str,
) -> Worker {
    let uploader = ObjectStoreUploader::new(endpoint, "shots");
    Worker::new(store, renderer, uploader, WorkerConfig::default())
}

#[tokio::test]
async fn tick_processes_job_end_to_end() {
    let server = accepting_server().await;
    let store = sqlite_store().await;
    let renderer = StubRenderer::ok(b"png-bytes");
    let worker = worker_with(store.clone(), renderer, &server.uri());

    let job = ScreenshotJob::new("https://example.com", "iphone_15");
    store.enqueue(&job).await.unwrap();

    assert_eq!(worker.tick().await, TickOutcome::Worked);

    let loaded = store.load(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Done);
    let key = loaded.storage_key.unwrap();
    assert!(key.ends_with(&format!("{}.png", job.id)));
    assert_eq!(
        loaded.storage_url.unwrap(),
        format!("{}/shots/{}", server.uri(), key)
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, b"png-bytes");
    assert!(requests[0].url.path().starts_with("/shots/"));

    // The finalized row leaves the queue empty.
    assert_eq!(worker.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn render_failure_marks_error_and_keeps_polling() {
    let server = accepting_server().await;
    let store = sqlite_store().await;
    let worker = worker_with(
        store.clone(),
        StubRenderer::failing("net::ERR_CONNECTION_REFUSED"),
        &server.uri(),
    );

    let job = ScreenshotJob::new("https://example.com", "iphone_15");
    store.enqueue(&job).await.unwrap();

    assert_eq!(worker.tick().await, TickOutcome::Worked);

    let loaded = store.load(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Error);
    assert!(
        loaded
            .error
            .unwrap()
            .contains("net::ERR_CONNECTION_REFUSED")
    );
    assert!(server.received_requests().await.unwrap().is_empty());

    assert_eq!(worker.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn empty_queue_is_idle() {
    let server = accepting_server().await;
    let worker = worker_with(sqlite_store().await, StubRenderer::ok(b"x"), &server.uri());
    assert_eq!(worker.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn job_device_profile_is_used() {
    let server = accepting_server().await;
    let store = sqlite_store().await;
    let renderer = StubRenderer::ok(b"x");
    let worker = worker_with(store.clone(), renderer.clone(), &server.uri());

    store
        .enqueue(&ScreenshotJob::new("https://example.com", "pixel_8"))
        .await
        .unwrap();
    worker.tick().await;

    assert_eq!(renderer.seen_devices(), vec!["pixel_8".to_string()]);
}

#[tokio::test]
async fn unknown_device_falls_back_to_default() {
    let server = accepting_server().await;
    let store = sqlite_store().await;
    let renderer = StubRenderer::ok(b"x");
    let worker = worker_with(store.clone(), renderer.clone(), &server.uri());

    store
        .enqueue(&ScreenshotJob::new("https://example.com", "vr_headset"))
        .await
        .unwrap();
    worker.tick().await;

    assert_eq!(
        renderer.seen_devices(),
        vec![foldlens_protocols::default_device().key.to_string()]
    );
}

#[tokio::test]
async fn upload_failure_marks_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let store = sqlite_store().await;
    let worker = worker_with(store.clone(), StubRenderer::ok(b"x"), &server.uri());

    let job = ScreenshotJob::new("https://example.com", "iphone_15");
    store.enqueue(&job).await.unwrap();

    assert_eq!(worker.tick().await, TickOutcome::Worked);
    let loaded = store.load(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Error);
    assert!(loaded.error.unwrap().contains("503"));
}

#[tokio::test]
async fn lease_failure_backs_off_without_marking() {
    let store = ScriptedStore::new(vec![Err(QueueError::Database(
        tokio_rusqlite::Error::ConnectionClosed,
    ))]);
    let worker = worker_with(store.clone(), StubRenderer::ok(b"x"), "http://127.0.0.1:1");

    assert_eq!(worker.tick().await, TickOutcome::LeaseFailed);
    assert!(store.recorded_errors().is_empty());
}

#[tokio::test]
async fn unusable_row_is_marked_error_not_retried() {
    let id = Uuid::new_v4();
    // A row with no URL can never be processed, whatever the attempt count.
    let store = ScriptedStore::new(vec![Ok(json!({"id": id.to_string()}))]);
    let worker = worker_with(store.clone(), StubRenderer::ok(b"x"), "http://127.0.0.1:1");

    assert_eq!(worker.tick().await, TickOutcome::Worked);
    assert_eq!(
        store.recorded_errors(),
        vec![(id, "unusable job row".to_string())]
    );
    assert_eq!(worker.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn run_stops_on_shutdown_signal() {
    let worker = Arc::new(worker_with(
        ScriptedStore::new(Vec::new()),
        StubRenderer::ok(b"x"),
        "http://127.0.0.1:1",
    ));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run(rx).await }
    });

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker should stop promptly")
        .unwrap();
}
