use std::time::Duration;

use tempfile::TempDir;

use super::*;

async fn memory_store() -> SqliteJobStore {
    SqliteJobStore::open(":memory:").await.unwrap()
}

fn job(url: &str) -> ScreenshotJob {
    ScreenshotJob::new(url, "iphone_15")
}

fn claimed_id(raw: &Value) -> Uuid {
    Uuid::parse_str(raw["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn enqueue_then_load_round_trips() {
    let store = memory_store().await;
    let row = job("https://example.com/pricing").with_run_id(Some("run-7".to_string()));
    store.enqueue(&row).await.unwrap();

    let loaded = store.load(row.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, row.id);
    assert_eq!(loaded.url, "https://example.com/pricing");
    assert_eq!(loaded.device, "iphone_15");
    assert_eq!(loaded.run_id.as_deref(), Some("run-7"));
    assert_eq!(loaded.status, JobStatus::Queued);
    assert_eq!(loaded.attempt, 0);
    assert!(loaded.storage_key.is_none());
    assert!(loaded.error.is_none());
}

#[tokio::test]
async fn load_of_unknown_id_is_none() {
    let store = memory_store().await;
    assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn claim_returns_row_and_increments_attempt() {
    let store = memory_store().await;
    let row = job("https://example.com");
    store.enqueue(&row).await.unwrap();

    let raw = store.claim_next(3).await.unwrap();
    assert!(raw.is_object());
    assert_eq!(claimed_id(&raw), row.id);
    assert_eq!(raw["attempt"].as_u64(), Some(1));
    assert_eq!(raw["status"].as_str(), Some("queued"));
    assert_eq!(raw["url"].as_str(), Some("https://example.com"));

    let loaded = store.load(row.id).await.unwrap().unwrap();
    assert_eq!(loaded.attempt, 1);
}

#[tokio::test]
async fn claim_on_empty_queue_returns_null() {
    let store = memory_store().await;
    assert!(store.claim_next(3).await.unwrap().is_null());
}

#[tokio::test]
async fn leased_row_is_invisible_to_the_next_claim() {
    let store = memory_store().await;
    store.enqueue(&job("https://example.com")).await.unwrap();

    let first = store.claim_next(3).await.unwrap();
    assert!(first.is_object());
    // Still within the visibility window, so the row is not claimable.
    let second = store.claim_next(3).await.unwrap();
    assert!(second.is_null());
}

#[tokio::test]
async fn concurrent_claims_yield_one_lease() {
    let store = memory_store().await;
    store.enqueue(&job("https://example.com")).await.unwrap();

    let (a, b) = tokio::join!(store.claim_next(3), store.claim_next(3));
    let leases = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|raw| raw.is_object())
        .count();
    assert_eq!(leases, 1);
}

#[tokio::test]
async fn expired_lease_is_reclaimable_until_attempts_cap() {
    let store = memory_store().await;
    let row = job("https://example.com");
    store.enqueue(&row).await.unwrap();

    for expected_attempt in 1..=3 {
        let raw = store
            .claim_with_visibility(3, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(raw["attempt"].as_u64(), Some(expected_attempt));
    }
    let exhausted = store
        .claim_with_visibility(3, Duration::ZERO)
        .await
        .unwrap();
    assert!(exhausted.is_null());
}

#[tokio::test]
async fn claims_follow_enqueue_order() {
    let store = memory_store().await;
    let first = job("https://example.com/a");
    store.enqueue(&first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = job("https://example.com/b");
    store.enqueue(&second).await.unwrap();

    let raw = store.claim_next(3).await.unwrap();
    assert_eq!(claimed_id(&raw), first.id);
}

#[tokio::test]
async fn mark_done_finalizes_and_stops_reclaims() {
    let store = memory_store().await;
    let row = job("https://example.com");
    store.enqueue(&row).await.unwrap();
    store.claim_next(3).await.unwrap();

    store
        .mark_done(row.id, "2026/08/25/shot.png", "https://cdn.example/shots/shot.png")
        .await
        .unwrap();

    let loaded = store.load(row.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Done);
    assert_eq!(loaded.storage_key.as_deref(), Some("2026/08/25/shot.png"));
    assert_eq!(
        loaded.storage_url.as_deref(),
        Some("https://cdn.example/shots/shot.png")
    );
    assert!(loaded.error.is_none());

    // Terminal rows never come back, even once the lease lapses.
    let raw = store
        .claim_with_visibility(3, Duration::ZERO)
        .await
        .unwrap();
    assert!(raw.is_null());
}

#[tokio::test]
async fn mark_error_finalizes_with_message() {
    let store = memory_store().await;
    let row = job("https://example.com");
    store.enqueue(&row).await.unwrap();
    store.claim_next(3).await.unwrap();

    store.mark_error(row.id, "upstream returned 502").await.unwrap();

    let loaded = store.load(row.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Error);
    assert_eq!(loaded.error.as_deref(), Some("upstream returned 502"));

    let raw = store
        .claim_with_visibility(3, Duration::ZERO)
        .await
        .unwrap();
    assert!(raw.is_null());
}

#[tokio::test]
async fn finalized_row_ignores_late_mark_done() {
    let store = memory_store().await;
    let row = job("https://example.com");
    store.enqueue(&row).await.unwrap();
    store.claim_next(3).await.unwrap();

    store.mark_error(row.id, "gave up").await.unwrap();
    store
        .mark_done(row.id, "late/key.png", "https://cdn.example/late/key.png")
        .await
        .unwrap();

    let loaded = store.load(row.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Error);
    assert!(loaded.storage_url.is_none());
}

#[tokio::test]
async fn store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jobs.db");
    let row = job("https://example.com");

    {
        let store = SqliteJobStore::open(&path).await.unwrap();
        store.enqueue(&row).await.unwrap();
    }

    let store = SqliteJobStore::open(&path).await.unwrap();
    let loaded = store.load(row.id).await.unwrap().unwrap();
    assert_eq!(loaded.url, "https://example.com");
    assert_eq!(loaded.status, JobStatus::Queued);
}
