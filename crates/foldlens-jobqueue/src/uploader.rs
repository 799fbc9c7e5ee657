//! Object-store uploads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads screenshot bytes with `PUT {endpoint}/{bucket}/{key}` and hands
/// back the public address `{public_base}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct ObjectStoreUploader {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
    public_base: Option<String>,
}

impl ObjectStoreUploader {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            token: None,
            public_base: None,
        }
    }

    /// Bearer token sent with every upload.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Public address base. Falls back to the endpoint when unset.
    pub fn with_public_base(mut self, public_base: Option<String>) -> Self {
        self.public_base = public_base;
        self
    }

    /// Store a PNG under `key` and return its public address.
    pub async fn put_png(&self, key: &str, bytes: Vec<u8>) -> Result<String, QueueError> {
        let url = join_address(&self.endpoint, &self.bucket, key);
        let size = bytes.len();
        let mut request = self
            .http
            .put(&url)
            .timeout(UPLOAD_TIMEOUT)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueueError::Upload(format!("PUT {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(QueueError::Upload(format!(
                "PUT {url} returned {}",
                response.status()
            )));
        }
        debug!("Uploaded {} bytes to {}", size, url);

        let base = self.public_base.as_deref().unwrap_or(&self.endpoint);
        Ok(join_address(base, &self.bucket, key))
    }
}

/// Storage key for a job screenshot, bucketed by capture date.
pub fn storage_key(id: Uuid, ts: DateTime<Utc>) -> String {
    format!("{}/{}.png", ts.format("%Y/%m/%d"), id)
}

fn join_address(base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use wiremock::matchers::{bearer_token, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn storage_key_buckets_by_date() {
        let id = Uuid::new_v4();
        let ts = Utc.with_ymd_and_hms(2026, 8, 25, 14, 30, 0).unwrap();
        assert_eq!(storage_key(id, ts), format!("2026/08/25/{id}.png"));
    }

    #[test]
    fn addresses_tolerate_trailing_slashes() {
        assert_eq!(
            join_address("https://store.example/", "shots", "a/b.png"),
            "https://store.example/shots/a/b.png"
        );
    }

    #[tokio::test]
    async fn put_sends_png_with_bearer_and_returns_address() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/shots/2026/08/25/cap.png"))
            .and(bearer_token("store-secret"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let uploader = ObjectStoreUploader::new(server.uri(), "shots")
            .with_token(Some("store-secret".to_string()));
        let bytes = b"\x89PNG\r\n\x1a\nfake".to_vec();
        let address = uploader
            .put_png("2026/08/25/cap.png", bytes.clone())
            .await
            .unwrap();
        assert_eq!(address, format!("{}/shots/2026/08/25/cap.png", server.uri()));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, bytes);
    }

    #[tokio::test]
    async fn put_without_token_sends_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let uploader = ObjectStoreUploader::new(server.uri(), "shots");
        uploader.put_png("k.png", vec![1, 2, 3]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn public_base_overrides_endpoint_in_address() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let uploader = ObjectStoreUploader::new(server.uri(), "shots")
            .with_public_base(Some("https://cdn.example".to_string()));
        let address = uploader.put_png("k.png", vec![0]).await.unwrap();
        assert_eq!(address, "https://cdn.example/shots/k.png");
    }

    #[tokio::test]
    async fn server_failure_becomes_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let uploader = ObjectStoreUploader::new(server.uri(), "shots");
        let err = uploader.put_png("k.png", vec![0]).await.unwrap_err();
        assert!(matches!(err, QueueError::Upload(_)));
        assert!(err.to_string().contains("500"));
    }
}
