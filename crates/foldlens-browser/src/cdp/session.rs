//! Attached page session.

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::client::CommandChannel;
use super::error::CdpError;
use super::protocol::{CdpResponse, ScreenshotClip};

/// Cloneable handle for issuing session-scoped commands outside the
/// session itself, e.g. from the request-interception pump.
#[derive(Clone)]
pub struct SessionCaller {
    channel: CommandChannel,
    session_id: String,
}

impl SessionCaller {
    /// Send a CDP command scoped to this session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.channel.call(method, params, Some(&self.session_id)).await
    }
}

/// One attached page inside an isolated browser context.
///
/// All page work (navigation, script evaluation, screenshots) goes through
/// the session so commands carry the right `sessionId` on the shared
/// browser socket.
pub struct PageSession {
    target_id: String,
    session_id: String,
    channel: CommandChannel,
    /// CDP events for this session; taken once by whoever pumps them.
    event_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        channel: CommandChannel,
        event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            channel,
            event_rx: parking_lot::Mutex::new(Some(event_rx)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Handle for issuing commands from a spawned task.
    pub fn caller(&self) -> SessionCaller {
        SessionCaller {
            channel: self.channel.clone(),
            session_id: self.session_id.clone(),
        }
    }

    /// Take the event stream. Yields `None` after the first call.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CdpResponse>> {
        self.event_rx.lock().take()
    }

    /// Send a CDP command scoped to this session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.channel.call(method, params, Some(&self.session_id)).await
    }

    /// Enable the domains every render needs.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        Ok(())
    }

    /// Navigate and wait for the document to reach at least `interactive`.
    pub async fn navigate(
        &self,
        url: &str,
        ready_timeout: std::time::Duration,
    ) -> Result<(), CdpError> {
        debug!("Navigating session {} to {}", self.session_id, url);

        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error_text) = result["errorText"].as_str() {
            if !error_text.is_empty() {
                return Err(CdpError::NavigationFailed(format!(
                    "{}: {}",
                    url, error_text
                )));
            }
        }

        let deadline = tokio::time::Instant::now() + ready_timeout;
        loop {
            let state = self
                .call(
                    "Runtime.evaluate",
                    Some(json!({
                        "expression": "document.readyState",
                        "returnByValue": true
                    })),
                )
                .await?;
            if ready_state_reached(&state["result"]["value"]) {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(CdpError::Timeout(format!(
                    "{} did not reach interactive state",
                    url
                )));
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        trace!("Navigation to {} settled", url);
        Ok(())
    }

    /// Evaluate JavaScript in the page and return the result by value.
    ///
    /// Promises are awaited, so audit programs can be async.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("JavaScript exception");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Install a script that runs in every new document before page scripts.
    pub async fn add_script_on_new_document(&self, source: &str) -> Result<(), CdpError> {
        self.call(
            "Page.addScriptToEvaluateOnNewDocument",
            Some(json!({"source": source})),
        )
        .await?;
        Ok(())
    }

    /// Capture a PNG of the given clip. Returns base64 without a data URI
    /// prefix.
    pub async fn screenshot_clip(&self, clip: ScreenshotClip) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({
                    "format": "png",
                    "clip": clip,
                    "captureBeyondViewport": false
                })),
            )
            .await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }
}

/// `document.readyState` values that count as navigated.
fn ready_state_reached(value: &Value) -> bool {
    matches!(value.as_str(), Some("interactive") | Some("complete"))
}
