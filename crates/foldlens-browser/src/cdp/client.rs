//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Pending request waiting for a response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Command plumbing shared by the client and every page session: one
/// WebSocket sink, one pending-request map, one id counter.
#[derive(Clone)]
pub(crate) struct CommandChannel {
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
}

impl CommandChannel {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        // A hung protocol call must not hold its caller forever; stage
        // watchdogs layer tighter budgets on top of this backstop.
        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }
}

/// CDP client owning one WebSocket connection to the browser.
///
/// Liveness is observable through [`CdpClient::is_alive`]: the flag flips
/// when the receive loop exits, which is how the engine manager decides to
/// relaunch.
pub struct CdpClient {
    /// Browser WebSocket URL.
    browser_ws_url: String,
    /// Version reported by the endpoint at connect time.
    version: BrowserVersion,
    /// Command plumbing shared with sessions.
    channel: CommandChannel,
    /// Event senders by session ID.
    event_handlers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>,
    /// False once the receive loop has exited.
    alive: Arc<AtomicBool>,
    /// Background task handle.
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given HTTP debug endpoint
    /// (e.g., `http://127.0.0.1:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let browser_ws_url = version.web_socket_debugger_url.clone();

        let (ws_stream, _) = tokio_tungstenite::connect_async(&browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let channel = CommandChannel {
            ws_tx: Arc::new(tokio::sync::Mutex::new(ws_sink)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            request_id: Arc::new(AtomicU64::new(1)),
        };
        let event_handlers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let recv_task = {
            let pending = channel.pending.clone();
            let event_handlers = event_handlers.clone();
            let alive = alive.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending, event_handlers).await;
                alive.store(false, Ordering::SeqCst);
            })
        };

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            browser_ws_url,
            version,
            channel,
            event_handlers,
            alive,
            recv_task,
        })
    }

    /// WebSocket receive loop: correlates responses, routes events.
    async fn receive_loop(
        mut ws_source: WsSource,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        event_handlers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                let pending_req = pending.lock().remove(&id);
                                if let Some(req) = pending_req {
                                    let result = if let Some(error) = resp.error {
                                        Err(CdpError::Protocol {
                                            code: error.code,
                                            message: error.message,
                                        })
                                    } else {
                                        Ok(resp.result.unwrap_or(Value::Null))
                                    };
                                    let _ = req.tx.send(result);
                                }
                            } else if resp.method.is_some() {
                                let session_id = resp.session_id.clone().unwrap_or_default();
                                let handlers = event_handlers.read().await;
                                if let Some(tx) = handlers.get(&session_id) {
                                    let _ = tx.send(resp);
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        // Unblock callers still waiting for responses.
        let stranded: Vec<PendingRequest> = pending.lock().drain().map(|(_, req)| req).collect();
        for req in stranded {
            let _ = req.tx.send(Err(CdpError::SessionClosed));
        }
    }

    /// Send a browser-level CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.channel.call(method, params, None).await
    }

    /// True while the WebSocket receive loop is running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Get browser WebSocket URL.
    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Browser product string, e.g. `Chrome/124.0.6367.78`.
    pub fn browser_version(&self) -> &str {
        &self.version.browser
    }

    // ========================================================================
    // Context and target management
    // ========================================================================

    /// Create an isolated browsing context: no cookie or storage sharing
    /// with any other context.
    pub async fn create_browser_context(&self) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.createBrowserContext",
                Some(json!({"disposeOnDetach": true})),
            )
            .await?;
        result["browserContextId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing browserContextId".to_string()))
    }

    /// Create a page inside a context and attach to it.
    pub async fn create_page(&self, browser_context_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.createTarget",
                Some(json!({
                    "url": "about:blank",
                    "browserContextId": browser_context_id,
                })),
            )
            .await?;

        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))?
            .to_string();

        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_handlers
            .write()
            .await
            .insert(session_id.clone(), event_tx);

        debug!(
            "Attached page {} (session {}) in context {}",
            target_id, session_id, browser_context_id
        );

        let session = PageSession::new(target_id, session_id, self.channel.clone(), event_rx);
        session.enable_domains().await?;

        Ok(session)
    }

    /// Close a page and drop its event channel.
    pub async fn close_page(&self, session: &PageSession) -> Result<(), CdpError> {
        self.event_handlers
            .write()
            .await
            .remove(session.session_id());
        self.call(
            "Target.closeTarget",
            Some(json!({"targetId": session.target_id()})),
        )
        .await?;
        Ok(())
    }

    /// Dispose an isolated context and everything in it.
    pub async fn dispose_browser_context(&self, browser_context_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.disposeBrowserContext",
            Some(json!({"browserContextId": browser_context_id})),
        )
        .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stranded_pending_requests_get_closed() {
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        pending.lock().insert(1, PendingRequest { tx });

        // What receive_loop does on exit.
        let stranded: Vec<PendingRequest> =
            pending.lock().drain().map(|(_, req)| req).collect();
        for req in stranded {
            let _ = req.tx.send(Err(CdpError::SessionClosed));
        }

        match rx.await {
            Ok(Err(CdpError::SessionClosed)) => {}
            other => panic!("expected SessionClosed, got {:?}", other.map(|r| r.map(|_| ()))),
        }
        assert!(pending.lock().is_empty());
    }
}
