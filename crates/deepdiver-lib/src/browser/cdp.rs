//! Chrome DevTools Protocol client over a single WebSocket.
//!
//! Commands carry auto-incrementing ids; a background reader task routes each
//! response to the waiting caller and fans events out on a broadcast channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::error::BrowserError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

/// Default per-command response timeout.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const EVENT_CAPACITY: usize = 256;

/// An event pushed by the browser (no `id`).
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Serialize)]
struct CdpCommand<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdpResponseError {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

/// Incoming frame after classification.
#[derive(Debug)]
pub enum Incoming {
    Response(CdpResponse),
    Event(CdpEvent),
}

/// Classify a decoded CDP frame. Frames with an `id` are responses, frames
/// with only a `method` are events, anything else is ignored.
pub fn classify(json: &Value) -> Option<Incoming> {
    if let Some(id) = json.get("id").and_then(Value::as_u64) {
        return Some(Incoming::Response(CdpResponse {
            id,
            result: json.get("result").cloned(),
            error: json
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        }));
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(Incoming::Event(CdpEvent { method, params }))
}

pub struct CdpClient {
    next_id: AtomicU64,
    pending: Pending,
    writer: Mutex<WsSink>,
    events: broadcast::Sender<CdpEvent>,
    reader: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a target's `webSocketDebuggerUrl`.
    pub async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
        tracing::debug!(url = ws_url, "connecting to DevTools WebSocket");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;

        let (writer, reader) = ws_stream.split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let reader = tokio::spawn(Self::read_loop(reader, Arc::clone(&pending), events.clone()));

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Mutex::new(writer),
            events,
            reader,
        })
    }

    /// Subscribe to browser events. Only events sent after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    pub async fn send(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        self.send_with_timeout(method, params, COMMAND_TIMEOUT).await
    }

    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&CdpCommand { id, method, params }).map_err(|e| {
            BrowserError::Protocol {
                detail: format!("failed to serialize command: {e}"),
            }
        })?;

        tracing::trace!(id, method, "CDP send");

        // Register before sending so a fast response cannot be lost.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let sent = self
            .writer
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await;
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(BrowserError::Protocol {
                detail: format!("failed to send WebSocket message: {e}"),
            });
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => {
                return Err(BrowserError::Protocol {
                    detail: "response channel closed unexpectedly".to_string(),
                })
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(BrowserError::Timeout {
                    method: method.to_string(),
                    duration: timeout,
                });
            }
        };

        if let Some(err) = response.error {
            return Err(BrowserError::CdpError {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Enable a CDP domain such as `Page` or `Runtime`.
    pub async fn enable_domain(&self, domain: &str) -> Result<(), BrowserError> {
        self.send(&format!("{domain}.enable"), serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn read_loop(
        mut reader: SplitStream<WsStream>,
        pending: Pending,
        events: broadcast::Sender<CdpEvent>,
    ) {
        while let Some(frame) = reader.next().await {
            let text = match frame {
                Ok(Message::Text(t)) => t.to_string(),
                Ok(Message::Binary(b)) => match String::from_utf8(b.to_vec()) {
                    Ok(s) => s,
                    Err(_) => continue,
                },
                Ok(Message::Close(_)) => {
                    tracing::debug!("DevTools WebSocket closed by remote");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "DevTools WebSocket read error");
                    break;
                }
            };

            let json: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "unparsable CDP frame");
                    continue;
                }
            };

            match classify(&json) {
                Some(Incoming::Response(resp)) => {
                    if let Some(tx) = pending.lock().await.remove(&resp.id) {
                        let _ = tx.send(resp);
                    }
                }
                Some(Incoming::Event(event)) => {
                    // No subscribers is fine.
                    let _ = events.send(event);
                }
                None => {}
            }
        }

        // Fail every in-flight command once the socket is gone.
        for (id, tx) in pending.lock().await.drain() {
            let _ = tx.send(CdpResponse {
                id,
                result: None,
                error: Some(CdpResponseError {
                    code: -1,
                    message: "WebSocket connection closed".to_string(),
                    data: None,
                }),
            });
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
