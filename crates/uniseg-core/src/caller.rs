//! How platform bots reach their peer.
//!
//! A bot holds an `Arc<dyn ApiCaller>` and never learns which transport is
//! behind it. [`ChannelApiCaller`] covers the common duplex case: requests
//! are tagged with a numeric echo and pushed into a channel, and the
//! transport loop routes each response back through
//! [`on_incoming_response`](ApiCaller::on_incoming_response).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Transport-specific API call mechanism.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Makes an API call and returns the response envelope.
    async fn call(&self, _action: &str, _params: Value) -> ApiResult<Value> {
        Err(ApiError::NotSupported)
    }

    /// Routes an incoming response to its waiting call.
    ///
    /// Returns `true` if `data` was consumed as a response.
    fn on_incoming_response(&self, _data: &Value) -> bool {
        false
    }

    /// Unblocks pending calls after the connection closed.
    fn on_disconnect(&self) {}
}

// =============================================================================
// ChannelApiCaller
// =============================================================================

/// Echo-matched request/response over an mpsc channel.
pub struct ChannelApiCaller {
    request_tx: mpsc::Sender<Value>,
    pending_calls: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    echo_counter: AtomicU64,
    api_timeout: Duration,
}

impl ChannelApiCaller {
    /// Creates a caller writing requests into `request_tx`.
    pub fn new(request_tx: mpsc::Sender<Value>) -> Self {
        Self {
            request_tx,
            pending_calls: Arc::new(Mutex::new(HashMap::new())),
            echo_counter: AtomicU64::new(1),
            api_timeout: Duration::from_secs(30),
        }
    }

    /// Sets how long a call waits for its response.
    pub fn with_timeout(mut self, api_timeout: Duration) -> Self {
        self.api_timeout = api_timeout;
        self
    }

    /// Number of calls still waiting for a response.
    pub fn pending(&self) -> usize {
        self.pending_calls.lock().len()
    }
}

#[async_trait]
impl ApiCaller for ChannelApiCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        let echo = self.echo_counter.fetch_add(1, Ordering::SeqCst);

        // Register before sending so an early response is never lost.
        let (tx, rx) = oneshot::channel();
        self.pending_calls.lock().insert(echo, tx);

        let request = json!({
            "action": action,
            "params": params,
            "echo": echo,
        });

        debug!(action = %action, echo = %echo, "Calling platform API");

        if let Err(e) = self.request_tx.send(request).await {
            self.pending_calls.lock().remove(&echo);
            return Err(ApiError::SendFailed(e.to_string()));
        }

        match timeout(self.api_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ApiError::NotConnected),
            Err(_) => {
                self.pending_calls.lock().remove(&echo);
                Err(ApiError::Timeout)
            }
        }
    }

    fn on_incoming_response(&self, data: &Value) -> bool {
        let Some(echo) = data.get("echo").and_then(Value::as_u64) else {
            return false;
        };
        let mut pending = self.pending_calls.lock();
        if let Some(tx) = pending.remove(&echo) {
            let _ = tx.send(data.clone());
            true
        } else {
            warn!(echo = %echo, "Received API response for unknown echo (timed out?)");
            false
        }
    }

    fn on_disconnect(&self) {
        let mut pending = self.pending_calls.lock();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Clearing pending API calls due to disconnect");
            pending.clear();
        }
    }
}

/// Caller for connections that cannot issue API calls.
pub struct DisabledApiCaller;

#[async_trait]
impl ApiCaller for DisabledApiCaller {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_routing() {
        let (tx, mut rx) = mpsc::channel(4);
        let caller = Arc::new(ChannelApiCaller::new(tx));

        let peer = caller.clone();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let response = json!({
                    "status": "ok",
                    "retcode": 0,
                    "data": { "action": request["action"] },
                    "echo": request["echo"],
                });
                peer.on_incoming_response(&response);
            }
        });

        let response = caller.call("get_status", json!({})).await.unwrap();
        assert_eq!(response["data"]["action"], "get_status");
        assert_eq!(caller.pending(), 0);
    }

    #[tokio::test]
    async fn test_timeout_clears_pending() {
        let (tx, _rx) = mpsc::channel(4);
        let caller = ChannelApiCaller::new(tx).with_timeout(Duration::from_millis(10));
        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert_eq!(caller.pending(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending() {
        let (tx, mut rx) = mpsc::channel(4);
        let caller = Arc::new(ChannelApiCaller::new(tx));
        let peer = caller.clone();
        tokio::spawn(async move {
            let _ = rx.recv().await;
            peer.on_disconnect();
        });
        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NotConnected));
    }

    #[tokio::test]
    async fn test_disabled_caller() {
        let err = DisabledApiCaller.call("anything", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NotSupported));
    }
}
