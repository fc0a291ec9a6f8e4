//! Test doubles shared by the adapter's unit tests.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use uniseg_core::{
    ApiCaller, ApiError, ApiResult, Bot, FallbackPolicy, Receipt, Target, UniMessage,
    UnisegResult,
};

/// Answers OneBot actions with canned data and records every call.
///
/// Sent messages get ids counting up from 42.
pub(crate) struct MockCaller {
    calls: Mutex<Vec<(String, Value)>>,
    next_id: AtomicI64,
}

impl Default for MockCaller {
    fn default() -> Self {
        Self {
            calls: Mutex::default(),
            next_id: AtomicI64::new(42),
        }
    }
}

impl MockCaller {
    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub(crate) fn last(&self) -> (String, Value) {
        self.calls.lock().last().cloned().expect("no API call recorded")
    }

    pub(crate) fn count(&self, action: &str) -> usize {
        self.calls.lock().iter().filter(|(a, _)| a == action).count()
    }
}

fn ok(data: Value) -> Value {
    json!({"status": "ok", "retcode": 0, "data": data})
}

#[async_trait]
impl ApiCaller for MockCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.calls.lock().push((action.to_string(), params.clone()));
        // Lets concurrent callers interleave like a real connection.
        tokio::task::yield_now().await;
        let response = match action {
            "send_private_msg"
            | "send_group_msg"
            | "send_private_forward_msg"
            | "send_group_forward_msg" => {
                ok(json!({"message_id": self.next_id.fetch_add(1, Ordering::Relaxed)}))
            }
            "get_msg" => ok(json!({
                "message_id": params["message_id"],
                "sender": {"user_id": 111, "nickname": "alice"},
                "time": 1700000000,
                "message": [
                    {"type": "text", "data": {"text": format!("quoted {}", params["message_id"])}}
                ],
            })),
            "get_friend_list" => ok(json!([
                {"user_id": 111, "nickname": "alice", "remark": ""},
                {"user_id": 222, "nickname": "bob", "remark": "b"},
            ])),
            "get_group_list" => ok(json!([
                {"group_id": 900, "group_name": "rustaceans", "member_count": 3},
            ])),
            _ => json!({"status": "failed", "retcode": 1404, "message": "unsupported action"}),
        };
        Ok(response)
    }
}

/// A bot of some other adapter.
pub(crate) struct NotOneBot;

#[async_trait]
impl Bot for NotOneBot {
    fn self_id(&self) -> &str {
        "0"
    }

    fn adapter(&self) -> &str {
        "elsewhere"
    }

    fn scope(&self) -> &str {
        "elsewhere"
    }

    async fn send(
        &self,
        _target: &Target,
        _message: &UniMessage,
        _fallback: FallbackPolicy,
    ) -> UnisegResult<Receipt> {
        Err(ApiError::NotSupported.into())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
