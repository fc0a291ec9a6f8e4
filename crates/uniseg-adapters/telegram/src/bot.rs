//! Telegram bot implementation.
//!
//! Telegram sends one item per API call. A universal message is exported,
//! then planned into calls: consecutive text becomes one `sendMessage`,
//! every media item its own `send*` call, and a reply marker applies to
//! the first call.
//!
//! The Bot API has no multipart path through an [`ApiCaller`], so this bot
//! does not upload; raw and local media fall back per the policy.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};
use uniseg_core::{
    ApiCaller, ApiError, ApiResult, Bot, FallbackPolicy, MessageBuilder, MessageExporter,
    Platform, Receipt, Target, UniMessage, UnisegError, UnisegResult,
};

use crate::Telegram;
use crate::model::api::ApiMessage;
use crate::model::entity::User;
use crate::model::segment::{Segment, TextData};

// =============================================================================
// Call Planning
// =============================================================================

/// One Bot API call, without chat addressing.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub method: &'static str,
    pub params: Map<String, Value>,
}

impl Outgoing {
    fn new(method: &'static str, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { method, params }
    }
}

fn text_call(data: TextData) -> Outgoing {
    let mut call = Outgoing::new("sendMessage", json!({ "text": data.text }));
    if !data.entities.is_empty() {
        call.params.insert("entities".into(), json!(data.entities));
    }
    call
}

fn flush(pending: &mut Option<TextData>, calls: &mut Vec<Outgoing>) {
    if let Some(data) = pending.take()
        && !data.text.is_empty()
    {
        calls.push(text_call(data));
    }
}

/// Plans the calls sending `natives`.
pub fn plan(natives: Vec<Segment>) -> Vec<Outgoing> {
    let mut reply_to = None;
    let mut pending: Option<TextData> = None;
    let mut calls = Vec::new();

    for native in natives {
        let call = match native {
            Segment::Reply(data) => {
                reply_to = Some(data.message_id);
                continue;
            }
            Segment::Text(data) => {
                match &mut pending {
                    Some(text) => text.append(data),
                    None => pending = Some(data),
                }
                continue;
            }
            Segment::Photo(f) => Outgoing::new("sendPhoto", json!({ "photo": f.file })),
            Segment::Voice(f) => Outgoing::new("sendVoice", json!({ "voice": f.file })),
            Segment::Audio(f) => Outgoing::new("sendAudio", json!({ "audio": f.file })),
            Segment::Video(f) => Outgoing::new("sendVideo", json!({ "video": f.file })),
            Segment::Animation(f) => {
                Outgoing::new("sendAnimation", json!({ "animation": f.file }))
            }
            Segment::Document(f) => Outgoing::new("sendDocument", json!({ "document": f.file })),
            Segment::Sticker(s) => Outgoing::new("sendSticker", json!({ "sticker": s.file })),
            Segment::Location(l) => Outgoing::new(
                "sendLocation",
                json!({ "latitude": l.latitude, "longitude": l.longitude }),
            ),
            Segment::Dice(d) => Outgoing::new("sendDice", json!({ "emoji": d.emoji })),
        };
        flush(&mut pending, &mut calls);
        calls.push(call);
    }
    flush(&mut pending, &mut calls);

    if let (Some(message_id), Some(first)) = (reply_to, calls.first_mut()) {
        first
            .params
            .insert("reply_parameters".into(), json!({ "message_id": message_id }));
    }
    calls
}

/// Chat addressing for a target; forum topics are channels of a group.
fn chat_params(target: &Target) -> UnisegResult<Map<String, Value>> {
    let id_value = |id: &str| match id.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(id),
    };

    let mut params = Map::new();
    if target.channel {
        let Some(chat) = &target.parent_id else {
            return Err(UnisegError::TargetNotFound(format!(
                "{target} (topic without a chat)"
            )));
        };
        let thread: i64 = target.id.parse().map_err(|_| {
            UnisegError::TargetNotFound(format!("{target} (topic id is not numeric)"))
        })?;
        params.insert("chat_id".into(), id_value(chat));
        params.insert("message_thread_id".into(), Value::from(thread));
    } else {
        params.insert("chat_id".into(), id_value(&target.id));
    }
    Ok(params)
}

// =============================================================================
// TelegramBot
// =============================================================================

/// A Telegram bot account.
pub struct TelegramBot {
    self_id: String,
    caller: Arc<dyn ApiCaller>,
    builder: Arc<MessageBuilder<Segment>>,
    exporter: Arc<MessageExporter<Segment>>,
}

impl TelegramBot {
    pub fn new(self_id: impl Into<String>, caller: Arc<dyn ApiCaller>) -> Self {
        Self::with_tables(
            self_id,
            caller,
            Arc::new(Telegram::builder()),
            Arc::new(Telegram::exporter()),
        )
    }

    /// Creates a bot sharing tables registered elsewhere.
    pub fn with_tables(
        self_id: impl Into<String>,
        caller: Arc<dyn ApiCaller>,
        builder: Arc<MessageBuilder<Segment>>,
        exporter: Arc<MessageExporter<Segment>>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            caller,
            builder,
            exporter,
        }
    }

    /// Converts a received Bot API message.
    pub fn receive(&self, message: ApiMessage) -> UnisegResult<UniMessage> {
        self.builder.generate_sync(&message.into_segments())
    }

    /// Calls a Bot API method and unwraps its `result`.
    pub async fn call_api(&self, method: &str, params: Value) -> ApiResult<Value> {
        let response = self.caller.call(method, params).await?;
        trace!(response = %response, "API response");

        if response.get("ok").and_then(Value::as_bool) == Some(false) {
            let retcode = response
                .get("error_code")
                .and_then(Value::as_i64)
                .unwrap_or(-1);
            let message = response
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ApiError::ApiError { retcode, message });
        }

        Ok(response.get("result").cloned().unwrap_or(response))
    }

    /// Returns the bot's own account.
    pub async fn get_me(&self) -> ApiResult<User> {
        Ok(serde_json::from_value(self.call_api("getMe", json!({})).await?)?)
    }

    /// Deletes a message.
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> ApiResult<()> {
        self.call_api(
            "deleteMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    async fn send_call(&self, call: Outgoing) -> ApiResult<ApiMessage> {
        let result = self.call_api(call.method, Value::Object(call.params)).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl Bot for TelegramBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn adapter(&self) -> &str {
        Telegram::NAME
    }

    fn scope(&self) -> &str {
        Telegram::SCOPE
    }

    async fn send(
        &self,
        target: &Target,
        message: &UniMessage,
        fallback: FallbackPolicy,
    ) -> UnisegResult<Receipt> {
        let chat = chat_params(target)?;
        let natives = self
            .exporter
            .export(message, Some(self as &dyn Bot), fallback)
            .await?;

        let calls = plan(natives.into_segments());
        if calls.is_empty() {
            return Err(UnisegError::NullMessage);
        }

        let mut message_ids = Vec::with_capacity(calls.len());
        for mut call in calls {
            call.params.extend(chat.clone());
            let sent = self.send_call(call).await?;
            message_ids.push(sent.message_id.to_string());
        }

        debug!(to = %target, ids = ?message_ids, "Sent Telegram message");
        Ok(Receipt::new(target.clone(), message_ids))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
