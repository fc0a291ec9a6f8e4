//! OneBot v11 bot implementation.
//!
//! `OneBotBot` implements the [`Bot`] trait on top of an [`ApiCaller`] and
//! also exposes strongly-typed methods for the OneBot APIs it uses.
//!
//! # Usage
//!
//! ```rust,ignore
//! use uniseg_adapter_onebot::OneBotBot;
//! use uniseg_core::{ChannelApiCaller, Target, FallbackPolicy};
//!
//! let caller = Arc::new(ChannelApiCaller::new(request_tx));
//! let bot = Arc::new(OneBotBot::new("10001", caller));
//!
//! let target = Target::group("123456").with_adapter("onebot");
//! bot.send(&target, &"Hello!".into(), FallbackPolicy::Text).await?;
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, trace};
use uniseg_core::cache::DEFAULT_CAPACITY;
use uniseg_core::{
    ApiCaller, ApiError, ApiResult, Bot, BoxedBot, FallbackPolicy, LruCache, Media, MediaSource,
    MessageBuilder, MessageExporter, Platform, Receipt, SegmentKind, Target, TargetFilter,
    UniMessage, UnisegError, UnisegResult,
};

use crate::OneBot;
use crate::model::api::{FriendInfo, GetMsgResponse, GroupInfo, LoginInfo};
use crate::model::segment::{OneBotMessage, Segment};

// =============================================================================
// OneBotBot
// =============================================================================

/// A OneBot v11 bot connection.
pub struct OneBotBot {
    self_id: String,
    caller: Arc<dyn ApiCaller>,
    builder: Arc<MessageBuilder<Segment>>,
    exporter: Arc<MessageExporter<Segment>>,
    /// Messages fetched for quoted replies, keyed by message id. A cell is
    /// filled by whichever caller asked first.
    message_cache: Mutex<LruCache<String, Arc<OnceCell<UniMessage>>>>,
}

impl OneBotBot {
    /// Creates a bot with the default OneBot tables.
    pub fn new(self_id: impl Into<String>, caller: Arc<dyn ApiCaller>) -> Self {
        Self::with_tables(
            self_id,
            caller,
            Arc::new(OneBot::builder()),
            Arc::new(OneBot::exporter()),
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
            message_cache: Mutex::new(LruCache::new(DEFAULT_CAPACITY)),
        }
    }

    /// Sets how many fetched messages are remembered.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.message_cache = Mutex::new(LruCache::new(capacity));
        self
    }

    pub fn caller(&self) -> &Arc<dyn ApiCaller> {
        &self.caller
    }

    /// Converts a received message, fetching quoted replies.
    pub async fn receive(self: &Arc<Self>, natives: &[Segment]) -> UnisegResult<UniMessage> {
        let bot: BoxedBot = self.clone();
        self.builder.generate(natives, &bot).await
    }

    /// Calls an API and unwraps the OneBot response envelope.
    pub async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        let response = self.caller.call(action, params).await?;
        trace!(response = %response, "API response");

        if let Some(retcode) = response.get("retcode").and_then(Value::as_i64)
            && retcode != 0
        {
            let message = response
                .get("message")
                .or_else(|| response.get("wording"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ApiError::ApiError { retcode, message });
        }

        Ok(response.get("data").cloned().unwrap_or(response))
    }

    /// Lists every friend and group reachable by this bot.
    pub async fn fetch_targets(&self, filter: &TargetFilter) -> Vec<ApiResult<Target>> {
        let mut targets = Vec::new();
        if filter.channel == Some(true) {
            return targets;
        }

        if filter.private != Some(false) {
            match self.get_friend_list().await {
                Ok(friends) => targets.extend(
                    friends
                        .into_iter()
                        .map(|f| Ok(self.target(Target::private(f.user_id.to_string())))),
                ),
                Err(e) => targets.push(Err(e)),
            }
        }

        if filter.private != Some(true) {
            match self.get_group_list().await {
                Ok(groups) => targets.extend(
                    groups
                        .into_iter()
                        .map(|g| Ok(self.target(Target::group(g.group_id.to_string())))),
                ),
                Err(e) => targets.push(Err(e)),
            }
        }

        targets.retain(|t| t.as_ref().map_or(true, |t| filter.matches(t)));
        targets
    }

    fn target(&self, target: Target) -> Target {
        target
            .with_adapter(OneBot::NAME)
            .with_scope(OneBot::SCOPE)
            .with_self_id(self.self_id.clone())
    }
}

fn parse_id(target: &Target) -> UnisegResult<i64> {
    target
        .id
        .parse()
        .map_err(|_| UnisegError::TargetNotFound(format!("{target} (id is not numeric)")))
}

/// Forward bundles need their own API call. Each reference becomes its own
/// batch and the segments between references stay together, in order.
fn split_batches(message: &UniMessage) -> Vec<UniMessage> {
    let mut batches = Vec::new();
    let mut run = UniMessage::new();
    for segment in message {
        if segment.kind() == SegmentKind::Reference {
            if !run.is_empty() {
                batches.push(std::mem::take(&mut run));
            }
            batches.push(UniMessage::from(segment.clone()));
        } else {
            run.push(segment.clone());
        }
    }
    if !run.is_empty() {
        batches.push(run);
    }
    batches
}

// =============================================================================
// Bot Trait Implementation
// =============================================================================

#[async_trait]
impl Bot for OneBotBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn adapter(&self) -> &str {
        OneBot::NAME
    }

    fn scope(&self) -> &str {
        OneBot::SCOPE
    }

    async fn send(
        &self,
        target: &Target,
        message: &UniMessage,
        fallback: FallbackPolicy,
    ) -> UnisegResult<Receipt> {
        if target.channel {
            return Err(UnisegError::TargetNotFound(format!(
                "{target} (OneBot has no channels)"
            )));
        }
        let id = parse_id(target)?;

        // Everything is exported before the first call so a failing
        // segment sends nothing.
        let mut batches = Vec::new();
        for batch in split_batches(message) {
            let natives = self
                .exporter
                .export(&batch, Some(self as &dyn Bot), fallback)
                .await?;
            if !natives.is_empty() {
                batches.push(natives);
            }
        }
        if batches.is_empty() {
            return Err(UnisegError::NullMessage);
        }

        let mut message_ids = Vec::with_capacity(batches.len());
        for natives in batches {
            let forward = natives.iter().all(Segment::is_node);
            let message_id = match (forward, target.private) {
                (true, true) => self.send_private_forward_msg(id, &natives).await?,
                (true, false) => self.send_group_forward_msg(id, &natives).await?,
                (false, true) => self.send_private_msg(id, &natives).await?,
                (false, false) => self.send_group_msg(id, &natives).await?,
            };
            message_ids.push(message_id.to_string());
        }

        debug!(to = %target, ids = ?message_ids, "Sent OneBot message");
        Ok(Receipt::new(target.clone(), message_ids))
    }

    /// OneBot implementations read `base64://` and `file://` sources
    /// directly, so nothing is uploaded ahead of time.
    async fn upload(&self, _kind: SegmentKind, media: &Media) -> ApiResult<Option<String>> {
        match &media.source {
            Some(MediaSource::Raw(raw)) => Ok(Some(format!("base64://{}", STANDARD.encode(raw)))),
            Some(MediaSource::Path(path)) => {
                let path = std::path::absolute(path).map_err(|e| ApiError::Other(e.to_string()))?;
                Ok(Some(format!("file://{}", path.display())))
            }
            _ => Ok(media.url().map(str::to_owned)),
        }
    }

    /// Concurrent fetches of one id share a single `get_msg` call.
    async fn fetch_message(&self, message_id: &str) -> UnisegResult<UniMessage> {
        let cell = {
            let mut cache = self.message_cache.lock();
            match cache.get(&message_id.to_string()) {
                Some(cell) => cell,
                None => {
                    let cell = Arc::new(OnceCell::new());
                    cache.put(message_id.to_string(), cell.clone());
                    cell
                }
            }
        };
        if cell.initialized() {
            trace!(message_id = %message_id, "Message cache hit");
        }

        let message = cell
            .get_or_try_init(|| async {
                let id = message_id
                    .parse()
                    .map_err(|_| ApiError::Other(format!("invalid message id: {message_id}")))?;
                let response = self.get_msg(id).await?;
                // Quotes inside quotes are not fetched.
                self.builder.generate_sync(&response.message)
            })
            .await?;
        Ok(message.clone())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// =========================================================================
// Message APIs
// =========================================================================

macro_rules! impl_api {
    // No return value
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<()> {
            self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(())
        }
    };
    // Returns a type T deserialized from "data"
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(serde_json::from_value::<$ret>(result)?)
        }
    };
    // Returns a specific field from "data"
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty, $field:expr $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            result
                .get($field)
                .cloned()
                .and_then(|v| serde_json::from_value::<$ret>(v).ok())
                .ok_or_else(|| ApiError::SerializationError(format!("Missing {}", $field)))
        }
    };
}

impl OneBotBot {
    impl_api!(
        /// Sends a private message.
        send_private_msg,
        (user_id: i64, message: &OneBotMessage) -> i64,
        "message_id"
    );

    impl_api!(
        /// Sends a group message.
        send_group_msg,
        (group_id: i64, message: &OneBotMessage) -> i64,
        "message_id"
    );

    impl_api!(
        /// Sends forward nodes to a user.
        send_private_forward_msg,
        (user_id: i64, messages: &OneBotMessage) -> i64,
        "message_id"
    );

    impl_api!(
        /// Sends forward nodes to a group.
        send_group_forward_msg,
        (group_id: i64, messages: &OneBotMessage) -> i64,
        "message_id"
    );

    impl_api!(
        /// Deletes (recalls) a message.
        delete_msg,
        (message_id: i64)
    );

    impl_api!(
        /// Gets a message by ID.
        get_msg,
        (message_id: i64) -> GetMsgResponse
    );

    impl_api!(
        /// Gets the bot's own account.
        get_login_info,
        () -> LoginInfo
    );

    impl_api!(
        /// Lists friends.
        get_friend_list,
        () -> Vec<FriendInfo>
    );

    impl_api!(
        /// Lists joined groups.
        get_group_list,
        () -> Vec<GroupInfo>
    );
}

// =============================================================================
// Tests
// =============================================================================
