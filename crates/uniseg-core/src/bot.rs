//! Live platform connections.
//!
//! A [`Bot`] wraps one authenticated connection of some adapter. It owns
//! its platform's exporter, so sending a [`UniMessage`] only needs a
//! [`Target`] and a [`FallbackPolicy`].

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult, UnisegResult};
use crate::exporter::FallbackPolicy;
use crate::message::UniMessage;
use crate::segment::{Media, SegmentKind};
use crate::target::Target;

/// What a successful send returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Where the message went.
    pub target: Target,
    /// Platform ids of the sent message(s).
    pub message_ids: Vec<String>,
}

impl Receipt {
    pub fn new(target: Target, message_ids: Vec<String>) -> Self {
        Self {
            target,
            message_ids,
        }
    }

    /// A reply marker pointing at the first sent message.
    pub fn reply_to(&self) -> Option<crate::segment::Segment> {
        self.message_ids.first().map(crate::segment::Segment::reply)
    }
}

/// An active bot connection.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// The bot's own account id.
    fn self_id(&self) -> &str;

    /// Adapter name, e.g. `onebot`.
    fn adapter(&self) -> &str;

    /// Platform family, e.g. `qq`.
    fn scope(&self) -> &str;

    /// Exports `message` and sends it to `target`.
    async fn send(
        &self,
        target: &Target,
        message: &UniMessage,
        fallback: FallbackPolicy,
    ) -> UnisegResult<Receipt>;

    /// Uploads media that has no inline URL.
    ///
    /// Returns `Ok(None)` when the platform has no upload path.
    async fn upload(&self, _kind: SegmentKind, _media: &Media) -> ApiResult<Option<String>> {
        Ok(None)
    }

    /// Retrieves an earlier message as a universal message.
    async fn fetch_message(&self, _message_id: &str) -> UnisegResult<UniMessage> {
        Err(ApiError::NotSupported.into())
    }

    /// Converts to `Arc<dyn Any>` for downcasting to the concrete bot.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Type alias for a boxed Bot.
pub type BoxedBot = Arc<dyn Bot>;

/// Downcasts a boxed bot to its concrete type.
pub fn downcast_bot<T: Bot>(bot: BoxedBot) -> Option<Arc<T>> {
    bot.as_any().downcast::<T>().ok()
}

// =============================================================================
// BotSet
// =============================================================================

/// The live connections known to the process, in registration order.
#[derive(Default)]
pub struct BotSet {
    bots: RwLock<Vec<BoxedBot>>,
}

impl BotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Returns `false` if an identical
    /// `(adapter, self_id)` pair is already present.
    pub fn register(&self, bot: BoxedBot) -> bool {
        let mut bots = self.bots.write();
        if bots
            .iter()
            .any(|b| b.adapter() == bot.adapter() && b.self_id() == bot.self_id())
        {
            warn!(adapter = %bot.adapter(), self_id = %bot.self_id(), "Bot already registered");
            return false;
        }
        info!(adapter = %bot.adapter(), self_id = %bot.self_id(), "Bot registered");
        bots.push(bot);
        true
    }

    /// Removes a connection.
    pub fn unregister(&self, adapter: &str, self_id: &str) -> Option<BoxedBot> {
        let mut bots = self.bots.write();
        let index = bots
            .iter()
            .position(|b| b.adapter() == adapter && b.self_id() == self_id)?;
        info!(adapter = %adapter, self_id = %self_id, "Bot unregistered");
        Some(bots.remove(index))
    }

    /// Finds a connection by account id.
    pub fn get(&self, self_id: &str) -> Option<BoxedBot> {
        self.bots.read().iter().find(|b| b.self_id() == self_id).cloned()
    }

    /// Snapshot of every connection.
    pub fn all(&self) -> Vec<BoxedBot> {
        self.bots.read().clone()
    }

    pub fn len(&self) -> usize {
        self.bots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.read().is_empty()
    }
}

impl std::fmt::Debug for BotSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bots = self.bots.read();
        f.debug_list()
            .entries(bots.iter().map(|b| format!("{}:{}", b.adapter(), b.self_id())))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use parking_lot::Mutex;

    use super::*;

    /// A bot that records what it was asked to send.
    pub(crate) struct RecordingBot {
        pub self_id: String,
        pub adapter: String,
        pub scope: String,
        pub sent: Mutex<Vec<(Target, UniMessage)>>,
    }

    impl RecordingBot {
        pub(crate) fn new(adapter: &str, scope: &str, self_id: &str) -> Arc<Self> {
            Arc::new(Self {
                self_id: self_id.into(),
                adapter: adapter.into(),
                scope: scope.into(),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Bot for RecordingBot {
        fn self_id(&self) -> &str {
            &self.self_id
        }

        fn adapter(&self) -> &str {
            &self.adapter
        }

        fn scope(&self) -> &str {
            &self.scope
        }

        async fn send(
            &self,
            target: &Target,
            message: &UniMessage,
            _fallback: FallbackPolicy,
        ) -> UnisegResult<Receipt> {
            let mut sent = self.sent.lock();
            sent.push((target.clone(), message.clone()));
            Ok(Receipt::new(target.clone(), vec![sent.len().to_string()]))
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn test_register_and_downcast() {
        let set = BotSet::new();
        assert!(set.register(RecordingBot::new("demo", "demo", "1")));
        assert!(!set.register(RecordingBot::new("demo", "demo", "1")));
        assert!(set.register(RecordingBot::new("demo", "demo", "2")));
        assert_eq!(set.len(), 2);

        let bot = set.get("2").unwrap();
        let concrete = downcast_bot::<RecordingBot>(bot).unwrap();
        assert_eq!(concrete.self_id, "2");

        assert!(set.unregister("demo", "1").is_some());
        assert!(set.get("1").is_none());
    }

    #[tokio::test]
    async fn test_default_capabilities() {
        let bot = RecordingBot::new("demo", "demo", "1");
        let upload = bot
            .upload(SegmentKind::Image, &Media::from_raw(vec![0u8]))
            .await
            .unwrap();
        assert!(upload.is_none());
        let err = bot.fetch_message("1").await.unwrap_err();
        assert!(matches!(err, crate::error::UnisegError::Api(ApiError::NotSupported)));
    }
}
