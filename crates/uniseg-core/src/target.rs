//! Platform-independent conversation addresses.
//!
//! A [`Target`] names a private chat, group, guild channel or similar by
//! `id` and optional `parent_id`. Targets serialize to a stable JSON object
//! and can be restored later to send proactively:
//!
//! ```rust,ignore
//! let target = Target::group("10086").with_adapter("onebot");
//! let stored = target.dump(false);
//! let restored = Target::load(stored)?;
//! restored.send(&bots, UniMessage::text("hello"), FallbackPolicy::Text).await?;
//! ```

use std::fmt::{self, Display};

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::bot::{BotSet, BoxedBot, Receipt};
use crate::error::{ApiResult, UnisegError, UnisegResult};
use crate::exporter::FallbackPolicy;
use crate::message::UniMessage;

// ============================================================================
// Target
// ============================================================================

/// A conversation address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Conversation id (user id for private chats).
    pub id: String,
    /// Owning guild/group id for channels.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// True for guild channels.
    #[serde(default)]
    pub channel: bool,
    /// True for one-to-one chats.
    #[serde(default)]
    pub private: bool,
    /// Adapter that can reach this target.
    #[serde(default)]
    pub adapter: Option<String>,
    /// Platform family that can reach this target.
    #[serde(default)]
    pub scope: Option<String>,
    /// Preferred bot account.
    #[serde(default)]
    pub self_id: Option<String>,
}

impl Target {
    /// A group or guild conversation.
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// A one-to-one conversation.
    pub fn private(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            private: true,
            ..Default::default()
        }
    }

    /// A channel inside a guild.
    pub fn channel(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(parent_id.into()),
            channel: true,
            ..Default::default()
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_self_id(mut self, self_id: impl Into<String>) -> Self {
        self.self_id = Some(self_id.into());
        self
    }

    /// Serializes to a JSON object with sorted keys.
    ///
    /// With `only_scope`, the bot account and adapter are dropped so that
    /// targets reachable through any adapter of the same family compare
    /// equal.
    pub fn dump(&self, only_scope: bool) -> Value {
        let opt = |value: &Option<String>| value.clone().map_or(Value::Null, Value::String);

        // Keys are inserted alphabetically so the order holds with any map backend.
        let mut map = Map::new();
        if !only_scope {
            map.insert("adapter".into(), opt(&self.adapter));
        }
        map.insert("channel".into(), Value::Bool(self.channel));
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert("parent_id".into(), opt(&self.parent_id));
        map.insert("private".into(), Value::Bool(self.private));
        map.insert("scope".into(), opt(&self.scope));
        if !only_scope {
            map.insert("self_id".into(), opt(&self.self_id));
        }
        Value::Object(map)
    }

    /// Restores a target from [`dump`](Self::dump) output.
    pub fn load(value: Value) -> UnisegResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns true if `bot` can reach this target.
    pub fn accepts(&self, bot: &BoxedBot) -> bool {
        self.adapter.as_deref().is_none_or(|a| a == bot.adapter())
            && self.scope.as_deref().is_none_or(|s| s == bot.scope())
            && self.self_id.as_deref().is_none_or(|id| id == bot.self_id())
    }

    /// Picks a live connection for this target.
    ///
    /// The first registered bot matching adapter, scope and account wins.
    pub fn select(&self, bots: &BotSet) -> UnisegResult<BoxedBot> {
        if self.adapter.is_none() && self.scope.is_none() {
            return Err(UnisegError::TargetNotFound(format!(
                "{self} (neither adapter nor scope set)"
            )));
        }
        bots.all()
            .into_iter()
            .find(|bot| self.accepts(bot))
            .ok_or_else(|| UnisegError::TargetNotFound(self.to_string()))
    }

    /// Sends `message` through the selected connection.
    pub async fn send(
        &self,
        bots: &BotSet,
        message: impl Into<UniMessage>,
        fallback: FallbackPolicy,
    ) -> UnisegResult<Receipt> {
        let bot = self.select(bots)?;
        debug!(to = %self, bot = %bot.self_id(), "Sending to target");
        bot.send(self, &message.into(), fallback).await
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match (self.private, self.channel) {
            (true, _) => "private",
            (_, true) => "channel",
            _ => "group",
        };
        match &self.parent_id {
            Some(parent) => write!(f, "{prefix}:{parent}/{}", self.id)?,
            None => write!(f, "{prefix}:{}", self.id)?,
        }
        if let Some(adapter) = self.adapter.as_deref().or(self.scope.as_deref()) {
            write!(f, "@{adapter}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Target Filter
// ============================================================================

/// A partially specified target used to filter fetched targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub channel: Option<bool>,
    pub private: Option<bool>,
}

impl TargetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn channel(mut self, channel: bool) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    /// Returns true if every set field equals the target's.
    pub fn matches(&self, target: &Target) -> bool {
        self.id.as_ref().is_none_or(|id| *id == target.id)
            && self
                .parent_id
                .as_ref()
                .is_none_or(|p| target.parent_id.as_ref() == Some(p))
            && self.channel.is_none_or(|c| c == target.channel)
            && self.private.is_none_or(|p| p == target.private)
    }
}

// ============================================================================
// Target Fetcher
// ============================================================================

/// Enumerates the conversations reachable from a live connection.
pub trait TargetFetcher: Send + Sync {
    /// Adapter whose bots this fetcher understands.
    fn adapter(&self) -> &str;

    /// Streams every reachable target accepted by `filter`.
    ///
    /// Bots of other adapters yield an empty stream.
    fn fetch(&self, bot: BoxedBot, filter: TargetFilter) -> BoxStream<'static, ApiResult<Target>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::tests::RecordingBot;

    #[test]
    fn test_dump_is_stable() {
        let a = Target::group("1").with_adapter("onebot").with_self_id("100");
        let b = Target::group("1").with_adapter("onebot").with_self_id("200");
        assert_eq!(a.dump(true), b.dump(true));
        assert_ne!(a.dump(false), b.dump(false));
        assert_ne!(a.dump(true), Target::group("2").dump(true));

        let text = serde_json::to_string(&a.dump(false)).unwrap();
        assert_eq!(
            text,
            r#"{"adapter":"onebot","channel":false,"id":"1","parent_id":null,"private":false,"scope":null,"self_id":"100"}"#
        );
    }

    #[test]
    fn test_load_round_trip() {
        let target = Target::channel("c1", "g1").with_scope("discord");
        let restored = Target::load(target.dump(false)).unwrap();
        assert_eq!(restored, target);
        let sparse = Target::load(serde_json::json!({"id": "9", "private": true})).unwrap();
        assert_eq!(sparse, Target::private("9"));
    }

    #[test]
    fn test_filter() {
        let filter = TargetFilter::new().private(true);
        assert!(filter.matches(&Target::private("1")));
        assert!(!filter.matches(&Target::group("1")));
        assert!(TargetFilter::new().parent_id("g").matches(&Target::channel("c", "g")));
    }

    #[tokio::test]
    async fn test_select_first_registered() {
        let bots = BotSet::new();
        bots.register(RecordingBot::new("telegram", "telegram", "t"));
        bots.register(RecordingBot::new("onebot", "qq", "1"));
        bots.register(RecordingBot::new("onebot", "qq", "2"));

        let target = Target::group("10").with_scope("qq");
        assert_eq!(target.select(&bots).unwrap().self_id(), "1");

        let pinned = target.clone().with_self_id("2");
        let receipt = pinned.send(&bots, "hi", FallbackPolicy::Text).await.unwrap();
        assert_eq!(receipt.target, pinned);
        assert_eq!(receipt.message_ids, vec!["1".to_string()]);
    }

    #[test]
    fn test_select_without_route() {
        let bots = BotSet::new();
        bots.register(RecordingBot::new("onebot", "qq", "1"));
        let err = Target::group("10").select(&bots).err().unwrap();
        assert!(matches!(err, UnisegError::TargetNotFound(_)));
        let err = Target::group("10").with_adapter("telegram").select(&bots).err().unwrap();
        assert!(matches!(err, UnisegError::TargetNotFound(_)));
    }
}
