//! Enumerates the friends and groups of OneBot bots.

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use uniseg_core::{ApiResult, BoxedBot, Platform, Target, TargetFetcher, TargetFilter, downcast_bot};

use crate::OneBot;
use crate::bot::OneBotBot;

/// [`TargetFetcher`] for [`OneBotBot`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneBotTargetFetcher;

impl TargetFetcher for OneBotTargetFetcher {
    fn adapter(&self) -> &str {
        OneBot::NAME
    }

    fn fetch(&self, bot: BoxedBot, filter: TargetFilter) -> BoxStream<'static, ApiResult<Target>> {
        let Some(bot) = downcast_bot::<OneBotBot>(bot) else {
            return stream::empty().boxed();
        };
        stream::once(async move { stream::iter(bot.fetch_targets(&filter).await) })
            .flatten()
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::TryStreamExt;

    use super::*;
    use crate::testing::{MockCaller, NotOneBot};

    fn bot() -> BoxedBot {
        Arc::new(OneBotBot::new("10001", Arc::new(MockCaller::default())))
    }

    #[tokio::test]
    async fn test_fetch_all() {
        let targets: Vec<Target> = OneBotTargetFetcher
            .fetch(bot(), TargetFilter::new())
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<_> = targets.iter().map(|t| (t.id.as_str(), t.private)).collect();
        assert_eq!(ids, vec![("111", true), ("222", true), ("900", false)]);
        assert!(targets.iter().all(|t| t.adapter.as_deref() == Some("onebot")
            && t.scope.as_deref() == Some("qq")
            && t.self_id.as_deref() == Some("10001")));
    }

    #[tokio::test]
    async fn test_fetch_filtered() {
        let groups: Vec<Target> = OneBotTargetFetcher
            .fetch(bot(), TargetFilter::new().private(false))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(groups, vec![Target::group("900")
            .with_adapter("onebot")
            .with_scope("qq")
            .with_self_id("10001")]);

        let one: Vec<Target> = OneBotTargetFetcher
            .fetch(bot(), TargetFilter::new().id("222"))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(one.len(), 1);

        let channels: Vec<Target> = OneBotTargetFetcher
            .fetch(bot(), TargetFilter::new().channel(true))
            .try_collect()
            .await
            .unwrap();
        assert!(channels.is_empty());
    }

    #[tokio::test]
    async fn test_other_bots_skipped() {
        let count = OneBotTargetFetcher
            .fetch(Arc::new(NotOneBot), TargetFilter::new())
            .count()
            .await;
        assert_eq!(count, 0);
    }
}
