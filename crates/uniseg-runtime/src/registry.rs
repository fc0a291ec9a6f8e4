//! Registry of platforms known to the runtime.
//!
//! Each registered [`Platform`] contributes one shared builder table and one
//! shared exporter table. Tables are stored type-erased and recovered by the
//! platform type, so callers never name the native segment type twice.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::RwLock;
use tracing::{debug, warn};

use uniseg_core::{
    ApiResult, BotSet, MessageBuilder, MessageExporter, Platform, Target, TargetFetcher,
    TargetFilter,
};

type ErasedTable = Arc<dyn Any + Send + Sync>;

struct PlatformEntry {
    scope: &'static str,
    builder: ErasedTable,
    exporter: ErasedTable,
}

/// Builder and exporter tables plus target fetchers, keyed by platform name.
#[derive(Default)]
pub struct ConversionRegistry {
    platforms: RwLock<HashMap<String, PlatformEntry>>,
    fetchers: RwLock<HashMap<String, Arc<dyn TargetFetcher>>>,
}

impl ConversionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `P` with its default tables.
    pub fn register<P: Platform>(&self) {
        self.register_with::<P>(P::builder(), P::exporter());
    }

    /// Registers `P` with caller-supplied tables.
    pub fn register_with<P: Platform>(
        &self,
        builder: MessageBuilder<P::Native>,
        exporter: MessageExporter<P::Native>,
    ) {
        let entry = PlatformEntry {
            scope: P::SCOPE,
            builder: Arc::new(builder),
            exporter: Arc::new(exporter),
        };
        if self
            .platforms
            .write()
            .insert(P::NAME.to_string(), entry)
            .is_some()
        {
            warn!(platform = P::NAME, "Platform tables replaced");
        } else {
            debug!(platform = P::NAME, scope = P::SCOPE, "Registered platform");
        }
    }

    /// Returns true if a platform named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.platforms.read().contains_key(name)
    }

    /// Registered platform names, sorted.
    pub fn platforms(&self) -> Vec<String> {
        let mut names: Vec<_> = self.platforms.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Scope of a registered platform.
    pub fn scope_of(&self, name: &str) -> Option<&'static str> {
        self.platforms.read().get(name).map(|entry| entry.scope)
    }

    /// Shared builder table of `P`.
    pub fn builder<P: Platform>(&self) -> Option<Arc<MessageBuilder<P::Native>>> {
        let table = self.platforms.read().get(P::NAME)?.builder.clone();
        table.downcast::<MessageBuilder<P::Native>>().ok()
    }

    /// Shared exporter table of `P`.
    pub fn exporter<P: Platform>(&self) -> Option<Arc<MessageExporter<P::Native>>> {
        let table = self.platforms.read().get(P::NAME)?.exporter.clone();
        table.downcast::<MessageExporter<P::Native>>().ok()
    }

    // =========================================================================
    // Target fetching
    // =========================================================================

    /// Registers the target fetcher of an adapter.
    pub fn register_fetcher(&self, fetcher: Arc<dyn TargetFetcher>) {
        let adapter = fetcher.adapter().to_string();
        if self.fetchers.write().insert(adapter.clone(), fetcher).is_some() {
            warn!(adapter = %adapter, "Target fetcher replaced");
        }
    }

    /// Streams the targets reachable by every bot in `bots`.
    ///
    /// Bots are visited in registration order; bots without a fetcher are
    /// skipped.
    pub fn fetch_targets(
        &self,
        bots: &BotSet,
        filter: TargetFilter,
    ) -> BoxStream<'static, ApiResult<Target>> {
        let fetchers = self.fetchers.read();
        let streams: Vec<_> = bots
            .all()
            .into_iter()
            .filter_map(|bot| match fetchers.get(bot.adapter()) {
                Some(fetcher) => Some(fetcher.fetch(bot, filter.clone())),
                None => {
                    debug!(adapter = %bot.adapter(), self_id = %bot.self_id(), "No target fetcher");
                    None
                }
            })
            .collect();
        stream::iter(streams).flatten().boxed()
    }
}

impl std::fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionRegistry")
            .field("platforms", &self.platforms())
            .field("fetchers", &self.fetchers.read().len())
            .finish()
    }
}
