//! Runtime glue: configuration, platform tables and live bots.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use uniseg_runtime::UnisegRuntime;
//!
//! let runtime = UnisegRuntime::load()?;
//! runtime.register_platform::<OneBot>();
//!
//! let bot = OneBotBot::with_tables(
//!     "10001",
//!     caller,
//!     runtime.builder::<OneBot>()?,
//!     runtime.exporter::<OneBot>()?,
//! );
//! runtime.register_bot(Arc::new(bot))?;
//!
//! runtime.send(&Target::group("123").with_adapter("onebot"), "hello").await?;
//! ```

use std::sync::Arc;

use futures::stream::BoxStream;
use tracing::{debug, info};

use serde_json::Value;
use tokio::sync::mpsc;
use uniseg_core::{
    ApiResult, Bot, BotSet, BoxedBot, ChannelApiCaller, LruCache, MessageBuilder, MessageExporter, NativeMessage,
    Platform, Receipt, Target, TargetFetcher, TargetFilter, UniMessage,
};

use crate::config::{ConfigLoader, UnisegConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::ConversionRegistry;

/// Owns the configuration, the platform registry and the live bot set.
#[derive(Debug)]
pub struct UnisegRuntime {
    config: UnisegConfig,
    registry: ConversionRegistry,
    bots: Arc<BotSet>,
}

impl UnisegRuntime {
    /// Creates a runtime without touching the global logger.
    pub fn new(config: UnisegConfig) -> Self {
        Self {
            config,
            registry: ConversionRegistry::new(),
            bots: Arc::new(BotSet::new()),
        }
    }

    /// Creates a runtime and initializes logging from `config`.
    pub fn from_config(config: &UnisegConfig) -> Self {
        logging::init_from_config(&config.logging);
        info!(
            log_level = %config.logging.level,
            fallback = ?config.convert.fallback,
            "Runtime initialized from configuration"
        );
        Self::new(config.clone())
    }

    /// Loads configuration from the usual sources, then calls
    /// [`from_config`](Self::from_config).
    pub fn load() -> RuntimeResult<Self> {
        let config = ConfigLoader::new().load()?;
        Ok(Self::from_config(&config))
    }

    pub fn config(&self) -> &UnisegConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConversionRegistry {
        &self.registry
    }

    pub fn bots(&self) -> &Arc<BotSet> {
        &self.bots
    }

    // =========================================================================
    // Platforms
    // =========================================================================

    /// Registers `P`, applying the configured whitespace handling.
    pub fn register_platform<P: Platform>(&self) {
        let mut builder = P::builder();
        builder.strip_whitespace(self.config.convert.strip_whitespace);
        self.registry.register_with::<P>(builder, P::exporter());
    }

    /// Shared builder table of `P`.
    pub fn builder<P: Platform>(&self) -> RuntimeResult<Arc<MessageBuilder<P::Native>>> {
        self.registry
            .builder::<P>()
            .ok_or_else(|| RuntimeError::PlatformNotFound(P::NAME.to_string()))
    }

    /// Shared exporter table of `P`.
    pub fn exporter<P: Platform>(&self) -> RuntimeResult<Arc<MessageExporter<P::Native>>> {
        self.registry
            .exporter::<P>()
            .ok_or_else(|| RuntimeError::PlatformNotFound(P::NAME.to_string()))
    }

    /// An empty cache sized by `convert.cache_capacity`.
    pub fn new_cache<K, V>(&self) -> LruCache<K, V>
    where
        K: std::hash::Hash + Eq + Clone,
        V: Clone,
    {
        LruCache::new(self.config.convert.cache_capacity)
    }

    /// A channel caller waiting `convert.api_timeout_secs` per call.
    pub fn channel_caller(&self, request_tx: mpsc::Sender<Value>) -> ChannelApiCaller {
        ChannelApiCaller::new(request_tx).with_timeout(self.config.convert.api_timeout())
    }

    // =========================================================================
    // Bots
    // =========================================================================

    /// Adds a live bot; fails if the same account is already present.
    pub fn register_bot(&self, bot: BoxedBot) -> RuntimeResult<()> {
        let key = format!("{}:{}", bot.adapter(), bot.self_id());
        if self.bots.register(bot) {
            Ok(())
        } else {
            Err(RuntimeError::BotExists(key))
        }
    }

    pub fn unregister_bot(&self, adapter: &str, self_id: &str) -> Option<BoxedBot> {
        self.bots.unregister(adapter, self_id)
    }

    pub fn register_fetcher(&self, fetcher: Arc<dyn TargetFetcher>) {
        self.registry.register_fetcher(fetcher);
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Builds natives of `P` received by `bot`.
    pub async fn build<P: Platform>(
        &self,
        natives: &[P::Native],
        bot: &BoxedBot,
    ) -> RuntimeResult<UniMessage> {
        Ok(self.builder::<P>()?.generate(natives, bot).await?)
    }

    /// Exports `message` for `P` with the configured fallback.
    pub async fn export<P: Platform>(
        &self,
        message: &UniMessage,
        bot: Option<&dyn Bot>,
    ) -> RuntimeResult<NativeMessage<P::Native>> {
        let exporter = self.exporter::<P>()?;
        Ok(exporter
            .export(message, bot, self.config.convert.fallback)
            .await?)
    }

    /// Sends to `target` through the first matching bot.
    pub async fn send(
        &self,
        target: &Target,
        message: impl Into<UniMessage>,
    ) -> RuntimeResult<Receipt> {
        let receipt = target
            .send(&self.bots, message, self.config.convert.fallback)
            .await?;
        debug!(to = %target, ids = ?receipt.message_ids, "Message delivered");
        Ok(receipt)
    }

    /// Streams every target reachable by the registered bots.
    pub fn fetch_targets(&self, filter: TargetFilter) -> BoxStream<'static, ApiResult<Target>> {
        self.registry.fetch_targets(&self.bots, filter)
    }
}

// =============================================================================
// Tests
// =============================================================================
