//! # Uniseg Core
//!
//! A platform-neutral message model for chat bots.
//!
//! Every chat platform has its own message segments. This crate defines one
//! universal vocabulary ([`Segment`], grouped in a [`UniMessage`]) and the
//! registries that translate between it and each platform's native
//! segments:
//!
//! ```text
//! ┌──────────────┐  MessageBuilder   ┌────────────┐  MessageExporter  ┌──────────────┐
//! │ native (recv)│──────────────────▶│ UniMessage │──────────────────▶│ native (send)│
//! └──────────────┘                   └────────────┘                   └──────────────┘
//! ```
//!
//! ## Pieces
//!
//! - **Segments**: [`Segment`], [`SegmentData`] and styled [`Text`]
//! - **Container**: [`UniMessage`] with kind queries and [`Template`]s
//! - **Conversion**: [`MessageBuilder`], [`MessageExporter`], [`FallbackPolicy`]
//! - **Addressing**: [`Target`], [`Bot`], [`BotSet`], [`TargetFetcher`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use uniseg_core::prelude::*;
//!
//! let msg = UniMessage::text("Hello ") + Segment::at("123");
//! let natives = exporter.export(&msg, None, FallbackPolicy::Text).await?;
//! let back = builder.generate_sync(&natives)?;
//! assert_eq!(back, msg);
//! ```

pub mod bot;
pub mod builder;
pub mod cache;
pub mod caller;
pub mod command;
pub mod error;
pub mod exporter;
pub mod message;
pub mod native;
pub mod segment;
pub mod style;
pub mod target;
pub mod template;

pub use bot::{Bot, BotSet, BoxedBot, Receipt, downcast_bot};
pub use builder::{AsyncBuildFn, BuildFn, MessageBuilder, PreprocessFn};
pub use cache::LruCache;
pub use caller::{ApiCaller, ChannelApiCaller, DisabledApiCaller};
#[cfg(feature = "command")]
pub use command::SegmentArg;
pub use command::{HandleRegistry, shell_split};
pub use error::{ApiError, ApiResult, TemplateError, UnisegError, UnisegResult};
pub use exporter::{AsyncExportFn, ExportContext, ExportFn, FallbackPolicy, MessageExporter};
pub use message::UniMessage;
pub use native::{NativeMessage, NativeSegment, Platform};
pub use segment::{
    At, AtAll, AtFlag, Custom, CustomSegmentType, Emoji, Hyper, HyperFormat, Media, MediaSource,
    Other, RefNode, Reference, Reply, Segment, SegmentData, SegmentKind,
};
pub use style::{StyleRange, StyledRun, Text};
pub use target::{Target, TargetFetcher, TargetFilter};
pub use template::{HintFn, Template, TemplateArg, TemplateArgs};

pub use futures::future::BoxFuture;
pub use futures::stream::BoxStream;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Bot, BoxedBot, FallbackPolicy, Media, MessageBuilder, MessageExporter, NativeSegment,
        Platform, Segment, SegmentKind, Target, Template, TemplateArgs, Text, UniMessage,
        UnisegError, UnisegResult,
    };
}
