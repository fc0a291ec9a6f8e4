//! # Uniseg
//!
//! Universal message segments for chat bots that speak many platforms.
//!
//! ## Overview
//!
//! Every platform describes messages with its own segments. Uniseg
//! converts them into one [`UniMessage`](core::UniMessage) on receipt and
//! back into the destination platform's segments on send, so a message
//! received on one platform can be replied to, stored, or forwarded to
//! any other:
//!
//! ```text
//! ┌─────────────┐  builders   ┌────────────┐  exporters  ┌──────────────┐
//! │ OneBot      │────────────▶│            │────────────▶│ OneBot       │
//! │ Telegram    │────────────▶│ UniMessage │────────────▶│ Telegram     │
//! │ ...         │────────────▶│            │────────────▶│ ...          │
//! └─────────────┘             └────────────┘             └──────────────┘
//! ```
//!
//! - **Core**: segments, styled text, templates, registries, targets
//! - **Runtime**: configuration, logging, platform registry, bot set
//! - **Adapters**: one crate per platform
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use uniseg::prelude::*;
//! use uniseg::onebot::{OneBot, OneBotBot};
//!
//! let runtime = UnisegRuntime::load()?;
//! runtime.register_platform::<OneBot>();
//! runtime.register_bot(Arc::new(OneBotBot::new("10001", caller)))?;
//!
//! let greeting = Template::new("Welcome {name}!")?.format(
//!     &TemplateArgs::new().named("name", Segment::at("12345")),
//! )?;
//! runtime.send(&Target::group("123456").with_adapter("onebot"), greeting).await?;
//! ```
//!
//! ## Features
//!
//! - `onebot`, `telegram`: platform adapters (default)
//! - `toml-config` (default), `yaml-config`: config file formats
//! - `json-log`: JSON log output
//! - `command`: parse messages into clap commands

pub use uniseg_core as core;
pub use uniseg_runtime as runtime;

pub use uniseg_macros::CustomSegment;

#[cfg(feature = "onebot")]
pub use uniseg_adapter_onebot as onebot;
#[cfg(feature = "telegram")]
pub use uniseg_adapter_telegram as telegram;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use uniseg::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use uniseg_runtime::{UnisegConfig, UnisegRuntime};

    // Message model
    pub use uniseg_core::prelude::*;
    pub use uniseg_core::{CustomSegmentType, Receipt, TargetFilter};

    pub use uniseg_macros::CustomSegment;
}
