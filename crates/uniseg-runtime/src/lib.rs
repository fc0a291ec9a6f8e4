//! Uniseg Runtime - configuration, logging and glue for the Uniseg layer.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `UnisegConfig`)
//! - Logging initialization (`LoggingBuilder`, `init_from_config`)
//! - A registry of platform builder/exporter tables (`ConversionRegistry`)
//! - `UnisegRuntime`, which ties both to the set of live bots
//!
//! ```ignore
//! use uniseg_runtime::UnisegRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = UnisegRuntime::load()?;
//!     runtime.register_platform::<OneBot>();
//!
//!     let target = Target::group("123").with_adapter("onebot");
//!     runtime.send(&target, "hello").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ConvertConfig, LoggingConfig, UnisegConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, init_from_config};
pub use registry::ConversionRegistry;
pub use runtime::UnisegRuntime;

pub use tracing;
