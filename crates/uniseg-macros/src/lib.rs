//! Procedural macros for Uniseg.
//!
//! - `#[derive(CustomSegment)]` - implements `CustomSegmentType` for a
//!   serde-serializable struct so it can travel inside a universal message.
//!
//! ```rust,ignore
//! use serde::{Deserialize, Serialize};
//! use uniseg::CustomSegment;
//!
//! #[derive(Serialize, Deserialize, CustomSegment)]
//! #[segment(tag = "market_face", display = "[sticker:{name}]")]
//! pub struct MarketFace {
//!     pub id: String,
//!     pub name: String,
//! }
//! ```

mod segment;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `CustomSegmentType`.
///
/// # Attributes
///
/// - `#[segment(tag = "...")]` - Registry tag (default: the type name in
///   snake_case)
/// - `#[segment(display = "...")]` - Text rendering used when a platform
///   degrades the segment; may reference named fields as `{field}`
#[proc_macro_derive(CustomSegment, attributes(segment))]
pub fn derive_custom_segment(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match segment::derive_custom_segment(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
