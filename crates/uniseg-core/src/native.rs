//! The contract every platform adapter fulfils.
//!
//! A platform exposes a native segment type implementing [`NativeSegment`]
//! and groups its segments in a [`NativeMessage`]. The core only relies on
//! the type tag, the text accessor and serde, which it uses to keep unknown
//! segments verbatim inside [`Other`](crate::segment::Other).

use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::builder::MessageBuilder;
use crate::exporter::MessageExporter;

// ============================================================================
// Native Segment Trait
// ============================================================================

/// A single native segment of some platform.
pub trait NativeSegment:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Creates a plain text segment.
    fn text(text: impl Into<String>) -> Self;

    /// Returns the platform's type tag (e.g. "text", "image", "at").
    fn type_tag(&self) -> &str;

    /// Returns the text content if this is a text segment.
    fn as_text(&self) -> Option<&str>;

    /// Returns true if this is a plain text segment.
    fn is_text(&self) -> bool {
        self.as_text().is_some()
    }

    /// Returns true for text segments holding only whitespace.
    fn is_blank_text(&self) -> bool {
        self.as_text().is_some_and(|text| text.trim().is_empty())
    }

    /// Nested native segments, built before their parent.
    fn children(&self) -> Vec<Self> {
        Vec::new()
    }
}

// ============================================================================
// Native Message
// ============================================================================

/// An ordered sequence of native segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent, bound(deserialize = ""))]
pub struct NativeMessage<S: NativeSegment> {
    segments: Vec<S>,
}

impl<S: NativeSegment> Default for NativeMessage<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NativeSegment> NativeMessage<S> {
    /// Creates a new empty message.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates a message from a vector of segments.
    pub fn from_segments(segments: Vec<S>) -> Self {
        Self { segments }
    }

    /// Concatenates the text content of all text segments.
    pub fn extract_plain_text(&self) -> String {
        self.iter().filter_map(NativeSegment::as_text).collect()
    }

    /// Adds a segment to the end of the message.
    pub fn push(&mut self, segment: S) {
        self.segments.push(segment);
    }

    /// Consumes the message and adds a segment (builder pattern).
    pub fn with(mut self, segment: S) -> Self {
        self.segments.push(segment);
        self
    }

    /// Consumes the message and returns the inner segments vector.
    pub fn into_segments(self) -> Vec<S> {
        self.segments
    }
}

impl<S: NativeSegment> Deref for NativeMessage<S> {
    type Target = [S];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl<S: NativeSegment> DerefMut for NativeMessage<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.segments
    }
}

impl<S: NativeSegment> From<Vec<S>> for NativeMessage<S> {
    fn from(segments: Vec<S>) -> Self {
        Self { segments }
    }
}

impl<S: NativeSegment> FromIterator<S> for NativeMessage<S> {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl<S: NativeSegment> IntoIterator for NativeMessage<S> {
    type Item = S;
    type IntoIter = std::vec::IntoIter<S>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

// ============================================================================
// Platform
// ============================================================================

/// A chat platform known to the conversion layer.
///
/// Implementors register their builders and exporters explicitly:
///
/// ```rust,ignore
/// impl Platform for OneBot {
///     type Native = Segment;
///     const NAME: &'static str = "onebot";
///     const SCOPE: &'static str = "qq";
///
///     fn builder() -> MessageBuilder<Segment> { builders::create() }
///     fn exporter() -> MessageExporter<Segment> { exporters::create() }
/// }
/// ```
pub trait Platform: Send + Sync + 'static {
    /// Native segment type of this platform.
    type Native: NativeSegment;

    /// Platform identifier, also the `adapter` of its targets.
    const NAME: &'static str;

    /// Coarser platform family shared by compatible adapters.
    const SCOPE: &'static str;

    /// Creates the builder table for this platform.
    fn builder() -> MessageBuilder<Self::Native>;

    /// Creates the exporter table for this platform.
    fn exporter() -> MessageExporter<Self::Native>;
}
