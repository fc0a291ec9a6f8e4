//! Native → universal conversion.
//!
//! A [`MessageBuilder`] maps native type tags to build functions. Build
//! functions receive the native segment together with its already-built
//! children and return the universal [`Segment`], or `None` to drop it.
//! Native segments without a registered function are kept verbatim as
//! [`Other`](crate::segment::Other) so that they can be sent back to the
//! same platform unchanged.
//!
//! Async build functions (e.g. fetching the quoted message of a reply) are
//! only used by [`MessageBuilder::generate`]; the sync entry points fall back
//! to the sync table.
//!
//! ```rust,ignore
//! let mut builder = MessageBuilder::<Segment>::new("onebot");
//! builder.on("text", |seg, _| Ok(seg.as_text().map(Segment::text)));
//! let msg = builder.generate_sync(&natives)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{trace, warn};

use crate::bot::BoxedBot;
use crate::error::{UnisegError, UnisegResult};
use crate::message::UniMessage;
use crate::native::NativeSegment;
use crate::segment::{Segment, SegmentKind};

/// Sync build function: `(native, built children) -> segment`.
pub type BuildFn<S> =
    Arc<dyn Fn(&S, Vec<Segment>) -> UnisegResult<Option<Segment>> + Send + Sync>;

/// Async build function with access to the receiving bot.
pub type AsyncBuildFn<S> = Arc<
    dyn for<'a> Fn(&'a S, Vec<Segment>, &'a BoxedBot) -> BoxFuture<'a, UnisegResult<Option<Segment>>>
        + Send
        + Sync,
>;

/// Preprocess hook; returning `None` skips the native segment.
pub type PreprocessFn<S> = Arc<dyn Fn(&S) -> Option<S> + Send + Sync>;

/// Per-platform table of build functions.
pub struct MessageBuilder<S: NativeSegment> {
    platform: String,
    builders: HashMap<String, BuildFn<S>>,
    async_builders: HashMap<String, AsyncBuildFn<S>>,
    preprocessors: HashMap<String, PreprocessFn<S>>,
    strip_whitespace: bool,
}

impl<S: NativeSegment> MessageBuilder<S> {
    /// Creates an empty table for `platform`.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            builders: HashMap::new(),
            async_builders: HashMap::new(),
            preprocessors: HashMap::new(),
            strip_whitespace: true,
        }
    }

    /// Platform this table builds from.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Registers a sync build function for `tag`.
    pub fn on<F>(&mut self, tag: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&S, Vec<Segment>) -> UnisegResult<Option<Segment>> + Send + Sync + 'static,
    {
        let tag = tag.into();
        if self.builders.insert(tag.clone(), Arc::new(f)).is_some() {
            warn!(platform = %self.platform, tag = %tag, "Build function replaced");
        }
        self
    }

    /// Registers an async build function for `tag`.
    pub fn on_async<F>(&mut self, tag: impl Into<String>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a S, Vec<Segment>, &'a BoxedBot) -> BoxFuture<'a, UnisegResult<Option<Segment>>>
            + Send
            + Sync
            + 'static,
    {
        let tag = tag.into();
        if self.async_builders.insert(tag.clone(), Arc::new(f)).is_some() {
            warn!(platform = %self.platform, tag = %tag, "Async build function replaced");
        }
        self
    }

    /// Registers a preprocess hook run before building `tag` segments,
    /// nested children included.
    pub fn preprocess<F>(&mut self, tag: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&S) -> Option<S> + Send + Sync + 'static,
    {
        let tag = tag.into();
        if self.preprocessors.insert(tag.clone(), Arc::new(f)).is_some() {
            warn!(platform = %self.platform, tag = %tag, "Preprocess hook replaced");
        }
        self
    }

    /// Toggles dropping of leading/trailing whitespace-only text.
    pub fn strip_whitespace(&mut self, enabled: bool) -> &mut Self {
        self.strip_whitespace = enabled;
        self
    }

    /// Returns true if a sync or async function exists for `tag`.
    pub fn handles(&self, tag: &str) -> bool {
        self.builders.contains_key(tag) || self.async_builders.contains_key(tag)
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    /// Builds a message, running async functions against `bot`.
    pub async fn generate(&self, natives: &[S], bot: &BoxedBot) -> UnisegResult<UniMessage> {
        let prepared = self.prepare(natives);
        let mut segments = Vec::with_capacity(prepared.len());
        for native in &prepared {
            if let Some(segment) = self.build_async(native, bot).await? {
                segments.push(segment);
            }
        }
        self.finish(segments)
    }

    /// Builds a message using only the sync table.
    pub fn generate_sync(&self, natives: &[S]) -> UnisegResult<UniMessage> {
        let prepared = self.prepare(natives);
        let mut segments = Vec::with_capacity(prepared.len());
        for native in &prepared {
            if let Some(segment) = self.build_sync(native)? {
                segments.push(segment);
            }
        }
        self.finish(segments)
    }

    /// Builds synchronously and drops reply markers.
    pub fn generate_without_reply(&self, natives: &[S]) -> UnisegResult<UniMessage> {
        let message = self.generate_sync(natives)?.exclude(&[SegmentKind::Reply]);
        if message.is_empty() {
            return Err(UnisegError::NullMessage);
        }
        Ok(message)
    }

    fn prepare(&self, natives: &[S]) -> Vec<S> {
        let mut prepared: Vec<S> = natives.iter().filter_map(|n| self.preprocess_one(n)).collect();

        if self.strip_whitespace {
            let start = prepared
                .iter()
                .position(|native| !native.is_blank_text())
                .unwrap_or(prepared.len());
            let end = prepared
                .iter()
                .rposition(|native| !native.is_blank_text())
                .map_or(start, |i| i + 1);
            prepared.truncate(end);
            prepared.drain(..start);
        }
        prepared
    }

    fn preprocess_one(&self, native: &S) -> Option<S> {
        match self.preprocessors.get(native.type_tag()) {
            Some(hook) => hook(native),
            None => Some(native.clone()),
        }
    }

    fn finish(&self, segments: Vec<Segment>) -> UnisegResult<UniMessage> {
        if segments.is_empty() {
            trace!(platform = %self.platform, "Native message built to nothing");
            return Err(UnisegError::NullMessage);
        }
        Ok(UniMessage::from_segments(segments))
    }

    fn build_sync(&self, native: &S) -> UnisegResult<Option<Segment>> {
        let mut children = Vec::new();
        for child in native.children().iter().filter_map(|c| self.preprocess_one(c)) {
            if let Some(built) = self.build_sync(&child)? {
                children.push(built);
            }
        }

        match self.builders.get(native.type_tag()) {
            Some(f) => f(native, children),
            None => self.keep_other(native).map(Some),
        }
    }

    fn build_async<'a>(
        &'a self,
        native: &'a S,
        bot: &'a BoxedBot,
    ) -> BoxFuture<'a, UnisegResult<Option<Segment>>> {
        Box::pin(async move {
            let mut children = Vec::new();
            let prepared: Vec<S> = native
                .children()
                .iter()
                .filter_map(|c| self.preprocess_one(c))
                .collect();
            for child in &prepared {
                if let Some(built) = self.build_async(child, bot).await? {
                    children.push(built);
                }
            }

            let tag = native.type_tag();
            if let Some(f) = self.async_builders.get(tag) {
                return f(native, children, bot).await;
            }
            match self.builders.get(tag) {
                Some(f) => f(native, children),
                None => self.keep_other(native).map(Some),
            }
        })
    }

    fn keep_other(&self, native: &S) -> UnisegResult<Segment> {
        trace!(platform = %self.platform, tag = native.type_tag(), "Keeping native segment as Other");
        Ok(Segment::other(
            self.platform.clone(),
            native.type_tag(),
            serde_json::to_value(native)?,
        ))
    }
}

impl<S: NativeSegment> std::fmt::Debug for MessageBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.builders.keys().chain(self.async_builders.keys()).collect();
        tags.sort();
        tags.dedup();
        f.debug_struct("MessageBuilder")
            .field("platform", &self.platform)
            .field("tags", &tags)
            .finish()
    }
}
