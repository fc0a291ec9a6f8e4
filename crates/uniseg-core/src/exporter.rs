//! Universal → native conversion.
//!
//! A [`MessageExporter`] maps segment tags to export functions producing
//! zero or more native segments. Built-in segments are keyed by
//! [`SegmentKind::as_str`], custom segments by their own tag.
//!
//! When a segment has no exporter, or its exporter fails with
//! [`UnisegError::SerializeFailed`], the [`FallbackPolicy`] decides what
//! happens: raise, degrade to the segment's plain-text rendering, or drop.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bot::Bot;
use crate::error::{UnisegError, UnisegResult};
use crate::message::UniMessage;
use crate::native::{NativeMessage, NativeSegment};
use crate::segment::{Media, MediaSource, Segment, SegmentData, SegmentKind};

// ============================================================================
// Fallback Policy
// ============================================================================

/// What to do with a segment the platform cannot express.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Fail with `SerializeFailed`.
    Forbid,
    /// Substitute the segment's text rendering.
    #[default]
    Text,
    /// Drop the segment silently.
    Ignore,
}

impl From<bool> for FallbackPolicy {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Text } else { Self::Forbid }
    }
}

// ============================================================================
// Export Context
// ============================================================================

/// Per-call state handed to export functions.
#[derive(Clone, Copy)]
pub struct ExportContext<'a> {
    /// Platform being exported to.
    pub platform: &'a str,
    /// The sending bot, if the export happens on a live connection.
    pub bot: Option<&'a dyn Bot>,
}

impl<'a> ExportContext<'a> {
    pub fn new(platform: &'a str, bot: Option<&'a dyn Bot>) -> Self {
        Self { platform, bot }
    }

    /// Resolves a media segment to something the platform can reference.
    ///
    /// An inline URL is used as is. Path and raw sources go through the
    /// bot's upload; without a bot, or if the upload is unsupported or
    /// fails, the segment cannot be serialized and the fallback applies.
    pub async fn media_url(&self, kind: SegmentKind, media: &Media) -> UnisegResult<String> {
        match &media.source {
            Some(MediaSource::Url(url)) => Ok(url.clone()),
            Some(MediaSource::Path(_) | MediaSource::Raw(_)) => {
                let Some(bot) = self.bot else {
                    return Err(UnisegError::serialize_failed(
                        self.platform,
                        kind.as_str(),
                        "upload requires a live bot",
                    ));
                };
                let uploaded = bot.upload(kind, media).await.map_err(|err| {
                    warn!(platform = %self.platform, error = %err, "Media upload failed");
                    UnisegError::serialize_failed(
                        self.platform,
                        kind.as_str(),
                        format!("upload failed: {err}"),
                    )
                })?;
                match uploaded {
                    Some(url) => Ok(url),
                    None => Err(UnisegError::serialize_failed(
                        self.platform,
                        kind.as_str(),
                        "platform cannot upload media",
                    )),
                }
            }
            None => Err(UnisegError::serialize_failed(
                self.platform,
                kind.as_str(),
                "media has no content source",
            )),
        }
    }

    /// Shorthand for a serialize failure on this platform.
    pub fn fail(&self, kind: impl Into<String>, reason: impl Into<String>) -> UnisegError {
        UnisegError::serialize_failed(self.platform, kind, reason)
    }
}

// ============================================================================
// Message Exporter
// ============================================================================

/// Sync export function.
pub type ExportFn<S> = Arc<dyn Fn(&Segment, &ExportContext<'_>) -> UnisegResult<Vec<S>> + Send + Sync>;

/// Async export function, used for media that may need uploading.
pub type AsyncExportFn<S> = Arc<
    dyn for<'a> Fn(&'a Segment, ExportContext<'a>) -> BoxFuture<'a, UnisegResult<Vec<S>>>
        + Send
        + Sync,
>;

enum Entry<S> {
    Sync(ExportFn<S>),
    Async(AsyncExportFn<S>),
}

/// Per-platform table of export functions.
pub struct MessageExporter<S: NativeSegment> {
    platform: String,
    exporters: HashMap<String, Entry<S>>,
}

impl<S: NativeSegment> MessageExporter<S> {
    /// Creates an empty table for `platform`.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            exporters: HashMap::new(),
        }
    }

    /// Platform this table exports to.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Registers a sync export function for a built-in kind.
    pub fn on<F>(&mut self, kind: SegmentKind, f: F) -> &mut Self
    where
        F: Fn(&Segment, &ExportContext<'_>) -> UnisegResult<Vec<S>> + Send + Sync + 'static,
    {
        self.insert(kind.as_str().to_owned(), Entry::Sync(Arc::new(f)))
    }

    /// Registers an async export function for a built-in kind.
    pub fn on_async<F>(&mut self, kind: SegmentKind, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a Segment, ExportContext<'a>) -> BoxFuture<'a, UnisegResult<Vec<S>>>
            + Send
            + Sync
            + 'static,
    {
        self.insert(kind.as_str().to_owned(), Entry::Async(Arc::new(f)))
    }

    /// Registers a sync export function for a custom segment tag.
    pub fn on_custom<F>(&mut self, tag: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Segment, &ExportContext<'_>) -> UnisegResult<Vec<S>> + Send + Sync + 'static,
    {
        self.insert(tag.into(), Entry::Sync(Arc::new(f)))
    }

    fn insert(&mut self, tag: String, entry: Entry<S>) -> &mut Self {
        if self.exporters.insert(tag.clone(), entry).is_some() {
            warn!(platform = %self.platform, tag = %tag, "Export function replaced");
        }
        self
    }

    /// Returns true if `tag` has an export function.
    pub fn handles(&self, tag: &str) -> bool {
        self.exporters.contains_key(tag)
    }

    /// Exports a whole message.
    pub async fn export(
        &self,
        message: &UniMessage,
        bot: Option<&dyn Bot>,
        fallback: FallbackPolicy,
    ) -> UnisegResult<NativeMessage<S>> {
        let ctx = ExportContext::new(&self.platform, bot);
        let mut natives = Vec::with_capacity(message.len());
        for segment in message {
            natives.extend(self.export_with_fallback(segment, ctx, fallback).await?);
        }
        Ok(natives.into())
    }

    /// Exports a single segment without applying any fallback.
    pub async fn export_segment(
        &self,
        segment: &Segment,
        ctx: ExportContext<'_>,
    ) -> UnisegResult<Vec<S>> {
        match self.exporters.get(segment.type_tag()) {
            Some(Entry::Sync(f)) => f(segment, &ctx),
            Some(Entry::Async(f)) => f(segment, ctx).await,
            None => self.export_builtin(segment),
        }
    }

    async fn export_with_fallback(
        &self,
        segment: &Segment,
        ctx: ExportContext<'_>,
        fallback: FallbackPolicy,
    ) -> UnisegResult<Vec<S>> {
        match self.export_segment(segment, ctx).await {
            Err(err) if err.is_serialize_failed() => match fallback {
                FallbackPolicy::Forbid => Err(err),
                FallbackPolicy::Text => {
                    debug!(platform = %self.platform, error = %err, "Degrading segment to text");
                    let rendered = segment.to_string();
                    if rendered.is_empty() {
                        Ok(Vec::new())
                    } else {
                        Ok(vec![S::text(rendered)])
                    }
                }
                FallbackPolicy::Ignore => {
                    debug!(platform = %self.platform, error = %err, "Dropping segment");
                    Ok(Vec::new())
                }
            },
            result => result,
        }
    }

    // `Other` payloads only go back to the platform they came from.
    fn export_builtin(&self, segment: &Segment) -> UnisegResult<Vec<S>> {
        match &segment.data {
            SegmentData::Other(other) if other.platform == self.platform => {
                let native: S = serde_json::from_value(other.payload.clone()).map_err(|err| {
                    UnisegError::serialize_failed(&self.platform, &other.tag, err.to_string())
                })?;
                Ok(vec![native])
            }
            SegmentData::Other(other) => Err(UnisegError::serialize_failed(
                &self.platform,
                &other.tag,
                format!("native segment from '{}'", other.platform),
            )),
            _ => Err(UnisegError::unsupported(&self.platform, segment.type_tag())),
        }
    }
}

impl<S: NativeSegment> std::fmt::Debug for MessageExporter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.exporters.keys().collect();
        tags.sort();
        f.debug_struct("MessageExporter")
            .field("platform", &self.platform)
            .field("tags", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use async_trait::async_trait;

    use super::*;
    use crate::bot::Receipt;
    use crate::builder::tests::{Demo, demo_builder};
    use crate::error::ApiError;
    use crate::target::Target;

    /// A bot whose uploads always time out.
    struct FlakyBot;

    #[async_trait]
    impl Bot for FlakyBot {
        fn self_id(&self) -> &str {
            "1"
        }

        fn adapter(&self) -> &str {
            "demo"
        }

        fn scope(&self) -> &str {
            "demo"
        }

        async fn send(
            &self,
            _target: &Target,
            _message: &UniMessage,
            _fallback: FallbackPolicy,
        ) -> UnisegResult<Receipt> {
            Err(ApiError::NotSupported.into())
        }

        async fn upload(
            &self,
            _kind: SegmentKind,
            _media: &Media,
        ) -> crate::error::ApiResult<Option<String>> {
            Err(ApiError::Timeout)
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn demo_exporter() -> MessageExporter<Demo> {
        let mut exporter = MessageExporter::new("demo");
        exporter
            .on(SegmentKind::Text, |seg, _| {
                Ok(seg.as_text().map(Demo::text).into_iter().collect())
            })
            .on(SegmentKind::At, |seg, ctx| match &seg.data {
                SegmentData::At(at) => Ok(vec![Demo::Mention {
                    user: at.target.clone(),
                }]),
                _ => Err(ctx.fail("at", "not an at")),
            })
            .on_async(SegmentKind::Image, |seg, ctx| Box::pin(export_image(seg, ctx)));
        exporter
    }

    async fn export_image(seg: &Segment, ctx: ExportContext<'_>) -> UnisegResult<Vec<Demo>> {
        let media = seg.as_media().ok_or_else(|| ctx.fail("image", "no media"))?;
        let url = ctx.media_url(SegmentKind::Image, media).await?;
        Ok(vec![Demo::text(url)])
    }

    #[tokio::test]
    async fn test_round_trip() {
        let natives = vec![
            Demo::text("Hello!"),
            Demo::Mention {
                user: "123".into(),
            },
            Demo::Sticker { pack: 3 },
        ];
        let msg = demo_builder().generate_sync(&natives).unwrap();
        let back = demo_exporter()
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap();
        assert_eq!(back.into_segments(), natives);
    }

    #[tokio::test]
    async fn test_fallback_policies() {
        let msg = UniMessage::text("hi").with(Segment::reply("5"));
        let exporter = demo_exporter();

        let err = exporter
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(err.is_serialize_failed());

        let text = exporter.export(&msg, None, true.into()).await.unwrap();
        assert_eq!(text.extract_plain_text(), "hi[reply:5]");

        let ignored = exporter
            .export(&msg, None, FallbackPolicy::Ignore)
            .await
            .unwrap();
        assert_eq!(ignored.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_other_rejected() {
        let msg = UniMessage::from(Segment::other(
            "elsewhere",
            "poke",
            serde_json::json!({"type": "poke"}),
        ));
        let err = demo_exporter()
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(err.is_serialize_failed());
    }

    #[tokio::test]
    async fn test_media_without_bot() {
        let exporter = demo_exporter();
        let by_url = UniMessage::from(Segment::image(Media::from_url("https://a/b.png")));
        let out = exporter
            .export(&by_url, None, FallbackPolicy::Forbid)
            .await
            .unwrap();
        assert_eq!(out.extract_plain_text(), "https://a/b.png");

        let raw = UniMessage::from(Segment::image(Media::from_raw(vec![1u8, 2, 3])));
        let err = exporter
            .export(&raw, None, FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(err.is_serialize_failed());
    }

    #[tokio::test]
    async fn test_failed_upload_degrades() {
        let exporter = demo_exporter();
        let bot = FlakyBot;
        let msg = UniMessage::text("see ") + Segment::image(Media::from_path("/tmp/a.png"));

        let err = exporter
            .export(&msg, Some(&bot), FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(err.is_serialize_failed());
        assert!(err.to_string().contains("upload failed"), "{err}");

        let text = exporter
            .export(&msg, Some(&bot), FallbackPolicy::Text)
            .await
            .unwrap();
        assert_eq!(text.extract_plain_text(), "see [image]");
    }
}
