//! Universal segments to OneBot segments.
//!
//! OneBot v11 has no file segment and cannot mention roles or channels;
//! those go through the fallback policy.

use uniseg_core::{
    AtFlag, BoxFuture, ExportContext, HyperFormat, MessageExporter, NativeSegment, Platform,
    RefNode, Segment as UniSegment, SegmentData, SegmentKind, UnisegResult,
};

use crate::OneBot;
use crate::model::segment::Segment;

/// Creates the OneBot exporter table.
pub fn create() -> MessageExporter<Segment> {
    let mut exporter = MessageExporter::new(OneBot::NAME);
    exporter
        .on(SegmentKind::Text, export_text)
        .on(SegmentKind::At, export_at)
        .on(SegmentKind::AtAll, |_, _| Ok(vec![Segment::at_all()]))
        .on(SegmentKind::Emoji, export_emoji)
        .on_async(SegmentKind::Image, export_media_boxed)
        .on_async(SegmentKind::Audio, export_media_boxed)
        .on_async(SegmentKind::Video, export_media_boxed)
        .on(SegmentKind::Reply, export_reply)
        .on(SegmentKind::Reference, export_reference)
        .on(SegmentKind::Hyper, export_hyper);
    exporter
}

fn export_text(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    // OneBot text carries no styling; ranges are dropped.
    match seg.as_text() {
        Some(text) => Ok(vec![Segment::text(text)]),
        None => Err(ctx.fail("text", "not a text segment")),
    }
}

fn export_at(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    match &seg.data {
        SegmentData::At(at) if at.flag == AtFlag::User => {
            Ok(vec![Segment::at(at.target.clone())])
        }
        SegmentData::At(at) => {
            let reason = format!("cannot mention a {}", at.flag.as_str());
            Err(ctx.fail("at", reason))
        }
        _ => Err(ctx.fail("at", "not a mention")),
    }
}

fn export_emoji(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    match &seg.data {
        SegmentData::Emoji(emoji) => Ok(vec![Segment::face(emoji.id.clone())]),
        _ => Err(ctx.fail("emoji", "not an emoji")),
    }
}

/// The platform file id wins and keeps the URL beside it; otherwise the
/// URL is sent as the file, uploading first if needed.
async fn export_media(seg: &UniSegment, ctx: ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    let kind = seg.kind();
    let Some(media) = seg.as_media() else {
        return Err(ctx.fail(kind.as_str(), "not a media segment"));
    };
    let (file, url) = match &media.id {
        Some(id) => (id.clone(), media.url().map(str::to_string)),
        None => (ctx.media_url(kind, media).await?, None),
    };
    let native = match kind {
        SegmentKind::Image => Segment::image(file),
        SegmentKind::Audio => Segment::record(file),
        _ => Segment::video(file),
    };
    Ok(vec![native.with_url(url)])
}

fn export_media_boxed<'a>(
    seg: &'a UniSegment,
    ctx: ExportContext<'a>,
) -> BoxFuture<'a, UnisegResult<Vec<Segment>>> {
    Box::pin(export_media(seg, ctx))
}

/// Only the marker is sent; quoted children stay on the platform.
fn export_reply(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    match &seg.data {
        SegmentData::Reply(reply) => Ok(vec![Segment::reply(reply.id.clone())]),
        _ => Err(ctx.fail("reply", "not a reply")),
    }
}

fn export_reference(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    let SegmentData::Reference(reference) = &seg.data else {
        return Err(ctx.fail("reference", "not a forward"));
    };
    if reference.nodes.is_empty() {
        return match &reference.id {
            Some(id) => Ok(vec![Segment::forward(id.clone())]),
            None => Err(ctx.fail("reference", "forward has neither id nor nodes")),
        };
    }
    Ok(reference.nodes.iter().map(export_node).collect())
}

fn export_node(node: &RefNode) -> Segment {
    if node.content.is_empty()
        && let Some(id) = &node.id
    {
        return Segment::node(id.clone());
    }
    Segment::node_custom(
        node.uid.clone().unwrap_or_default(),
        node.name.clone().unwrap_or_default(),
        node.content.iter().map(inline_segment).collect(),
    )
}

/// Forward node content cannot upload; anything without a ready
/// reference is rendered as text.
fn inline_segment(seg: &UniSegment) -> Segment {
    match &seg.data {
        SegmentData::At(at) if at.flag == AtFlag::User => Segment::at(at.target.clone()),
        SegmentData::AtAll(_) => Segment::at_all(),
        SegmentData::Emoji(emoji) => Segment::face(emoji.id.clone()),
        SegmentData::Image(media) => match media.id.as_deref().or(media.url()) {
            Some(file) => Segment::image(file),
            None => Segment::text(seg.to_string()),
        },
        _ => Segment::text(seg.to_string()),
    }
}

fn export_hyper(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    match &seg.data {
        SegmentData::Hyper(hyper) => Ok(vec![match hyper.format {
            HyperFormat::Xml => Segment::xml(hyper.raw.clone()),
            HyperFormat::Json => Segment::json(hyper.raw.clone()),
        }]),
        _ => Err(ctx.fail("hyper", "not a card")),
    }
}
