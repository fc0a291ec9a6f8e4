//! Universal segments to Telegram segments.
//!
//! Styles become entities; styles Telegram has no entity for are dropped
//! without failing the segment. Mentions of roles, channels and everyone,
//! forwards and cards have no Telegram form and go through the fallback
//! policy, as do media that would need an upload.

use uniseg_core::{
    AtFlag, BoxFuture, ExportContext, MessageExporter, Platform, Segment as UniSegment,
    SegmentData, SegmentKind, UnisegResult,
};

use crate::Telegram;
use crate::model::entity::{MessageEntity, User, text_to_entities, utf16_len};
use crate::model::segment::{FileData, Segment};

/// Creates the Telegram exporter table.
pub fn create() -> MessageExporter<Segment> {
    let mut exporter = MessageExporter::new(Telegram::NAME);
    exporter
        .on(SegmentKind::Text, export_text)
        .on(SegmentKind::At, export_at)
        .on(SegmentKind::Emoji, export_emoji)
        .on_async(SegmentKind::Image, export_media)
        .on_async(SegmentKind::Audio, export_media)
        .on_async(SegmentKind::Video, export_media)
        .on_async(SegmentKind::File, export_media)
        .on(SegmentKind::Reply, export_reply);
    exporter
}

fn export_text(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    let Some(text) = seg.as_styled() else {
        return Err(ctx.fail("text", "not a text segment"));
    };
    Ok(vec![Segment::styled(text.as_str(), text_to_entities(text))])
}

/// Numeric targets become `text_mention`s; anything else is taken as a
/// username and left for Telegram to link.
fn export_at(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    let SegmentData::At(at) = &seg.data else {
        return Err(ctx.fail("at", "not a mention"));
    };
    if at.flag != AtFlag::User {
        return Err(ctx.fail("at", format!("cannot mention a {}", at.flag.as_str())));
    }

    match at.target.parse::<i64>() {
        Ok(id) => {
            let display = at.display.clone().unwrap_or_else(|| at.target.clone());
            let mut entity = MessageEntity::new("text_mention", 0, utf16_len(&display));
            entity.user = Some(User::new(id));
            Ok(vec![Segment::styled(display, vec![entity])])
        }
        Err(_) => {
            let text = format!("@{}", at.target.trim_start_matches('@'));
            let entity = MessageEntity::new("mention", 0, utf16_len(&text));
            Ok(vec![Segment::styled(text, vec![entity])])
        }
    }
}

/// Custom emoji need a plain emoji to stand in for clients that cannot
/// render them; its name is used for that.
fn export_emoji(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    let SegmentData::Emoji(emoji) = &seg.data else {
        return Err(ctx.fail("emoji", "not an emoji"));
    };
    let Some(name) = &emoji.name else {
        return Err(ctx.fail("emoji", "custom emoji without a stand-in character"));
    };
    let mut entity = MessageEntity::new("custom_emoji", 0, utf16_len(name));
    entity.custom_emoji_id = Some(emoji.id.clone());
    Ok(vec![Segment::styled(name.clone(), vec![entity])])
}

fn export_media<'a>(
    seg: &'a UniSegment,
    ctx: ExportContext<'a>,
) -> BoxFuture<'a, UnisegResult<Vec<Segment>>> {
    Box::pin(async move {
        let kind = seg.kind();
        let Some(media) = seg.as_media() else {
            return Err(ctx.fail(kind.as_str(), "not a media segment"));
        };
        let file = match &media.id {
            Some(id) => id.clone(),
            None => ctx.media_url(kind, media).await?,
        };
        let data = FileData {
            file,
            file_name: media.name.clone(),
            mime_type: media.mimetype.clone(),
        };
        Ok(vec![match kind {
            SegmentKind::Image => Segment::Photo(data),
            SegmentKind::Audio => Segment::Audio(data),
            SegmentKind::Video => Segment::Video(data),
            _ => Segment::Document(data),
        }])
    })
}

fn export_reply(seg: &UniSegment, ctx: &ExportContext<'_>) -> UnisegResult<Vec<Segment>> {
    let SegmentData::Reply(reply) = &seg.data else {
        return Err(ctx.fail("reply", "not a reply"));
    };
    match reply.id.parse() {
        Ok(message_id) => Ok(vec![Segment::reply(message_id)]),
        Err(_) => Err(ctx.fail("reply", format!("message id {} is not numeric", reply.id))),
    }
}

#[cfg(test)]
mod tests {
    use uniseg_core::{
        Emoji, FallbackPolicy, HyperFormat, Media, NativeSegment, Text, UniMessage, UnisegError,
    };

    use super::*;

    #[tokio::test]
    async fn test_styles_to_entities() {
        let text = Text::new("Hello 👋 world")
            .mark(8, 13, "bold")
            .unwrap()
            .mark_with(0, 5, "link", "https://example.com")
            .unwrap()
            .mark(0, 5, "markdown")
            .unwrap();
        let natives = create()
            .export(&UniSegment::styled(text).into(), None, FallbackPolicy::Forbid)
            .await
            .unwrap();

        let Segment::Text(data) = &natives[0] else {
            panic!("expected text");
        };
        assert_eq!(data.entities.len(), 2);
        assert_eq!(data.entities[0].kind, "text_link");
        assert_eq!(data.entities[1], MessageEntity::new("bold", 9, 5));
    }

    #[tokio::test]
    async fn test_mentions() {
        let msg = UniMessage::from(UniSegment::at("42"))
            + UniSegment::at("alice")
            + UniSegment::at_all();

        let natives = create()
            .export(&msg, None, FallbackPolicy::Ignore)
            .await
            .unwrap();
        assert_eq!(natives.len(), 2);
        let Segment::Text(by_id) = &natives[0] else {
            panic!("expected text");
        };
        assert_eq!(by_id.entities[0].user, Some(User::new(42)));
        assert_eq!(natives[1].as_text(), Some("@alice"));

        let err = create()
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(matches!(err, UnisegError::SerializeFailed { ref kind, .. } if kind == "at_all"));
    }

    #[tokio::test]
    async fn test_emoji_needs_name() {
        let named = UniSegment::from(SegmentData::Emoji(Emoji {
            id: "5368324170671202286".into(),
            name: Some("👍".into()),
        }));
        let natives = create()
            .export(&named.into(), None, FallbackPolicy::Forbid)
            .await
            .unwrap();
        let Segment::Text(data) = &natives[0] else {
            panic!("expected text");
        };
        assert_eq!(data.entities[0].length, 2);

        let err = create()
            .export(&UniSegment::emoji("1").into(), None, FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(err.is_serialize_failed());
    }

    #[tokio::test]
    async fn test_media_without_upload() {
        let by_url = UniSegment::image(Media::from_url("https://example.com/a.png"));
        let natives = create()
            .export(&by_url.into(), None, FallbackPolicy::Forbid)
            .await
            .unwrap();
        assert_eq!(natives[0], Segment::photo("https://example.com/a.png"));

        let msg = UniMessage::text("see ")
            + UniSegment::file(Media::from_path("/tmp/report.pdf").with_name("report.pdf"));
        let err = create()
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap_err();
        assert!(err.is_serialize_failed());

        let natives = create()
            .export(&msg, None, FallbackPolicy::Text)
            .await
            .unwrap();
        assert_eq!(natives.extract_plain_text(), "see [file:report.pdf]");
    }

    #[tokio::test]
    async fn test_unsupported_kinds_fall_back() {
        let msg = UniMessage::from(UniSegment::hyper(HyperFormat::Xml, "<msg/>"))
            + UniSegment::reply("abc");
        let natives = create()
            .export(&msg, None, FallbackPolicy::Ignore)
            .await
            .unwrap();
        assert!(natives.is_empty());
    }
}
