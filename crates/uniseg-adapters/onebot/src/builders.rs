//! OneBot segments to universal segments.
//!
//! `poke`, `share`, `rps` and `dice` have no universal counterpart and are
//! kept as `Other`, so they still round-trip through this platform.

use tracing::warn;
use uniseg_core::{
    BoxFuture, BoxedBot, HyperFormat, Media, MessageBuilder, Platform, RefNode, Reference,
    Segment as UniSegment, UnisegResult,
};

use crate::OneBot;
use crate::model::segment::{NodeData, Segment};

/// Creates the OneBot builder table.
pub fn create() -> MessageBuilder<Segment> {
    let mut builder = MessageBuilder::new(OneBot::NAME);
    builder
        .on("text", build_text)
        .on("at", build_at)
        .on("face", build_face)
        .on("image", build_media)
        .on("record", build_media)
        .on("video", build_media)
        .on("reply", build_reply)
        .on("forward", build_forward)
        .on("node", build_node)
        .on("xml", build_hyper)
        .on("json", build_hyper)
        .on_async("reply", fetch_reply);
    builder
}

fn is_remote(file: &str) -> bool {
    file.starts_with("http://") || file.starts_with("https://")
}

/// Received media keep the platform file id next to the download URL.
fn media(file: &str, url: Option<&str>) -> Media {
    match url {
        Some(url) => Media {
            id: Some(file.to_string()),
            ..Media::from_url(url)
        },
        None if is_remote(file) => Media::from_url(file),
        None => Media::from_id(file),
    }
}

fn build_text(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Text(data) = native else {
        return Ok(None);
    };
    Ok(Some(UniSegment::text(data.text.clone())))
}

fn build_at(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::At(data) = native else {
        return Ok(None);
    };
    if data.is_all() {
        Ok(Some(UniSegment::at_all()))
    } else {
        Ok(Some(UniSegment::at(data.qq.clone())))
    }
}

fn build_face(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Face(data) = native else {
        return Ok(None);
    };
    Ok(Some(UniSegment::emoji(data.id.clone())))
}

/// `image`, `record` and `video` share one payload.
fn build_media(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Some(data) = native.media() else {
        return Ok(None);
    };
    let media = media(&data.file, data.url.as_deref());
    Ok(match native {
        Segment::Image(_) => Some(UniSegment::image(media)),
        Segment::Record(_) => Some(UniSegment::audio(media)),
        Segment::Video(_) => Some(UniSegment::video(media)),
        _ => None,
    })
}

fn build_reply(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Reply(data) = native else {
        return Ok(None);
    };
    Ok(Some(UniSegment::reply(data.id.clone())))
}

/// Attaches the quoted message as children when the bot can fetch it.
fn fetch_reply<'a>(
    native: &'a Segment,
    _: Vec<UniSegment>,
    bot: &'a BoxedBot,
) -> BoxFuture<'a, UnisegResult<Option<UniSegment>>> {
    Box::pin(async move {
        let Segment::Reply(data) = native else {
            return Ok(None);
        };
        let reply = UniSegment::reply(data.id.clone());
        match bot.fetch_message(&data.id).await {
            Ok(quoted) => Ok(Some(reply.with_children(quoted.into_segments()))),
            Err(e) => {
                warn!(message_id = %data.id, error = %e, "Failed to fetch quoted message");
                Ok(Some(reply))
            }
        }
    })
}

fn build_forward(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Forward(data) = native else {
        return Ok(None);
    };
    Ok(Some(UniSegment::reference(Reference {
        id: Some(data.id.clone()),
        nodes: Vec::new(),
    })))
}

/// A node's content arrives already built as `children`.
fn build_node(native: &Segment, children: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Node(NodeData {
        id,
        user_id,
        nickname,
        ..
    }) = native
    else {
        return Ok(None);
    };
    Ok(Some(UniSegment::reference(Reference {
        id: None,
        nodes: vec![RefNode {
            id: id.clone(),
            uid: user_id.clone(),
            name: nickname.clone(),
            content: children,
        }],
    })))
}

fn build_hyper(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    match native {
        Segment::Xml(data) => Ok(Some(UniSegment::hyper(HyperFormat::Xml, data.data.clone()))),
        Segment::Json(data) => Ok(Some(UniSegment::hyper(HyperFormat::Json, data.data.clone()))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uniseg_core::{NativeSegment, SegmentData, SegmentKind, UniMessage, UnisegError};

    use super::*;

    #[test]
    fn test_text_and_mentions() {
        let msg = create()
            .generate_sync(&[
                Segment::text("Hello!"),
                Segment::at("123"),
                Segment::at_all(),
            ])
            .unwrap();
        assert_eq!(
            msg,
            UniMessage::text("Hello!") + UniSegment::at("123") + UniSegment::at_all()
        );
    }

    #[test]
    fn test_media_sources() {
        let received =
            Segment::image("abc.image").with_url(Some("https://example.com/a.png".into()));
        let msg = create()
            .generate_sync(&[received, Segment::record("voice.amr")])
            .unwrap();

        let image = msg[0].as_media().unwrap();
        assert_eq!(image.id.as_deref(), Some("abc.image"));
        assert_eq!(image.url(), Some("https://example.com/a.png"));
        assert_eq!(msg[1], UniSegment::audio(Media::from_id("voice.amr")));
    }

    #[test]
    fn test_unknown_kept_as_other() {
        let poke: Segment = serde_json::from_value(json!({
            "type": "poke",
            "data": {"type": "126", "id": "2003"}
        }))
        .unwrap();
        let msg = create().generate_sync(&[poke]).unwrap();
        let SegmentData::Other(other) = &msg[0].data else {
            panic!("expected Other, got {:?}", msg[0]);
        };
        assert_eq!(other.platform, "onebot");
        assert_eq!(other.tag, "poke");
        assert_eq!(other.payload["data"]["id"], "2003");
    }

    #[test]
    fn test_node_content_built() {
        let node = Segment::node_custom(
            "10",
            "alice",
            vec![Segment::text("inner"), Segment::face("1")],
        );
        let msg = create().generate_sync(&[node]).unwrap();
        let SegmentData::Reference(reference) = &msg[0].data else {
            panic!("expected Reference");
        };
        assert_eq!(reference.nodes[0].name.as_deref(), Some("alice"));
        assert_eq!(
            reference.nodes[0].content,
            vec![UniSegment::text("inner"), UniSegment::emoji("1")]
        );
    }

    #[test]
    fn test_blank_message_is_null() {
        let err = create()
            .generate_sync(&[Segment::text("  "), Segment::text("\n")])
            .unwrap_err();
        assert!(matches!(err, UnisegError::NullMessage));

        let err = create()
            .generate_without_reply(&[Segment::reply("9")])
            .unwrap_err();
        assert!(err.is_null_message());
        assert!(
            create()
                .generate_sync(&[Segment::reply("9"), Segment::text("ok")])
                .unwrap()
                .has(SegmentKind::Reply)
        );
    }
}
