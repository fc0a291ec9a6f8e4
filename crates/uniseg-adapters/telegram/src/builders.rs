//! Telegram segments to universal segments.

use uniseg_core::{Media, MessageBuilder, Platform, Segment as UniSegment, UnisegResult};

use crate::Telegram;
use crate::model::entity::entities_to_text;
use crate::model::segment::{FileData, Segment};

/// Creates the Telegram builder table.
///
/// Stickers, locations and dice are kept as `Other`.
pub fn create() -> MessageBuilder<Segment> {
    let mut builder = MessageBuilder::new(Telegram::NAME);
    builder
        .on("text", build_text)
        .on("photo", build_media)
        .on("animation", build_media)
        .on("voice", build_media)
        .on("audio", build_media)
        .on("video", build_media)
        .on("document", build_media)
        .on("reply", build_reply);
    builder
}

fn build_text(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Text(data) = native else {
        return Ok(None);
    };
    let text = entities_to_text(&data.text, &data.entities)?;
    Ok(Some(UniSegment::styled(text)))
}

fn media(data: &FileData) -> Media {
    let mut media = Media::from_id(data.file.clone());
    media.name = data.file_name.clone();
    media.mimetype = data.mime_type.clone();
    media
}

fn build_media(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let built = match native {
        Segment::Photo(data) | Segment::Animation(data) => UniSegment::image(media(data)),
        Segment::Voice(data) | Segment::Audio(data) => UniSegment::audio(media(data)),
        Segment::Video(data) => UniSegment::video(media(data)),
        Segment::Document(data) => UniSegment::file(media(data)),
        _ => return Ok(None),
    };
    Ok(Some(built))
}

fn build_reply(native: &Segment, _: Vec<UniSegment>) -> UnisegResult<Option<UniSegment>> {
    let Segment::Reply(data) = native else {
        return Ok(None);
    };
    Ok(Some(UniSegment::reply(data.message_id.to_string())))
}

#[cfg(test)]
mod tests {
    use uniseg_core::{SegmentData, SegmentKind, StyleRange, UnisegError};

    use super::*;
    use crate::model::entity::MessageEntity;
    use crate::model::segment::{DiceData, TextData};

    #[test]
    fn test_styled_text() {
        let native = Segment::styled(
            "Hello 👋 world",
            vec![MessageEntity::new("bold", 9, 5), MessageEntity::new("italic", 0, 14)],
        );
        let msg = create().generate_sync(&[native]).unwrap();
        let text = msg[0].as_styled().unwrap();
        assert_eq!(text.as_str(), "Hello 👋 world");
        assert_eq!(text.styles()[0], StyleRange::new(8, 13, "bold"));
        assert_eq!(text.most_style_at(9), Some("bold"));
        assert_eq!(text.most_style_at(2), Some("italic"));
    }

    #[test]
    fn test_bad_entity_fails() {
        let native = Segment::Text(TextData {
            text: "hi".into(),
            entities: vec![MessageEntity::new("bold", 1, 5)],
        });
        let err = create().generate_sync(&[native]).unwrap_err();
        assert!(matches!(err, UnisegError::InvalidRange { .. }));
    }

    #[test]
    fn test_media_and_reply() {
        let mut doc = FileData::new("BQACAgIAAxk");
        doc.file_name = Some("report.pdf".into());
        let msg = create()
            .generate_sync(&[
                Segment::reply(12),
                Segment::photo("AgACAgIAAxk"),
                Segment::Document(doc),
            ])
            .unwrap();

        assert_eq!(msg[0], UniSegment::reply("12"));
        assert_eq!(msg[1], UniSegment::image(Media::from_id("AgACAgIAAxk")));
        assert_eq!(msg[2].kind(), SegmentKind::File);
        assert_eq!(msg[2].to_string(), "[file:report.pdf]");
    }

    #[test]
    fn test_dice_kept_as_other() {
        let dice = Segment::Dice(DiceData {
            emoji: "🎲".into(),
            value: 4,
        });
        let msg = create().generate_sync(&[dice]).unwrap();
        let SegmentData::Other(other) = &msg[0].data else {
            panic!("expected Other");
        };
        assert_eq!((other.platform.as_str(), other.tag.as_str()), ("telegram", "dice"));
        assert_eq!(other.payload["data"]["value"], 4);
    }
}
