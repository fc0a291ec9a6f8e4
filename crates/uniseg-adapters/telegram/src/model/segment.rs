//! Telegram native segments.
//!
//! The Bot API has no segment list: a message is either styled text or a
//! single media item. Incoming updates are split into segments, and on
//! send consecutive text segments are merged back into one `sendMessage`.

use serde::{Deserialize, Serialize};
use uniseg_core::{NativeMessage, NativeSegment};

use super::entity::{MessageEntity, utf16_len};

/// A Telegram message.
pub type TelegramMessage = NativeMessage<Segment>;

/// A Telegram message segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Text with formatting entities.
    Text(TextData),
    Photo(FileData),
    Voice(FileData),
    Audio(FileData),
    Video(FileData),
    /// GIF or silent video.
    Animation(FileData),
    Document(FileData),
    Sticker(StickerData),
    /// Marks the message this one replies to.
    Reply(ReplyData),
    Location(LocationData),
    Dice(DiceData),
}

impl NativeSegment for Segment {
    fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData {
            text: text.into(),
            entities: Vec::new(),
        })
    }

    fn type_tag(&self) -> &str {
        match self {
            Segment::Text(_) => "text",
            Segment::Photo(_) => "photo",
            Segment::Voice(_) => "voice",
            Segment::Audio(_) => "audio",
            Segment::Video(_) => "video",
            Segment::Animation(_) => "animation",
            Segment::Document(_) => "document",
            Segment::Sticker(_) => "sticker",
            Segment::Reply(_) => "reply",
            Segment::Location(_) => "location",
            Segment::Dice(_) => "dice",
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }
}

impl Segment {
    /// Creates a text segment with entities.
    pub fn styled(text: impl Into<String>, entities: Vec<MessageEntity>) -> Self {
        Segment::Text(TextData {
            text: text.into(),
            entities,
        })
    }

    pub fn photo(file: impl Into<String>) -> Self {
        Segment::Photo(FileData::new(file))
    }

    pub fn voice(file: impl Into<String>) -> Self {
        Segment::Voice(FileData::new(file))
    }

    pub fn audio(file: impl Into<String>) -> Self {
        Segment::Audio(FileData::new(file))
    }

    pub fn video(file: impl Into<String>) -> Self {
        Segment::Video(FileData::new(file))
    }

    pub fn document(file: impl Into<String>) -> Self {
        Segment::Document(FileData::new(file))
    }

    pub fn reply(message_id: i64) -> Self {
        Segment::Reply(ReplyData { message_id })
    }
}

/// Text segment data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
}

impl TextData {
    /// Appends `other`, shifting its entities past the current text.
    pub fn append(&mut self, other: TextData) {
        let shift = utf16_len(&self.text);
        self.text.push_str(&other.text);
        self.entities
            .extend(other.entities.into_iter().map(|mut entity| {
                entity.offset += shift;
                entity
            }));
    }
}

/// Media segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    /// A `file_id` known to Telegram or an HTTP URL.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileData {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            file_name: None,
            mime_type: None,
        }
    }
}

/// Sticker segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerData {
    pub file: String,
    /// Emoji associated with the sticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// Reply segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    pub message_id: i64,
}

/// Location segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
}

/// Dice segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceData {
    pub emoji: String,
    #[serde(default)]
    pub value: i32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        let seg = Segment::styled("hi", vec![MessageEntity::new("bold", 0, 2)]);
        assert_eq!(
            serde_json::to_value(&seg).unwrap(),
            json!({
                "type": "text",
                "data": {"text": "hi", "entities": [{"type": "bold", "offset": 0, "length": 2}]}
            })
        );
        assert_eq!(
            serde_json::to_value(Segment::reply(7)).unwrap(),
            json!({"type": "reply", "data": {"message_id": 7}})
        );
    }

    #[test]
    fn test_append_shifts_entities() {
        let mut data = TextData {
            text: "👋 ".into(),
            entities: vec![MessageEntity::new("italic", 0, 2)],
        };
        data.append(TextData {
            text: "bob".into(),
            entities: vec![MessageEntity::new("bold", 0, 3)],
        });
        assert_eq!(data.text, "👋 bob");
        assert_eq!(data.entities[1], MessageEntity::new("bold", 3, 3));
    }
}
