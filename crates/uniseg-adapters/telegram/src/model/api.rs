//! Bot API objects the adapter reads.

use serde::{Deserialize, Serialize};

use super::entity::MessageEntity;
use super::segment::{DiceData, FileData, LocationData, Segment, StickerData, TextData};

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFile {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl From<ApiFile> for FileData {
    fn from(file: ApiFile) -> Self {
        FileData {
            file: file.file_id,
            file_name: file.file_name,
            mime_type: file.mime_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSticker {
    pub file_id: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// A received or sent message.
///
/// Only the content fields are modelled; chat and sender metadata stay
/// with the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub caption_entities: Vec<MessageEntity>,
    /// Available sizes, smallest first.
    #[serde(default)]
    pub photo: Vec<ApiFile>,
    #[serde(default)]
    pub voice: Option<ApiFile>,
    #[serde(default)]
    pub audio: Option<ApiFile>,
    #[serde(default)]
    pub video: Option<ApiFile>,
    #[serde(default)]
    pub animation: Option<ApiFile>,
    #[serde(default)]
    pub document: Option<ApiFile>,
    #[serde(default)]
    pub sticker: Option<ApiSticker>,
    #[serde(default)]
    pub location: Option<LocationData>,
    #[serde(default)]
    pub dice: Option<DiceData>,
    #[serde(default)]
    pub reply_to_message: Option<Box<ApiMessage>>,
}

impl ApiMessage {
    /// Splits the message into native segments.
    ///
    /// The reply marker comes first, then the media, then text or caption.
    pub fn into_segments(self) -> Vec<Segment> {
        let mut segments = Vec::new();
        if let Some(replied) = self.reply_to_message {
            segments.push(Segment::reply(replied.message_id));
        }

        // Telegram also sends a document for animations; keep only one.
        let document = if self.animation.is_some() {
            None
        } else {
            self.document
        };
        segments.extend(self.photo.into_iter().last().map(|p| Segment::Photo(p.into())));
        segments.extend(self.voice.map(|f| Segment::Voice(f.into())));
        segments.extend(self.audio.map(|f| Segment::Audio(f.into())));
        segments.extend(self.video.map(|f| Segment::Video(f.into())));
        segments.extend(self.animation.map(|f| Segment::Animation(f.into())));
        segments.extend(document.map(|f| Segment::Document(f.into())));
        segments.extend(self.sticker.map(|s| {
            Segment::Sticker(StickerData {
                file: s.file_id,
                emoji: s.emoji,
            })
        }));
        segments.extend(self.location.map(Segment::Location));
        segments.extend(self.dice.map(Segment::Dice));

        let (text, entities) = match self.text {
            Some(text) => (Some(text), self.entities),
            None => (self.caption, self.caption_entities),
        };
        if let Some(text) = text {
            segments.push(Segment::Text(TextData { text, entities }));
        }
        segments
    }
}
