//! Telegram message entities and their mapping to style ranges.
//!
//! Telegram measures entity offsets in UTF-16 code units while
//! [`Text`] ranges count characters, so every conversion goes through an
//! offset table.

use serde::{Deserialize, Serialize};
use uniseg_core::{StyleRange, Text, UnisegError, UnisegResult};

/// A Telegram user, as carried by `text_mention` entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            is_bot: false,
            first_name: String::new(),
            username: None,
        }
    }
}

/// One special part of a text, e.g. a bold span or a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    /// Offset in UTF-16 code units.
    pub offset: usize,
    /// Length in UTF-16 code units.
    pub length: usize,
    /// Target of a `text_link`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Mentioned user of a `text_mention`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Language of a `pre` block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_emoji_id: Option<String>,
}

impl MessageEntity {
    pub fn new(kind: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            kind: kind.into(),
            offset,
            length,
            url: None,
            user: None,
            language: None,
            custom_emoji_id: None,
        }
    }
}

/// Formatting entities that carry no parameter and keep their name as
/// the style name.
const PLAIN_STYLES: &[&str] = &[
    "bold",
    "italic",
    "underline",
    "strikethrough",
    "spoiler",
    "code",
    "blockquote",
    "expandable_blockquote",
];

/// UTF-16 offset of every char boundary, including the end.
pub(crate) fn utf16_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len() + 1);
    let mut position = 0;
    for c in text.chars() {
        offsets.push(position);
        position += c.len_utf16();
    }
    offsets.push(position);
    offsets
}

/// Length of `text` in UTF-16 code units.
pub(crate) fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Converts received entities to a styled [`Text`].
///
/// Entities that split a surrogate pair or run past the text are rejected.
pub fn entities_to_text(text: &str, entities: &[MessageEntity]) -> UnisegResult<Text> {
    let offsets = utf16_offsets(text);
    let to_char = |unit: usize| offsets.binary_search(&unit).ok();

    let mut ranges = Vec::with_capacity(entities.len());
    for entity in entities {
        let end_unit = entity.offset + entity.length;
        let (Some(start), Some(end)) = (to_char(entity.offset), to_char(end_unit)) else {
            return Err(UnisegError::InvalidRange {
                start: entity.offset,
                end: end_unit,
                len: offsets.last().copied().unwrap_or_default(),
            });
        };

        let (style, param) = match entity.kind.as_str() {
            "text_link" => ("link", entity.url.clone()),
            "text_mention" => ("mention", entity.user.as_ref().map(|u| u.id.to_string())),
            "custom_emoji" => ("emoji", entity.custom_emoji_id.clone()),
            "pre" => ("pre", entity.language.clone()),
            other => (other, None),
        };
        let range = StyleRange::new(start, end, style);
        ranges.push(match param {
            Some(param) => range.with_param(param),
            None => range,
        });
    }
    Text::with_styles(text, ranges)
}

/// Converts one style range to an entity, if Telegram can express it.
///
/// Auto-detected kinds such as `url` and `hashtag` are left to the server
/// and yield `None`.
pub fn style_to_entity(range: &StyleRange, offsets: &[usize]) -> Option<MessageEntity> {
    let offset = *offsets.get(range.start)?;
    let length = offsets.get(range.end)? - offset;
    let param = range.param.clone();

    let mut entity = MessageEntity::new(range.style.as_str(), offset, length);
    match range.style.as_str() {
        style if PLAIN_STYLES.contains(&style) => {}
        "pre" => entity.language = param,
        "link" => {
            entity.kind = "text_link".into();
            entity.url = Some(param?);
        }
        // `@username` mentions carry no user and keep their kind.
        "mention" => {
            if let Some(id) = param {
                entity.kind = "text_mention".into();
                entity.user = Some(User::new(id.parse().ok()?));
            }
        }
        "emoji" => {
            entity.kind = "custom_emoji".into();
            entity.custom_emoji_id = Some(param?);
        }
        _ => return None,
    }
    Some(entity)
}

/// Converts the styles of `text` to entities sorted by offset.
pub fn text_to_entities(text: &Text) -> Vec<MessageEntity> {
    let offsets = utf16_offsets(text.as_str());
    let mut entities: Vec<_> = text
        .styles()
        .iter()
        .filter_map(|range| style_to_entity(range, &offsets))
        .collect();
    entities.sort_by_key(|entity| entity.offset);
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_offsets() {
        assert_eq!(utf16_offsets("a👋b"), vec![0, 1, 3, 4]);
        assert_eq!(utf16_len("a👋b"), 4);
        assert_eq!(utf16_offsets(""), vec![0]);
    }

    #[test]
    fn test_entities_to_text() {
        let mut link = MessageEntity::new("text_link", 0, 5);
        link.url = Some("https://example.com".into());
        let entities = vec![link, MessageEntity::new("bold", 9, 5)];

        let text = entities_to_text("Hello 👋 world", &entities).unwrap();
        assert_eq!(
            text.styles(),
            &[
                StyleRange::new(0, 5, "link").with_param("https://example.com"),
                StyleRange::new(8, 13, "bold"),
            ]
        );
        assert_eq!(text.most_style_at(10), Some("bold"));
    }

    #[test]
    fn test_split_surrogate_rejected() {
        let entities = vec![MessageEntity::new("bold", 1, 1)];
        let err = entities_to_text("👋", &entities).unwrap_err();
        assert!(matches!(err, UnisegError::InvalidRange { start: 1, end: 2, len: 2 }));
    }

    #[test]
    fn test_text_to_entities() {
        let text = Text::new("👋 @alice hi")
            .mark(2, 8, "mention")
            .unwrap()
            .mark_with(0, 1, "emoji", "5368324170671202286")
            .unwrap()
            .mark(9, 11, "hashtag")
            .unwrap()
            .mark(9, 11, "link")
            .unwrap();

        let entities = text_to_entities(&text);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].kind, "custom_emoji");
        assert_eq!((entities[0].offset, entities[0].length), (0, 2));
        assert_eq!(entities[1], MessageEntity::new("mention", 3, 6));

        let text = Text::new("ping bob")
            .mark_with(5, 8, "mention", "42")
            .unwrap()
            .mark(0, 4, "bold")
            .unwrap();
        let entities = text_to_entities(&text);
        assert_eq!(entities[0], MessageEntity::new("bold", 0, 4));
        assert_eq!(entities[1].kind, "text_mention");
        assert_eq!(entities[1].user.as_ref().map(|u| u.id), Some(42));
    }

    #[test]
    fn test_username_mention_round_trip() {
        let received = vec![MessageEntity::new("mention", 3, 6)];
        let text = entities_to_text("hi @alice", &received).unwrap();
        assert_eq!(text.styles(), &[StyleRange::new(3, 9, "mention")]);
        assert_eq!(text_to_entities(&text), received);
    }
}
