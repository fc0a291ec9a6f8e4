//! # Uniseg Adapter for Telegram
//!
//! Translates between Telegram Bot API messages and universal segments.
//!
//! Telegram formats text with entities measured in UTF-16 code units; they
//! map onto [`Text`](uniseg_core::Text) style ranges in both directions:
//!
//! ```text
//! bold, italic, underline, strikethrough,
//! spoiler, code, blockquote                <-> same name
//! pre (language)                           <-> pre:language
//! text_link (url)                          <-> link:url
//! text_mention (user)                      <-> mention:user_id
//! mention (@username)                      <-> mention
//! custom_emoji (id)                        <-> emoji:id
//! url, hashtag, ...                         -> same name (not sent back)
//! ```
//!
//! The adapter has no upload path and Telegram has no forwards, cards or
//! role mentions, which makes it the strict counterpart to the OneBot
//! adapter when exercising fallback policies.

pub mod bot;
pub mod builders;
pub mod exporters;
pub mod model;

use uniseg_core::{MessageBuilder, MessageExporter, Platform};

pub use bot::{Outgoing, TelegramBot, plan};
pub use model::api::{ApiFile, ApiMessage, ApiSticker};
pub use model::entity::{MessageEntity, User, entities_to_text, text_to_entities};
pub use model::segment::{
    DiceData, FileData, LocationData, ReplyData, Segment, StickerData, TelegramMessage, TextData,
};

/// The Telegram Bot API platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Telegram;

impl Platform for Telegram {
    type Native = Segment;

    const NAME: &'static str = "telegram";
    const SCOPE: &'static str = "telegram";

    fn builder() -> MessageBuilder<Segment> {
        builders::create()
    }

    fn exporter() -> MessageExporter<Segment> {
        exporters::create()
    }
}

#[cfg(test)]
mod tests {
    use uniseg_core::{FallbackPolicy, Segment as UniSegment, Text, UniMessage};

    use super::*;

    #[tokio::test]
    async fn test_styled_round_trip() {
        let mut link = MessageEntity::new("text_link", 0, 4);
        link.url = Some("https://www.rust-lang.org".into());
        let natives = vec![Segment::styled(
            "Rust 🦀 rocks",
            vec![link, MessageEntity::new("bold", 8, 5)],
        )];

        let msg = Telegram::builder().generate_sync(&natives).unwrap();
        let expected = Text::new("Rust 🦀 rocks")
            .mark_with(0, 4, "link", "https://www.rust-lang.org")
            .unwrap()
            .mark(7, 12, "bold")
            .unwrap();
        assert_eq!(msg, UniMessage::from(UniSegment::styled(expected)));

        let back = Telegram::exporter()
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap();
        assert_eq!(back.into_segments(), natives);
    }

    #[tokio::test]
    async fn test_onebot_only_segments_degrade() {
        let msg = UniMessage::text("hi ") + UniSegment::at_role("admins");
        let natives = Telegram::exporter()
            .export(&msg, None, FallbackPolicy::Text)
            .await
            .unwrap();
        assert_eq!(natives.extract_plain_text(), "hi @admins");
    }
}
