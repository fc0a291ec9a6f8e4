//! # Uniseg Adapter for OneBot v11
//!
//! Translates between OneBot v11 message segments and universal segments,
//! and provides a [`OneBotBot`] that sends universal messages over any
//! [`ApiCaller`](uniseg_core::ApiCaller).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use uniseg_runtime::UnisegRuntime;
//! use uniseg_adapter_onebot::{OneBot, OneBotBot, OneBotTargetFetcher};
//!
//! let runtime = UnisegRuntime::load()?;
//! runtime.register_platform::<OneBot>();
//! runtime.register_fetcher(Arc::new(OneBotTargetFetcher));
//!
//! let bot = Arc::new(OneBotBot::with_tables(
//!     "10001",
//!     caller,
//!     runtime.builder::<OneBot>()?,
//!     runtime.exporter::<OneBot>()?,
//! ));
//! runtime.register_bot(bot.clone())?;
//!
//! // Incoming
//! let msg = bot.receive(&event.message).await?;
//! // Outgoing
//! runtime.send(&Target::group("123456"), msg).await?;
//! ```
//!
//! ## Segment Mapping
//!
//! ```text
//! text          <-> Text
//! at            <-> At (user) / AtAll
//! face          <-> Emoji
//! image         <-> Image
//! record        <-> Audio
//! video         <-> Video
//! reply         <-> Reply
//! forward       <-> Reference (id only)
//! node          <-> Reference (nodes)
//! xml, json     <-> Hyper
//! others         -> Other
//! ```

pub mod bot;
pub mod builders;
pub mod exporters;
pub mod fetcher;
pub mod model;

#[cfg(test)]
pub(crate) mod testing;

use uniseg_core::{MessageBuilder, MessageExporter, Platform};

pub use bot::OneBotBot;
pub use fetcher::OneBotTargetFetcher;
pub use model::api::{ApiSender, FriendInfo, GetMsgResponse, GroupInfo, LoginInfo};
pub use model::segment::{
    AtData, EmptyData, IdData, MediaData, NodeData, OneBotMessage, PokeData, RawData, Segment,
    ShareData, TextData,
};

/// The OneBot v11 platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneBot;

impl Platform for OneBot {
    type Native = Segment;

    const NAME: &'static str = "onebot";
    const SCOPE: &'static str = "qq";

    fn builder() -> MessageBuilder<Segment> {
        builders::create()
    }

    fn exporter() -> MessageExporter<Segment> {
        exporters::create()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uniseg_core::{
        FallbackPolicy, Media, NativeSegment, Segment as UniSegment, Target, UniMessage,
    };

    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let natives = vec![
            Segment::text("Hello!"),
            Segment::at("123"),
            Segment::at_all(),
            Segment::face("178"),
            Segment::image("abc.image").with_url(Some("https://example.com/a.png".into())),
            Segment::record("voice.amr"),
            Segment::video("https://example.com/v.mp4"),
            Segment::reply("9"),
            Segment::forward("fw1"),
            Segment::node("5"),
            Segment::node_custom("10", "alice", vec![Segment::text("inner")]),
            Segment::xml("<msg/>"),
            Segment::json("{}"),
        ];
        let msg = OneBot::builder().generate_sync(&natives).unwrap();
        assert_eq!(msg.len(), natives.len());
        assert_eq!(
            msg.segments()[..2],
            [UniSegment::text("Hello!"), UniSegment::at("123")]
        );

        let back = OneBot::exporter()
            .export(&msg, None, FallbackPolicy::Forbid)
            .await
            .unwrap();
        assert_eq!(back.into_segments(), natives);
    }

    #[tokio::test]
    async fn test_file_rendered_as_text() {
        let msg = UniMessage::text("see ")
            + UniSegment::file(Media::from_url("https://x/a.txt").with_name("a.txt"));
        let natives = OneBot::exporter()
            .export(&msg, None, FallbackPolicy::Text)
            .await
            .unwrap();
        assert_eq!(natives.extract_plain_text(), "see [file:a.txt]");
    }

    #[test]
    fn test_target_dump_is_stable() {
        let target = Target::group("123456")
            .with_adapter(OneBot::NAME)
            .with_scope(OneBot::SCOPE)
            .with_self_id("10001");
        let dumped = target.dump(false);
        assert_eq!(
            serde_json::to_string(&dumped).unwrap(),
            serde_json::to_string(&json!({
                "adapter": "onebot",
                "channel": false,
                "id": "123456",
                "parent_id": null,
                "private": false,
                "scope": "qq",
                "self_id": "10001",
            }))
            .unwrap()
        );
        assert_eq!(Target::load(dumped).unwrap(), target);
    }
}
