//! OneBot v11 array-format segments.
//!
//! Each segment travels as `{"type": "...", "data": {...}}`. Every field is
//! a string on the wire, ids and QQ numbers included.

use serde::{Deserialize, Serialize};

use uniseg_core::{NativeMessage, NativeSegment};

pub type OneBotMessage = NativeMessage<Segment>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    Text(TextData),
    Face(IdData),
    Image(MediaData),
    Record(MediaData),
    Video(MediaData),
    At(AtData),
    Rps(EmptyData),
    Dice(EmptyData),
    Poke(PokeData),
    Share(ShareData),
    Reply(IdData),
    /// Id of a stored forward bundle, fetched with `get_forward_msg`.
    Forward(IdData),
    /// One entry of a forward bundle being sent.
    Node(NodeData),
    Xml(RawData),
    Json(RawData),
}

impl Segment {
    pub fn face(id: impl Into<String>) -> Self {
        Self::Face(IdData::new(id))
    }

    /// `file` is a cached file name, a path, an http(s) URL or a `base64://`
    /// payload.
    pub fn image(file: impl Into<String>) -> Self {
        Self::Image(MediaData::new(file))
    }

    pub fn record(file: impl Into<String>) -> Self {
        Self::Record(MediaData::new(file))
    }

    pub fn video(file: impl Into<String>) -> Self {
        Self::Video(MediaData::new(file))
    }

    pub fn at(qq: impl Into<String>) -> Self {
        Self::At(AtData { qq: qq.into() })
    }

    pub fn at_all() -> Self {
        Self::at(AtData::ALL)
    }

    pub fn reply(id: impl Into<String>) -> Self {
        Self::Reply(IdData::new(id))
    }

    pub fn forward(id: impl Into<String>) -> Self {
        Self::Forward(IdData::new(id))
    }

    /// A node that re-sends an existing message.
    pub fn node(id: impl Into<String>) -> Self {
        Self::Node(NodeData {
            id: Some(id.into()),
            ..NodeData::default()
        })
    }

    /// A node with its own sender and content.
    pub fn node_custom(
        user_id: impl Into<String>,
        nickname: impl Into<String>,
        content: Vec<Segment>,
    ) -> Self {
        Self::Node(NodeData {
            id: None,
            user_id: Some(user_id.into()),
            nickname: Some(nickname.into()),
            content: Some(content),
        })
    }

    pub fn xml(data: impl Into<String>) -> Self {
        Self::Xml(RawData { data: data.into() })
    }

    pub fn json(data: impl Into<String>) -> Self {
        Self::Json(RawData { data: data.into() })
    }

    /// Sets the download URL of a media segment. Other segments are returned
    /// unchanged.
    pub fn with_url(mut self, url: Option<String>) -> Self {
        if let Some(media) = self.media_mut() {
            media.url = url;
        }
        self
    }

    pub fn media(&self) -> Option<&MediaData> {
        match self {
            Self::Image(media) | Self::Record(media) | Self::Video(media) => Some(media),
            _ => None,
        }
    }

    fn media_mut(&mut self) -> Option<&mut MediaData> {
        match self {
            Self::Image(media) | Self::Record(media) | Self::Video(media) => Some(media),
            _ => None,
        }
    }

    /// Nodes must go through the forward actions.
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

impl NativeSegment for Segment {
    fn text(text: impl Into<String>) -> Self {
        Self::Text(TextData { text: text.into() })
    }

    fn type_tag(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Face(_) => "face",
            Self::Image(_) => "image",
            Self::Record(_) => "record",
            Self::Video(_) => "video",
            Self::At(_) => "at",
            Self::Rps(_) => "rps",
            Self::Dice(_) => "dice",
            Self::Poke(_) => "poke",
            Self::Share(_) => "share",
            Self::Reply(_) => "reply",
            Self::Forward(_) => "forward",
            Self::Node(_) => "node",
            Self::Xml(_) => "xml",
            Self::Json(_) => "json",
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    fn children(&self) -> Vec<Self> {
        match self {
            Self::Node(node) => node.content.clone().unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// Payload of `face`, `reply` and `forward`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdData {
    pub id: String,
}

impl IdData {
    fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Payload of `image`, `record` and `video`.
///
/// Received media carry a cached `file` name plus a download `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaData {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `flash` for flash images.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl MediaData {
    fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: None,
            subtype: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    pub qq: String,
}

impl AtData {
    pub const ALL: &'static str = "all";

    pub fn is_all(&self) -> bool {
        self.qq == Self::ALL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyData {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokeData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareData {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Either `id` alone, or `user_id`, `nickname` and `content` together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Segment>>,
}

/// Card markup for `xml` and `json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawData {
    pub data: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(Segment::at("10001000")).unwrap(),
            json!({"type": "at", "data": {"qq": "10001000"}})
        );
        assert_eq!(
            serde_json::to_value(Segment::forward("fw1")).unwrap(),
            json!({"type": "forward", "data": {"id": "fw1"}})
        );

        let parsed: Segment = serde_json::from_value(json!({
            "type": "image",
            "data": {"file": "abc.image", "url": "https://example.com/a.png", "type": "flash"}
        }))
        .unwrap();
        let media = parsed.media().unwrap();
        assert_eq!(media.url.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(media.subtype.as_deref(), Some("flash"));
    }

    #[test]
    fn test_with_url() {
        let video = Segment::video("v.mp4").with_url(Some("https://x/v.mp4".into()));
        assert_eq!(
            serde_json::to_value(&video).unwrap(),
            json!({"type": "video", "data": {"file": "v.mp4", "url": "https://x/v.mp4"}})
        );
        assert_eq!(Segment::face("1").with_url(Some("ignored".into())), Segment::face("1"));
    }

    #[test]
    fn test_message_is_array() {
        let msg: OneBotMessage = vec![Segment::text("hi"), Segment::face("178")].into();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value[1]["type"], "face");
        assert_eq!(msg.extract_plain_text(), "hi");

        let parsed: OneBotMessage = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_node_children() {
        let node = Segment::node_custom("1", "alice", vec![Segment::text("inner")]);
        assert_eq!(node.children(), vec![Segment::text("inner")]);
        assert!(Segment::node("5").children().is_empty());
        assert!(Segment::at_all().as_text().is_none());
    }
}
