//! Universal message segments.
//!
//! A [`Segment`] is one unit of platform-neutral content. The payload lives
//! in [`SegmentData`]; every segment additionally owns an ordered list of
//! `children`, which lets a [`Reply`] carry the quoted message or any other
//! segment wrap nested content. The tree is strictly nested: children are
//! owned values, so cycles cannot be expressed.
//!
//! # Example
//!
//! ```rust,ignore
//! use uniseg_core::{Segment, SegmentKind};
//!
//! let at = Segment::at("123");
//! assert_eq!(at.kind(), SegmentKind::At);
//! assert_eq!(at.to_string(), "@123");
//!
//! let reply = Segment::reply("42").with_children(vec![Segment::text("quoted")]);
//! assert_eq!(reply.children().len(), 1);
//! ```

use std::fmt::{self, Display};
use std::path::PathBuf;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{UnisegError, UnisegResult};
use crate::style::Text;

// ============================================================================
// SegmentKind
// ============================================================================

/// Fieldless discriminant of [`SegmentData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Text,
    At,
    AtAll,
    Emoji,
    Image,
    Audio,
    Video,
    File,
    Reply,
    Reference,
    Hyper,
    Other,
    Custom,
}

impl SegmentKind {
    /// Every built-in kind, in declaration order.
    pub const ALL: [SegmentKind; 13] = [
        Self::Text,
        Self::At,
        Self::AtAll,
        Self::Emoji,
        Self::Image,
        Self::Audio,
        Self::Video,
        Self::File,
        Self::Reply,
        Self::Reference,
        Self::Hyper,
        Self::Other,
        Self::Custom,
    ];

    /// Registry tag of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::At => "at",
            Self::AtAll => "at_all",
            Self::Emoji => "emoji",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
            Self::Reply => "reply",
            Self::Reference => "reference",
            Self::Hyper => "hyper",
            Self::Other => "other",
            Self::Custom => "custom",
        }
    }

    /// Parses a registry tag back into a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Returns true for image, audio, video and file.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Audio | Self::Video | Self::File)
    }
}

impl Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Variant payloads
// ============================================================================

/// What an [`At`] points to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtFlag {
    #[default]
    User,
    Role,
    Channel,
}

impl AtFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Channel => "channel",
        }
    }
}

/// A mention of a user, role or channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct At {
    pub flag: AtFlag,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A mention of everyone (`here` restricts it to online members).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtAll {
    #[serde(default)]
    pub here: bool,
}

/// A platform emoji or sticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emoji {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Where the bytes of a media segment come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Url(String),
    Path(PathBuf),
    Raw(Bytes),
}

/// Shared payload of image, audio, video and file segments.
///
/// At most one content source can be set; `id` is an optional
/// platform-side file identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MediaSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

impl Media {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: Some(MediaSource::Url(url.into())),
            ..Default::default()
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(MediaSource::Path(path.into())),
            ..Default::default()
        }
    }

    pub fn from_raw(raw: impl Into<Bytes>) -> Self {
        Self {
            source: Some(MediaSource::Raw(raw.into())),
            ..Default::default()
        }
    }

    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// The inline URL, if this media is URL-sourced.
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            Some(MediaSource::Url(url)) => Some(url),
            _ => None,
        }
    }

    /// Returns true if the content must be uploaded before sending.
    pub fn needs_upload(&self) -> bool {
        matches!(
            self.source,
            Some(MediaSource::Path(_)) | Some(MediaSource::Raw(_))
        )
    }
}

/// A reply marker referring to an earlier message.
///
/// The quoted content, when known, is stored in the segment's children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
}

/// One node of a forwarded message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Segment>,
}

/// A forwarded message, either by platform id or by explicit nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<RefNode>,
}

/// Encoding of a rich card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperFormat {
    Xml,
    Json,
}

/// A rich card carried as raw markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyper {
    pub format: HyperFormat,
    pub raw: String,
}

/// A native segment no builder understood, kept verbatim.
///
/// It can only be exported back to `platform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Other {
    pub platform: String,
    pub tag: String,
    pub payload: Value,
}

/// A third-party segment identified by a unique tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Custom {
    pub tag: String,
    pub data: Value,
    /// Text rendering captured at construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A typed custom segment.
///
/// Usually implemented with `#[derive(CustomSegment)]`.
pub trait CustomSegmentType: Serialize + DeserializeOwned {
    /// Unique registry tag.
    const TAG: &'static str;

    /// Plain-text rendering used when the segment is degraded to text.
    fn display(&self) -> String {
        format!("[{}]", Self::TAG)
    }
}

// ============================================================================
// SegmentData / Segment
// ============================================================================

/// The payload of a [`Segment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SegmentData {
    Text(Text),
    At(At),
    AtAll(AtAll),
    Emoji(Emoji),
    Image(Media),
    Audio(Media),
    Video(Media),
    File(Media),
    Reply(Reply),
    Reference(Reference),
    Hyper(Hyper),
    Other(Other),
    Custom(Custom),
}

// `Value` is not `Eq`/`Hash`, but JSON values compare structurally.
impl Eq for Other {}
impl Eq for Custom {}
impl Eq for SegmentData {}

impl std::hash::Hash for Other {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.platform.hash(state);
        self.tag.hash(state);
        self.payload.to_string().hash(state);
    }
}

impl std::hash::Hash for Custom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        self.data.to_string().hash(state);
    }
}

impl std::hash::Hash for SegmentData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Text(v) => v.hash(state),
            Self::At(v) => v.hash(state),
            Self::AtAll(v) => v.hash(state),
            Self::Emoji(v) => v.hash(state),
            Self::Image(v) | Self::Audio(v) | Self::Video(v) | Self::File(v) => v.hash(state),
            Self::Reply(v) => v.hash(state),
            Self::Reference(v) => v.hash(state),
            Self::Hyper(v) => v.hash(state),
            Self::Other(v) => v.hash(state),
            Self::Custom(v) => v.hash(state),
        }
    }
}

/// One unit of normalized message content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    #[serde(flatten)]
    pub data: SegmentData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Segment>,
}

impl From<SegmentData> for Segment {
    fn from(data: SegmentData) -> Self {
        Self {
            data,
            children: Vec::new(),
        }
    }
}

impl Segment {
    // --------------------------------
    // Constructors
    // --------------------------------

    pub fn text(text: impl Into<String>) -> Self {
        SegmentData::Text(Text::new(text)).into()
    }

    pub fn styled(text: Text) -> Self {
        SegmentData::Text(text).into()
    }

    /// Mentions a user.
    pub fn at(target: impl Into<String>) -> Self {
        Self::at_flag(AtFlag::User, target)
    }

    pub fn at_role(target: impl Into<String>) -> Self {
        Self::at_flag(AtFlag::Role, target)
    }

    pub fn at_channel(target: impl Into<String>) -> Self {
        Self::at_flag(AtFlag::Channel, target)
    }

    pub fn at_flag(flag: AtFlag, target: impl Into<String>) -> Self {
        SegmentData::At(At {
            flag,
            target: target.into(),
            display: None,
        })
        .into()
    }

    pub fn at_all() -> Self {
        SegmentData::AtAll(AtAll::default()).into()
    }

    pub fn emoji(id: impl Into<String>) -> Self {
        SegmentData::Emoji(Emoji {
            id: id.into(),
            name: None,
        })
        .into()
    }

    pub fn image(media: Media) -> Self {
        SegmentData::Image(media).into()
    }

    pub fn audio(media: Media) -> Self {
        SegmentData::Audio(media).into()
    }

    pub fn video(media: Media) -> Self {
        SegmentData::Video(media).into()
    }

    pub fn file(media: Media) -> Self {
        SegmentData::File(media).into()
    }

    pub fn reply(id: impl Into<String>) -> Self {
        SegmentData::Reply(Reply { id: id.into() }).into()
    }

    pub fn reference(reference: Reference) -> Self {
        SegmentData::Reference(reference).into()
    }

    pub fn hyper(format: HyperFormat, raw: impl Into<String>) -> Self {
        SegmentData::Hyper(Hyper {
            format,
            raw: raw.into(),
        })
        .into()
    }

    /// Wraps a native segment that has no universal counterpart.
    pub fn other(platform: impl Into<String>, tag: impl Into<String>, payload: Value) -> Self {
        SegmentData::Other(Other {
            platform: platform.into(),
            tag: tag.into(),
            payload,
        })
        .into()
    }

    /// Builds a custom segment from its typed form.
    pub fn custom<T: CustomSegmentType>(value: &T) -> UnisegResult<Self> {
        Ok(SegmentData::Custom(Custom {
            tag: T::TAG.to_string(),
            data: serde_json::to_value(value)?,
            display: Some(value.display()),
        })
        .into())
    }

    /// Replaces the children (builder form).
    pub fn with_children(mut self, children: Vec<Segment>) -> Self {
        self.children = children;
        self
    }

    // --------------------------------
    // Accessors
    // --------------------------------

    pub fn kind(&self) -> SegmentKind {
        match &self.data {
            SegmentData::Text(_) => SegmentKind::Text,
            SegmentData::At(_) => SegmentKind::At,
            SegmentData::AtAll(_) => SegmentKind::AtAll,
            SegmentData::Emoji(_) => SegmentKind::Emoji,
            SegmentData::Image(_) => SegmentKind::Image,
            SegmentData::Audio(_) => SegmentKind::Audio,
            SegmentData::Video(_) => SegmentKind::Video,
            SegmentData::File(_) => SegmentKind::File,
            SegmentData::Reply(_) => SegmentKind::Reply,
            SegmentData::Reference(_) => SegmentKind::Reference,
            SegmentData::Hyper(_) => SegmentKind::Hyper,
            SegmentData::Other(_) => SegmentKind::Other,
            SegmentData::Custom(_) => SegmentKind::Custom,
        }
    }

    /// Registry tag: the kind name, or the custom tag for custom segments.
    pub fn type_tag(&self) -> &str {
        match &self.data {
            SegmentData::Custom(custom) => &custom.tag,
            _ => self.kind().as_str(),
        }
    }

    pub fn children(&self) -> &[Segment] {
        &self.children
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, SegmentData::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            SegmentData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_styled(&self) -> Option<&Text> {
        match &self.data {
            SegmentData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Mutable access to the style annotations of a text segment.
    pub fn as_styled_mut(&mut self) -> Option<&mut Text> {
        match &mut self.data {
            SegmentData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_media(&self) -> Option<&Media> {
        match &self.data {
            SegmentData::Image(m)
            | SegmentData::Audio(m)
            | SegmentData::Video(m)
            | SegmentData::File(m) => Some(m),
            _ => None,
        }
    }

    /// Decodes a custom segment into `T` if the tag matches.
    pub fn custom_as<T: CustomSegmentType>(&self) -> Option<UnisegResult<T>> {
        match &self.data {
            SegmentData::Custom(custom) if custom.tag == T::TAG => Some(
                serde_json::from_value(custom.data.clone()).map_err(UnisegError::from),
            ),
            _ => None,
        }
    }
}

// ============================================================================
// Display (plain-text rendering, used by the text degrade policy)
// ============================================================================

impl Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            SegmentData::Text(text) => write!(f, "{text}"),
            SegmentData::At(at) => match (&at.display, at.flag) {
                (Some(display), _) => write!(f, "@{display}"),
                (None, AtFlag::Channel) => write!(f, "#{}", at.target),
                (None, _) => write!(f, "@{}", at.target),
            },
            SegmentData::AtAll(all) => {
                if all.here {
                    write!(f, "@here")
                } else {
                    write!(f, "@everyone")
                }
            }
            SegmentData::Emoji(emoji) => match &emoji.name {
                Some(name) => write!(f, "[emoji:{name}]"),
                None => write!(f, "[emoji:{}]", emoji.id),
            },
            SegmentData::Image(_) => write!(f, "[image]"),
            SegmentData::Audio(_) => write!(f, "[audio]"),
            SegmentData::Video(_) => write!(f, "[video]"),
            SegmentData::File(media) => match &media.name {
                Some(name) => write!(f, "[file:{name}]"),
                None => write!(f, "[file]"),
            },
            SegmentData::Reply(reply) => write!(f, "[reply:{}]", reply.id),
            SegmentData::Reference(_) => write!(f, "[forward]"),
            SegmentData::Hyper(hyper) => match hyper.format {
                HyperFormat::Xml => write!(f, "[xml]"),
                HyperFormat::Json => write!(f, "[json]"),
            },
            SegmentData::Other(other) => write!(f, "[{}]", other.tag),
            SegmentData::Custom(custom) => match &custom.display {
                Some(display) => f.write_str(display),
                None => write!(f, "[{}]", custom.tag),
            },
        }
    }
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<Text> for Segment {
    fn from(text: Text) -> Self {
        Self::styled(text)
    }
}
