//! Telegram Bot API data model.

pub mod api;
pub mod entity;
pub mod segment;

pub use api::{ApiFile, ApiMessage, ApiSticker};
pub use entity::{MessageEntity, User};
pub use segment::{
    DiceData, FileData, LocationData, ReplyData, Segment, StickerData, TelegramMessage, TextData,
};
