//! OneBot v11 data model.

pub mod api;
pub mod segment;

pub use api::{ApiSender, FriendInfo, GetMsgResponse, GroupInfo, LoginInfo};
pub use segment::{OneBotMessage, Segment};
