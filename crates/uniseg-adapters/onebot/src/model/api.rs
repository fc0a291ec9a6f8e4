//! API response types for OneBot v11.

use serde::{Deserialize, Serialize};

use super::segment::Segment;

/// Sender information in API responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSender {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    /// Group card (for group messages).
    #[serde(default)]
    pub card: Option<String>,
}

/// Response data for `get_msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMsgResponse {
    pub message_id: i64,
    #[serde(default)]
    pub real_id: Option<i64>,
    #[serde(default)]
    pub sender: ApiSender,
    #[serde(default)]
    pub time: i64,
    pub message: Vec<Segment>,
}

/// Response data for `get_login_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

/// One entry of `get_friend_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub remark: String,
}

/// One entry of `get_group_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub member_count: i32,
    #[serde(default)]
    pub max_member_count: i32,
}
