//! Shared data models for chats, messages and real-time payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned chat (room) identifier.
pub type RoomId = i64;

/// Server-assigned user identifier.
pub type UserId = i64;

/// Message identifier. Server-assigned ids are positive; the client uses
/// negative values for messages it has not had confirmed yet.
pub type MessageId = i64;

// --- Records ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
}

/// A message as delivered by `message-new` and the REST history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "chat_id")]
    pub room_id: RoomId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserSummary>,
}

impl Message {
    /// The author, from `sender_id` or the embedded sender record.
    pub fn author(&self) -> Option<UserId> {
        self.sender_id.or_else(|| self.sender.as_ref().map(|s| s.id))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    #[default]
    Private,
    Group,
}

/// A chat as delivered by `chat-new` and the REST chat list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: RoomId,
    #[serde(rename = "type", default)]
    pub kind: ChatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<UserSummary>,
}

// --- Event payloads ---

/// `{ roomId }`, used by `typing-start` and `typing-stop`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_id: RoomId,
}

/// `{ messageId, roomId }`, sent with `message-read`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRead {
    pub message_id: MessageId,
    pub room_id: RoomId,
}

/// `{ roomId, messageId }`, received with `message-deleted`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessage {
    pub room_id: RoomId,
    pub message_id: MessageId,
}

/// `{ roomId }`, received with `chat-deleted`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedChat {
    pub room_id: RoomId,
}

/// `{ roomId, userId }`, received with `user-typing` and `user-stopped-typing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingActivity {
    pub room_id: RoomId,
    pub user_id: UserId,
}
