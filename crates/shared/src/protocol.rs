//! Real-time wire protocol.
//!
//! Every frame is a single JSON text message carrying the event name and its
//! payload: `{"event": "join-room", "data": 10}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::{
    Chat, DeletedChat, DeletedMessage, Message, MessageRead, RoomId, RoomRef, TypingActivity,
};

/// Events the client emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(RoomId),
    LeaveRoom(RoomId),
    TypingStart(RoomRef),
    TypingStop(RoomRef),
    MessageRead(MessageRead),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::LeaveRoom(_) => "leave-room",
            ClientEvent::TypingStart(_) => "typing-start",
            ClientEvent::TypingStop(_) => "typing-stop",
            ClientEvent::MessageRead(_) => "message-read",
        }
    }
}

/// Events the server pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    MessageNew(Message),
    MessageDeleted(DeletedMessage),
    ChatNew(Chat),
    ChatDeleted(DeletedChat),
    UserTyping(TypingActivity),
    UserStoppedTyping(TypingActivity),
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::MessageNew(_) => EventKind::MessageNew,
            ServerEvent::MessageDeleted(_) => EventKind::MessageDeleted,
            ServerEvent::ChatNew(_) => EventKind::ChatNew,
            ServerEvent::ChatDeleted(_) => EventKind::ChatDeleted,
            ServerEvent::UserTyping(_) => EventKind::UserTyping,
            ServerEvent::UserStoppedTyping(_) => EventKind::UserStoppedTyping,
        }
    }

    /// The room this event concerns. `chat-new` concerns the new chat itself.
    pub fn room_id(&self) -> RoomId {
        match self {
            ServerEvent::MessageNew(m) => m.room_id,
            ServerEvent::MessageDeleted(d) => d.room_id,
            ServerEvent::ChatNew(c) => c.id,
            ServerEvent::ChatDeleted(d) => d.room_id,
            ServerEvent::UserTyping(t) | ServerEvent::UserStoppedTyping(t) => t.room_id,
        }
    }
}

/// The closed set of server event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    MessageNew,
    MessageDeleted,
    ChatNew,
    ChatDeleted,
    UserTyping,
    UserStoppedTyping,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::MessageNew,
        EventKind::MessageDeleted,
        EventKind::ChatNew,
        EventKind::ChatDeleted,
        EventKind::UserTyping,
        EventKind::UserStoppedTyping,
    ];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageNew => "message-new",
            EventKind::MessageDeleted => "message-deleted",
            EventKind::ChatNew => "chat-new",
            EventKind::ChatDeleted => "chat-deleted",
            EventKind::UserTyping => "user-typing",
            EventKind::UserStoppedTyping => "user-stopped-typing",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize an outbound event into a text frame.
pub fn encode(event: &ClientEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

/// Parse an inbound text frame.
pub fn decode(frame: &str) -> Result<ServerEvent, ProtocolError> {
    serde_json::from_str(frame).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_room_carries_bare_room_id() {
        let frame = encode(&ClientEvent::JoinRoom(10)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({ "event": "join-room", "data": 10 }));
    }

    #[test]
    fn typing_and_read_payloads_use_camel_case() {
        let start = encode(&ClientEvent::TypingStart(RoomRef { room_id: 5 })).unwrap();
        let value: serde_json::Value = serde_json::from_str(&start).unwrap();
        assert_eq!(value, json!({ "event": "typing-start", "data": { "roomId": 5 } }));

        let read = encode(&ClientEvent::MessageRead(MessageRead {
            message_id: 42,
            room_id: 5,
        }))
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&read).unwrap();
        assert_eq!(
            value,
            json!({ "event": "message-read", "data": { "messageId": 42, "roomId": 5 } })
        );
    }

    #[test]
    fn decodes_user_stopped_typing() {
        let event =
            decode(r#"{"event":"user-stopped-typing","data":{"roomId":5,"userId":9}}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::UserStoppedTyping(TypingActivity {
                room_id: 5,
                user_id: 9
            })
        );
        assert_eq!(event.kind(), EventKind::UserStoppedTyping);
        assert_eq!(event.room_id(), 5);
    }

    #[test]
    fn decodes_message_new_record() {
        let event = decode(
            r#"{"event":"message-new","data":{"id":7,"chat_id":10,"content":"hi","sender_id":3,"sent_at":"2024-05-01T12:00:00Z"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::MessageNew(message) => {
                assert_eq!(message.id, 7);
                assert_eq!(message.room_id, 10);
                assert_eq!(message.author(), Some(3));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_a_decode_error() {
        let err = decode(r#"{"event":"room-exploded","data":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn kind_names_match_serde_tags() {
        for kind in EventKind::ALL {
            assert!(kind.as_str().chars().all(|c| c.is_ascii_lowercase() || c == '-'));
        }
        let deleted = ServerEvent::ChatDeleted(DeletedChat { room_id: 1 });
        let value = serde_json::to_value(&deleted).unwrap();
        assert_eq!(value["event"], deleted.kind().as_str());
    }
}
