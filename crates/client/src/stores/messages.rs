//! Per-room message threads.
//!
//! Messages are organized by room, and each room tracks whether its history
//! has been loaded from the REST API.

use parley_shared::{Message, MessageId};

/// Confirmed messages for a single room.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RoomThread {
    /// All messages in this room, sorted by `sent_at` ascending.
    pub messages: Vec<Message>,
    /// Whether the room history has been fetched from the REST API.
    pub is_loaded: bool,
}

impl RoomThread {
    /// Add a message to the room, maintaining sort order by `sent_at`.
    /// Returns false if a message with the same ID already exists (deduplication).
    pub fn add_message(&mut self, msg: Message) -> bool {
        if self.contains(msg.id) {
            return false;
        }

        // Ties keep arrival order
        let pos = self.messages.partition_point(|m| m.sent_at <= msg.sent_at);
        self.messages.insert(pos, msg);
        true
    }

    pub fn remove_message(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Set the full message history (from REST API fetch). Messages that
    /// arrived live before the fetch completed are kept.
    /// Marks the room as loaded.
    pub fn set_history(&mut self, messages: Vec<Message>) {
        let live = std::mem::replace(&mut self.messages, messages);
        self.messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        self.messages.dedup_by_key(|m| m.id);
        for msg in live {
            self.add_message(msg);
        }
        self.is_loaded = true;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
