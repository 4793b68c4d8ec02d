//! Optimistic records for sends still in flight.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use parley_shared::{Message, MessageId, RoomId, UserId};

/// A message the user sent that the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    /// Always negative, so it can never collide with a server id.
    pub local_id: MessageId,
    pub room_id: RoomId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PendingMessage {
    /// Whether `confirmed` is the server's copy of this send.
    pub(crate) fn matches(&self, confirmed: &Message, local_user: Option<UserId>) -> bool {
        if self.room_id != confirmed.room_id || self.content != confirmed.content {
            return false;
        }
        match (local_user, confirmed.author()) {
            (Some(me), Some(author)) => me == author,
            _ => true,
        }
    }
}

/// Clock-derived local ids: the negated millisecond timestamp, bumped so
/// consecutive ids stay strictly decreasing within a millisecond.
#[derive(Debug, Default)]
pub(crate) struct LocalIds {
    last: AtomicI64,
}

impl LocalIds {
    pub(crate) fn next(&self) -> MessageId {
        let now = Utc::now().timestamp_millis().max(1);
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        -now.max(prev + 1)
    }
}
