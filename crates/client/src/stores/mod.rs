//! Client-side realtime state.
//!
//! Transport handlers write here; views read from here. The store never
//! sends anything on the wire.

pub mod messages;
pub mod pending;
pub mod state;

use std::sync::Arc;

use chrono::Utc;
use parley_shared::{Message, MessageId, RoomId, UserId};
use tokio::sync::watch;

pub use messages::RoomThread;
pub use pending::PendingMessage;
pub use state::{Action, RealtimeState, ThreadEntry};

use crate::ws::ConnectionStatus;
use pending::LocalIds;

/// Shared handle to the [`RealtimeState`].
///
/// Every mutation goes through [`StateStore::dispatch`]; receivers obtained
/// from [`StateStore::subscribe`] are woken only when the state changed.
#[derive(Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<RealtimeState>>,
    local_ids: Arc<LocalIds>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &*self.tx.borrow())
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RealtimeState::default());
        Self {
            tx: Arc::new(tx),
            local_ids: Arc::new(LocalIds::default()),
        }
    }

    /// A clone of the current state.
    pub fn snapshot(&self) -> RealtimeState {
        self.tx.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&RealtimeState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<RealtimeState> {
        self.tx.subscribe()
    }

    /// Apply `action`, notifying subscribers if the state changed.
    pub fn dispatch(&self, action: Action) -> bool {
        self.tx.send_if_modified(|state| state.apply(action))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }

    // --- Named mutators ---

    pub fn set_status(&self, status: ConnectionStatus) {
        self.dispatch(Action::SetStatus(status));
    }

    pub fn set_active_room(&self, room_id: Option<RoomId>) {
        self.dispatch(Action::SetActiveRoom(room_id));
    }

    pub fn set_local_user(&self, user_id: Option<UserId>) {
        self.dispatch(Action::SetLocalUser(user_id));
    }

    pub fn increment_unread(&self, room_id: RoomId) {
        self.dispatch(Action::IncrementUnread(room_id));
    }

    pub fn clear_unread(&self, room_id: RoomId) {
        self.dispatch(Action::ClearUnread(room_id));
    }

    pub fn set_unread_count(&self, room_id: RoomId, count: u32) {
        self.dispatch(Action::SetUnreadCount(room_id, count));
    }

    pub fn add_typing_user(&self, room_id: RoomId, user_id: UserId) {
        self.dispatch(Action::AddTypingUser { room_id, user_id });
    }

    pub fn remove_typing_user(&self, room_id: RoomId, user_id: UserId) {
        self.dispatch(Action::RemoveTypingUser { room_id, user_id });
    }

    pub fn clear_typing_users(&self, room_id: RoomId) {
        self.dispatch(Action::ClearTypingUsers(room_id));
    }

    /// Record an optimistic send and return its local id.
    pub fn add_pending_message(&self, room_id: RoomId, content: impl Into<String>) -> MessageId {
        let local_id = self.local_ids.next();
        self.dispatch(Action::AddPending(PendingMessage {
            local_id,
            room_id,
            content: content.into(),
            created_at: Utc::now(),
        }));
        local_id
    }

    pub fn remove_pending_message(&self, local_id: MessageId) {
        self.dispatch(Action::RemovePending(local_id));
    }

    pub fn confirm_pending(&self, local_id: MessageId, message: Message) {
        self.dispatch(Action::ConfirmPending { local_id, message });
    }

    pub fn clear_pending_messages(&self) {
        self.dispatch(Action::ClearPending);
    }

    pub fn set_history(&self, room_id: RoomId, messages: Vec<Message>) {
        self.dispatch(Action::SetHistory { room_id, messages });
    }

    pub fn reset(&self) {
        self.dispatch(Action::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_messages_carry_distinct_negative_ids() {
        let store = StateStore::new();
        let first = store.add_pending_message(1, "one");
        let second = store.add_pending_message(1, "two");
        assert!(first < 0 && second < 0);
        assert_ne!(first, second);

        store.remove_pending_message(first);
        let pending: Vec<_> = store.read(|s| s.pending_for(1).map(|p| p.local_id).collect());
        assert_eq!(pending, vec![second]);

        store.clear_pending_messages();
        assert!(store.snapshot().pending.is_empty());
    }

    #[tokio::test]
    async fn subscribers_wake_only_on_change() {
        let store = StateStore::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.add_typing_user(4, 2);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        store.add_typing_user(4, 2);
        store.clear_unread(9);
        assert!(!rx.has_changed().unwrap());

        store.clear_typing_users(4);
        rx.changed().await.unwrap();
        assert!(rx.borrow().typing_users(4).is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let store = StateStore::new();
        store.set_status(ConnectionStatus::Connected);
        store.set_active_room(Some(3));
        store.increment_unread(5);
        store.add_pending_message(3, "draft");
        store.reset();
        assert_eq!(store.snapshot(), RealtimeState::default());
    }
}
