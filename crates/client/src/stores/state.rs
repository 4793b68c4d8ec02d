//! The derived client state and its transitions.
//!
//! [`RealtimeState`] is a plain value. Every change is an [`Action`] applied
//! by [`RealtimeState::reduce`]; nothing else writes to it.

use std::collections::{BTreeMap, BTreeSet};

use parley_shared::{Chat, DeletedMessage, Message, MessageId, RoomId, UserId};

use super::messages::RoomThread;
use super::pending::PendingMessage;
use crate::ws::ConnectionStatus;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealtimeState {
    /// Mirror of the connection manager's status.
    pub status: ConnectionStatus,
    pub active_room: Option<RoomId>,
    /// Signed-in user, used to recognise the echo of our own sends.
    pub local_user: Option<UserId>,
    /// Users other clients report as typing, per room.
    pub typing: BTreeMap<RoomId, BTreeSet<UserId>>,
    pub unread: BTreeMap<RoomId, u32>,
    pub pending: Vec<PendingMessage>,
    pub threads: BTreeMap<RoomId, RoomThread>,
    pub chats: BTreeMap<RoomId, Chat>,
}

/// A single state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetStatus(ConnectionStatus),
    SetActiveRoom(Option<RoomId>),
    SetLocalUser(Option<UserId>),
    IncrementUnread(RoomId),
    ClearUnread(RoomId),
    SetUnreadCount(RoomId, u32),
    AddTypingUser { room_id: RoomId, user_id: UserId },
    RemoveTypingUser { room_id: RoomId, user_id: UserId },
    ClearTypingUsers(RoomId),
    AddPending(PendingMessage),
    RemovePending(MessageId),
    /// The REST send for `local_id` returned `message`.
    ConfirmPending { local_id: MessageId, message: Message },
    ClearPending,
    MessageReceived(Message),
    MessageDeleted(DeletedMessage),
    SetHistory { room_id: RoomId, messages: Vec<Message> },
    ChatUpserted(Chat),
    ChatRemoved(RoomId),
    Reset,
}

/// One row of a rendered thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThreadEntry<'a> {
    Confirmed(&'a Message),
    Pending(&'a PendingMessage),
}

impl ThreadEntry<'_> {
    pub fn id(&self) -> MessageId {
        match self {
            ThreadEntry::Confirmed(m) => m.id,
            ThreadEntry::Pending(p) => p.local_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ThreadEntry::Confirmed(m) => &m.content,
            ThreadEntry::Pending(p) => &p.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ThreadEntry::Pending(_))
    }
}

impl RealtimeState {
    /// Produce the state that follows `action`.
    pub fn reduce(mut self, action: Action) -> Self {
        self.apply(action);
        self
    }

    /// Apply `action` in place. Returns whether anything changed.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::SetStatus(status) => replace_if_changed(&mut self.status, status),
            Action::SetActiveRoom(room) => replace_if_changed(&mut self.active_room, room),
            Action::SetLocalUser(user) => replace_if_changed(&mut self.local_user, user),
            Action::IncrementUnread(room_id) => {
                let count = self.unread.entry(room_id).or_insert(0);
                *count = count.saturating_add(1);
                true
            }
            Action::ClearUnread(room_id) => self.unread.remove(&room_id).is_some(),
            Action::SetUnreadCount(room_id, 0) => self.unread.remove(&room_id).is_some(),
            Action::SetUnreadCount(room_id, count) => {
                self.unread.insert(room_id, count) != Some(count)
            }
            Action::AddTypingUser { room_id, user_id } => {
                self.typing.entry(room_id).or_default().insert(user_id)
            }
            Action::RemoveTypingUser { room_id, user_id } => {
                let Some(users) = self.typing.get_mut(&room_id) else {
                    return false;
                };
                let removed = users.remove(&user_id);
                if users.is_empty() {
                    self.typing.remove(&room_id);
                }
                removed
            }
            Action::ClearTypingUsers(room_id) => self.typing.remove(&room_id).is_some(),
            Action::AddPending(pending) => {
                self.pending.push(pending);
                true
            }
            Action::RemovePending(local_id) => self.remove_pending(local_id),
            Action::ConfirmPending { local_id, message } => {
                let removed = self.remove_pending(local_id);
                self.insert_message(message) || removed
            }
            Action::ClearPending => {
                let changed = !self.pending.is_empty();
                self.pending.clear();
                changed
            }
            Action::MessageReceived(message) => self.receive(message),
            Action::MessageDeleted(deleted) => self
                .threads
                .get_mut(&deleted.room_id)
                .is_some_and(|thread| thread.remove_message(deleted.message_id)),
            Action::SetHistory { room_id, messages } => {
                let thread = self.threads.entry(room_id).or_default();
                let before = thread.clone();
                thread.set_history(messages);
                let mut changed = *thread != before;
                // Each newly held message settles at most one pending send.
                for message in thread.messages.iter().filter(|m| !before.contains(m.id)) {
                    changed |= take_matching(&mut self.pending, message, self.local_user);
                }
                changed
            }
            Action::ChatUpserted(chat) => {
                if self.chats.get(&chat.id) == Some(&chat) {
                    return false;
                }
                self.chats.insert(chat.id, chat);
                true
            }
            Action::ChatRemoved(room_id) => self.remove_chat(room_id),
            Action::Reset => {
                let changed = *self != Self::default();
                *self = Self::default();
                changed
            }
        }
    }

    pub fn typing_users(&self, room_id: RoomId) -> Vec<UserId> {
        self.typing
            .get(&room_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn unread_count(&self, room_id: RoomId) -> u32 {
        self.unread.get(&room_id).copied().unwrap_or(0)
    }

    pub fn total_unread(&self) -> u32 {
        self.unread.values().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    pub fn pending_for(&self, room_id: RoomId) -> impl Iterator<Item = &PendingMessage> {
        self.pending.iter().filter(move |p| p.room_id == room_id)
    }

    /// Confirmed messages in time order followed by this room's pending sends.
    pub fn visible_messages(&self, room_id: RoomId) -> Vec<ThreadEntry<'_>> {
        let confirmed = self
            .threads
            .get(&room_id)
            .into_iter()
            .flat_map(|thread| thread.messages.iter().map(ThreadEntry::Confirmed));
        confirmed
            .chain(self.pending_for(room_id).map(ThreadEntry::Pending))
            .collect()
    }

    fn receive(&mut self, message: Message) -> bool {
        let room_id = message.room_id;
        let thread = self.threads.entry(room_id).or_default();
        if thread.contains(message.id) {
            // Redelivery; its pending send was settled when it was first held.
            return false;
        }
        take_matching(&mut self.pending, &message, self.local_user);
        thread.add_message(message);
        if self.active_room != Some(room_id) {
            let count = self.unread.entry(room_id).or_insert(0);
            *count = count.saturating_add(1);
        }
        true
    }

    fn insert_message(&mut self, message: Message) -> bool {
        self.threads
            .entry(message.room_id)
            .or_default()
            .add_message(message)
    }

    fn remove_pending(&mut self, local_id: MessageId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.local_id != local_id);
        self.pending.len() != before
    }

    fn remove_chat(&mut self, room_id: RoomId) -> bool {
        let mut changed = self.chats.remove(&room_id).is_some();
        changed |= self.threads.remove(&room_id).is_some();
        changed |= self.unread.remove(&room_id).is_some();
        changed |= self.typing.remove(&room_id).is_some();
        let before = self.pending.len();
        self.pending.retain(|p| p.room_id != room_id);
        changed |= self.pending.len() != before;
        if self.active_room == Some(room_id) {
            self.active_room = None;
            changed = true;
        }
        changed
    }
}

/// Remove the oldest pending send that `confirmed` settles.
fn take_matching(
    pending: &mut Vec<PendingMessage>,
    confirmed: &Message,
    local_user: Option<UserId>,
) -> bool {
    match pending.iter().position(|p| p.matches(confirmed, local_user)) {
        Some(index) => {
            pending.remove(index);
            true
        }
        None => false,
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
