//! Scope-bound adapters over [`RealtimeClient`].
//!
//! Each binding attaches on construction and detaches in `Drop`, so the
//! owner's lifetime is the binding's scope. The Dioxus hooks in
//! [`crate::ws`] keep these in hook storage.

use std::sync::Arc;

use parking_lot::Mutex;
use parley_shared::{Chat, DeletedChat, DeletedMessage, Message, RoomId, UserId};

use crate::client::RealtimeClient;
use crate::events::{self, Event, Subscription};

/// Connects while a credential is present; disconnects when it goes away or
/// the binding is dropped.
pub struct ConnectionBinding {
    client: RealtimeClient,
    token: Option<String>,
}

impl ConnectionBinding {
    pub fn new(client: RealtimeClient) -> Self {
        Self {
            client,
            token: None,
        }
    }

    /// Follow a credential that may not be available yet. Only a change of
    /// credential reaches the manager.
    pub fn set_token(&mut self, token: Option<&str>) {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        if self.token.as_deref() == token {
            return;
        }
        match token {
            Some(token) => self.client.connect(token),
            None => self.client.disconnect(),
        }
        self.token = token.map(str::to_owned);
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl Drop for ConnectionBinding {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}

/// Keeps at most one room joined.
///
/// A join requested while disconnected is retried when the connection comes
/// up.
pub struct RoomBinding {
    client: RealtimeClient,
    room: Arc<Mutex<Option<RoomId>>>,
    _retry: Subscription,
}

impl RoomBinding {
    pub fn new(client: RealtimeClient) -> Self {
        let room: Arc<Mutex<Option<RoomId>>> = Arc::new(Mutex::new(None));
        let retry = {
            let room = room.clone();
            let rooms = client.rooms().clone();
            client.on_status_change(move |status| {
                if !status.is_connected() {
                    return;
                }
                let current = *room.lock();
                if let Some(room_id) = current.filter(|r| !rooms.is_member(*r)) {
                    rooms.join(room_id);
                }
            })
        };
        Self {
            client,
            room,
            _retry: retry,
        }
    }

    /// Switch to `room_id`, leaving the previous room.
    pub fn set_room(&mut self, room_id: Option<RoomId>) {
        let previous = {
            let mut room = self.room.lock();
            if *room == room_id {
                return;
            }
            std::mem::replace(&mut *room, room_id)
        };
        if let Some(previous) = previous {
            self.release(previous);
        }
        if let Some(next) = room_id {
            self.client.join(next);
        }
    }

    pub fn room(&self) -> Option<RoomId> {
        *self.room.lock()
    }

    /// Whether the bound room is currently joined.
    pub fn is_joined(&self) -> bool {
        self.room().is_some_and(|r| self.client.rooms().is_member(r))
    }

    /// Leave `room_id`, or drop it from membership if no leave could be sent
    /// so the next session does not rejoin it.
    fn release(&self, room_id: RoomId) {
        if !self.client.leave(room_id) {
            self.client.rooms().forget(room_id);
        }
    }
}

impl Drop for RoomBinding {
    fn drop(&mut self) {
        let room = self.room.lock().take();
        if let Some(room_id) = room {
            self.release(room_id);
        }
    }
}

/// Local typing pulse for one room, plus who else is typing there.
pub struct TypingBinding {
    client: RealtimeClient,
    room: Option<RoomId>,
}

impl TypingBinding {
    pub fn new(client: RealtimeClient, room: Option<RoomId>) -> Self {
        Self { client, room }
    }

    pub fn set_room(&mut self, room: Option<RoomId>) {
        if self.room == room {
            return;
        }
        if let Some(previous) = self.room {
            self.client.stop_typing(previous);
        }
        self.room = room;
    }

    /// Call on every input change.
    pub fn notify(&self) {
        if let Some(room_id) = self.room {
            self.client.notify_typing(room_id);
        }
    }

    pub fn stop(&self) {
        if let Some(room_id) = self.room {
            self.client.stop_typing(room_id);
        }
    }

    /// Whether this client is currently signalling typing in the room.
    pub fn is_typing(&self) -> bool {
        self.room
            .is_some_and(|r| self.client.manager().typing().is_typing(r))
    }

    /// Other users typing in the room.
    pub fn typing_users(&self) -> Vec<UserId> {
        match self.room {
            Some(room_id) => self.client.store().read(|s| s.typing_users(room_id)),
            None => Vec::new(),
        }
    }
}

impl Drop for TypingBinding {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A set of event subscriptions released together.
#[derive(Default)]
pub struct EventSubscriptions {
    subscriptions: Vec<Subscription>,
}

impl EventSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<E: Event>(
        &mut self,
        client: &RealtimeClient,
        callback: impl Fn(&E::Payload) + Send + Sync + 'static,
    ) -> &mut Self {
        self.subscriptions.push(client.events().subscribe::<E>(callback));
        self
    }

    pub fn on_message_new(
        &mut self,
        client: &RealtimeClient,
        callback: impl Fn(&Message) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on::<events::MessageNew>(client, callback)
    }

    pub fn on_message_deleted(
        &mut self,
        client: &RealtimeClient,
        callback: impl Fn(&DeletedMessage) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on::<events::MessageDeleted>(client, callback)
    }

    pub fn on_chat_new(
        &mut self,
        client: &RealtimeClient,
        callback: impl Fn(&Chat) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on::<events::ChatNew>(client, callback)
    }

    pub fn on_chat_deleted(
        &mut self,
        client: &RealtimeClient,
        callback: impl Fn(&DeletedChat) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on::<events::ChatDeleted>(client, callback)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}
