//! The application-scoped service object.

use std::sync::Arc;

use parley_shared::{Message, MessageId, RoomId, UserId};

use crate::config::ClientConfig;
use crate::events::{self, EventRegistry, Subscription};
use crate::stores::{Action, StateStore};
use crate::ws::{ConnectionManager, ConnectionStatus, Dialer, RoomTracker};

struct ClientInner {
    manager: ConnectionManager,
    store: StateStore,
    _wiring: Vec<Subscription>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.manager.disconnect();
    }
}

/// Connection manager plus the derived state it keeps current.
///
/// Construct one per application session and hand clones to whatever needs
/// it; in a Dioxus tree, [`RealtimeProvider`](crate::components::RealtimeProvider)
/// puts it in context. Dropping the last clone disconnects.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

impl PartialEq for RealtimeClient {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl RealtimeClient {
    /// A client over the native WebSocket transport.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_dialer(config, Arc::new(crate::ws::TungsteniteDialer))
    }

    pub fn with_dialer(config: ClientConfig, dialer: Arc<dyn Dialer>) -> Self {
        let store = StateStore::new();
        let registry = EventRegistry::new();
        let manager = ConnectionManager::new(config, dialer, registry.clone(), store.clone());
        let wiring = wire(&manager, &registry, &store);
        Self {
            inner: Arc::new(ClientInner {
                manager,
                store,
                _wiring: wiring,
            }),
        }
    }

    pub fn connect(&self, token: &str) {
        self.inner.manager.connect(token);
    }

    pub fn disconnect(&self) {
        self.inner.manager.disconnect();
    }

    /// End the application session: disconnect and clear all derived state.
    pub fn reset(&self) {
        self.inner.manager.disconnect();
        self.inner.store.reset();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.manager.status()
    }

    pub fn join(&self, room_id: RoomId) -> bool {
        self.inner.manager.rooms().join(room_id)
    }

    pub fn leave(&self, room_id: RoomId) -> bool {
        self.inner.manager.rooms().leave(room_id)
    }

    pub fn notify_typing(&self, room_id: RoomId) -> bool {
        self.inner.manager.typing().notify_typing(room_id)
    }

    pub fn stop_typing(&self, room_id: RoomId) -> bool {
        self.inner.manager.typing().stop_typing(room_id)
    }

    pub fn mark_message_read(&self, message_id: MessageId, room_id: RoomId) -> bool {
        self.inner.manager.mark_message_read(message_id, room_id)
    }

    /// Make `room_id` the room on screen. Unread counts are left alone; see
    /// [`RealtimeClient::acknowledge`].
    pub fn set_active_room(&self, room_id: Option<RoomId>) {
        self.inner.store.set_active_room(room_id);
    }

    /// Clear the unread count for `room_id`.
    pub fn acknowledge(&self, room_id: RoomId) {
        self.inner.store.clear_unread(room_id);
    }

    pub fn set_local_user(&self, user_id: Option<UserId>) {
        self.inner.store.set_local_user(user_id);
    }

    /// Record an optimistic send before the REST call goes out.
    pub fn add_pending_message(&self, room_id: RoomId, content: impl Into<String>) -> MessageId {
        self.inner.store.add_pending_message(room_id, content)
    }

    pub fn confirm_pending(&self, local_id: MessageId, message: Message) {
        self.inner.store.confirm_pending(local_id, message);
    }

    pub fn remove_pending_message(&self, local_id: MessageId) {
        self.inner.store.remove_pending_message(local_id);
    }

    pub fn on_status_change(
        &self,
        callback: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.manager.on_status_change(callback)
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.inner.manager
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    pub fn events(&self) -> &EventRegistry {
        self.inner.manager.events()
    }

    pub fn rooms(&self) -> &RoomTracker {
        self.inner.manager.rooms()
    }
}

/// Route manager status and inbound events into the store.
fn wire(
    manager: &ConnectionManager,
    registry: &EventRegistry,
    store: &StateStore,
) -> Vec<Subscription> {
    let rooms = manager.rooms().clone();
    let mut subs = Vec::with_capacity(7);

    let s = store.clone();
    subs.push(manager.on_status_change(move |status| s.set_status(*status)));

    let s = store.clone();
    subs.push(registry.subscribe::<events::MessageNew>(move |message| {
        s.dispatch(Action::MessageReceived(message.clone()));
    }));

    let s = store.clone();
    subs.push(registry.subscribe::<events::MessageDeleted>(move |deleted| {
        s.dispatch(Action::MessageDeleted(*deleted));
    }));

    let s = store.clone();
    subs.push(registry.subscribe::<events::ChatNew>(move |chat| {
        s.dispatch(Action::ChatUpserted(chat.clone()));
    }));

    let s = store.clone();
    let r = rooms.clone();
    subs.push(registry.subscribe::<events::ChatDeleted>(move |deleted| {
        r.forget(deleted.room_id);
        s.dispatch(Action::ChatRemoved(deleted.room_id));
    }));

    let s = store.clone();
    let r = rooms;
    subs.push(registry.subscribe::<events::UserTyping>(move |activity| {
        if r.is_member(activity.room_id) {
            s.add_typing_user(activity.room_id, activity.user_id);
        } else {
            tracing::debug!(room_id = activity.room_id, "typing for a room we have not joined");
        }
    }));

    let s = store.clone();
    subs.push(registry.subscribe::<events::UserStoppedTyping>(move |activity| {
        s.remove_typing_user(activity.room_id, activity.user_id);
    }));

    subs
}
