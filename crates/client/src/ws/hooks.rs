//! Realtime hooks for Dioxus components.
//!
//! NOTE: Components should render from [`use_realtime_state`], not from raw
//! events. The event hooks here are for per-screen side effects such as
//! scrolling or refetching.
//!
//! Every hook expects a [`RealtimeClient`] in context, which
//! [`RealtimeProvider`](crate::components::RealtimeProvider) supplies.

use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;
use futures_channel::mpsc::unbounded;
use futures_util::StreamExt;
use parley_shared::{Chat, DeletedChat, DeletedMessage, Message, MessageId, RoomId, UserId};

use super::connection::ConnectionStatus;
use crate::bindings::{ConnectionBinding, RoomBinding, TypingBinding};
use crate::client::RealtimeClient;
use crate::events::{self, Event};
use crate::stores::RealtimeState;

/// The client provided by the nearest [`RealtimeProvider`](crate::components::RealtimeProvider).
pub fn use_realtime_client() -> RealtimeClient {
    use_context::<RealtimeClient>()
}

/// Reactive view of the derived state store.
///
/// # Returns
/// The signal shared by every component under the provider. It updates
/// whenever the store changes.
pub fn use_realtime_state() -> Signal<RealtimeState> {
    use_context::<Signal<RealtimeState>>()
}

/// Mirror `client`'s store into a signal owned by the calling scope.
pub(crate) fn use_store_signal(client: &RealtimeClient) -> Signal<RealtimeState> {
    let mut state = use_signal(|| client.store().snapshot());

    use_hook(|| {
        let mut rx = client.store().subscribe();
        spawn(async move {
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                state.set(next);
            }
        });
    });

    state
}

/// Keep the session connected with `token` for as long as the calling
/// component is mounted.
///
/// # Arguments
/// * `token` - The bearer credential, or `None` while it is not available
///   yet
///
/// # Returns
/// The current connection status
pub fn use_realtime_connection(token: Option<String>) -> ConnectionStatus {
    let client = use_realtime_client();
    let binding = use_hook(|| Rc::new(RefCell::new(ConnectionBinding::new(client.clone()))));
    binding.borrow_mut().set_token(token.as_deref());

    let state = use_realtime_state();
    let status = state.read().status;
    status
}

/// Join `room` while mounted, switching rooms when it changes.
///
/// # Returns
/// Whether the room is currently joined
pub fn use_chat_room(room: Option<RoomId>) -> bool {
    let client = use_realtime_client();
    let binding = use_hook(|| Rc::new(RefCell::new(RoomBinding::new(client.clone()))));
    binding.borrow_mut().set_room(room);

    // Re-render on status changes so the join retry is reflected.
    let state = use_realtime_state();
    let connected = state.read().status.is_connected();
    let joined = binding.borrow().is_joined();
    connected && joined
}

/// Handle returned by [`use_typing_indicator`].
#[derive(Clone)]
pub struct TypingIndicator {
    binding: Rc<RefCell<TypingBinding>>,
    /// Other users typing in the room
    pub typing_users: Vec<UserId>,
}

impl TypingIndicator {
    /// Call from the input's change handler.
    pub fn notify(&self) {
        self.binding.borrow().notify();
    }

    /// Call on blur or send.
    pub fn stop(&self) {
        self.binding.borrow().stop();
    }

    pub fn is_typing(&self) -> bool {
        self.binding.borrow().is_typing()
    }
}

/// Typing signals for `room`; the local pulse stops on unmount.
pub fn use_typing_indicator(room: Option<RoomId>) -> TypingIndicator {
    let client = use_realtime_client();
    let binding = use_hook(|| Rc::new(RefCell::new(TypingBinding::new(client.clone(), room))));
    binding.borrow_mut().set_room(room);

    let state = use_realtime_state();
    let typing_users = room
        .map(|room_id| state.read().typing_users(room_id))
        .unwrap_or_default();

    TypingIndicator {
        binding,
        typing_users,
    }
}

/// Run `handler` on the UI thread for every `E`, until unmount.
///
/// The latest `handler` passed is the one invoked.
pub fn use_server_event<E>(handler: impl FnMut(E::Payload) + 'static)
where
    E: Event,
    E::Payload: Clone + Send,
{
    let client = use_realtime_client();
    let slot = use_hook(|| Rc::new(RefCell::new(None::<Box<dyn FnMut(E::Payload)>>)));
    *slot.borrow_mut() = Some(Box::new(handler));

    use_hook(|| {
        let (tx, mut rx) = unbounded::<E::Payload>();
        let subscription = client.events().subscribe::<E>(move |payload| {
            // Fails only once the component is gone.
            let _ = tx.unbounded_send(payload.clone());
        });

        let slot = slot.clone();
        spawn(async move {
            while let Some(payload) = rx.next().await {
                if let Some(handler) = slot.borrow_mut().as_mut() {
                    handler(payload);
                }
            }
        });

        Rc::new(subscription)
    });
}

/// `message-new` and `message-deleted` callbacks for the calling component.
pub fn use_message_events(
    on_new: impl FnMut(Message) + 'static,
    on_deleted: impl FnMut(DeletedMessage) + 'static,
) {
    use_server_event::<events::MessageNew>(on_new);
    use_server_event::<events::MessageDeleted>(on_deleted);
}

/// `chat-new` and `chat-deleted` callbacks for the calling component.
pub fn use_chat_events(
    on_new: impl FnMut(Chat) + 'static,
    on_deleted: impl FnMut(DeletedChat) + 'static,
) {
    use_server_event::<events::ChatNew>(on_new);
    use_server_event::<events::ChatDeleted>(on_deleted);
}

/// Sends read receipts.
#[derive(Clone)]
pub struct MessageReadStatus {
    client: RealtimeClient,
}

impl MessageReadStatus {
    /// Returns false if the receipt could not be sent.
    pub fn mark_read(&self, message_id: MessageId, room_id: RoomId) -> bool {
        self.client.mark_message_read(message_id, room_id)
    }
}

pub fn use_message_read_status() -> MessageReadStatus {
    MessageReadStatus {
        client: use_realtime_client(),
    }
}
