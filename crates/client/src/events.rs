//! Typed fan-out of server events to subscribers.
//!
//! The transport hands every decoded [`ServerEvent`] to
//! [`EventRegistry::dispatch`], which invokes each subscriber registered for
//! that event's [`EventKind`]. Subscribers register against marker types such
//! as [`MessageNew`], so the payload type is checked where the callback is
//! written.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use parley_shared::{
    Chat, DeletedChat, DeletedMessage, EventKind, Message, ServerEvent, TypingActivity,
};

/// A server event name paired with its payload type.
pub trait Event: 'static {
    const KIND: EventKind;
    type Payload: 'static;

    fn payload(event: &ServerEvent) -> Option<&Self::Payload>;
}

macro_rules! server_events {
    ($($(#[$doc:meta])* $marker:ident => $variant:ident($payload:ty);)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $marker;

            impl Event for $marker {
                const KIND: EventKind = EventKind::$variant;
                type Payload = $payload;

                fn payload(event: &ServerEvent) -> Option<&Self::Payload> {
                    match event {
                        ServerEvent::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }
        )*
    };
}

server_events! {
    /// `message-new`
    MessageNew => MessageNew(Message);
    /// `message-deleted`
    MessageDeleted => MessageDeleted(DeletedMessage);
    /// `chat-new`
    ChatNew => ChatNew(Chat);
    /// `chat-deleted`
    ChatDeleted => ChatDeleted(DeletedChat);
    /// `user-typing`
    UserTyping => UserTyping(TypingActivity);
    /// `user-stopped-typing`
    UserStoppedTyping => UserStoppedTyping(TypingActivity);
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

static NEXT_SUBSCRIBER: AtomicU64 = AtomicU64::new(1);

/// Capability to remove exactly one registration.
///
/// Dropping it unsubscribes; hold it for as long as the callback should run.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

/// An ordered set of callbacks keyed by registration, not by callback identity.
pub(crate) struct Listeners<T: ?Sized + 'static> {
    entries: Arc<Mutex<Vec<(u64, Callback<T>)>>>,
}

impl<T: ?Sized + 'static> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: ?Sized + 'static> Listeners<T> {
    pub(crate) fn add(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = NEXT_SUBSCRIBER.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, Arc::new(callback)));

        let entries: Weak<Mutex<Vec<(u64, Callback<T>)>>> = Arc::downgrade(&self.entries);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries.lock().retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Invoke every callback with `value`. A panicking callback is logged and
    /// the remaining callbacks still run. Returns the number of failures.
    pub(crate) fn emit(&self, value: &T, label: &str) -> usize {
        // Snapshot so callbacks may subscribe or unsubscribe while we iterate.
        let snapshot: Vec<Callback<T>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        let mut failures = 0;
        for callback in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
                failures += 1;
                tracing::error!(
                    event = label,
                    reason = %panic_message(&panic),
                    "subscriber panicked during dispatch"
                );
            }
        }
        failures
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Per-event-name subscriber sets.
#[derive(Clone)]
pub struct EventRegistry {
    listeners: Arc<HashMap<EventKind, Listeners<ServerEvent>>>,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        let listeners = EventKind::ALL
            .iter()
            .map(|kind| (*kind, Listeners::default()))
            .collect();
        Self {
            listeners: Arc::new(listeners),
        }
    }

    /// Register `callback` for event `E`.
    pub fn subscribe<E: Event>(
        &self,
        callback: impl Fn(&E::Payload) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_kind(E::KIND, move |event| {
            if let Some(payload) = E::payload(event) {
                callback(payload);
            }
        })
    }

    /// Register `callback` for every event named `kind`.
    pub fn subscribe_kind(
        &self,
        kind: EventKind,
        callback: impl Fn(&ServerEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners_for(kind).add(callback)
    }

    /// Deliver `event` to its subscribers. Never fails; subscriber panics are
    /// logged and isolated.
    pub fn dispatch(&self, event: &ServerEvent) {
        let kind = event.kind();
        let failures = self.listeners_for(kind).emit(event, kind.as_str());
        if failures > 0 {
            tracing::warn!(event = %kind, failures, "dispatch completed with failing subscribers");
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.listeners_for(kind).len()
    }

    fn listeners_for(&self, kind: EventKind) -> &Listeners<ServerEvent> {
        // Populated for every kind in `new`.
        &self.listeners[&kind]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    fn message(room_id: i64) -> ServerEvent {
        ServerEvent::MessageNew(Message {
            id: 1,
            room_id,
            content: "hello".into(),
            sender_id: Some(2),
            sent_at: Utc::now(),
            sender: None,
        })
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let registry = EventRegistry::new();
        let received = Arc::new(AtomicUsize::new(0));

        let _bad = registry.subscribe::<MessageNew>(|_| panic!("subscriber bug"));
        let counter = received.clone();
        let _good = registry.subscribe::<MessageNew>(move |message| {
            assert_eq!(message.room_id, 10);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&message(10));
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identical_callbacks_are_independent_registrations() {
        let registry = EventRegistry::new();
        let received = Arc::new(AtomicUsize::new(0));
        let callback = {
            let received = received.clone();
            move |_: &Message| {
                received.fetch_add(1, Ordering::SeqCst);
            }
        };

        let first = registry.subscribe::<MessageNew>(callback.clone());
        let second = registry.subscribe::<MessageNew>(callback);
        registry.dispatch(&message(1));
        assert_eq!(received.load(Ordering::SeqCst), 2);

        first.unsubscribe();
        registry.dispatch(&message(1));
        assert_eq!(received.load(Ordering::SeqCst), 3);

        drop(second);
        registry.dispatch(&message(1));
        assert_eq!(received.load(Ordering::SeqCst), 3);
        assert_eq!(registry.subscriber_count(EventKind::MessageNew), 0);
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let registry = EventRegistry::new();
        let typing = Arc::new(AtomicUsize::new(0));
        let counter = typing.clone();
        let _sub = registry.subscribe::<UserTyping>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&message(1));
        registry.dispatch(&ServerEvent::UserStoppedTyping(TypingActivity {
            room_id: 1,
            user_id: 2,
        }));
        assert_eq!(typing.load(Ordering::SeqCst), 0);

        registry.dispatch(&ServerEvent::UserTyping(TypingActivity {
            room_id: 1,
            user_id: 2,
        }));
        assert_eq!(typing.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_may_unsubscribe_itself_during_dispatch() {
        let registry = EventRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let sub = {
            let slot = slot.clone();
            let calls = calls.clone();
            registry.subscribe::<ChatDeleted>(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(sub) = slot.lock().take() {
                    sub.unsubscribe();
                }
            })
        };
        *slot.lock() = Some(sub);

        let event = ServerEvent::ChatDeleted(DeletedChat { room_id: 4 });
        registry.dispatch(&event);
        registry.dispatch(&event);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
