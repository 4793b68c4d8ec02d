//! Local "I am typing" pulses.
//!
//! One pulse per room. A pulse sends `typing-start` when armed from idle and
//! `typing-stop` when it expires or is stopped; renewing it only re-arms the
//! expiry timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use parley_shared::{ClientEvent, RoomId, RoomRef};

use super::connection::Transmitter;
use crate::timer::{self, TimerHandle};

struct Pulse {
    token: u64,
    _timer: TimerHandle,
}

struct TypingInner {
    pulses: Mutex<HashMap<RoomId, Pulse>>,
    transmitter: Transmitter,
    timeout: Duration,
    next_token: AtomicU64,
}

/// Debounced typing signals for every room the client types in.
#[derive(Clone)]
pub struct TypingCoordinator {
    inner: Arc<TypingInner>,
}

impl TypingCoordinator {
    pub fn new(transmitter: Transmitter, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(TypingInner {
                pulses: Mutex::new(HashMap::new()),
                transmitter,
                timeout,
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Arm or renew the pulse for `room_id`. Returns true if this call sent
    /// `typing-start`. Does nothing while disconnected.
    pub fn notify_typing(&self, room_id: RoomId) -> bool {
        if !self.inner.transmitter.is_connected() {
            tracing::debug!(room_id, "typing ignored while disconnected");
            return false;
        }

        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<TypingInner> = Arc::downgrade(&self.inner);
        let timer = timer::schedule(self.inner.timeout, move || {
            if let Some(inner) = weak.upgrade() {
                TypingCoordinator { inner }.expire(room_id, token);
            }
        });

        // Replacing the old pulse drops and cancels its timer.
        let renewed = self
            .inner
            .pulses
            .lock()
            .insert(room_id, Pulse { token, _timer: timer })
            .is_some();
        if renewed {
            return false;
        }

        self.send(ClientEvent::TypingStart(RoomRef { room_id }));
        true
    }

    /// Stop the pulse now. Returns true if one was active.
    pub fn stop_typing(&self, room_id: RoomId) -> bool {
        if self.inner.pulses.lock().remove(&room_id).is_none() {
            return false;
        }
        self.send(ClientEvent::TypingStop(RoomRef { room_id }));
        true
    }

    /// Drop the pulse for `room_id` without telling the server.
    pub fn cancel_local(&self, room_id: RoomId) -> bool {
        self.inner.pulses.lock().remove(&room_id).is_some()
    }

    /// Drop every pulse without telling the server.
    pub fn cancel_all(&self) {
        let cancelled = std::mem::take(&mut *self.inner.pulses.lock());
        if !cancelled.is_empty() {
            tracing::debug!(rooms = cancelled.len(), "cancelled typing pulses");
        }
    }

    pub fn is_typing(&self, room_id: RoomId) -> bool {
        self.inner.pulses.lock().contains_key(&room_id)
    }

    pub fn active_rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.inner.pulses.lock().keys().copied().collect();
        rooms.sort_unstable();
        rooms
    }

    fn expire(&self, room_id: RoomId, token: u64) {
        {
            let mut pulses = self.inner.pulses.lock();
            // A renewal since this timer was armed owns the slot now.
            if pulses.get(&room_id).map(|p| p.token) != Some(token) {
                return;
            }
            pulses.remove(&room_id);
        }
        tracing::debug!(room_id, "typing pulse expired");
        self.send(ClientEvent::TypingStop(RoomRef { room_id }));
    }

    fn send(&self, event: ClientEvent) {
        if let Err(e) = self.inner.transmitter.send(&event) {
            tracing::debug!(event = event.name(), error = %e, "typing signal not sent");
        }
    }
}
