//! Room membership as the client intends it.
//!
//! The set survives transport loss and is replayed as `join-room` requests
//! each time a session opens.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use parley_shared::{ClientEvent, RoomId};

use super::connection::Transmitter;
use super::typing::TypingCoordinator;
use crate::stores::StateStore;

struct RoomsInner {
    joined: Mutex<BTreeSet<RoomId>>,
    transmitter: Transmitter,
    typing: TypingCoordinator,
    store: StateStore,
}

#[derive(Clone)]
pub struct RoomTracker {
    inner: Arc<RoomsInner>,
}

impl RoomTracker {
    pub fn new(transmitter: Transmitter, typing: TypingCoordinator, store: StateStore) -> Self {
        Self {
            inner: Arc::new(RoomsInner {
                joined: Mutex::new(BTreeSet::new()),
                transmitter,
                typing,
                store,
            }),
        }
    }

    /// Join `room_id`. Returns true if a `join-room` was sent.
    ///
    /// While disconnected nothing is recorded; callers retry once connected.
    pub fn join(&self, room_id: RoomId) -> bool {
        if !self.inner.transmitter.is_connected() {
            tracing::debug!(room_id, "join deferred, not connected");
            return false;
        }
        let mut joined = self.inner.joined.lock();
        if joined.contains(&room_id) {
            tracing::debug!(room_id, "already joined");
            return false;
        }
        if let Err(e) = self.inner.transmitter.send(&ClientEvent::JoinRoom(room_id)) {
            tracing::warn!(room_id, error = %e, "failed to send join");
            return false;
        }
        joined.insert(room_id);
        tracing::info!(room_id, "joined room");
        true
    }

    /// Leave `room_id`. Returns true if a `leave-room` was sent.
    ///
    /// The room's typing state is cleared either way; membership only changes
    /// while connected.
    pub fn leave(&self, room_id: RoomId) -> bool {
        if !self.inner.transmitter.is_connected() {
            self.inner.typing.cancel_local(room_id);
            self.inner.store.clear_typing_users(room_id);
            tracing::debug!(room_id, "leave ignored, not connected");
            return false;
        }
        {
            let mut joined = self.inner.joined.lock();
            if !joined.remove(&room_id) {
                tracing::debug!(room_id, "not a member");
                return false;
            }
            // Stop before leaving so the server still routes it.
            self.inner.typing.stop_typing(room_id);
            if let Err(e) = self.inner.transmitter.send(&ClientEvent::LeaveRoom(room_id)) {
                tracing::warn!(room_id, error = %e, "failed to send leave");
            }
        }
        self.inner.store.clear_typing_users(room_id);
        tracing::info!(room_id, "left room");
        true
    }

    /// Drop `room_id` from membership without a network send.
    pub fn forget(&self, room_id: RoomId) -> bool {
        let removed = self.inner.joined.lock().remove(&room_id);
        self.inner.typing.cancel_local(room_id);
        self.inner.store.clear_typing_users(room_id);
        removed
    }

    /// Re-send `join-room` for every member room. Returns how many were sent.
    pub(crate) fn replay(&self) -> usize {
        let joined = self.inner.joined.lock();
        let mut sent = 0;
        for room_id in joined.iter() {
            match self.inner.transmitter.send(&ClientEvent::JoinRoom(*room_id)) {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!(room_id, error = %e, "failed to replay join"),
            }
        }
        sent
    }

    /// Forget all membership and the typing state that came with it.
    pub(crate) fn clear(&self) {
        let rooms = std::mem::take(&mut *self.inner.joined.lock());
        for room_id in rooms {
            self.inner.store.clear_typing_users(room_id);
        }
    }

    pub fn is_member(&self, room_id: RoomId) -> bool {
        self.inner.joined.lock().contains(&room_id)
    }

    pub fn rooms(&self) -> Vec<RoomId> {
        self.inner.joined.lock().iter().copied().collect()
    }
}
