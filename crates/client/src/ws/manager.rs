//! Connection manager: owner of the single transport session.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use parley_shared::{decode, ClientEvent, MessageId, MessageRead, RoomId};
use tokio::task::AbortHandle;
use url::Url;

use super::connection::{ConnectionStatus, Dialer, Transmitter};
use super::rooms::RoomTracker;
use super::session::{Report, SessionDriver, TransportEvent};
use super::typing::TypingCoordinator;
use crate::config::ClientConfig;
use crate::events::{EventRegistry, Listeners, Subscription};
use crate::stores::StateStore;

struct Session {
    generation: u64,
    token: String,
    task: Option<AbortHandle>,
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Default)]
struct ManagerState {
    status: ConnectionStatus,
    session: Option<Session>,
    next_generation: u64,
}

impl ManagerState {
    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }
}

struct ManagerShared {
    config: ClientConfig,
    dialer: Arc<dyn Dialer>,
    registry: EventRegistry,
    transmitter: Transmitter,
    rooms: RoomTracker,
    typing: TypingCoordinator,
    state: Mutex<ManagerState>,
    status_listeners: Listeners<ConnectionStatus>,
}

/// Owns at most one live session and drives its status machine.
///
/// Cheap to clone; every clone manages the same session. Transport failures
/// never surface as errors: observe them through [`ConnectionManager::status`]
/// and [`ConnectionManager::on_status_change`].
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<ManagerShared>,
}

impl ConnectionManager {
    pub fn new(
        config: ClientConfig,
        dialer: Arc<dyn Dialer>,
        registry: EventRegistry,
        store: StateStore,
    ) -> Self {
        let transmitter = Transmitter::new();
        let typing = TypingCoordinator::new(transmitter.clone(), config.typing_timeout);
        let rooms = RoomTracker::new(transmitter.clone(), typing.clone(), store);
        Self {
            shared: Arc::new(ManagerShared {
                config,
                dialer,
                registry,
                transmitter,
                rooms,
                typing,
                state: Mutex::new(ManagerState::default()),
                status_listeners: Listeners::default(),
            }),
        }
    }

    /// Open a session authenticated with `token`.
    ///
    /// A no-op while a live session already uses the same token. Any other
    /// session is disconnected first. Must be called inside a tokio runtime.
    pub fn connect(&self, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            tracing::warn!("refusing to connect without a credential");
            return;
        }

        let replacing = {
            let state = self.shared.state.lock();
            match &state.session {
                Some(session) if session.token == token && state.status.is_live() => {
                    tracing::debug!(generation = session.generation, "already connected");
                    return;
                }
                Some(_) => true,
                None => false,
            }
        };
        if replacing {
            tracing::info!("replacing existing session");
            self.disconnect();
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "connect called outside a tokio runtime");
                return;
            }
        };

        let generation = {
            let mut state = self.shared.state.lock();
            if state.session.is_some() {
                tracing::debug!("another connect won the race");
                return;
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            state.session = Some(Session {
                generation,
                token: token.to_owned(),
                task: None,
            });
            state.status = ConnectionStatus::Connecting;
            generation
        };
        tracing::info!(
            generation,
            endpoint = %self.shared.config.endpoint,
            "connecting"
        );
        self.publish(ConnectionStatus::Connecting);

        let driver = SessionDriver {
            generation,
            endpoint: authenticated_endpoint(&self.shared.config.endpoint, token),
            dialer: self.shared.dialer.clone(),
            reconnect: self.shared.config.reconnect.clone(),
            report: self.reporter(),
        };
        let task = runtime.spawn(driver.run()).abort_handle();

        let mut state = self.shared.state.lock();
        match state.session.as_mut() {
            Some(session) if session.generation == generation => session.task = Some(task),
            // Torn down before the task handle landed.
            _ => task.abort(),
        }
    }

    /// Tear down the session, forget room membership and cancel typing
    /// timers. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let (session, changed) = {
            let mut state = self.shared.state.lock();
            let session = state.session.take();
            let changed = state.status != ConnectionStatus::Disconnected;
            state.status = ConnectionStatus::Disconnected;
            (session, changed)
        };
        if session.is_none() && !changed {
            tracing::debug!("already disconnected");
            return;
        }

        let generation = session.as_ref().map(|s| s.generation);
        drop(session);
        self.shared.transmitter.detach(None);
        self.shared.typing.cancel_all();
        self.shared.rooms.clear();
        tracing::info!(?generation, "disconnected");

        if changed {
            self.publish(ConnectionStatus::Disconnected);
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.state.lock().status
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Observe every status transition.
    pub fn on_status_change(
        &self,
        callback: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared.status_listeners.add(callback)
    }

    /// Send `message-read`. Returns false while disconnected.
    pub fn mark_message_read(&self, message_id: MessageId, room_id: RoomId) -> bool {
        if !self.is_connected() {
            tracing::debug!(message_id, room_id, "read receipt dropped, not connected");
            return false;
        }
        let event = ClientEvent::MessageRead(MessageRead {
            message_id,
            room_id,
        });
        match self.shared.transmitter.send(&event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(message_id, room_id, error = %e, "failed to send read receipt");
                false
            }
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn events(&self) -> &EventRegistry {
        &self.shared.registry
    }

    pub fn rooms(&self) -> &RoomTracker {
        &self.shared.rooms
    }

    pub fn typing(&self) -> &TypingCoordinator {
        &self.shared.typing
    }

    pub fn transmitter(&self) -> &Transmitter {
        &self.shared.transmitter
    }

    fn reporter(&self) -> Report {
        let weak: Weak<ManagerShared> = Arc::downgrade(&self.shared);
        Arc::new(move |generation: u64, event: TransportEvent| {
            if let Some(shared) = weak.upgrade() {
                ConnectionManager { shared }.on_transport(generation, event);
            }
        })
    }

    fn on_transport(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Opened(sender) => {
                {
                    let state = self.shared.state.lock();
                    if !state.is_current(generation) {
                        tracing::debug!(generation, "ignoring open from stale session");
                        return;
                    }
                    self.shared.transmitter.attach(generation, sender);
                }
                let replayed = self.shared.rooms.replay();
                tracing::info!(generation, replayed, "connected");
                self.transition(generation, ConnectionStatus::Connected);
            }
            TransportEvent::Frame(frame) => {
                if !self.shared.state.lock().is_current(generation) {
                    return;
                }
                match decode(&frame) {
                    Ok(event) => self.shared.registry.dispatch(&event),
                    Err(e) => tracing::warn!(generation, error = %e, "dropping inbound frame"),
                }
            }
            TransportEvent::Closed => {
                if !self.shared.state.lock().is_current(generation) {
                    return;
                }
                self.shared.transmitter.detach(Some(generation));
                tracing::warn!(generation, "transport closed unexpectedly");
            }
            TransportEvent::Retrying { attempt } => {
                self.transition(generation, ConnectionStatus::Reconnecting { attempt });
            }
            TransportEvent::Exhausted => {
                let session = {
                    let mut state = self.shared.state.lock();
                    if !state.is_current(generation) {
                        return;
                    }
                    state.status = ConnectionStatus::Disconnected;
                    state.session.take()
                };
                drop(session);
                self.shared.transmitter.detach(Some(generation));
                self.shared.typing.cancel_all();
                tracing::warn!(generation, "reconnect attempts exhausted");
                self.publish(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Set the status on behalf of session `generation`, if it is current.
    fn transition(&self, generation: u64, status: ConnectionStatus) {
        {
            let mut state = self.shared.state.lock();
            if !state.is_current(generation) || state.status == status {
                return;
            }
            state.status = status;
        }
        tracing::debug!(generation, ?status, "status changed");
        self.publish(status);
    }

    fn publish(&self, status: ConnectionStatus) {
        self.shared.status_listeners.emit(&status, "status-change");
    }
}

fn authenticated_endpoint(endpoint: &Url, token: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair("token", token);
    url
}
