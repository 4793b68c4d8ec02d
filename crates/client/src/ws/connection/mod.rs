//! Transport session types: status, backoff policy, the outbound transmitter
//! and the dialer seam.
//!
//! This module provides the shared types and conditionally includes the
//! platform-specific dialer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use parking_lot::Mutex;
use parley_shared::{encode, ClientEvent};
use rand::Rng;
use url::Url;

use crate::error::ClientError;

/// Connection status of the single transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting to redial after losing or failing to open the transport.
    Reconnecting { attempt: u32 },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting)
    }

    pub fn is_reconnecting(&self) -> bool {
        matches!(self, ConnectionStatus::Reconnecting { .. })
    }

    /// Any state with a session alive, including one that is still dialing.
    pub fn is_live(&self) -> bool {
        !matches!(self, ConnectionStatus::Disconnected)
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Redials after a failure before giving up (0 = never redial)
    pub max_attempts: u32,
    /// Delay before the first redial
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomized either way (0 = deterministic)
    pub randomization_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            backoff_multiplier: 2.0,
            randomization_factor: 0.5,
        }
    }
}

impl ReconnectConfig {
    /// Delay before redial number `attempt + 1`, without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// [`ReconnectConfig::delay_for_attempt`] spread by the randomization
    /// factor, still capped at `max_delay`.
    pub fn jittered_delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let base = self.delay_for_attempt(attempt);
        if self.randomization_factor <= 0.0 {
            return base;
        }
        let spread = base.as_millis() as f64 * self.randomization_factor.min(1.0);
        let offset = rng.gen_range(-spread..=spread);
        let ceiling = self.max_delay.as_millis() as f64;
        let millis = (base.as_millis() as f64 + offset).clamp(0.0, ceiling);
        Duration::from_millis(millis as u64)
    }
}

/// An open transport: outbound text frames in, inbound text frames out.
/// The inbound stream ending means the transport closed.
pub struct TransportLink {
    pub outbound: UnboundedSender<String>,
    pub inbound: UnboundedReceiver<String>,
}

/// Opens transports to the gateway.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// `endpoint` already carries the credential.
    async fn dial(&self, endpoint: &Url) -> Result<TransportLink, ClientError>;
}

struct Outbound {
    generation: u64,
    sender: UnboundedSender<String>,
}

/// Handle for sending events on whichever session is currently open.
///
/// Attached by the connection manager when a session opens and detached when
/// it closes; sends in between fail with [`ClientError::NotConnected`].
#[derive(Clone, Default)]
pub struct Transmitter {
    outbound: Arc<Mutex<Option<Outbound>>>,
}

impl Transmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, generation: u64, sender: UnboundedSender<String>) {
        *self.outbound.lock() = Some(Outbound { generation, sender });
    }

    /// Detach the outbound link. With `Some(generation)`, only if that session
    /// is the one attached.
    pub(crate) fn detach(&self, generation: Option<u64>) {
        let mut outbound = self.outbound.lock();
        let matches = match (outbound.as_ref(), generation) {
            (Some(current), Some(generation)) => current.generation == generation,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches {
            *outbound = None;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .as_ref()
            .is_some_and(|o| !o.sender.is_closed())
    }

    /// Send an event to the server
    pub fn send(&self, event: &ClientEvent) -> Result<(), ClientError> {
        let frame = encode(event)?;
        let outbound = self.outbound.lock();
        let Some(outbound) = outbound.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        tracing::debug!(event = event.name(), generation = outbound.generation, "sending");
        outbound
            .sender
            .unbounded_send(frame)
            .map_err(|e| ClientError::Transport(format!("failed to send: {e}")))
    }
}

// Include platform-specific implementation
#[cfg(not(target_arch = "wasm32"))]
mod connection_native;
#[cfg(not(target_arch = "wasm32"))]
pub use connection_native::TungsteniteDialer;

#[cfg(test)]
mod tests {
    use super::*;
    use futures_channel::mpsc::unbounded;
    use futures_util::StreamExt;
    use parley_shared::RoomRef;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn backoff_grows_and_caps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(5000));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(5000));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = ReconnectConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..8 {
            let base = config.delay_for_attempt(attempt).as_millis() as f64;
            let delay = config.jittered_delay(attempt, &mut rng).as_millis() as f64;
            assert!(delay >= base * 0.5 - 1.0, "{delay} below window for {base}");
            assert!(delay <= config.max_delay.as_millis() as f64);
        }
    }

    #[test]
    fn transmitter_refuses_without_session() {
        let transmitter = Transmitter::new();
        assert!(!transmitter.is_connected());
        let err = transmitter.send(&ClientEvent::JoinRoom(1)).unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn transmitter_detach_respects_generation() {
        let transmitter = Transmitter::new();
        let (tx, mut rx) = unbounded();
        transmitter.attach(2, tx);

        transmitter.detach(Some(1));
        assert!(transmitter.is_connected());

        transmitter
            .send(&ClientEvent::TypingStop(RoomRef { room_id: 3 }))
            .unwrap();
        let frame = rx.next().await.unwrap();
        assert!(frame.contains("typing-stop"));

        transmitter.detach(Some(2));
        assert!(!transmitter.is_connected());
    }
}
