//! Shared helpers for the client integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use parking_lot::Mutex;
use parley_client::{
    ClientConfig, ClientError, ConnectionStatus, Dialer, RealtimeClient, ReconnectConfig,
    Subscription, TransportLink,
};
use serde_json::Value;
use url::Url;

/// Server side of one in-memory transport.
pub struct Peer {
    pub url: Url,
    from_client: UnboundedReceiver<String>,
    to_client: Option<UnboundedSender<String>>,
}

impl Peer {
    /// Push a server event to the client.
    pub fn push(&self, event: &str, data: Value) {
        self.push_raw(&serde_json::json!({ "event": event, "data": data }).to_string());
    }

    pub fn push_raw(&self, frame: &str) {
        if let Some(tx) = &self.to_client {
            tx.unbounded_send(frame.to_string()).expect("client side gone");
        }
    }

    /// Every frame the client has sent so far, parsed.
    pub fn received(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = self.from_client.try_next() {
            frames.push(serde_json::from_str(&frame).expect("client sent invalid JSON"));
        }
        frames
    }

    /// Event names of [`Peer::received`].
    pub fn received_events(&mut self) -> Vec<String> {
        self.received()
            .into_iter()
            .map(|frame| frame["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// End the transport from the server side.
    pub fn close(&mut self) {
        self.to_client = None;
    }
}

/// A [`Dialer`] whose transports are channel pairs handed to the test.
pub struct MemoryDialer {
    refuse: AtomicBool,
    dials: Mutex<Vec<Url>>,
    peers: tokio::sync::mpsc::UnboundedSender<Peer>,
}

impl MemoryDialer {
    pub fn new() -> (Arc<Self>, tokio::sync::mpsc::UnboundedReceiver<Peer>) {
        let (peers, rx) = tokio::sync::mpsc::unbounded_channel();
        let dialer = Arc::new(Self {
            refuse: AtomicBool::new(false),
            dials: Mutex::new(Vec::new()),
            peers,
        });
        (dialer, rx)
    }

    /// Make every later dial fail.
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().len()
    }

    pub fn last_url(&self) -> Option<Url> {
        self.dials.lock().last().cloned()
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(&self, endpoint: &Url) -> Result<TransportLink, ClientError> {
        self.dials.lock().push(endpoint.clone());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".into()));
        }

        let (outbound, from_client) = unbounded();
        let (to_client, inbound) = unbounded();
        let peer = Peer {
            url: endpoint.clone(),
            from_client,
            to_client: Some(to_client),
        };
        self.peers
            .send(peer)
            .map_err(|_| ClientError::Transport("test harness gone".into()))?;
        Ok(TransportLink { outbound, inbound })
    }
}

/// Short, deterministic backoff: 100ms, 200ms, 400ms, then give up.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        reconnect: ReconnectConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            backoff_multiplier: 2.0,
            randomization_factor: 0.0,
        },
        ..ClientConfig::default()
    }
}

pub fn test_client() -> (
    RealtimeClient,
    Arc<MemoryDialer>,
    tokio::sync::mpsc::UnboundedReceiver<Peer>,
) {
    let (dialer, peers) = MemoryDialer::new();
    let client = RealtimeClient::with_dialer(test_config(), dialer.clone());
    (client, dialer, peers)
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Connect with `token` and return the opened peer.
pub async fn connect(
    client: &RealtimeClient,
    peers: &mut tokio::sync::mpsc::UnboundedReceiver<Peer>,
    token: &str,
) -> Peer {
    client.connect(token);
    let peer = peers.recv().await.expect("no transport was dialed");
    settle().await;
    peer
}

pub fn message_json(id: i64, room_id: i64, content: &str, sender_id: i64) -> Value {
    serde_json::json!({
        "id": id,
        "chat_id": room_id,
        "content": content,
        "sender_id": sender_id,
        "sent_at": "2025-01-01T12:00:00Z",
    })
}

/// Collects every status the client publishes.
pub fn record_statuses(
    client: &RealtimeClient,
) -> (Arc<Mutex<Vec<ConnectionStatus>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = client.on_status_change(move |status| sink.lock().push(*status));
    (seen, sub)
}
