//! Parley Client - real-time connection core
//!
//! This crate contains the live half of the parley chat client: one
//! auto-reconnecting gateway session, room membership, typing presence and
//! the derived state that Dioxus components render from.

pub mod bindings;
pub mod client;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod stores;
pub mod timer;
pub mod ws;

pub use bindings::{ConnectionBinding, EventSubscriptions, RoomBinding, TypingBinding};
pub use client::RealtimeClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{EventRegistry, Subscription};
pub use stores::{RealtimeState, StateStore};
pub use ws::{ConnectionManager, ConnectionStatus, Dialer, ReconnectConfig, TransportLink};
