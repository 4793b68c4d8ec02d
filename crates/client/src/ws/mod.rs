//! Real-time transport for the chat gateway.
//!
//! This module provides:
//! - A single auto-reconnecting session with a status machine
//! - Room membership that is replayed after every reconnect
//! - Debounced local typing pulses
//! - Dioxus hooks over the framework-free bindings
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ConnectionManager               │
//! │   (status machine, session generations)      │
//! └──────────────────────────────────────────────┘
//!          │ frames            │ sends
//!          ▼                   ▼
//!   ┌─────────────┐    ┌──────────────────────┐
//!   │EventRegistry│    │     Transmitter      │
//!   │  (fan-out)  │    │ ▲ RoomTracker        │
//!   └─────────────┘    │ ▲ TypingCoordinator  │
//!          │           └──────────────────────┘
//!          ▼
//!   ┌─────────────┐
//!   │ StateStore  │ ──▶ components (watch channel)
//!   └─────────────┘
//! ```
//!
//! # Usage
//!
//! Components read from the [`StateStore`](crate::stores::StateStore), not
//! from raw events. The [`RealtimeClient`](crate::RealtimeClient) wires
//! inbound events into the store.
//!
//! ```rust,ignore
//! let client = RealtimeClient::new(ClientConfig::from_env()?);
//! rsx! {
//!     RealtimeProvider { client,
//!         ConnectionBanner {}
//!         // Your app here
//!     }
//! }
//! ```

mod connection;
mod hooks;
mod manager;
mod rooms;
mod session;
mod typing;

pub use connection::{ConnectionStatus, Dialer, ReconnectConfig, Transmitter, TransportLink};
#[cfg(not(target_arch = "wasm32"))]
pub use connection::TungsteniteDialer;
pub use manager::ConnectionManager;
pub use rooms::RoomTracker;
pub use typing::TypingCoordinator;

pub use hooks::{
    use_chat_events, use_chat_room, use_message_events, use_message_read_status,
    use_realtime_client, use_realtime_connection, use_realtime_state, use_server_event,
    use_typing_indicator, MessageReadStatus, TypingIndicator,
};
pub(crate) use hooks::use_store_signal;
