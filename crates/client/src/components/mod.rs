//! Realtime UI components.

mod connection_status;
mod provider;

pub use connection_status::{
    Banner, ConnectionBanner, ConnectionIndicator, StatusAppearance,
};
pub use provider::RealtimeProvider;
