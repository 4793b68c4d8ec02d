//! Client error types.

use parley_shared::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No live transport to send on.
    #[error("not connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}
