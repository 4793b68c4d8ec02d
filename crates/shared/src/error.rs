//! Shared error types.

use thiserror::Error;

/// Failure to turn an event into a frame or a frame into an event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),
}
