//! Native/Desktop WebSocket transport using tokio-tungstenite.

use async_trait::async_trait;
use futures_channel::mpsc::unbounded;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{Dialer, TransportLink};
use crate::error::ClientError;

/// Dials the gateway over WebSocket and pumps frames in two background tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteDialer;

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(&self, endpoint: &Url) -> Result<TransportLink, ClientError> {
        let (ws_stream, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let host = endpoint.host_str().unwrap_or_default().to_string();
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = unbounded::<String>();
        let (inbound_tx, inbound_rx) = unbounded::<String>();

        // Read task; dropping `inbound_tx` signals the close.
        let host_for_read = host.clone();
        tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.unbounded_send(text.as_str().to_owned()).is_err() {
                            // Session torn down
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::info!(host = %host_for_read, ?frame, "received close frame");
                        break;
                    }
                    Ok(Message::Ping(_)) => {
                        // Pong is handled automatically by tungstenite
                    }
                    Ok(_) => {
                        // Ignore binary, pong, etc.
                    }
                    Err(e) => {
                        tracing::warn!(host = %host_for_read, error = %e, "websocket read error");
                        break;
                    }
                }
            }
        });

        // Write task; ends when the session drops its sender.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.next().await {
                if let Err(e) = write.send(Message::text(frame)).await {
                    tracing::warn!(host = %host, error = %e, "websocket send failed");
                    break;
                }
            }
            let _ = write.close().await;
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
