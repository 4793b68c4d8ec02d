//! The dial / pump / back off loop behind one session.

use std::sync::Arc;

use futures_channel::mpsc::UnboundedSender;
use futures_util::StreamExt;
use url::Url;

use super::connection::{Dialer, ReconnectConfig, TransportLink};

/// What a session's driver reports to its owner.
pub(crate) enum TransportEvent {
    /// A transport opened; frames for it go to this sender.
    Opened(UnboundedSender<String>),
    Frame(String),
    /// The open transport ended without being asked to.
    Closed,
    /// Waiting before redial number `attempt`.
    Retrying { attempt: u32 },
    /// No redials left. The driver has stopped.
    Exhausted,
}

pub(crate) type Report = Arc<dyn Fn(u64, TransportEvent) + Send + Sync>;

pub(crate) struct SessionDriver {
    pub generation: u64,
    pub endpoint: Url,
    pub dialer: Arc<dyn Dialer>,
    pub reconnect: ReconnectConfig,
    pub report: Report,
}

impl SessionDriver {
    /// Runs until every redial has failed, or until the task is aborted.
    pub async fn run(self) {
        let mut attempt: u32 = 0;
        loop {
            match self.dialer.dial(&self.endpoint).await {
                Ok(TransportLink { outbound, mut inbound }) => {
                    attempt = 0;
                    self.emit(TransportEvent::Opened(outbound));
                    while let Some(frame) = inbound.next().await {
                        self.emit(TransportEvent::Frame(frame));
                    }
                    self.emit(TransportEvent::Closed);
                }
                Err(e) => {
                    tracing::warn!(generation = self.generation, error = %e, "dial failed");
                }
            }

            if attempt >= self.reconnect.max_attempts {
                self.emit(TransportEvent::Exhausted);
                return;
            }
            attempt += 1;
            self.emit(TransportEvent::Retrying { attempt });

            let delay = self
                .reconnect
                .jittered_delay(attempt - 1, &mut rand::thread_rng());
            tracing::debug!(
                generation = self.generation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "waiting to redial"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn emit(&self, event: TransportEvent) {
        (self.report)(self.generation, event);
    }
}
