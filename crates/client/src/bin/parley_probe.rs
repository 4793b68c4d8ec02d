//! Parley Probe - connect to the gateway and log what arrives.
//!
//! ```text
//! PARLEY_TOKEN=... parley-probe 3 7
//! ```

use anyhow::{bail, Context};
use parley_client::events::{
    ChatDeleted, ChatNew, MessageDeleted, MessageNew, UserStoppedTyping, UserTyping,
};
use parley_client::{ClientConfig, ConnectionStatus, EventSubscriptions, RealtimeClient};
use parley_shared::RoomId;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("parley_client=debug")),
        )
        .init();

    let token = std::env::var("PARLEY_TOKEN").context("PARLEY_TOKEN is not set")?;
    if token.trim().is_empty() {
        bail!("PARLEY_TOKEN is empty");
    }
    let rooms = std::env::args()
        .skip(1)
        .map(|arg| {
            arg.parse::<RoomId>()
                .with_context(|| format!("invalid room id {arg:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config = ClientConfig::from_env()?;
    tracing::info!(endpoint = %config.endpoint, rooms = ?rooms, "starting probe");
    let client = RealtimeClient::new(config);

    // Join once the session is up; replay covers later reconnects.
    let joiner = client.rooms().clone();
    let wanted = rooms.clone();
    let _status = client.on_status_change(move |status| {
        tracing::info!(?status, "status");
        if *status == ConnectionStatus::Connected {
            for room_id in &wanted {
                joiner.join(*room_id);
            }
        }
    });

    let mut subs = EventSubscriptions::new();
    subs.on::<MessageNew>(&client, |m| {
        tracing::info!(
            room_id = m.room_id,
            id = m.id,
            author = ?m.author(),
            content = %m.content,
            "message-new"
        );
    })
    .on::<MessageDeleted>(&client, |d| {
        tracing::info!(room_id = d.room_id, id = d.message_id, "message-deleted");
    })
    .on::<ChatNew>(&client, |c| {
        tracing::info!(room_id = c.id, name = ?c.name, "chat-new");
    })
    .on::<ChatDeleted>(&client, |d| {
        tracing::info!(room_id = d.room_id, "chat-deleted");
    })
    .on::<UserTyping>(&client, |t| {
        tracing::info!(room_id = t.room_id, user_id = t.user_id, "user-typing");
    })
    .on::<UserStoppedTyping>(&client, |t| {
        tracing::info!(room_id = t.room_id, user_id = t.user_id, "user-stopped-typing");
    });

    client.connect(&token);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    drop(subs);
    client.disconnect();
    tracing::info!("probe stopped");
    Ok(())
}
