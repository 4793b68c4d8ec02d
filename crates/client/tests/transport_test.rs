use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use parley_client::{ClientConfig, ConnectionStatus, RealtimeClient, RealtimeState};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Helper: a one-connection gateway. Frames it receives go to the returned
/// channel; frames sent on the other channel go to the client.
async fn start_gateway() -> (
    SocketAddr,
    Arc<Mutex<Option<String>>>,
    mpsc::UnboundedReceiver<String>,
    mpsc::UnboundedSender<String>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().unwrap();
    let query = Arc::new(Mutex::new(None));
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<String>();

    let seen_query = query.clone();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            *seen_query.lock() = req.uri().query().map(str::to_owned);
            Ok(resp)
        };
        let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .expect("handshake");
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let _ = received_tx.send(text.as_str().to_owned());
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
                outgoing = push_rx.recv() => match outgoing {
                    Some(frame) => write.send(Message::text(frame)).await.expect("server send"),
                    None => break,
                },
            }
        }
    });

    (addr, query, received_rx, push_tx)
}

async fn wait_for(client: &RealtimeClient, what: &str, pred: impl Fn(&RealtimeState) -> bool) {
    let mut rx = client.store().subscribe();
    time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return;
            }
            rx.changed().await.expect("store dropped");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn websocket_round_trip() {
    let (addr, query, mut received, push) = start_gateway().await;
    let config = ClientConfig::new(&format!("ws://{addr}/ws")).unwrap();
    let client = RealtimeClient::new(config);

    client.connect("secret");
    wait_for(&client, "connected", |s| s.status == ConnectionStatus::Connected).await;
    assert_eq!(query.lock().as_deref(), Some("token=secret"));

    assert!(client.join(10));
    let frame = time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("timeout waiting for join")
        .expect("gateway stopped");
    assert_eq!(frame, r#"{"event":"join-room","data":10}"#);

    let message = serde_json::json!({
        "event": "message-new",
        "data": {
            "id": 77,
            "chat_id": 10,
            "content": "over the wire",
            "sender_id": 5,
            "sent_at": "2025-01-01T12:00:00Z",
        }
    });
    push.send(message.to_string()).unwrap();
    wait_for(&client, "message", |s| s.visible_messages(10).len() == 1).await;
    assert_eq!(client.store().snapshot().unread_count(10), 1);

    client.disconnect();
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn server_close_triggers_reconnect() {
    let (addr, _query, _received, push) = start_gateway().await;
    let mut config = ClientConfig::new(&format!("ws://{addr}/ws")).unwrap();
    config.reconnect.initial_delay = Duration::from_millis(50);
    config.reconnect.randomization_factor = 0.0;
    let client = RealtimeClient::new(config);

    client.connect("secret");
    wait_for(&client, "connected", |s| s.status.is_connected()).await;

    // Dropping the push side ends the server loop and closes the socket.
    drop(push);
    wait_for(&client, "reconnecting", |s| s.status.is_reconnecting()).await;

    client.disconnect();
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}
