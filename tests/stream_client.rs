use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use supplystream::{ConnectionState, StreamClient, StreamConfig};

async fn wait_for_state(client: &StreamClient, expected: ConnectionState) {
    let mut states = client.on_state_change();
    timeout(Duration::from_secs(5), async {
        while *states.borrow_and_update() != expected {
            states.changed().await.unwrap();
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state {} not reached", expected));
}

#[tokio::test]
async fn live_session_subscribes_and_aggregates() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = path_tx.send(req.uri().path().to_string());
            Ok(resp)
        };
        let mut ws = accept_hdr_async(stream, callback).await.unwrap();

        let subscribe = ws.next().await.unwrap().unwrap().into_text().unwrap();

        ws.send(Message::Text(
            r#"{"channel":"inventory","level":"warning","message":"low stock"}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"channel":"inventory","level":"info","message":"restocked"}"#.into(),
        ))
        .await
        .unwrap();

        // Hold the socket until the client closes it
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                break;
            }
        }

        subscribe
    });

    let base_url = format!("ws://{}", addr);
    let config = StreamConfig {
        base_url: base_url.clone(),
        ..StreamConfig::default()
    };
    let client = StreamClient::new(config);
    let mut events = client.on_event();

    client.connect(&base_url).unwrap();

    let path = timeout(Duration::from_secs(5), path_rx).await.unwrap().unwrap();
    assert!(path.starts_with("/ws/client_"), "unexpected path {}", path);

    for expected in ["low stock", "restocked"] {
        let entry = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.event.message, expected);
    }

    assert_eq!(client.connection_state(), ConnectionState::Connected);
    let stats = client.stats();
    assert_eq!(stats.inventory.active, 2);
    assert_eq!(stats.inventory.alerts, 1);
    assert_eq!(client.history().len(), 2);
    assert_eq!(client.metrics().synthetic_events, 0);

    client.disconnect().await;
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    let subscribe = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(
        subscribe,
        r#"{"type":"subscribe","channels":["deliveries","inventory","orders"]}"#
    );
}

#[tokio::test]
async fn unreachable_source_falls_back_to_synthetic_events() {
    // Reserve a port, then free it so the connect is refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = format!("ws://{}", addr);
    let config = StreamConfig {
        base_url: base_url.clone(),
        fallback_interval_ms: 200,
        reconnect_delay_ms: 10_000,
        ..StreamConfig::default()
    };
    let client = StreamClient::new(config);
    let mut events = client.on_event();

    client.connect(&base_url).unwrap();
    wait_for_state(&client, ConnectionState::FallbackActive).await;
    assert!(!client.connection_state().is_authoritative());

    let entry = timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(["inventory", "orders", "deliveries"].contains(&entry.event.channel.as_str()));
    assert!(!client.history().is_empty());

    let metrics = client.metrics();
    assert_eq!(metrics.frames_received, 0);
    assert_eq!(metrics.connect_attempts, 1);

    client.disconnect().await;
    client.disconnect().await;
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert!(!client.is_running());
}
