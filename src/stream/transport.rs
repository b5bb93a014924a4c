/// Transport connection: exactly one physical socket per handle
///
/// `TransportConnection::open` spawns a task that connects, then pumps
/// outbound frames to the socket and inbound frames to the event callback.
/// The callback sees at most one terminal event (`Closed` or `Error`) per
/// connection, and none after a local `close()`.
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use futures_util::future;
use rand::Rng;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};

use crate::errors::StreamError;
use crate::logger::{self, LogTag};

/// A frame read from the socket
#[derive(Debug, Clone, PartialEq)]
pub enum WireFrame {
    Text(String),
    /// Close frame with optional reason
    Closed(Option<String>),
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = StreamError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<WireFrame, StreamError>> + Send>>;

/// Opens the underlying socket
///
/// `WebSocketConnector` is the production implementation; tests plug in
/// in-memory connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), StreamError>;
}

/// tokio-tungstenite backed connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), StreamError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| StreamError::transport(&format!("Failed to connect to {}", url), e))?;

        let (ws_sender, ws_receiver) = ws_stream.split();

        let sink = ws_sender
            .with(|text: String| future::ready(Ok::<Message, WsError>(Message::Text(text))))
            .sink_map_err(|e| StreamError::transport("WebSocket send failed", e));

        let stream = ws_receiver.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(WireFrame::Text(text))),
                Ok(Message::Binary(bytes)) => {
                    Some(Ok(WireFrame::Text(String::from_utf8_lossy(&bytes).into_owned())))
                }
                Ok(Message::Close(frame)) => {
                    Some(Ok(WireFrame::Closed(frame.map(|f| f.reason.to_string()))))
                }
                // Ping/pong are answered by tungstenite itself
                Ok(_) => None,
                Err(e) => Some(Err(StreamError::transport("WebSocket error", e))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

/// Fresh per-attempt client id: `client_<unix millis>_<9 base36 chars>`
pub fn generate_client_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("client_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Stream endpoint for a client: `<base>/ws/<client_id>`
pub fn stream_url(base_url: &str, client_id: &str) -> String {
    format!("{}/ws/{}", base_url.trim_end_matches('/'), client_id)
}

/// Events emitted by a transport connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed(Option<String>),
    Error(String),
}

/// Anything the subscription manager can hand a frame to
pub trait FrameSender {
    fn is_open(&self) -> bool;

    /// Fire-and-forget send; returns false (and logs) when the frame was dropped
    fn send(&self, json: &str) -> bool;
}

pub struct TransportConnection {
    url: String,
    client_id: String,
    outbound: Option<mpsc::UnboundedSender<String>>,
    open: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl TransportConnection {
    /// Spawn the connection task; `on_event` receives lifecycle and message events
    pub fn open<F>(
        connector: Arc<dyn Connector>,
        url: String,
        client_id: String,
        on_event: F,
    ) -> Self
    where
        F: Fn(TransportEvent) + Send + Sync + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        logger::debug(LogTag::Transport, &format!("Opening transport to {}", url));

        let task = tokio::spawn(run_connection(
            connector,
            url.clone(),
            outbound_rx,
            open.clone(),
            on_event,
        ));

        Self {
            url,
            client_id,
            outbound: Some(outbound_tx),
            open,
            task: Some(task),
        }
    }

    /// Close the connection; calling it again is a no-op
    pub fn close(&mut self) {
        let Some(outbound) = self.outbound.take() else {
            return;
        };
        let was_open = self.open.swap(false, Ordering::SeqCst);

        // Dropping the sender makes an open connection close its socket gracefully.
        drop(outbound);
        if let Some(task) = self.task.take() {
            if !was_open {
                task.abort();
            }
        }

        logger::debug(
            LogTag::Transport,
            &format!("Transport {} closed (client_id={})", self.url, self.client_id),
        );
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_none()
    }
}

impl FrameSender for TransportConnection {
    fn is_open(&self) -> bool {
        self.outbound.is_some() && self.open.load(Ordering::SeqCst)
    }

    fn send(&self, json: &str) -> bool {
        let outbound = match &self.outbound {
            Some(outbound) if self.open.load(Ordering::SeqCst) => outbound,
            _ => {
                logger::debug(
                    LogTag::Transport,
                    &format!("Dropping send on non-open transport {}", self.url),
                );
                return false;
            }
        };

        if outbound.send(json.to_string()).is_err() {
            logger::debug(
                LogTag::Transport,
                &format!("Dropping send: transport task for {} has exited", self.url),
            );
            return false;
        }

        logger::verbose(LogTag::Transport, &format!("Queued frame: {}", json));
        true
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection<F>(
    connector: Arc<dyn Connector>,
    url: String,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
    on_event: F,
) where
    F: Fn(TransportEvent) + Send + Sync + 'static,
{
    let (mut sink, mut stream) = match connector.connect(&url).await {
        Ok(pair) => pair,
        Err(e) => {
            on_event(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    on_event(TransportEvent::Opened);

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = sink.send(text).await {
                        if open.swap(false, Ordering::SeqCst) {
                            on_event(TransportEvent::Error(e.to_string()));
                        }
                        break;
                    }
                }
                None => {
                    // Local close
                    let _ = sink.close().await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WireFrame::Text(text))) => on_event(TransportEvent::Message(text)),
                Some(Ok(WireFrame::Closed(reason))) => {
                    if open.swap(false, Ordering::SeqCst) {
                        on_event(TransportEvent::Closed(reason));
                    }
                    break;
                }
                Some(Err(e)) => {
                    if open.swap(false, Ordering::SeqCst) {
                        on_event(TransportEvent::Error(e.to_string()));
                    }
                    break;
                }
                None => {
                    if open.swap(false, Ordering::SeqCst) {
                        on_event(TransportEvent::Closed(None));
                    }
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Far end of an in-memory socket: what the client sent, and a feed of frames to it
    type Peer = (
        fmpsc::UnboundedReceiver<String>,
        fmpsc::UnboundedSender<Result<WireFrame, StreamError>>,
    );

    /// Connector handing out in-memory socket pairs
    struct PairConnector {
        fail: bool,
        peer: Mutex<Option<Peer>>,
    }

    impl PairConnector {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                peer: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Connector for PairConnector {
        async fn connect(&self, _url: &str) -> Result<(FrameSink, FrameStream), StreamError> {
            if self.fail {
                return Err(StreamError::Transport("connection refused".to_string()));
            }
            let (out_tx, out_rx) = fmpsc::unbounded::<String>();
            let (in_tx, in_rx) = fmpsc::unbounded::<Result<WireFrame, StreamError>>();
            *self.peer.lock() = Some((out_rx, in_tx));
            let sink = out_tx.sink_map_err(|e| StreamError::transport("send", e));
            Ok((Box::pin(sink), Box::pin(in_rx)))
        }
    }

    fn recorder() -> (
        Arc<Mutex<Vec<TransportEvent>>>,
        impl Fn(TransportEvent) + Send + Sync + 'static,
    ) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event| sink.lock().push(event))
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_client_id_and_url() {
        let id = generate_client_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "client");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(id, generate_client_id());

        assert_eq!(
            stream_url("ws://host:8000/", "client_1_a"),
            "ws://host:8000/ws/client_1_a"
        );
        assert_eq!(stream_url("wss://host", "c"), "wss://host/ws/c");
    }

    #[tokio::test]
    async fn test_connect_failure_reports_error() {
        let connector = PairConnector::new(true);
        let (events, on_event) = recorder();

        let transport = TransportConnection::open(
            connector,
            "ws://mock/ws/c1".to_string(),
            "c1".to_string(),
            on_event,
        );
        settle().await;

        let events = events.lock().clone();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::Error(msg) if msg.contains("refused")));
        assert!(!transport.is_open());
        assert!(!transport.send("{}"));
    }

    #[tokio::test]
    async fn test_messages_flow_both_ways() {
        let connector = PairConnector::new(false);
        let (events, on_event) = recorder();

        let transport = TransportConnection::open(
            connector.clone(),
            "ws://mock/ws/c2".to_string(),
            "c2".to_string(),
            on_event,
        );
        settle().await;
        assert!(transport.is_open());

        let (mut outbound, inbound) = connector.peer.lock().take().unwrap();
        assert!(transport.send(r#"{"type":"subscribe","channels":[]}"#));
        let sent = tokio::time::timeout(Duration::from_secs(1), outbound.next())
            .await
            .unwrap();
        assert_eq!(sent.as_deref(), Some(r#"{"type":"subscribe","channels":[]}"#));

        inbound.unbounded_send(Ok(WireFrame::Text("hello".to_string()))).unwrap();
        inbound.unbounded_send(Ok(WireFrame::Closed(Some("bye".to_string())))).unwrap();
        settle().await;

        let events = events.lock().clone();
        assert_eq!(
            events,
            vec![
                TransportEvent::Opened,
                TransportEvent::Message("hello".to_string()),
                TransportEvent::Closed(Some("bye".to_string())),
            ]
        );
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_silent() {
        let connector = PairConnector::new(false);
        let (events, on_event) = recorder();

        let mut transport = TransportConnection::open(
            connector.clone(),
            "ws://mock/ws/c3".to_string(),
            "c3".to_string(),
            on_event,
        );
        settle().await;

        transport.close();
        transport.close();
        settle().await;

        assert!(transport.is_closed());
        assert!(!transport.send("{}"));
        assert_eq!(events.lock().clone(), vec![TransportEvent::Opened]);

        // The socket itself was closed once the sender went away
        let (mut outbound, _inbound) = connector.peer.lock().take().unwrap();
        assert_eq!(outbound.next().await, None);
    }
}
