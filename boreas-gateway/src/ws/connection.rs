//! A single WebSocket connection with its receive loop.

use async_trait::async_trait;
use boreas_core::error::{BoreasError, NetworkError, StateError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{Instrument, debug, info, trace, warn};

use super::config::ConnectionConfig;
use super::state::{ConnectionState, InternalState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Process-unique connection identifier.
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Receives traffic from a connection's receive loop.
#[async_trait]
pub trait ConnectionCallback: Send + Sync {
    /// Called for every text (or UTF-8 binary) message.
    async fn on_message(&self, connection_id: ConnectionId, text: &str);

    /// Called once when the receive loop ends, whatever the cause.
    async fn on_disconnected(&self, connection_id: ConnectionId, reason: &str) {
        let _ = (connection_id, reason);
    }
}

#[derive(Default)]
struct Control {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// One transport connection.
///
/// Connects at most once. The receive loop owns the socket and is the only
/// writer of the `Connected -> Closed` transition when the remote side goes
/// away; [`close`](Self::close) is idempotent and safe at any time.
pub struct WebSocketConnection {
    id: ConnectionId,
    config: ConnectionConfig,
    state: Arc<RwLock<InternalState>>,
    control: Mutex<Control>,
}

impl std::fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl WebSocketConnection {
    /// Creates a disconnected connection.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            state: Arc::new(RwLock::new(InternalState::new())),
            control: Mutex::new(Control::default()),
        }
    }

    /// Returns the connection identifier.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.read().state
    }

    /// Returns true while the receive loop is running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state().is_connected()
    }

    /// Time since the last received frame (or since creation).
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.state.read().idle_for()
    }

    /// Time since the connection was established (or created).
    #[must_use]
    pub fn age(&self) -> Duration {
        self.state.read().age()
    }

    /// Number of data messages handed to the callback.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.state.read().messages_received
    }

    /// Opens the connection and starts the receive loop.
    ///
    /// Only legal from `Disconnected`. Any failure leaves the connection `Closed`.
    pub async fn connect(
        &self,
        endpoint: &str,
        callback: Arc<dyn ConnectionCallback>,
    ) -> Result<(), BoreasError> {
        {
            let mut state = self.state.write();
            if state.state != ConnectionState::Disconnected {
                return Err(StateError::invalid(state.state, "connect").into());
            }
            state.state = ConnectionState::Connecting;
        }

        let ws_config =
            WebSocketConfig::default().max_message_size(Some(self.config.max_message_bytes));
        let handshake = timeout(
            self.config.connect_timeout(),
            connect_async_with_config(endpoint, Some(ws_config), false),
        )
        .await;

        let ws_stream = match handshake {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                self.state.write().mark_closed();
                return Err(Self::map_connect_error(endpoint, e).into());
            }
            Err(_) => {
                self.state.write().mark_closed();
                return Err(NetworkError::Timeout {
                    timeout_ms: self.config.connect_timeout_ms,
                }
                .into());
            }
        };

        let (sink, stream) = ws_stream.split();
        {
            let mut control = self.control.lock();
            {
                let mut state = self.state.write();
                if state.state != ConnectionState::Connecting {
                    return Err(NetworkError::ConnectionClosed {
                        reason: "closed while connecting".to_string(),
                    }
                    .into());
                }
                state.mark_connected();
            }

            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let task = tokio::spawn(
                Self::run_loop(
                    self.id,
                    sink,
                    stream,
                    shutdown_rx,
                    Arc::clone(&self.state),
                    callback,
                    self.config.heartbeat_interval(),
                )
                .in_current_span(),
            );
            control.shutdown_tx = Some(shutdown_tx);
            control.task = Some(task);
        }

        info!(connection.id = self.id, endpoint, "Connection established");
        Ok(())
    }

    fn map_connect_error(endpoint: &str, error: tungstenite::Error) -> NetworkError {
        match error {
            tungstenite::Error::Url(_) | tungstenite::Error::HttpFormat(_) => {
                NetworkError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: error.to_string(),
                }
            }
            other => NetworkError::ConnectionFailed {
                reason: other.to_string(),
            },
        }
    }

    /// Stops the receive loop and waits for it to exit.
    ///
    /// Sends a close frame, then waits up to `close_timeout` before aborting
    /// the task. Calling it again, or after the loop already ended, is a no-op.
    pub async fn close(&self) {
        let (shutdown_tx, task) = {
            let mut control = self.control.lock();
            (control.shutdown_tx.take(), control.task.take())
        };

        {
            let mut state = self.state.write();
            if matches!(
                state.state,
                ConnectionState::Disconnected | ConnectionState::Connecting
            ) {
                state.mark_closed();
            }
        }

        if let Some(shutdown_tx) = shutdown_tx {
            let _ = shutdown_tx.send(());
        }

        if let Some(mut task) = task {
            if timeout(self.config.close_timeout(), &mut task).await.is_err() {
                warn!(
                    connection.id = self.id,
                    timeout_ms = self.config.close_timeout_ms,
                    "Receive loop did not stop in time, aborting"
                );
                task.abort();
            }
            debug!(connection.id = self.id, "Connection closed");
        }

        self.state.write().mark_closed();
    }

    async fn run_loop(
        id: ConnectionId,
        mut sink: WsSink,
        mut stream: WsSource,
        mut shutdown_rx: oneshot::Receiver<()>,
        state: Arc<RwLock<InternalState>>,
        callback: Arc<dyn ConnectionCallback>,
        heartbeat_period: Option<Duration>,
    ) {
        let mut heartbeat = heartbeat_period.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    break "closed by client".to_string();
                }

                frame = stream.next() => {
                    let msg = match frame {
                        Some(Ok(msg)) => msg,
                        Some(Err(tungstenite::Error::Capacity(e))) => {
                            break format!("message exceeds receive buffer: {e}");
                        }
                        Some(Err(e)) => break format!("read error: {e}"),
                        None => break "stream ended".to_string(),
                    };
                    state.write().record_frame();

                    match msg {
                        Message::Text(text) => {
                            state.write().record_message();
                            callback.on_message(id, text.as_str()).await;
                        }
                        Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                            Ok(text) => {
                                state.write().record_message();
                                callback.on_message(id, text).await;
                            }
                            Err(e) => warn!(connection.id = id, error = %e, "Dropping non UTF-8 binary message"),
                        },
                        Message::Ping(data) => {
                            if let Err(e) = sink.send(Message::Pong(data)).await {
                                warn!(connection.id = id, error = %e, "Failed to send pong");
                            }
                        }
                        Message::Pong(_) => trace!(connection.id = id, "Pong received"),
                        Message::Close(frame) => {
                            break match frame {
                                Some(frame) => format!("server closed: {} {}", frame.code, frame.reason.as_str()),
                                None => "server closed".to_string(),
                            };
                        }
                        Message::Frame(_) => {}
                    }
                }

                () = next_heartbeat(&mut heartbeat) => {
                    if let Err(e) = sink.send(Message::Ping(Vec::new().into())).await {
                        warn!(connection.id = id, error = %e, "Failed to send ping");
                    }
                }
            }
        };

        state.write().mark_closed();
        info!(connection.id = id, reason = %reason, "Receive loop ended");
        callback.on_disconnected(id, &reason).await;
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    struct Collector {
        messages: mpsc::UnboundedSender<String>,
        disconnects: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl ConnectionCallback for Collector {
        async fn on_message(&self, _connection_id: ConnectionId, text: &str) {
            let _ = self.messages.send(text.to_string());
        }

        async fn on_disconnected(&self, _connection_id: ConnectionId, reason: &str) {
            let _ = self.disconnects.send(reason.to_string());
        }
    }

    fn collector() -> (
        Arc<Collector>,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (messages, messages_rx) = mpsc::unbounded_channel();
        let (disconnects, disconnects_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Collector {
                messages,
                disconnects,
            }),
            messages_rx,
            disconnects_rx,
        )
    }

    /// Accepts one client and sends it `frames`, then keeps the socket open
    /// until the client goes away.
    async fn serve_once(frames: Vec<Message>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            while let Some(Ok(_)) = ws.next().await {}
        });
        format!("ws://{addr}/stream")
    }

    #[tokio::test]
    async fn test_receives_messages_and_closes() {
        let endpoint = serve_once(vec![
            Message::Text("first".into()),
            Message::Binary(b"second".to_vec().into()),
        ])
        .await;
        let (callback, mut messages, mut disconnects) = collector();

        let connection = WebSocketConnection::new(ConnectionConfig::default());
        connection.connect(&endpoint, callback).await.unwrap();
        assert!(connection.is_alive());

        assert_eq!(messages.recv().await.unwrap(), "first");
        assert_eq!(messages.recv().await.unwrap(), "second");
        assert_eq!(connection.messages_received(), 2);

        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(disconnects.recv().await.unwrap(), "closed by client");

        // Idempotent
        connection.close().await;
        assert!(!connection.is_alive());
    }

    #[tokio::test]
    async fn test_connect_twice_is_invalid() {
        let endpoint = serve_once(Vec::new()).await;
        let (callback, _messages, _disconnects) = collector();

        let connection = WebSocketConnection::new(ConnectionConfig::default());
        connection
            .connect(&endpoint, Arc::clone(&callback) as Arc<dyn ConnectionCallback>)
            .await
            .unwrap();

        let err = connection.connect(&endpoint, callback).await.unwrap_err();
        assert!(matches!(err, BoreasError::State(_)));
        connection.close().await;
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (callback, _messages, _disconnects) = collector();
        let connection = WebSocketConnection::new(ConnectionConfig::default());
        let err = connection
            .connect(&format!("ws://{addr}/stream"), callback)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BoreasError::Network(NetworkError::ConnectionFailed { .. })
        ));
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let (callback, _messages, _disconnects) = collector();
        let connection = WebSocketConnection::new(ConnectionConfig::default());
        let err = connection
            .connect("http://127.0.0.1/stream", callback)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoreasError::Network(NetworkError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_message_ends_loop() {
        let endpoint = serve_once(vec![Message::Text("x".repeat(4096).into())]).await;
        let (callback, mut messages, mut disconnects) = collector();

        let config = ConnectionConfig::builder().max_message_bytes(1024).build();
        let connection = WebSocketConnection::new(config);
        connection.connect(&endpoint, callback).await.unwrap();

        let reason = disconnects.recv().await.unwrap();
        assert!(reason.contains("receive buffer"));
        assert!(messages.try_recv().is_err());
        assert_eq!(connection.state(), ConnectionState::Closed);
        connection.close().await;
    }

    #[tokio::test]
    async fn test_server_close_marks_closed() {
        let endpoint = serve_once(vec![Message::Close(None)]).await;
        let (callback, _messages, mut disconnects) = collector();

        let connection = WebSocketConnection::new(ConnectionConfig::default());
        connection.connect(&endpoint, callback).await.unwrap();

        let reason = disconnects.recv().await.unwrap();
        assert!(reason.starts_with("server closed"));
        assert!(!connection.is_alive());
    }

    #[tokio::test]
    async fn test_close_before_connect() {
        let connection = WebSocketConnection::new(ConnectionConfig::default());
        connection.close().await;
        assert_eq!(connection.state(), ConnectionState::Closed);

        let (callback, _messages, _disconnects) = collector();
        let err = connection
            .connect("ws://127.0.0.1:1/stream", callback)
            .await
            .unwrap_err();
        assert!(matches!(err, BoreasError::State(_)));
    }
}
