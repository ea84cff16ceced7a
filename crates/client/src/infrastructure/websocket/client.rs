//! WebSocket connector using tokio-tungstenite

use std::sync::atomic::{AtomicU64, AtomicU8};
use std::sync::Arc;
use std::time::Duration;

use clocktower_protocol::ClientMessage;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::infrastructure::messaging::connection::{
    set_connection_state, CloseInitiator, ConnectionError, ConnectionEvent, ConnectionEvents,
    ConnectionHandle, ConnectionState, LifecycleEvent,
};
use crate::infrastructure::websocket::codec;
use crate::infrastructure::websocket::shared::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT_SECS, PLAYER_ID_PLACEHOLDER,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens connection epochs to the game server for one local identity.
pub struct Connector {
    identity: String,
    connect_timeout: Duration,
    channel_capacity: usize,
    next_epoch: AtomicU64,
}

impl Connector {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            next_epoch: AtomicU64::new(0),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Substitute the local identity into `template` and validate the result.
    pub fn resolve_endpoint(&self, template: &str) -> Result<Url, ConnectionError> {
        let endpoint = template.replace(PLAYER_ID_PLACEHOLDER, &self.identity);
        let url = Url::parse(&endpoint).map_err(|source| ConnectionError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            source,
        })?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConnectionError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Open a new connection epoch.
    ///
    /// On success the epoch is `OPEN`, `JOIN_GAME` for the local identity is
    /// already queued, and the returned events start with `Opened`.
    pub async fn open(
        &self,
        endpoint: &str,
    ) -> Result<(ConnectionHandle, ConnectionEvents), ConnectionError> {
        let url = self.resolve_endpoint(endpoint)?;
        let epoch = self.next_epoch.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        tracing::info!(epoch, endpoint = %url, "Connecting to game server");

        let ws_stream = match tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
        {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(source)) => {
                tracing::error!(epoch, error = %source, "Failed to connect to game server");
                return Err(ConnectionError::Handshake {
                    endpoint: url.to_string(),
                    source: Box::new(source),
                });
            }
            Err(_) => {
                tracing::error!(epoch, timeout = ?self.connect_timeout, "Handshake timed out");
                return Err(ConnectionError::Timeout {
                    endpoint: url.to_string(),
                    timeout: self.connect_timeout,
                });
            }
        };
        tracing::info!(epoch, "Connected to game server");

        let (write, read) = ws_stream.split();
        let state = Arc::new(AtomicU8::new(ConnectionState::Open.to_u8()));
        let cancel = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel::<ClientMessage>(self.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(self.channel_capacity);

        // Fresh channel with capacity >= 1, so this cannot block.
        let _ = event_tx
            .send(ConnectionEvent::Lifecycle(LifecycleEvent::Opened { epoch }))
            .await;

        tokio::spawn(write_loop(epoch, write, cmd_rx, cancel.clone()));
        tokio::spawn(read_loop(
            epoch,
            read,
            event_tx,
            Arc::clone(&state),
            cancel.clone(),
        ));

        let handle = ConnectionHandle::new(epoch, state, cmd_tx, cancel);
        if let Err(err) = handle.send(ClientMessage::JoinGame {
            player_id: self.identity.clone(),
        }) {
            tracing::warn!(epoch, error = %err, "Failed to queue JOIN_GAME");
        }

        Ok((handle, event_rx))
    }
}

async fn read_loop(
    epoch: u64,
    mut read: SplitStream<WsStream>,
    events: mpsc::Sender<ConnectionEvent>,
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
) {
    let initiator = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break CloseInitiator::Local,
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if events.send(ConnectionEvent::Frame(text)).await.is_err() {
                        // Nobody is listening any more.
                        break CloseInitiator::Local;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if events.send(ConnectionEvent::Frame(text)).await.is_err() {
                            break CloseInitiator::Local;
                        }
                    }
                    Err(_) => tracing::warn!(epoch, "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(epoch, ?frame, "Server closed connection");
                    break CloseInitiator::Remote;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(epoch, error = %e, "WebSocket error");
                    let _ = events
                        .send(ConnectionEvent::Lifecycle(LifecycleEvent::Error {
                            epoch,
                            message: e.to_string(),
                        }))
                        .await;
                    break CloseInitiator::Transport;
                }
                None => {
                    tracing::info!(epoch, "Connection stream ended");
                    break CloseInitiator::Remote;
                }
            },
        }
    };

    set_connection_state(&state, ConnectionState::Closed);
    // Stops the writer as well.
    cancel.cancel();
    let _ = events
        .send(ConnectionEvent::Lifecycle(LifecycleEvent::Closed {
            epoch,
            initiator,
        }))
        .await;
    tracing::debug!(epoch, ?initiator, "Read task completed");
}

async fn write_loop(
    epoch: u64,
    mut write: SplitSink<WsStream, Message>,
    mut commands: mpsc::Receiver<ClientMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = commands.recv() => {
                let Some(message) = next else { break };
                let frame = match codec::encode(&message) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(epoch, error = %e, "Failed to serialize command");
                        continue;
                    }
                };
                tracing::debug!(epoch, tag = message.tag(), "Sending command");
                if let Err(e) = write.send(Message::Text(frame)).await {
                    tracing::error!(epoch, error = %e, "Failed to send command");
                    break;
                }
            }
        }
    }

    // Whatever is still queued never reaches the wire.
    commands.close();
    let mut discarded = 0usize;
    while commands.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        tracing::debug!(epoch, discarded, "Discarded unsent commands");
    }

    if let Err(e) = write.close().await {
        tracing::debug!(epoch, error = %e, "Close handshake not completed");
    }
    tracing::debug!(epoch, "Write task completed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::websocket::test_server::TestServer;

    #[test]
    fn endpoint_template_substitutes_identity() {
        let connector = Connector::new("HumanPlayer1");
        let url = connector
            .resolve_endpoint("ws://localhost:8000/ws/{player_id}")
            .expect("valid");
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/HumanPlayer1");
    }

    #[test]
    fn endpoint_must_be_websocket() {
        let connector = Connector::new("HumanPlayer1");
        assert!(matches!(
            connector.resolve_endpoint("http://localhost:8000/ws"),
            Err(ConnectionError::UnsupportedScheme(scheme)) if scheme == "http"
        ));
        assert!(matches!(
            connector.resolve_endpoint("not a url"),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_to_open() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let connector = Connector::new("HumanPlayer1").with_connect_timeout(Duration::from_secs(2));
        let result = connector.open(&format!("ws://{addr}/ws")).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Handshake { .. }) | Err(ConnectionError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn open_sends_join_game_and_reports_opened_first() {
        let mut server = TestServer::start().await;
        let connector = Connector::new("HumanPlayer1");

        let (handle, mut events) = connector
            .open(&server.endpoint())
            .await
            .expect("open");
        assert_eq!(handle.state(), ConnectionState::Open);
        assert_eq!(
            events.recv().await,
            Some(ConnectionEvent::Lifecycle(LifecycleEvent::Opened {
                epoch: handle.epoch()
            }))
        );

        let join: serde_json::Value =
            serde_json::from_str(&server.next_frame().await.expect("join frame")).expect("json");
        assert_eq!(join["type"], "JOIN_GAME");
        assert_eq!(join["playerId"], "HumanPlayer1");

        handle.close();
    }

    #[tokio::test]
    async fn frames_arrive_in_order_and_close_is_reported_once() {
        let mut server = TestServer::start().await;
        let connector = Connector::new("HumanPlayer1");
        let (handle, mut events) = connector.open(&server.endpoint()).await.expect("open");
        let _ = server.next_frame().await;

        server.push("first").await;
        server.push("second").await;
        server.close().await;

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }

        let frames: Vec<_> = seen
            .iter()
            .filter_map(|event| match event {
                ConnectionEvent::Frame(text) => Some(text.as_str()),
                ConnectionEvent::Lifecycle(_) => None,
            })
            .collect();
        assert_eq!(frames, vec!["first", "second"]);

        let closes = seen
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    ConnectionEvent::Lifecycle(LifecycleEvent::Closed { .. })
                )
            })
            .count();
        assert_eq!(closes, 1);
        assert!(matches!(
            seen.last(),
            Some(ConnectionEvent::Lifecycle(LifecycleEvent::Closed {
                initiator: CloseInitiator::Remote,
                ..
            }))
        ));
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(handle.send(ClientMessage::RequestGameStart).is_err());
    }

    #[tokio::test]
    async fn local_close_twice_ends_epoch_once() {
        let server = TestServer::start().await;
        let connector = Connector::new("HumanPlayer1");
        let (handle, mut events) = connector.open(&server.endpoint()).await.expect("open");

        handle.close();
        handle.close();

        let mut closes = Vec::new();
        while let Some(event) = events.recv().await {
            if let ConnectionEvent::Lifecycle(LifecycleEvent::Closed { initiator, .. }) = event {
                closes.push(initiator);
            }
        }
        assert_eq!(closes, vec![CloseInitiator::Local]);
        assert_eq!(handle.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn each_open_starts_a_new_epoch() {
        let server = TestServer::start().await;
        let connector = Connector::new("HumanPlayer1");

        let (first, _events) = connector.open(&server.endpoint()).await.expect("first");
        first.close();
        let (second, _events) = connector.open(&server.endpoint()).await.expect("second");

        assert!(second.epoch() > first.epoch());
        second.close();
    }
}
