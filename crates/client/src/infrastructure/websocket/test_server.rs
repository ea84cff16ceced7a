//! Loopback WebSocket server for connection and session tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

enum Outbound {
    Text(String),
    Close,
}

/// Serves one client connection at a time on 127.0.0.1.
///
/// Frames the client sends are collected in order; frames pushed by the
/// test go to whichever connection is currently accepted.
pub(crate) struct TestServer {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<Outbound>,
    accepted: mpsc::UnboundedReceiver<()>,
}

impl TestServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (received_tx, received) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel();
        let (accepted_tx, accepted) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _peer)) = listener.accept().await {
                let Ok(mut ws) = accept_async(stream).await else {
                    continue;
                };
                let _ = accepted_tx.send(());

                loop {
                    tokio::select! {
                        incoming = ws.next() => match incoming {
                            Some(Ok(WsMessage::Text(text))) => {
                                let _ = received_tx.send(text.to_string());
                            }
                            Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        },
                        out = outbound_rx.recv() => match out {
                            Some(Outbound::Text(text)) => {
                                if ws.send(WsMessage::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Outbound::Close) => {
                                let _ = ws.close(None).await;
                                while let Some(Ok(_)) = ws.next().await {}
                                break;
                            }
                            None => return,
                        },
                    }
                }
            }
        });

        Self {
            addr,
            received,
            outbound,
            accepted,
        }
    }

    /// Endpoint template for clients, `{player_id}` left for the connector.
    pub(crate) fn endpoint(&self) -> String {
        format!("ws://{}/ws/{{player_id}}", self.addr)
    }

    /// Next text frame any client sent, or `None` after a few seconds.
    pub(crate) async fn next_frame(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait until another client connection has been accepted.
    pub(crate) async fn wait_for_connection(&mut self) -> bool {
        tokio::time::timeout(Duration::from_secs(5), self.accepted.recv())
            .await
            .ok()
            .flatten()
            .is_some()
    }

    pub(crate) async fn push(&self, frame: &str) {
        let _ = self.outbound.send(Outbound::Text(frame.to_string()));
    }

    /// Close the current connection from the server side.
    pub(crate) async fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}
