//! Connection lifecycle management.
//!
//! Types for one connection epoch: its state, the owned handle used to send and
//! close, and the events the transport reports back.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clocktower_protocol::ClientMessage;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a connection epoch.
///
/// Transport errors are reported as `LifecycleEvent::Error` and do not change
/// the state by themselves; the `Closed` that follows does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Frames can be sent
    Open,
    /// Terminal for this epoch
    #[default]
    Closed,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Closed => 0,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// Who ended a connection epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiator {
    /// `ConnectionHandle::close` was called
    Local,
    /// The server sent a close frame or ended the stream
    Remote,
    /// The transport failed
    Transport,
}

/// Lifecycle notifications, delivered separately from data frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Opened {
        epoch: u64,
    },
    Error {
        epoch: u64,
        message: String,
    },
    Closed {
        epoch: u64,
        initiator: CloseInitiator,
    },
}

impl LifecycleEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            LifecycleEvent::Opened { epoch }
            | LifecycleEvent::Error { epoch, .. }
            | LifecycleEvent::Closed { epoch, .. } => *epoch,
        }
    }
}

/// Everything the transport reports for one epoch, in delivery order.
///
/// The first event is always `Opened` and the last is always exactly one `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Lifecycle(LifecycleEvent),
    Frame(String),
}

/// Receiving side of a connection epoch's events.
pub type ConnectionEvents = mpsc::Receiver<ConnectionEvent>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported endpoint scheme {0:?}, expected ws or wss")]
    UnsupportedScheme(String),

    #[error("handshake with {endpoint} failed: {source}")]
    Handshake {
        endpoint: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("handshake with {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
}

/// A command was attempted while the connection was not `OPEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not connected")]
pub struct NotConnectedError;

/// Why an outbound command was not queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    NotConnected(#[from] NotConnectedError),

    #[error("outbound queue full, dropped {tag}")]
    Backpressure { tag: &'static str },
}

impl CommandError {
    pub fn is_not_connected(&self) -> bool {
        matches!(self, CommandError::NotConnected(_))
    }
}

/// Owned handle to one connection epoch.
///
/// Clones share the same epoch. Dropping a handle does NOT close the
/// connection; call `close()` explicitly.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    epoch: u64,
    state: Arc<AtomicU8>,
    tx: mpsc::Sender<ClientMessage>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    pub(crate) fn new(
        epoch: u64,
        state: Arc<AtomicU8>,
        tx: mpsc::Sender<ClientMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            epoch,
            state,
            tx,
            cancel,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Queue a command for the writer task.
    ///
    /// Fails with `NotConnected` unless the epoch is `OPEN`. A queued command is
    /// written as one whole frame or not at all.
    pub fn send(&self, message: ClientMessage) -> Result<(), CommandError> {
        if !self.is_open() {
            return Err(NotConnectedError.into());
        }

        self.tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(message) => CommandError::Backpressure {
                tag: message.tag(),
            },
            mpsc::error::TrySendError::Closed(_) => NotConnectedError.into(),
        })
    }

    /// Close the connection. Idempotent: later calls have no effect.
    ///
    /// Commands still queued are discarded.
    pub fn close(&self) {
        let previous = self
            .state
            .swap(ConnectionState::Closed.to_u8(), Ordering::SeqCst);
        if ConnectionState::from_u8(previous) == ConnectionState::Closed {
            tracing::trace!(epoch = self.epoch, "Close on an already closed connection");
            return;
        }

        tracing::info!(epoch = self.epoch, "Closing connection");
        self.cancel.cancel();
    }
}

/// Internal helper to update connection state (used by the transport tasks).
pub(crate) fn set_connection_state(state_ref: &AtomicU8, new_state: ConnectionState) {
    state_ref.store(new_state.to_u8(), Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_handle(state: ConnectionState) -> (ConnectionHandle, mpsc::Receiver<ClientMessage>) {
        let (tx, rx) = mpsc::channel(2);
        let handle = ConnectionHandle::new(
            1,
            Arc::new(AtomicU8::new(state.to_u8())),
            tx,
            CancellationToken::new(),
        );
        (handle, rx)
    }

    #[test]
    fn test_connection_state_roundtrip() {
        let states = [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closed,
        ];

        for state in states {
            assert_eq!(ConnectionState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn send_on_closed_handle_is_not_connected_and_queues_nothing() {
        let (handle, mut rx) = detached_handle(ConnectionState::Closed);

        let err = handle
            .send(ClientMessage::RequestGameStart)
            .expect_err("closed handle");
        assert_eq!(err, CommandError::NotConnected(NotConnectedError));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_on_open_handle_queues_command() {
        let (handle, mut rx) = detached_handle(ConnectionState::Open);

        handle
            .send(ClientMessage::RequestGameStart)
            .expect("open handle");
        assert_eq!(rx.try_recv().ok(), Some(ClientMessage::RequestGameStart));
    }

    #[test]
    fn full_queue_reports_backpressure() {
        let (handle, _rx) = detached_handle(ConnectionState::Open);
        handle.send(ClientMessage::RequestGameStart).expect("first");
        handle.send(ClientMessage::RequestGameStart).expect("second");

        let err = handle
            .send(ClientMessage::RequestGameStart)
            .expect_err("queue is full");
        assert_eq!(
            err,
            CommandError::Backpressure {
                tag: "REQUEST_GAME_START"
            }
        );
    }

    #[test]
    fn close_is_idempotent() {
        let (handle, _rx) = detached_handle(ConnectionState::Open);
        let observer = handle.clone();

        handle.close();
        let after_first = (handle.state(), handle.cancel.is_cancelled());
        handle.close();
        let after_second = (handle.state(), handle.cancel.is_cancelled());

        assert_eq!(after_first, (ConnectionState::Closed, true));
        assert_eq!(after_first, after_second);
        assert_eq!(observer.state(), ConnectionState::Closed);
    }
}
