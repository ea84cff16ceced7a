//! Outbound command encoding.
//!
//! `CommandEncoder` turns user intents into `ClientMessage`s and hands them to a
//! `CommandSink`. Nothing is queued or retried here: a command issued while the
//! connection is not `OPEN` is dropped and the caller gets `NotConnected`.

use std::sync::Arc;

use clocktower_protocol::{
    CastVotePayload, ChatMessage, ClientMessage, NightActionPayload, NightChoice, NominatePayload,
};
use tokio::sync::watch;

use crate::infrastructure::clock::ClockPort;
use crate::infrastructure::messaging::connection::{
    CommandError, ConnectionHandle, ConnectionState, NotConnectedError,
};

/// Where encoded commands go.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSink: Send + Sync {
    fn state(&self) -> ConnectionState;
    fn transmit(&self, message: ClientMessage) -> Result<(), CommandError>;
}

impl CommandSink for ConnectionHandle {
    fn state(&self) -> ConnectionState {
        ConnectionHandle::state(self)
    }

    fn transmit(&self, message: ClientMessage) -> Result<(), CommandError> {
        self.send(message)
    }
}

/// Sink that follows whichever epoch the session currently holds.
///
/// Before the first epoch and between reconnects there is no handle and the
/// sink reports `Closed`.
#[derive(Clone)]
pub struct ActiveConnection {
    current: watch::Receiver<Option<ConnectionHandle>>,
}

impl ActiveConnection {
    pub fn new(current: watch::Receiver<Option<ConnectionHandle>>) -> Self {
        Self { current }
    }

    fn handle(&self) -> Option<ConnectionHandle> {
        self.current.borrow().clone()
    }
}

impl CommandSink for ActiveConnection {
    fn state(&self) -> ConnectionState {
        self.current
            .borrow()
            .as_ref()
            .map(ConnectionHandle::state)
            .unwrap_or(ConnectionState::Closed)
    }

    fn transmit(&self, message: ClientMessage) -> Result<(), CommandError> {
        match self.handle() {
            Some(handle) => handle.send(message),
            None => Err(NotConnectedError.into()),
        }
    }
}

/// Builds wire commands on behalf of the local identity.
///
/// This is a concrete struct (not a trait) that can be cloned and shared.
#[derive(Clone)]
pub struct CommandEncoder {
    identity: String,
    sink: Arc<dyn CommandSink>,
    clock: Arc<dyn ClockPort>,
}

impl CommandEncoder {
    pub fn new(
        identity: impl Into<String>,
        sink: Arc<dyn CommandSink>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            identity: identity.into(),
            sink,
            clock,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.sink.state()
    }

    /// `JOIN_GAME`. The connector already sends this once per epoch.
    pub fn join_game(&self) -> Result<(), CommandError> {
        self.dispatch(ClientMessage::JoinGame {
            player_id: self.identity.clone(),
        })
    }

    pub fn send_chat(&self, text: impl Into<String>) -> Result<(), CommandError> {
        self.dispatch(ClientMessage::SendChat {
            payload: ChatMessage::new(self.identity.clone(), text, self.clock.now_iso()),
        })
    }

    pub fn nominate(&self, nominee_id: impl Into<String>) -> Result<(), CommandError> {
        self.dispatch(ClientMessage::Nominate {
            payload: NominatePayload {
                nominator_id: self.identity.clone(),
                nominee_id: nominee_id.into(),
            },
        })
    }

    pub fn cast_vote(&self, vote: bool) -> Result<(), CommandError> {
        self.dispatch(ClientMessage::CastVote {
            payload: CastVotePayload {
                voter_id: self.identity.clone(),
                vote,
            },
        })
    }

    pub fn night_action(&self, target: impl Into<String>) -> Result<(), CommandError> {
        self.dispatch(ClientMessage::NightAction {
            payload: NightActionPayload {
                player_id: self.identity.clone(),
                choice: NightChoice {
                    target: target.into(),
                },
            },
        })
    }

    pub fn request_game_start(&self) -> Result<(), CommandError> {
        self.dispatch(ClientMessage::RequestGameStart)
    }

    fn dispatch(&self, message: ClientMessage) -> Result<(), CommandError> {
        let state = self.sink.state();
        if state != ConnectionState::Open {
            tracing::warn!(
                tag = message.tag(),
                state = ?state,
                "Connection not open, dropping command"
            );
            return Err(NotConnectedError.into());
        }

        let tag = message.tag();
        self.sink.transmit(message).inspect_err(|err| {
            tracing::warn!(tag, error = %err, "Command not sent");
        })?;
        tracing::debug!(tag, "Command queued");
        Ok(())
    }
}
