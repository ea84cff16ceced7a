//! Message dispatcher: the only writer of the client state.
//!
//! Data frames are decoded, classified by tag and reduced into the store.
//! Lifecycle events arrive on the same ordered stream and update connection
//! bookkeeping; they never touch game state except to clear it when a new
//! epoch opens.

use std::sync::Arc;

use clocktower_protocol::{MessageKind, TaggedMessage};

use crate::application::reducers;
use crate::infrastructure::clock::ClockPort;
use crate::infrastructure::messaging::{ConnectionEvent, ConnectionState, LifecycleEvent};
use crate::infrastructure::websocket::decode;
use crate::state::{StateReader, StateStore};

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A reducer ran and changed the state
    Applied(MessageKind),
    /// A reducer ran and left the state as it was (e.g. private info for someone else)
    Unchanged(MessageKind),
    /// Tag this client does not know; logged and discarded
    Unknown(String),
    /// Payload rejected by the codec; logged and discarded
    Malformed(Option<MessageKind>),
}

pub struct MessageDispatcher {
    identity: String,
    store: StateStore,
    clock: Arc<dyn ClockPort>,
}

impl MessageDispatcher {
    pub fn new(identity: impl Into<String>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            identity: identity.into(),
            store: StateStore::new(),
            clock,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn reader(&self) -> StateReader {
        self.store.reader()
    }

    /// Route one transport event.
    pub fn handle_event(&self, event: ConnectionEvent) -> Option<DispatchOutcome> {
        match event {
            ConnectionEvent::Frame(raw) => Some(self.handle_frame(&raw)),
            ConnectionEvent::Lifecycle(lifecycle) => {
                self.handle_lifecycle(&lifecycle);
                None
            }
        }
    }

    /// Decode, classify and reduce one data frame.
    pub fn handle_frame(&self, raw: &str) -> DispatchOutcome {
        let message = match decode(raw, self.clock.as_ref()) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Dropping malformed server message");
                return DispatchOutcome::Malformed(err.kind());
            }
        };

        let kind = match &message {
            TaggedMessage::Unknown { kind } => {
                tracing::debug!(kind = %kind, "Unknown message type ignored");
                return DispatchOutcome::Unknown(kind.clone());
            }
            TaggedMessage::LlmDebug(_) => MessageKind::LlmDebug,
            TaggedMessage::Chat(_) => MessageKind::ChatMessage,
            TaggedMessage::GameStateUpdate(_) => MessageKind::GameStateUpdate,
            TaggedMessage::PrivateInfoUpdate { .. } => MessageKind::PrivateInfoUpdate,
            TaggedMessage::PlayerListUpdate(_) => MessageKind::PlayerListUpdate,
        };

        let identity = self.identity.as_str();
        if self
            .store
            .update(|state| reducers::apply(state, message, identity))
        {
            DispatchOutcome::Applied(kind)
        } else {
            tracing::trace!(kind = %kind, "Message left state unchanged");
            DispatchOutcome::Unchanged(kind)
        }
    }

    /// Record a lifecycle transition.
    ///
    /// A newer epoch opening starts from an empty snapshot; events from an
    /// epoch older than the current one are ignored.
    pub fn handle_lifecycle(&self, event: &LifecycleEvent) {
        self.store.update(|state| {
            if event.epoch() < state.epoch {
                tracing::debug!(
                    epoch = event.epoch(),
                    current = state.epoch,
                    "Stale lifecycle event"
                );
                return false;
            }

            match event {
                LifecycleEvent::Opened { epoch } => {
                    if *epoch != state.epoch {
                        state.clear_game_data();
                    }
                    state.epoch = *epoch;
                    state.connection = ConnectionState::Open;
                    state.last_error = None;
                }
                LifecycleEvent::Error { message, .. } => {
                    state.last_error = Some(message.clone());
                }
                LifecycleEvent::Closed { epoch, initiator } => {
                    tracing::info!(epoch, ?initiator, "Connection closed");
                    state.connection = ConnectionState::Closed;
                }
            }
            true
        });
    }

    /// A new connection attempt has started.
    pub fn connecting(&self) {
        self.store.update(|state| {
            if state.connection == ConnectionState::Connecting {
                return false;
            }
            state.connection = ConnectionState::Connecting;
            true
        });
    }

    /// A connection attempt failed before any epoch opened.
    pub fn connect_failed(&self, error: &str) {
        self.store.update(|state| {
            state.connection = ConnectionState::Closed;
            state.last_error = Some(error.to_string());
            true
        });
    }
}
