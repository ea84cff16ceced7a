//! Session composition: one connector, one dispatcher, one event loop.
//!
//! All inbound events for every epoch are consumed by a single task, so
//! reducers never run concurrently and frames are applied in arrival order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::dispatcher::MessageDispatcher;
use crate::config::ClientConfig;
use crate::infrastructure::clock::{ClockPort, SystemClock};
use crate::infrastructure::messaging::{
    ActiveConnection, CommandEncoder, ConnectionError, ConnectionEvents, ConnectionHandle,
};
use crate::infrastructure::websocket::{BackoffState, Connector};
use crate::state::StateReader;

/// A running game client.
///
/// Renderers read snapshots through `state()` and issue intents through
/// `commands()`; neither can mutate state directly.
pub struct GameClient {
    identity: String,
    state: StateReader,
    commands: CommandEncoder,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl GameClient {
    /// Open the first connection epoch and start the session task.
    pub async fn connect(config: ClientConfig) -> Result<Self, ConnectionError> {
        Self::connect_with_clock(config, Arc::new(SystemClock::new())).await
    }

    pub async fn connect_with_clock(
        config: ClientConfig,
        clock: Arc<dyn ClockPort>,
    ) -> Result<Self, ConnectionError> {
        let connector = Connector::new(config.player_id.clone())
            .with_connect_timeout(config.connect_timeout)
            .with_channel_capacity(config.channel_capacity);
        let dispatcher = MessageDispatcher::new(config.player_id.clone(), Arc::clone(&clock));
        let state = dispatcher.reader();

        dispatcher.connecting();
        let (handle, events) = match connector.open(&config.endpoint).await {
            Ok(opened) => opened,
            Err(e) => {
                dispatcher.connect_failed(&e.to_string());
                return Err(e);
            }
        };

        let (current, current_rx) = watch::channel(Some(handle));
        let commands = CommandEncoder::new(
            config.player_id.clone(),
            Arc::new(ActiveConnection::new(current_rx)),
            clock,
        );
        let shutdown = CancellationToken::new();

        let session = Session {
            connector,
            endpoint: config.endpoint,
            dispatcher,
            current,
            shutdown: shutdown.clone(),
            reconnect: config.reconnect,
        };
        let task = tokio::spawn(session.run(events));

        Ok(Self {
            identity: config.player_id,
            state,
            commands,
            shutdown,
            task: Some(task),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> StateReader {
        self.state.clone()
    }

    pub fn commands(&self) -> CommandEncoder {
        self.commands.clone()
    }

    /// Close the active connection and wait for the session task to finish.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Session task failed");
            }
        }
    }

    /// Whether the session task has stopped (shutdown, or the connection
    /// ended with reconnect disabled or exhausted).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum EpochEnd {
    Closed,
    Shutdown,
}

struct Session {
    connector: Connector,
    endpoint: String,
    dispatcher: MessageDispatcher,
    current: watch::Sender<Option<ConnectionHandle>>,
    shutdown: CancellationToken,
    reconnect: bool,
}

impl Session {
    async fn run(self, mut events: ConnectionEvents) {
        let mut backoff = BackoffState::default();

        loop {
            let end = self.pump(&mut events).await;
            // The epoch is over either way; commands must not reach its handle.
            self.current.send_replace(None);

            if matches!(end, EpochEnd::Shutdown) || !self.reconnect {
                break;
            }

            match self.reconnect_with_backoff(&mut backoff).await {
                Some((handle, next)) => {
                    self.current.send_replace(Some(handle));
                    events = next;
                }
                None => break,
            }
        }

        tracing::info!("Session ended");
    }

    /// Feed one epoch's events to the dispatcher until it closes.
    async fn pump(&self, events: &mut ConnectionEvents) -> EpochEnd {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatcher.handle_event(event);
                    }
                    None => return EpochEnd::Closed,
                },
            }
        }

        let handle = self.current.borrow().clone();
        if let Some(handle) = handle {
            handle.close();
        }
        // Apply whatever was already delivered, up to and including `Closed`.
        while let Some(event) = events.recv().await {
            self.dispatcher.handle_event(event);
        }
        EpochEnd::Shutdown
    }

    async fn reconnect_with_backoff(
        &self,
        backoff: &mut BackoffState,
    ) -> Option<(ConnectionHandle, ConnectionEvents)> {
        loop {
            let Some(delay_ms) = backoff.next_delay_and_advance() else {
                tracing::error!(
                    attempts = backoff.attempts(),
                    "Giving up reconnecting to game server"
                );
                return None;
            };

            tracing::info!(
                attempt = backoff.attempts(),
                max_attempts = backoff.max_attempts(),
                delay_ms,
                "Reconnecting to game server"
            );
            tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            }

            self.dispatcher.connecting();
            let opened = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                opened = self.connector.open(&self.endpoint) => opened,
            };
            match opened {
                Ok(opened) => {
                    backoff.reset();
                    return Some(opened);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reconnect attempt failed");
                    self.dispatcher.connect_failed(&e.to_string());
                }
            }
        }
    }
}
