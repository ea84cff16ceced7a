//! Real-time client for a Blood on the Clocktower style game server.
//!
//! The server is authoritative. This crate keeps one persistent WebSocket
//! connection, reduces every inbound message into a `ClientState` snapshot and
//! turns local intents into outbound commands.
//!
//! - `infrastructure`: WebSocket transport, frame codec, command encoding, clock
//! - `state`: the snapshot type, its single-writer store and debug traces
//! - `application`: reducers, the dispatcher and the running session

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod state;

pub use application::{DispatchOutcome, GameClient, MessageDispatcher};
pub use config::ClientConfig;
pub use infrastructure::messaging::{CommandEncoder, CommandError, ConnectionError, ConnectionState};
pub use state::{ClientState, DebugLog, StateReader};
