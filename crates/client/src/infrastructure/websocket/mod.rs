//! WebSocket transport for the game server connection
//!
//! - `client`: tokio-tungstenite based connector and per-epoch tasks
//! - `codec`: inbound frame decoding and outbound command encoding
//! - `core`: reconnect backoff policy

mod client;
mod codec;
mod core;
mod shared;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::Connector;
pub use codec::{decode, encode, parse_frame, DecodeError, EncodeError, FALLBACK_SENDER};
pub use self::core::BackoffState;
pub use shared::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT_SECS, MAX_RETRY_ATTEMPTS,
    PLAYER_ID_PLACEHOLDER,
};
