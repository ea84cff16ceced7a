//! Shared constants for the WebSocket transport and reconnect policy.

// Reconnection constants
pub const INITIAL_RETRY_DELAY_MS: u64 = 1_000;
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default capacity of the outbound command and inbound event channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Placeholder in the endpoint template replaced by the local identity.
pub const PLAYER_ID_PLACEHOLDER: &str = "{player_id}";
