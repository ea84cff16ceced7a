//! Client configuration from the environment.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::infrastructure::websocket::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT_SECS};

pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/{player_id}";
pub const DEFAULT_PLAYER_ID: &str = "HumanPlayer1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint template; `{player_id}` is replaced with `player_id`
    pub endpoint: String,
    /// Local identity the server addresses private info to
    pub player_id: String,
    pub connect_timeout: Duration,
    pub channel_capacity: usize,
    /// Retry with backoff after the connection drops
    pub reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WS_URL.to_string(),
            player_id: DEFAULT_PLAYER_ID.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            reconnect: false,
        }
    }
}

impl ClientConfig {
    /// Read `CLOCKTOWER_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let player_id = var("CLOCKTOWER_PLAYER_ID").unwrap_or(defaults.player_id);
        let endpoint = var("CLOCKTOWER_WS_URL").unwrap_or(defaults.endpoint);

        let connect_timeout = match var("CLOCKTOWER_CONNECT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("CLOCKTOWER_CONNECT_TIMEOUT_SECS={raw} is not a number"))?,
            ),
            None => defaults.connect_timeout,
        };

        let channel_capacity = match var("CLOCKTOWER_CHANNEL_CAPACITY") {
            Some(raw) => {
                let capacity: usize = raw
                    .parse()
                    .with_context(|| format!("CLOCKTOWER_CHANNEL_CAPACITY={raw} is not a number"))?;
                if capacity == 0 {
                    bail!("CLOCKTOWER_CHANNEL_CAPACITY must be at least 1");
                }
                capacity
            }
            None => defaults.channel_capacity,
        };

        let reconnect = match var("CLOCKTOWER_RECONNECT") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("CLOCKTOWER_RECONNECT={raw} is not a boolean"))?,
            None => defaults.reconnect,
        };

        Ok(Self {
            endpoint,
            player_id,
            connect_timeout,
            channel_capacity,
            reconnect,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load `.env.local` then `.env` from `dir`, without overriding variables
/// already set.
pub fn load_dotenv(dir: &Path) {
    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = dir.join(filename);
        if path.exists() {
            if let Err(e) = dotenvy::from_path(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load env file");
            }
        }
    }
}
