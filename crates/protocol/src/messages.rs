//! WebSocket message types for server-client communication
//!
//! Inbound frames arrive as a loose envelope (`ServerEnvelope`) and are then
//! classified into `TaggedMessage`, validating the payload for the tag at that
//! point. Outbound commands are the `ClientMessage` enum.
//!
//! ## Versioning Policy
//!
//! - New inbound tags can be added by the server at any time; old clients classify
//!   them as `TaggedMessage::Unknown` and ignore them
//! - Renaming a tag or a payload field is a breaking change

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::types::{ChatMessage, DebugEntry, GameState, Player, PrivateInfo};

// =============================================================================
// Server Messages (Server → Client)
// =============================================================================

/// Envelope shared by every inbound frame.
///
/// `{ "type": <string>, "payload": <any>, "playerId"?: <string> }`
///
/// Only a JSON object is an envelope; arrays and scalars are rejected even
/// when their positions would line up with the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Map<String, serde_json::Value>")]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    /// Target identity for addressed messages
    #[serde(rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

#[derive(Deserialize)]
struct EnvelopeWire {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
    /// Older servers name the target `to`.
    #[serde(default, rename = "playerId", alias = "to")]
    player_id: Option<String>,
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for ServerEnvelope {
    type Error = serde_json::Error;

    fn try_from(object: serde_json::Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let wire: EnvelopeWire = serde_json::from_value(serde_json::Value::Object(object))?;
        Ok(Self {
            kind: wire.kind,
            payload: wire.payload,
            player_id: wire.player_id,
        })
    }
}

/// Inbound tags this client knows how to reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    LlmDebug,
    ChatMessage,
    GameStateUpdate,
    PrivateInfoUpdate,
    PlayerListUpdate,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::LlmDebug,
        MessageKind::ChatMessage,
        MessageKind::GameStateUpdate,
        MessageKind::PrivateInfoUpdate,
        MessageKind::PlayerListUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::LlmDebug => "LLM_DEBUG",
            MessageKind::ChatMessage => "CHAT_MESSAGE",
            MessageKind::GameStateUpdate => "GAME_STATE_UPDATE",
            MessageKind::PrivateInfoUpdate => "PRIVATE_INFO_UPDATE",
            MessageKind::PlayerListUpdate => "PLAYER_LIST_UPDATE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload did not match the schema of its tag.
#[derive(Debug, Error)]
#[error("malformed {kind} payload: {source}")]
pub struct PayloadError {
    pub kind: MessageKind,
    #[source]
    pub source: serde_json::Error,
}

/// An inbound message after tag classification and payload validation.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedMessage {
    LlmDebug(DebugPayload),
    Chat(ChatMessage),
    GameStateUpdate(GameStateUpdate),
    PrivateInfoUpdate {
        /// Identity the update is addressed to; `None` when the server omitted it
        target: Option<String>,
        info: PrivateInfo,
    },
    PlayerListUpdate(Vec<Player>),
    /// A tag from a newer server; carried only so it can be logged
    Unknown { kind: String },
}

impl TaggedMessage {
    /// Classify an envelope by its tag and validate the payload for that tag.
    pub fn classify(envelope: ServerEnvelope) -> Result<Self, PayloadError> {
        let Some(kind) = MessageKind::from_tag(&envelope.kind) else {
            return Ok(TaggedMessage::Unknown {
                kind: envelope.kind,
            });
        };

        let payload = envelope.payload;
        let parsed = match kind {
            MessageKind::LlmDebug => serde_json::from_value(payload).map(TaggedMessage::LlmDebug),
            MessageKind::ChatMessage => serde_json::from_value(payload).map(TaggedMessage::Chat),
            MessageKind::GameStateUpdate => {
                serde_json::from_value(payload).map(TaggedMessage::GameStateUpdate)
            }
            MessageKind::PrivateInfoUpdate => {
                serde_json::from_value(payload).map(|info| TaggedMessage::PrivateInfoUpdate {
                    target: envelope.player_id,
                    info,
                })
            }
            MessageKind::PlayerListUpdate => {
                serde_json::from_value(payload).map(TaggedMessage::PlayerListUpdate)
            }
        };

        parsed.map_err(|source| PayloadError { kind, source })
    }

    /// Wire tag of this message, for logging.
    pub fn tag(&self) -> &str {
        match self {
            TaggedMessage::LlmDebug(_) => MessageKind::LlmDebug.as_str(),
            TaggedMessage::Chat(_) => MessageKind::ChatMessage.as_str(),
            TaggedMessage::GameStateUpdate(_) => MessageKind::GameStateUpdate.as_str(),
            TaggedMessage::PrivateInfoUpdate { .. } => MessageKind::PrivateInfoUpdate.as_str(),
            TaggedMessage::PlayerListUpdate(_) => MessageKind::PlayerListUpdate.as_str(),
            TaggedMessage::Unknown { kind } => kind,
        }
    }
}

/// `LLM_DEBUG` payload: at most one prompt and one response fragment for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugPayload {
    pub agent: String,
    #[serde(
        default,
        deserialize_with = "debug_fragment",
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt: Option<DebugEntry>,
    #[serde(
        default,
        deserialize_with = "debug_fragment",
        skip_serializing_if = "Option::is_none"
    )]
    pub response: Option<DebugEntry>,
}

/// Debug fragments are plain strings on older servers and `{content, timestamp}` objects
/// on newer ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum DebugFragmentWire {
    Text(String),
    Entry(DebugEntry),
}

impl From<DebugFragmentWire> for DebugEntry {
    fn from(wire: DebugFragmentWire) -> Self {
        match wire {
            DebugFragmentWire::Text(content) => DebugEntry::new(content),
            DebugFragmentWire::Entry(entry) => entry,
        }
    }
}

/// Empty fragments count as absent.
fn debug_fragment<'de, D>(deserializer: D) -> Result<Option<DebugEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let wire = Option::<DebugFragmentWire>::deserialize(deserializer)?;
    Ok(wire
        .map(DebugEntry::from)
        .filter(|entry| !entry.content.is_empty()))
}

/// `GAME_STATE_UPDATE` payload: the public state and the player list, always together.
///
/// The nested form is `{gameState, players}`; the game server also flattens the
/// state fields next to `players`. A `gameState` key selects the nested form, so
/// a broken nested state is rejected rather than read as an empty flat one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    try_from = "serde_json::Map<String, serde_json::Value>"
)]
pub struct GameStateUpdate {
    pub game_state: GameState,
    pub players: Vec<Player>,
}

#[derive(Deserialize)]
struct NestedGameStateWire {
    #[serde(rename = "gameState")]
    game_state: GameState,
    players: Vec<Player>,
}

#[derive(Deserialize)]
struct FlatGameStateWire {
    #[serde(flatten)]
    game_state: GameState,
    players: Vec<Player>,
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for GameStateUpdate {
    type Error = serde_json::Error;

    fn try_from(object: serde_json::Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let update = if object.contains_key("gameState") {
            let NestedGameStateWire {
                game_state,
                players,
            } = serde_json::from_value(serde_json::Value::Object(object))?;
            Self {
                game_state,
                players,
            }
        } else {
            let FlatGameStateWire {
                game_state,
                players,
            } = serde_json::from_value(serde_json::Value::Object(object))?;
            Self {
                game_state,
                players,
            }
        };
        Ok(update)
    }
}

// =============================================================================
// Client Messages (Client → Server)
// =============================================================================

/// Messages from the client to the game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Announce the local identity; sent once per connection epoch
    JoinGame {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    /// Post a line to the public chat
    SendChat { payload: ChatMessage },
    /// Put another player up for execution
    Nominate { payload: NominatePayload },
    /// Vote on the current nominee
    CastVote { payload: CastVotePayload },
    /// Choose a target for a night ability
    NightAction { payload: NightActionPayload },
    /// Ask the storyteller to set up a new game
    RequestGameStart,
}

impl ClientMessage {
    /// Wire tag of this command, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            ClientMessage::JoinGame { .. } => "JOIN_GAME",
            ClientMessage::SendChat { .. } => "SEND_CHAT",
            ClientMessage::Nominate { .. } => "NOMINATE",
            ClientMessage::CastVote { .. } => "CAST_VOTE",
            ClientMessage::NightAction { .. } => "NIGHT_ACTION",
            ClientMessage::RequestGameStart => "REQUEST_GAME_START",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NominatePayload {
    pub nominator_id: String,
    pub nominee_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVotePayload {
    pub voter_id: String,
    pub vote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightActionPayload {
    pub player_id: String,
    pub choice: NightChoice,
}

/// Target of a night ability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightChoice {
    pub target: String,
}
