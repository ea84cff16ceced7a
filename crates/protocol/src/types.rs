//! Shared type definitions
//!
//! Public and private game state as the server asserts it. The client never
//! derives any of these values itself; it only stores what arrives.

use serde::{Deserialize, Serialize};

/// Agent identity of the storyteller in debug traces.
///
/// Every other agent identity is a player id.
pub const STORYTELLER_AGENT: &str = "storyteller";

fn default_true() -> bool {
    true
}

// =============================================================================
// Players
// =============================================================================

/// A seat at the table, as broadcast in public state.
///
/// Identity is `id`. Lists of players are always replaced wholesale, never
/// merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    /// Display name; the server falls back to the id when no name is known
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_alive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_alive: true,
            role: None,
            alignment: None,
        }
    }

    /// Name to show for this player, or the id when the server sent no name.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// =============================================================================
// Game Phase & Public State
// =============================================================================

/// Phase of the game clock.
///
/// Anything the client does not recognise (including a missing phase before
/// setup) becomes `Unknown`, which renderers must treat as non-interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum GamePhase {
    FirstNight,
    DayChat,
    Nomination,
    Voting,
    Night,
    #[default]
    Unknown,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::FirstNight => "FIRST_NIGHT",
            GamePhase::DayChat => "DAY_CHAT",
            GamePhase::Nomination => "NOMINATION",
            GamePhase::Voting => "VOTING",
            GamePhase::Night => "NIGHT",
            GamePhase::Unknown => "UNKNOWN",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "FIRST_NIGHT" => GamePhase::FirstNight,
            "DAY_CHAT" => GamePhase::DayChat,
            "NOMINATION" => GamePhase::Nomination,
            "VOTING" => GamePhase::Voting,
            "NIGHT" => GamePhase::Night,
            _ => GamePhase::Unknown,
        }
    }

    /// Whether a renderer may offer intents during this phase.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, GamePhase::Unknown)
    }

    pub fn is_night(&self) -> bool {
        matches!(self, GamePhase::FirstNight | GamePhase::Night)
    }
}

impl From<Option<String>> for GamePhase {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(GamePhase::from_wire).unwrap_or_default()
    }
}

impl From<GamePhase> for String {
    fn from(phase: GamePhase) -> Self {
        phase.as_str().to_string()
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The player currently up for execution.
///
/// Newer servers send a player snapshot, older ones only the player id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nominee {
    Player(Player),
    Id(String),
}

impl Nominee {
    pub fn id(&self) -> &str {
        match self {
            Nominee::Player(player) => &player.id,
            Nominee::Id(id) => id,
        }
    }
}

/// Public game clock state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub current_phase: GamePhase,
    #[serde(default)]
    pub day_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominee: Option<Nominee>,
    /// Why the server pushed this state (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// =============================================================================
// Chat
// =============================================================================

/// One line of the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Player id or a system label such as `Server`
    pub sender: String,
    pub text: String,
    /// ISO-8601 timestamp as produced by the sender
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn is_from(&self, identity: &str) -> bool {
        self.sender == identity
    }
}

// =============================================================================
// Private Information
// =============================================================================

/// Information learned during a night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night: Option<u32>,
    pub text: String,
}

/// Role knowledge owned by exactly one identity.
///
/// Field names follow the server's snake_case keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivateInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clues: Vec<Clue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_demon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub known_minions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub demon_bluffs: Vec<String>,
}

impl PrivateInfo {
    pub fn is_empty(&self) -> bool {
        *self == PrivateInfo::default()
    }
}

// =============================================================================
// Debug Traces
// =============================================================================

/// A single prompt or response fragment from an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEntry {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DebugEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: None,
        }
    }
}
