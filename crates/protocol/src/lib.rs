//! Clocktower Protocol - wire types for server and client communication
//!
//! This crate contains the vocabulary exchanged over the game WebSocket:
//! - Public game state (players, phase, nominee)
//! - Chat lines and per-player private information
//! - Agent debug fragments (prompts and responses)
//! - The inbound envelope (`ServerEnvelope`) and its classified form (`TaggedMessage`)
//! - Outbound commands (`ClientMessage`)
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, and thiserror
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Validate at the edge** - optional fields are typed as `Option`, payloads are
//!    checked when a message is classified rather than when it is used

pub mod messages;
pub mod types;

// =============================================================================
// WebSocket Message Types
// =============================================================================
pub use messages::{
    CastVotePayload, ClientMessage, DebugPayload, GameStateUpdate, MessageKind,
    NightActionPayload, NightChoice, NominatePayload, PayloadError, ServerEnvelope,
    TaggedMessage,
};

// =============================================================================
// Shared State Types
// =============================================================================
pub use types::{
    ChatMessage, Clue, DebugEntry, GamePhase, GameState, Nominee, Player, PrivateInfo,
    STORYTELLER_AGENT,
};
