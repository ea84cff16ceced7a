//! Reducers: one classified server message applied to the client state.
//!
//! Each reducer is a plain function over `&mut ClientState` and reports whether
//! it changed anything. The dispatcher runs them inside a single store update.

use clocktower_protocol::{
    ChatMessage, DebugPayload, GameStateUpdate, Player, PrivateInfo, TaggedMessage,
};

use crate::state::ClientState;

/// Apply `message` for the local `identity`. Returns `true` if state changed.
pub fn apply(state: &mut ClientState, message: TaggedMessage, identity: &str) -> bool {
    match message {
        TaggedMessage::Chat(chat) => append_chat(state, chat),
        TaggedMessage::GameStateUpdate(update) => replace_game_state(state, update),
        TaggedMessage::PlayerListUpdate(players) => replace_players(state, players),
        TaggedMessage::PrivateInfoUpdate { target, info } => {
            replace_private_info(state, target.as_deref(), info, identity)
        }
        TaggedMessage::LlmDebug(payload) => record_debug(state, payload),
        TaggedMessage::Unknown { kind } => {
            tracing::debug!(kind = %kind, "Ignoring unknown message type");
            false
        }
    }
}

fn append_chat(state: &mut ClientState, chat: ChatMessage) -> bool {
    state.chat.push(chat);
    true
}

/// Phase and seats are swapped together so no snapshot pairs a new phase
/// with an old player list.
fn replace_game_state(state: &mut ClientState, update: GameStateUpdate) -> bool {
    let GameStateUpdate {
        game_state,
        players,
    } = update;
    if state.game.current_phase != game_state.current_phase {
        tracing::info!(
            from = %state.game.current_phase,
            to = %game_state.current_phase,
            day = game_state.day_number,
            "Phase changed"
        );
    }
    state.game = game_state;
    state.players = players;
    true
}

fn replace_players(state: &mut ClientState, players: Vec<Player>) -> bool {
    state.players = players;
    true
}

fn replace_private_info(
    state: &mut ClientState,
    target: Option<&str>,
    info: PrivateInfo,
    identity: &str,
) -> bool {
    if target != Some(identity) {
        // Addressed to someone else (or to nobody): never stored, never reported.
        return false;
    }
    state.private_info = Some(info);
    true
}

fn record_debug(state: &mut ClientState, payload: DebugPayload) -> bool {
    let DebugPayload {
        agent,
        prompt,
        response,
    } = payload;
    state.debug.record(&agent, prompt, response)
}
