//! Canonical client-visible state.

use clocktower_protocol::{ChatMessage, GameState, Nominee, Player, PrivateInfo};

use crate::infrastructure::messaging::ConnectionState;
use crate::state::debug_log::DebugLog;

/// Everything a renderer may show, as last asserted by the server.
///
/// Values are replaced by reducers only; the read helpers below never infer
/// game rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    pub connection: ConnectionState,
    /// Connection epoch the rest of the snapshot belongs to (0 before the first open)
    pub epoch: u64,
    /// Text of the most recent transport error in this epoch
    pub last_error: Option<String>,
    pub game: GameState,
    pub players: Vec<Player>,
    pub chat: Vec<ChatMessage>,
    /// Role knowledge for the local identity only
    pub private_info: Option<PrivateInfo>,
    pub debug: DebugLog,
}

impl ClientState {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Open
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn local_player(&self, identity: &str) -> Option<&Player> {
        self.player(identity)
    }

    /// Whether the local identity is seated and alive.
    pub fn is_local_player_alive(&self, identity: &str) -> bool {
        self.local_player(identity).is_some_and(|p| p.is_alive)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive)
    }

    /// The current nominee as the server asserted it.
    ///
    /// A snapshot is returned as sent; a bare id is looked up in the player list.
    pub fn nominee(&self) -> Option<&Player> {
        match self.game.nominee.as_ref()? {
            Nominee::Player(snapshot) => Some(snapshot),
            Nominee::Id(id) => self.player(id),
        }
    }

    /// Drop all server-asserted data, keeping connection bookkeeping.
    pub(crate) fn clear_game_data(&mut self) {
        *self = ClientState {
            connection: self.connection,
            epoch: self.epoch,
            last_error: self.last_error.take(),
            ..ClientState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clocktower_protocol::GamePhase;

    fn seated() -> Vec<Player> {
        let mut dead = Player::new("p2", "Bob");
        dead.is_alive = false;
        vec![Player::new("p1", "Alice"), dead, Player::new("p3", "Cara")]
    }

    #[test]
    fn local_player_liveness() {
        let state = ClientState {
            players: seated(),
            ..ClientState::default()
        };
        assert!(state.is_local_player_alive("p1"));
        assert!(!state.is_local_player_alive("p2"));
        assert!(!state.is_local_player_alive("HumanPlayer1"));
        assert_eq!(
            state.alive_players().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["p1", "p3"]
        );
    }

    #[test]
    fn nominee_id_resolves_against_current_players() {
        let mut state = ClientState {
            players: seated(),
            ..ClientState::default()
        };
        state.game.nominee = Some(Nominee::Id("p3".to_string()));
        assert_eq!(state.nominee().map(|p| p.name.as_str()), Some("Cara"));

        state.game.nominee = Some(Nominee::Id("p9".to_string()));
        assert!(state.nominee().is_none());
    }

    #[test]
    fn nominee_snapshot_is_returned_as_sent() {
        let mut state = ClientState {
            players: seated(),
            ..ClientState::default()
        };
        // The seated p3 is alive; the snapshot taken at nomination says otherwise.
        let mut snapshot = Player::new("p3", "Cara at nomination");
        snapshot.is_alive = false;
        state.game.nominee = Some(Nominee::Player(snapshot.clone()));
        assert_eq!(state.nominee(), Some(&snapshot));

        // Snapshot of a player no longer listed is still shown.
        state.game.nominee = Some(Nominee::Player(Player::new("p9", "Zed")));
        assert_eq!(state.nominee().map(|p| p.name.as_str()), Some("Zed"));
    }

    #[test]
    fn clearing_keeps_connection_bookkeeping() {
        let mut state = ClientState {
            connection: ConnectionState::Open,
            epoch: 3,
            players: seated(),
            chat: vec![ChatMessage::new("Server", "hello", "t")],
            private_info: Some(PrivateInfo::default()),
            ..ClientState::default()
        };
        state.game.current_phase = GamePhase::Night;

        state.clear_game_data();

        assert_eq!(state.connection, ConnectionState::Open);
        assert_eq!(state.epoch, 3);
        assert!(state.players.is_empty());
        assert!(state.chat.is_empty());
        assert!(state.private_info.is_none());
        assert_eq!(state.game.current_phase, GamePhase::Unknown);
    }
}
