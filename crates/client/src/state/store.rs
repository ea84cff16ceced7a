//! Single-writer state store with snapshot readers.

use tokio::sync::watch;

use crate::state::client_state::ClientState;

/// Write side of the state, owned by the message dispatcher.
///
/// Every mutation happens inside one `send_if_modified` call, so readers only
/// ever see whole snapshots.
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<ClientState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ClientState::default());
        Self { tx }
    }

    pub fn reader(&self) -> StateReader {
        StateReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Apply `reduce` atomically. Readers are notified only when it returns `true`.
    pub(crate) fn update<F>(&self, reduce: F) -> bool
    where
        F: FnOnce(&mut ClientState) -> bool,
    {
        self.tx.send_if_modified(reduce)
    }

    pub fn snapshot(&self) -> ClientState {
        self.tx.borrow().clone()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the state; cheap to clone.
#[derive(Debug, Clone)]
pub struct StateReader {
    rx: watch::Receiver<ClientState>,
}

impl StateReader {
    /// Owned copy of the latest snapshot.
    pub fn snapshot(&self) -> ClientState {
        self.rx.borrow().clone()
    }

    /// Read the latest snapshot without cloning it.
    pub fn with<R>(&self, read: impl FnOnce(&ClientState) -> R) -> R {
        read(&self.rx.borrow())
    }

    /// Wait for a snapshot newer than the last one this reader saw.
    ///
    /// Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Whether a newer snapshot exists than the last one this reader marked seen.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark the current snapshot as seen and return a copy of it.
    pub fn latest(&mut self) -> ClientState {
        self.rx.borrow_and_update().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clocktower_protocol::{ChatMessage, Player};

    #[tokio::test]
    async fn readers_are_notified_only_on_change() {
        let store = StateStore::new();
        let mut reader = store.reader();

        assert!(!store.update(|_| false));
        assert!(!reader.has_changed());

        assert!(store.update(|state| {
            state.chat.push(ChatMessage::new("Server", "hi", "t"));
            true
        }));
        assert!(reader.changed().await);
        assert_eq!(reader.latest().chat.len(), 1);
    }

    #[test]
    fn readers_see_whole_updates() {
        let store = StateStore::new();
        let reader = store.reader();

        store.update(|state| {
            state.players = vec![Player::new("p1", "Alice")];
            state.game.day_number = 2;
            true
        });

        reader.with(|state| {
            assert_eq!(state.players.len(), 1);
            assert_eq!(state.game.day_number, 2);
        });
    }

    #[tokio::test]
    async fn changed_reports_dropped_store() {
        let store = StateStore::new();
        let mut reader = store.reader();
        drop(store);
        assert!(!reader.changed().await);
    }
}
