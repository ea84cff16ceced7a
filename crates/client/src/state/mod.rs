//! Client-visible state: snapshot type, store and debug trace aggregation.

pub mod client_state;
pub mod debug_log;
pub mod store;

pub use client_state::ClientState;
pub use debug_log::{DebugLog, DebugLogBucket, Thought, ThoughtKind};
pub use store::{StateReader, StateStore};
