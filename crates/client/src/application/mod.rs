//! Application layer: reducers, the message dispatcher and session wiring.

pub mod dispatcher;
pub mod reducers;
pub mod session;

pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use session::GameClient;
