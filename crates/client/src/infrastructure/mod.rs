pub mod clock;
pub mod messaging;
pub mod websocket;

// Re-export messaging types
pub use messaging::{CommandEncoder, ConnectionHandle, ConnectionState};
