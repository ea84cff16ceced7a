//! Connection handles and outbound command plumbing.
//!
//! - `connection`: lifecycle state, the owned `ConnectionHandle`, transport events
//! - `command_bus`: `CommandEncoder` and the `CommandSink` seam it writes to

pub mod command_bus;
pub mod connection;

pub use command_bus::{ActiveConnection, CommandEncoder, CommandSink};
pub use connection::{
    CloseInitiator, CommandError, ConnectionError, ConnectionEvent, ConnectionEvents,
    ConnectionHandle, ConnectionState, LifecycleEvent, NotConnectedError,
};
