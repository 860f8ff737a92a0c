// Library crate for the mini-game server
// This file exposes the public API for integration tests

pub mod boundary;
pub mod connections;
pub mod games;
pub mod registry;
pub mod shared;
pub mod timer;

// Re-export commonly used types for easier access in tests
pub use boundary::{IdentityProvider, NotificationSink};
pub use connections::{
    ConnectionDirectory, ConnectionFanout, Fanout, InMemoryConnectionDirectory, MessageType,
    WireMessage,
};
pub use games::{GameState, GameType};
pub use registry::{GameService, InMemorySessionRegistry, Room, SessionRegistry};
pub use shared::{AppError, AppState, CommandError};
pub use timer::TimerEngine;
