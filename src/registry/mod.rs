// Public API
pub use lobby::{open_rooms, LobbyDirectory, LobbyScope};
pub use models::{Player, Room, RoomConfig, RoomStatus, RoomSummary};
pub use service::GameService;
pub use store::{InMemorySessionRegistry, SessionRegistry, SharedRoom};

// Internal modules
pub mod lobby;
pub mod models;
pub mod service;
pub mod store;
