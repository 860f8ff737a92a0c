// Public API
pub use directory::{ConnectionDirectory, ConnectionHandle, InMemoryConnectionDirectory};
pub use fanout::{ConnectionFanout, Fanout};
pub use handler::{websocket_handler, MessageRouter};
pub use messages::{MessageType, WireMessage};
pub use socket::InboundHandler;

// Internal modules
pub mod directory;
pub mod fanout;
mod handler;
pub mod messages;
mod socket;
