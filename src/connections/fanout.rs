use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::directory::ConnectionDirectory;
use super::messages::WireMessage;
use crate::registry::models::Room;

/// Delivers outbound events to a whole room or to one participant.
/// Single-recipient delivery carries privileged payloads (the drawer's
/// word options, command rejections), so it must never widen.
#[async_trait]
pub trait Fanout: Send + Sync {
    async fn to_room(&self, room: &Room, message: &WireMessage);
    async fn to_participant(&self, participant_id: &str, message: &WireMessage);
}

/// Fanout over the live connection directory.
pub struct ConnectionFanout {
    directory: Arc<dyn ConnectionDirectory>,
}

impl ConnectionFanout {
    pub fn new(directory: Arc<dyn ConnectionDirectory>) -> Self {
        Self { directory }
    }

    fn encode(message: &WireMessage) -> Option<String> {
        match serde_json::to_string(message) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound message");
                None
            }
        }
    }
}

#[async_trait]
impl Fanout for ConnectionFanout {
    async fn to_room(&self, room: &Room, message: &WireMessage) {
        let json = match Self::encode(message) {
            Some(json) => json,
            None => return,
        };
        for player in &room.players {
            self.directory.send_to(&player.participant_id, &json).await;
        }
    }

    async fn to_participant(&self, participant_id: &str, message: &WireMessage) {
        if let Some(json) = Self::encode(message) {
            self.directory.send_to(participant_id, &json).await;
        }
    }
}
