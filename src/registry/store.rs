use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::models::Room;

/// A room behind its serialization lock. Every read or write of one
/// room's state goes through this mutex, giving the per-room total order
/// the state machines rely on. Different rooms run in parallel.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Owns the room map: the only structure shared across rooms.
///
/// Implementations must support concurrent insert/remove/lookup; callers
/// never hold the map lock across a room operation.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn insert(&self, room: Room) -> SharedRoom;
    async fn get(&self, room_id: &str) -> Option<SharedRoom>;
    async fn remove(&self, room_id: &str) -> bool;
    async fn list(&self) -> Vec<SharedRoom>;
}

/// In-memory registry used in production and tests alike; game state is
/// ephemeral by design.
pub struct InMemorySessionRegistry {
    rooms: RwLock<HashMap<String, SharedRoom>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn insert(&self, room: Room) -> SharedRoom {
        let room_id = room.id.clone();
        let shared = Arc::new(Mutex::new(room));
        let mut rooms = self.rooms.write().await;
        rooms.insert(room_id.clone(), Arc::clone(&shared));
        debug!(room_id = %room_id, "Room registered");
        shared
    }

    async fn get(&self, room_id: &str) -> Option<SharedRoom> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned()
    }

    async fn remove(&self, room_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let removed = rooms.remove(room_id).is_some();
        if removed {
            debug!(room_id = %room_id, "Room removed from registry");
        }
        removed
    }

    async fn list(&self) -> Vec<SharedRoom> {
        let rooms = self.rooms.read().await;
        rooms.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::GameType;
    use crate::registry::models::RoomConfig;
    use uuid::Uuid;

    fn test_room() -> Room {
        Room::new(
            GameType::DrawingGuess,
            "host".to_string(),
            "Host".to_string(),
            RoomConfig::default(),
            None,
            Uuid::new_v4(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let registry = InMemorySessionRegistry::new();
        let room = test_room();
        let room_id = room.id.clone();

        registry.insert(room).await;
        assert!(registry.get(&room_id).await.is_some());
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = InMemorySessionRegistry::new();
        let room = test_room();
        let room_id = room.id.clone();
        registry.insert(room).await;

        assert!(registry.remove(&room_id).await);
        assert!(!registry.remove(&room_id).await);
        assert!(registry.get(&room_id).await.is_none());
    }

    #[tokio::test]
    async fn test_rooms_are_independently_lockable() {
        let registry = InMemorySessionRegistry::new();
        let a = registry.insert(test_room()).await;
        let b = registry.insert(test_room()).await;

        // Holding one room's lock must not block the other room.
        let guard_a = a.lock().await;
        let guard_b = b.lock().await;
        assert_ne!(guard_a.id, guard_b.id);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_land_in_the_map() {
        let registry = Arc::new(InMemorySessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.insert(test_room()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.list().await.len(), 8);
    }
}
