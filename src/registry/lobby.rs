//! Discovery view over the session registry: which rooms are open for
//! joining, grouped by game type and scope.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::models::{RoomStatus, RoomSummary};
use super::store::SessionRegistry;
use crate::games::GameType;

/// A listing key: one game type within one grouping scope, or the
/// global scope when `group` is None.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LobbyScope {
    pub game_type: GameType,
    pub group: Option<String>,
}

/// Tracks which participants asked for room listings, so lifecycle
/// changes can push fresh lists to the scopes that care.
pub struct LobbyDirectory {
    watchers: RwLock<HashMap<LobbyScope, HashSet<String>>>,
}

impl LobbyDirectory {
    pub fn new() -> Self {
        Self {
            watchers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a participant's interest in a listing scope.
    pub async fn watch(&self, scope: LobbyScope, participant_id: &str) {
        let mut watchers = self.watchers.write().await;
        watchers
            .entry(scope)
            .or_default()
            .insert(participant_id.to_string());
    }

    /// Drops a participant from every scope (disconnect).
    pub async fn forget(&self, participant_id: &str) {
        let mut watchers = self.watchers.write().await;
        for set in watchers.values_mut() {
            set.remove(participant_id);
        }
        watchers.retain(|_, set| !set.is_empty());
    }

    /// The scopes interested in a change to a room of this game type and
    /// grouping: the room's own scope plus the global one.
    pub async fn interested_scopes(
        &self,
        game_type: GameType,
        group: &Option<String>,
    ) -> Vec<(LobbyScope, Vec<String>)> {
        let mut keys = vec![LobbyScope {
            game_type,
            group: None,
        }];
        if group.is_some() {
            keys.push(LobbyScope {
                game_type,
                group: group.clone(),
            });
        }

        let watchers = self.watchers.read().await;
        keys.into_iter()
            .filter_map(|key| {
                watchers
                    .get(&key)
                    .filter(|set| !set.is_empty())
                    .map(|set| (key.clone(), set.iter().cloned().collect()))
            })
            .collect()
    }
}

impl Default for LobbyDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Rooms still in lobby status for the given game type, filtered to the
/// requested scope or spanning all scopes for the global view.
pub async fn open_rooms(
    registry: &dyn SessionRegistry,
    game_type: GameType,
    group: &Option<String>,
) -> Vec<RoomSummary> {
    let mut listings = Vec::new();
    for shared in registry.list().await {
        let room = shared.lock().await;
        if room.status != RoomStatus::Lobby || room.game_type != game_type {
            continue;
        }
        if let Some(group) = group {
            if room.scope.as_deref() != Some(group.as_str()) {
                continue;
            }
        }
        listings.push(room.summary());
    }
    listings.sort_by(|a, b| a.id.cmp(&b.id));
    listings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::models::{Room, RoomConfig};
    use crate::registry::store::InMemorySessionRegistry;
    use uuid::Uuid;

    fn room(game_type: GameType, scope: Option<&str>) -> Room {
        Room::new(
            game_type,
            "host".to_string(),
            "Host".to_string(),
            RoomConfig::default(),
            scope.map(|s| s.to_string()),
            Uuid::new_v4(),
        )
    }

    #[tokio::test]
    async fn test_open_rooms_filters_by_game_type_and_scope() {
        let registry = InMemorySessionRegistry::new();
        registry.insert(room(GameType::QuizMatch, Some("club-a"))).await;
        registry.insert(room(GameType::QuizMatch, Some("club-b"))).await;
        registry.insert(room(GameType::DrawingGuess, Some("club-a"))).await;

        let scoped = open_rooms(
            &registry,
            GameType::QuizMatch,
            &Some("club-a".to_string()),
        )
        .await;
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].scope.as_deref(), Some("club-a"));

        let global = open_rooms(&registry, GameType::QuizMatch, &None).await;
        assert_eq!(global.len(), 2);
    }

    #[tokio::test]
    async fn test_started_rooms_drop_out_of_listings() {
        let registry = InMemorySessionRegistry::new();
        let shared = registry.insert(room(GameType::QuizMatch, None)).await;
        assert_eq!(open_rooms(&registry, GameType::QuizMatch, &None).await.len(), 1);

        shared.lock().await.status = RoomStatus::Playing;
        assert!(open_rooms(&registry, GameType::QuizMatch, &None).await.is_empty());
    }

    #[tokio::test]
    async fn test_watchers_grouped_by_scope() {
        let lobby = LobbyDirectory::new();
        lobby
            .watch(
                LobbyScope {
                    game_type: GameType::QuizMatch,
                    group: None,
                },
                "alice",
            )
            .await;
        lobby
            .watch(
                LobbyScope {
                    game_type: GameType::QuizMatch,
                    group: Some("club-a".to_string()),
                },
                "bob",
            )
            .await;

        let interested = lobby
            .interested_scopes(GameType::QuizMatch, &Some("club-a".to_string()))
            .await;
        assert_eq!(interested.len(), 2);

        let global_only = lobby
            .interested_scopes(GameType::QuizMatch, &Some("club-b".to_string()))
            .await;
        assert_eq!(global_only.len(), 1);
        assert!(global_only[0].0.group.is_none());
    }

    #[tokio::test]
    async fn test_forget_removes_watcher_everywhere() {
        let lobby = LobbyDirectory::new();
        for group in [None, Some("club-a".to_string())] {
            lobby
                .watch(
                    LobbyScope {
                        game_type: GameType::CodeBreaker,
                        group,
                    },
                    "alice",
                )
                .await;
        }
        lobby.forget("alice").await;

        let interested = lobby
            .interested_scopes(GameType::CodeBreaker, &Some("club-a".to_string()))
            .await;
        assert!(interested.is_empty());
    }
}
