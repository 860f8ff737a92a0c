use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::games::{GameState, GameType};
use crate::shared::CommandError;

/// Fixed player ceiling per room.
pub const ROOM_CAPACITY: usize = 8;

/// Minimum players required before the host may start a game.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Room lifecycle. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

/// Round configuration chosen at room creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomConfig {
    pub total_rounds: u32,
    pub round_seconds: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            total_rounds: 3,
            round_seconds: 60,
        }
    }
}

/// A participant inside a room. The stable `participant_id` drives all
/// game logic; the connection handle only addresses message delivery and
/// is swapped in place on reconnect.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub participant_id: String,
    pub display_name: String,
    pub score: i64,
    pub turn_score: i64,
    #[serde(skip)]
    pub connection: Uuid,
}

impl Player {
    pub fn new(participant_id: String, display_name: String, connection: Uuid) -> Self {
        Self {
            participant_id,
            display_name,
            score: 0,
            turn_score: 0,
            connection,
        }
    }
}

/// One line of a sorted final or running leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub participant_id: String,
    pub display_name: String,
    pub score: i64,
}

/// Public description of a room, used for lobby listings and snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub game_type: GameType,
    pub status: RoomStatus,
    pub host_id: String,
    pub host_name: String,
    pub player_count: usize,
    pub capacity: usize,
    pub config: RoomConfig,
    pub scope: Option<String>,
}

/// One ephemeral multiplayer session.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub game_type: GameType,
    pub status: RoomStatus,
    pub host_id: String,
    pub players: Vec<Player>,
    pub config: RoomConfig,
    pub scope: Option<String>,
    pub state: GameState,
    /// Bumped on every phase transition. Timer callbacks carry the epoch
    /// they were scheduled under; a mismatch marks them stale.
    pub epoch: u64,
}

impl Room {
    /// Creates a lobby room with the host already joined.
    pub fn new(
        game_type: GameType,
        host_id: String,
        host_name: String,
        config: RoomConfig,
        scope: Option<String>,
        connection: Uuid,
    ) -> Self {
        let room_id = petname::Petnames::default().generate_one(2, "-");
        Self {
            id: room_id,
            game_type,
            status: RoomStatus::Lobby,
            host_id: host_id.clone(),
            players: vec![Player::new(host_id, host_name, connection)],
            config,
            scope,
            state: GameState::new_for(game_type),
            epoch: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= ROOM_CAPACITY
    }

    pub fn player(&self, participant_id: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.participant_id == participant_id)
    }

    pub fn player_mut(&mut self, participant_id: &str) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.participant_id == participant_id)
    }

    pub fn player_index(&self, participant_id: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.participant_id == participant_id)
    }

    /// Finds the player whose current handle matches `connection`. A
    /// reconnect-superseded handle matches nobody.
    pub fn player_by_connection(&self, connection: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.connection == connection)
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.players.iter().map(|p| p.participant_id.clone()).collect()
    }

    /// Adds a new player, or replaces the connection handle in place
    /// when the participant id is already present (reconnect). Score and
    /// turn order are untouched on reconnect.
    pub fn admit(
        &mut self,
        participant_id: String,
        display_name: String,
        connection: Uuid,
    ) -> Result<bool, CommandError> {
        if let Some(player) = self.player_mut(&participant_id) {
            player.connection = connection;
            return Ok(false);
        }
        if self.status != RoomStatus::Lobby {
            return Err(CommandError::WrongPhase);
        }
        if self.is_full() {
            return Err(CommandError::RoomFull);
        }
        self.players
            .push(Player::new(participant_id, display_name, connection));
        Ok(true)
    }

    /// Removes the player holding `connection`. Returns the removed
    /// player and its former index, or None for a stale handle.
    pub fn remove_by_connection(&mut self, connection: Uuid) -> Option<(usize, Player)> {
        let index = self.players.iter().position(|p| p.connection == connection)?;
        Some((index, self.players.remove(index)))
    }

    /// Hands the host role to the first remaining player. Returns the
    /// new host id when it changed.
    pub fn reassign_host(&mut self) -> Option<String> {
        let first = self.players.first()?;
        if first.participant_id == self.host_id {
            return None;
        }
        self.host_id = first.participant_id.clone();
        Some(self.host_id.clone())
    }

    pub fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Players sorted by cumulative score, best first.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|p| LeaderboardEntry {
                participant_id: p.participant_id.clone(),
                display_name: p.display_name.clone(),
                score: p.score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            game_type: self.game_type,
            status: self.status,
            host_id: self.host_id.clone(),
            host_name: self
                .player(&self.host_id)
                .map(|p| p.display_name.clone())
                .unwrap_or_default(),
            player_count: self.players.len(),
            capacity: ROOM_CAPACITY,
            config: self.config,
            scope: self.scope.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_room() -> Room {
        Room::new(
            GameType::QuizMatch,
            "host".to_string(),
            "Host".to_string(),
            RoomConfig::default(),
            None,
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_new_room_has_host_joined() {
        let room = test_room();
        assert_eq!(room.status, RoomStatus::Lobby);
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].participant_id, "host");
        assert!(!room.id.is_empty());
    }

    #[test]
    fn test_admit_enforces_capacity() {
        let mut room = test_room();
        for i in 0..ROOM_CAPACITY - 1 {
            room.admit(format!("p{}", i), format!("P{}", i), Uuid::new_v4())
                .unwrap();
        }
        assert!(room.is_full());
        assert!(matches!(
            room.admit("late".to_string(), "Late".to_string(), Uuid::new_v4()),
            Err(CommandError::RoomFull)
        ));
    }

    #[test]
    fn test_readmit_replaces_connection_and_keeps_score() {
        let mut room = test_room();
        let old_connection = Uuid::new_v4();
        room.admit("bob".to_string(), "Bob".to_string(), old_connection)
            .unwrap();
        room.player_mut("bob").unwrap().score = 250;

        let new_connection = Uuid::new_v4();
        let added = room
            .admit("bob".to_string(), "Bob".to_string(), new_connection)
            .unwrap();
        assert!(!added);
        assert_eq!(room.players.len(), 2);

        let bob = room.player("bob").unwrap();
        assert_eq!(bob.score, 250);
        assert_eq!(bob.connection, new_connection);
        // The superseded handle no longer addresses anyone.
        assert!(room.player_by_connection(old_connection).is_none());
    }

    #[test]
    fn test_reconnect_is_allowed_once_a_room_is_full() {
        let mut room = test_room();
        for i in 0..ROOM_CAPACITY - 1 {
            room.admit(format!("p{}", i), format!("P{}", i), Uuid::new_v4())
                .unwrap();
        }
        assert!(room.is_full());
        assert!(room
            .admit("p0".to_string(), "P0".to_string(), Uuid::new_v4())
            .is_ok());
    }

    #[test]
    fn test_remove_by_stale_connection_is_noop() {
        let mut room = test_room();
        room.admit("bob".to_string(), "Bob".to_string(), Uuid::new_v4())
            .unwrap();
        assert!(room.remove_by_connection(Uuid::new_v4()).is_none());
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn test_host_transfers_to_first_remaining_player() {
        let mut room = test_room();
        let bob_connection = Uuid::new_v4();
        room.admit("bob".to_string(), "Bob".to_string(), bob_connection)
            .unwrap();

        let host_connection = room.players[0].connection;
        room.remove_by_connection(host_connection).unwrap();
        assert_eq!(room.reassign_host(), Some("bob".to_string()));
        assert_eq!(room.host_id, "bob");
    }

    #[test]
    fn test_leaderboard_sorted_by_score() {
        let mut room = test_room();
        room.admit("bob".to_string(), "Bob".to_string(), Uuid::new_v4())
            .unwrap();
        room.player_mut("bob").unwrap().score = 500;
        room.player_mut("host").unwrap().score = 100;

        let board = room.leaderboard();
        assert_eq!(board[0].participant_id, "bob");
        assert_eq!(board[1].participant_id, "host");
    }
}
