use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::games::clues::Clue;
use crate::games::codebreaker::{Attempt, CodeAlphabet, Difficulty};
use crate::games::drawing::Stroke;
use crate::games::quiz::RoundScore;
use crate::games::{GameState, GameType};
use crate::registry::models::{LeaderboardEntry, Player, Room, RoomSummary};

/// Message types for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Client -> Server
    CreateRoom,
    JoinRoom,
    StartGame,
    LeaveRoom,
    ListOpenRooms,
    SelectWord,
    SubmitStroke,
    ClearCanvas,
    ChangeCanvasColor,
    SyncStrokes,
    SubmitGuess,
    SetCodeOptions,
    SubmitSecret,
    SubmitAnswer,

    // Server -> Client
    RoomSnapshot,
    RoomList,
    PlayerJoined,
    PlayerLeft,
    HostChange,
    GameStarted,
    TurnStart,
    WordOptions,
    DrawingStarted,
    RevealUpdate,
    Stroke,
    CanvasCleared,
    CanvasColor,
    StrokeSync,
    CorrectGuess,
    CodeOptionsSet,
    SecretSet,
    GuessResult,
    TurnEnd,
    Question,
    AnswerAck,
    RoundResults,
    Tick,
    GameOver,
    Error,
}

/// Metadata attached to outbound messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessageMeta {
    pub timestamp: DateTime<Utc>,
}

/// Envelope for every message in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub meta: Option<WireMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomPayload {
    pub game_type: GameType,
    pub total_rounds: Option<u32>,
    pub round_seconds: Option<u32>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOpenRoomsPayload {
    pub game_type: GameType,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectWordPayload {
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitStrokePayload {
    pub stroke: Stroke,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeCanvasColorPayload {
    pub color: String,
}

/// Guess payload shared by the drawing and code-breaker games; the room's
/// game type decides which field applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitGuessPayload {
    pub word: Option<String>,
    pub sequence: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCodeOptionsPayload {
    pub alphabet: CodeAlphabet,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSecretPayload {
    pub sequence: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerPayload {
    pub choice: usize,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshotPayload {
    pub room: RoomSummary,
    pub players: Vec<Player>,
    pub state: GameState,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomListPayload {
    pub game_type: GameType,
    pub scope: Option<String>,
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerJoinedPayload {
    pub participant_id: String,
    pub display_name: String,
    pub player_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerLeftPayload {
    pub participant_id: String,
    pub player_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostChangePayload {
    pub host_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStartedPayload {
    pub game_type: GameType,
    pub turn_order: Vec<String>,
    pub total_rounds: u32,
    pub round_seconds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnStartPayload {
    pub round: u32,
    pub turn_index: usize,
    /// Drawer or code-maker, depending on the game.
    pub role_holder: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WordOptionsPayload {
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawingStartedPayload {
    pub mask: String,
    pub seconds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevealUpdatePayload {
    pub mask: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrokePayload {
    pub by: String,
    pub stroke: Stroke,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanvasColorPayload {
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrokeSyncPayload {
    pub strokes: Vec<Stroke>,
    pub canvas_color: String,
    pub mask: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectGuessPayload {
    pub guesser: String,
    pub points: i64,
    pub drawer_points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeOptionsSetPayload {
    pub alphabet: CodeAlphabet,
    pub difficulty: Difficulty,
    pub code_length: usize,
    pub max_attempts: u32,
    pub time_limit_seconds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecretSetPayload {
    pub attempts_remaining: u32,
    pub seconds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuessResultPayload {
    pub guesser: String,
    pub guess: Vec<u8>,
    pub clue: Clue,
    pub attempts_remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawingTurnEndPayload {
    pub word: String,
    pub correct_guessers: Vec<String>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeTurnEndPayload {
    pub secret: Vec<u8>,
    pub solver: Option<String>,
    pub solver_points: i64,
    pub attempts: Vec<Attempt>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionPayload {
    pub round: u32,
    pub prompt: String,
    pub options: Vec<String>,
    pub seconds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerAckPayload {
    pub choice: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundResultsPayload {
    pub round: u32,
    pub correct_answer: String,
    pub results: Vec<RoundScore>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickPayload {
    pub seconds_remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOverPayload {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Helper functions for creating messages
impl WireMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WireMessageMeta {
                timestamp: Utc::now(),
            }),
        }
    }

    fn with_payload<P: Serialize>(message_type: MessageType, payload: P) -> Self {
        Self::new(
            message_type,
            serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        )
    }

    /// Create a ROOM_SNAPSHOT message
    pub fn room_snapshot(room: &Room) -> Self {
        Self::with_payload(
            MessageType::RoomSnapshot,
            RoomSnapshotPayload {
                room: room.summary(),
                players: room.players.clone(),
                state: room.state.clone(),
            },
        )
    }

    /// Create a ROOM_LIST message
    pub fn room_list(game_type: GameType, scope: Option<String>, rooms: Vec<RoomSummary>) -> Self {
        Self::with_payload(
            MessageType::RoomList,
            RoomListPayload {
                game_type,
                scope,
                rooms,
            },
        )
    }

    /// Create a PLAYER_JOINED message
    pub fn player_joined(player: &Player, player_count: usize) -> Self {
        Self::with_payload(
            MessageType::PlayerJoined,
            PlayerJoinedPayload {
                participant_id: player.participant_id.clone(),
                display_name: player.display_name.clone(),
                player_count,
            },
        )
    }

    /// Create a PLAYER_LEFT message
    pub fn player_left(participant_id: String, player_count: usize) -> Self {
        Self::with_payload(
            MessageType::PlayerLeft,
            PlayerLeftPayload {
                participant_id,
                player_count,
            },
        )
    }

    /// Create a HOST_CHANGE message
    pub fn host_change(host_id: String) -> Self {
        Self::with_payload(MessageType::HostChange, HostChangePayload { host_id })
    }

    /// Create a GAME_STARTED message
    pub fn game_started(room: &Room) -> Self {
        Self::with_payload(
            MessageType::GameStarted,
            GameStartedPayload {
                game_type: room.game_type,
                turn_order: room.participant_ids(),
                total_rounds: room.config.total_rounds,
                round_seconds: room.config.round_seconds,
            },
        )
    }

    /// Create a TURN_START message
    pub fn turn_start(round: u32, turn_index: usize, role_holder: String) -> Self {
        Self::with_payload(
            MessageType::TurnStart,
            TurnStartPayload {
                round,
                turn_index,
                role_holder,
            },
        )
    }

    /// Create a WORD_OPTIONS message (drawer only)
    pub fn word_options(options: Vec<String>) -> Self {
        Self::with_payload(MessageType::WordOptions, WordOptionsPayload { options })
    }

    /// Create a DRAWING_STARTED message
    pub fn drawing_started(mask: String, seconds: u32) -> Self {
        Self::with_payload(
            MessageType::DrawingStarted,
            DrawingStartedPayload { mask, seconds },
        )
    }

    /// Create a REVEAL_UPDATE message
    pub fn reveal_update(mask: String) -> Self {
        Self::with_payload(MessageType::RevealUpdate, RevealUpdatePayload { mask })
    }

    /// Create a STROKE message
    pub fn stroke(by: String, stroke: Stroke) -> Self {
        Self::with_payload(MessageType::Stroke, StrokePayload { by, stroke })
    }

    /// Create a CANVAS_CLEARED message
    pub fn canvas_cleared() -> Self {
        Self::new(MessageType::CanvasCleared, serde_json::Value::Null)
    }

    /// Create a CANVAS_COLOR message
    pub fn canvas_color(color: String) -> Self {
        Self::with_payload(MessageType::CanvasColor, CanvasColorPayload { color })
    }

    /// Create a STROKE_SYNC message (single recipient)
    pub fn stroke_sync(strokes: Vec<Stroke>, canvas_color: String, mask: String) -> Self {
        Self::with_payload(
            MessageType::StrokeSync,
            StrokeSyncPayload {
                strokes,
                canvas_color,
                mask,
            },
        )
    }

    /// Create a CORRECT_GUESS message
    pub fn correct_guess(guesser: String, points: i64, drawer_points: i64) -> Self {
        Self::with_payload(
            MessageType::CorrectGuess,
            CorrectGuessPayload {
                guesser,
                points,
                drawer_points,
            },
        )
    }

    /// Create a CODE_OPTIONS_SET message
    pub fn code_options_set(alphabet: CodeAlphabet, difficulty: Difficulty) -> Self {
        Self::with_payload(
            MessageType::CodeOptionsSet,
            CodeOptionsSetPayload {
                alphabet,
                difficulty,
                code_length: difficulty.code_length(),
                max_attempts: difficulty.max_attempts(),
                time_limit_seconds: difficulty.time_limit_seconds(),
            },
        )
    }

    /// Create a SECRET_SET message (never carries the secret itself)
    pub fn secret_set(attempts_remaining: u32, seconds: u32) -> Self {
        Self::with_payload(
            MessageType::SecretSet,
            SecretSetPayload {
                attempts_remaining,
                seconds,
            },
        )
    }

    /// Create a GUESS_RESULT message
    pub fn guess_result(
        guesser: String,
        guess: Vec<u8>,
        clue: Clue,
        attempts_remaining: u32,
    ) -> Self {
        Self::with_payload(
            MessageType::GuessResult,
            GuessResultPayload {
                guesser,
                guess,
                clue,
                attempts_remaining,
            },
        )
    }

    /// Create a TURN_END message for the drawing game
    pub fn drawing_turn_end(
        word: String,
        correct_guessers: Vec<String>,
        leaderboard: Vec<LeaderboardEntry>,
    ) -> Self {
        Self::with_payload(
            MessageType::TurnEnd,
            DrawingTurnEndPayload {
                word,
                correct_guessers,
                leaderboard,
            },
        )
    }

    /// Create a TURN_END message for the code-breaker game
    pub fn code_turn_end(
        secret: Vec<u8>,
        solver: Option<String>,
        solver_points: i64,
        attempts: Vec<Attempt>,
        leaderboard: Vec<LeaderboardEntry>,
    ) -> Self {
        Self::with_payload(
            MessageType::TurnEnd,
            CodeTurnEndPayload {
                secret,
                solver,
                solver_points,
                attempts,
                leaderboard,
            },
        )
    }

    /// Create a QUESTION message
    pub fn question(round: u32, prompt: String, options: Vec<String>, seconds: u32) -> Self {
        Self::with_payload(
            MessageType::Question,
            QuestionPayload {
                round,
                prompt,
                options,
                seconds,
            },
        )
    }

    /// Create an ANSWER_ACK message (single recipient)
    pub fn answer_ack(choice: usize) -> Self {
        Self::with_payload(MessageType::AnswerAck, AnswerAckPayload { choice })
    }

    /// Create a ROUND_RESULTS message
    pub fn round_results(
        round: u32,
        correct_answer: String,
        results: Vec<RoundScore>,
        leaderboard: Vec<LeaderboardEntry>,
    ) -> Self {
        Self::with_payload(
            MessageType::RoundResults,
            RoundResultsPayload {
                round,
                correct_answer,
                results,
                leaderboard,
            },
        )
    }

    /// Create a TICK message
    pub fn tick(seconds_remaining: u32) -> Self {
        Self::with_payload(MessageType::Tick, TickPayload { seconds_remaining })
    }

    /// Create a GAME_OVER message
    pub fn game_over(leaderboard: Vec<LeaderboardEntry>) -> Self {
        Self::with_payload(MessageType::GameOver, GameOverPayload { leaderboard })
    }

    /// Create an ERROR message
    pub fn error(message: String) -> Self {
        Self::with_payload(MessageType::Error, ErrorPayload { message })
    }
}
