// Public API
pub use clues::{compare_codes, Clue};
pub use codebreaker::{CodeAlphabet, CodeBreakerState, CodePhase, Difficulty};
pub use drawing::{DrawingPhase, DrawingState};
pub use questions::{BuiltinQuestionBank, QuestionSource, QuizRound};
pub use quiz::{QuizPhase, QuizState};

pub mod clues;
pub mod codebreaker;
pub mod drawing;
pub mod questions;
pub mod quiz;
pub mod scoring;
pub mod words;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The game variant a room runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameType {
    DrawingGuess,
    CodeBreaker,
    QuizMatch,
}

/// How the machine wants the room to proceed after a turn closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAdvance {
    NextTurn,
    NextRound,
    GameOver,
}

/// Per-room game state: a closed union with one variant per game type,
/// so handling is exhaustive at compile time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameState {
    DrawingGuess(DrawingState),
    CodeBreaker(CodeBreakerState),
    QuizMatch(QuizState),
}

impl GameState {
    pub fn new_for(game_type: GameType) -> Self {
        match game_type {
            GameType::DrawingGuess => GameState::DrawingGuess(DrawingState::new()),
            GameType::CodeBreaker => GameState::CodeBreaker(CodeBreakerState::new()),
            GameType::QuizMatch => GameState::QuizMatch(QuizState::new()),
        }
    }

    /// Forces the machine into its terminal phase, e.g. when a game is
    /// cut short because too few players remain.
    pub fn complete(&mut self) {
        match self {
            GameState::DrawingGuess(state) => state.phase = DrawingPhase::GameOver,
            GameState::CodeBreaker(state) => state.phase = CodePhase::GameOver,
            GameState::QuizMatch(state) => state.phase = QuizPhase::GameOver,
        }
    }

    /// Whether the machine has reached its terminal phase.
    pub fn is_over(&self) -> bool {
        match self {
            GameState::DrawingGuess(state) => state.phase == DrawingPhase::GameOver,
            GameState::CodeBreaker(state) => state.phase == CodePhase::GameOver,
            GameState::QuizMatch(state) => state.phase == QuizPhase::GameOver,
        }
    }
}
