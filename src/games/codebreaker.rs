//! State machine for the secret-code deduction game.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::clues::{compare_codes, Clue};
use super::{scoring, TurnAdvance};
use crate::shared::CommandError;

/// Symbols available per alphabet. Guess values are indexes into the
/// chosen alphabet.
pub const ALPHABET_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CodeAlphabet {
    Numbers,
    Colors,
    Symbols,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn code_length(self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Medium => 5,
            Difficulty::Hard => 6,
        }
    }

    pub fn max_attempts(self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 8,
            Difficulty::Hard => 6,
        }
    }

    pub fn time_limit_seconds(self) -> u32 {
        match self {
            Difficulty::Easy => 120,
            Difficulty::Medium => 90,
            Difficulty::Hard => 60,
        }
    }

    pub fn bonus(self) -> i64 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 500,
            Difficulty::Hard => 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePhase {
    Picking,
    Guessing,
    TurnEnd,
    GameOver,
}

/// One logged guess and its clue. The history is public.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub guesser: String,
    pub guess: Vec<u8>,
    pub clue: Clue,
}

/// Outcome of a guess against the current secret.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeGuessOutcome {
    Solved { clue: Clue, points: i64 },
    /// Attempts remain; keep guessing.
    Progress { clue: Clue, attempts_remaining: u32 },
    /// That was the last attempt and it missed.
    Exhausted { clue: Clue },
}

/// Effect of a player departure on the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureImpact {
    None,
    /// The code-maker left; the turn cannot continue.
    RoleAbandoned,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeBreakerState {
    pub phase: CodePhase,
    pub round: u32,
    pub turn_index: usize,
    pub code_maker_id: String,
    pub alphabet: Option<CodeAlphabet>,
    pub difficulty: Option<Difficulty>,
    #[serde(skip)]
    pub secret: Vec<u8>,
    pub attempts: Vec<Attempt>,
    pub attempts_remaining: u32,
    pub seconds_remaining: u32,
    pub solver_id: Option<String>,
}

impl CodeBreakerState {
    pub fn new() -> Self {
        Self {
            phase: CodePhase::Picking,
            round: 1,
            turn_index: 0,
            code_maker_id: String::new(),
            alphabet: None,
            difficulty: None,
            secret: Vec::new(),
            attempts: Vec::new(),
            attempts_remaining: 0,
            seconds_remaining: 0,
            solver_id: None,
        }
    }

    /// Hands the code-maker role to the player at `turn_index`.
    pub fn begin_turn(&mut self, player_ids: &[String]) {
        self.code_maker_id = player_ids
            .get(self.turn_index)
            .cloned()
            .unwrap_or_default();
        self.alphabet = None;
        self.difficulty = None;
        self.secret.clear();
        self.attempts.clear();
        self.attempts_remaining = 0;
        self.seconds_remaining = 0;
        self.solver_id = None;
        self.phase = CodePhase::Picking;
    }

    /// The code-maker locks in the alphabet and difficulty for the turn.
    pub fn set_options(
        &mut self,
        participant_id: &str,
        alphabet: CodeAlphabet,
        difficulty: Difficulty,
    ) -> Result<(), CommandError> {
        if self.phase != CodePhase::Picking {
            return Err(CommandError::WrongPhase);
        }
        if participant_id != self.code_maker_id {
            return Err(CommandError::NotAuthorized(
                "only the code-maker picks the options",
            ));
        }
        self.alphabet = Some(alphabet);
        self.difficulty = Some(difficulty);
        Ok(())
    }

    /// The code-maker submits the secret sequence, opening the guessing
    /// window. Returns the attempt budget and time limit for the turn.
    pub fn submit_secret(
        &mut self,
        participant_id: &str,
        sequence: Vec<u8>,
    ) -> Result<(u32, u32), CommandError> {
        if self.phase != CodePhase::Picking {
            return Err(CommandError::WrongPhase);
        }
        if participant_id != self.code_maker_id {
            return Err(CommandError::NotAuthorized(
                "only the code-maker sets the secret",
            ));
        }
        let difficulty = self
            .difficulty
            .ok_or_else(|| CommandError::InvalidPayload("options not chosen yet".to_string()))?;
        Self::validate_sequence(&sequence, difficulty)?;

        self.attempts_remaining = difficulty.max_attempts();
        self.seconds_remaining = difficulty.time_limit_seconds();
        self.secret = sequence;
        self.phase = CodePhase::Guessing;
        Ok((self.attempts_remaining, self.seconds_remaining))
    }

    /// Evaluates a guess from a non-code-maker.
    pub fn guess(
        &mut self,
        participant_id: &str,
        sequence: Vec<u8>,
    ) -> Result<CodeGuessOutcome, CommandError> {
        if self.phase != CodePhase::Guessing {
            return Err(CommandError::WrongPhase);
        }
        if participant_id == self.code_maker_id {
            return Err(CommandError::NotAuthorized("the code-maker cannot guess"));
        }
        let difficulty = self
            .difficulty
            .ok_or(CommandError::WrongPhase)?;
        Self::validate_sequence(&sequence, difficulty)?;

        let clue = compare_codes(&self.secret, &sequence);
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
        self.attempts.push(Attempt {
            guesser: participant_id.to_string(),
            guess: sequence,
            clue,
        });

        if clue.exact as usize == self.secret.len() {
            self.solver_id = Some(participant_id.to_string());
            let points = scoring::code_breaker_points(
                self.attempts.len() as u32,
                self.seconds_remaining,
                difficulty.bonus(),
            );
            return Ok(CodeGuessOutcome::Solved { clue, points });
        }
        if self.attempts_remaining == 0 {
            return Ok(CodeGuessOutcome::Exhausted { clue });
        }
        Ok(CodeGuessOutcome::Progress {
            clue,
            attempts_remaining: self.attempts_remaining,
        })
    }

    /// Closes the turn and rotates the code-maker role round-robin.
    ///
    /// `advance_turn_index` is false when the code-maker just left the
    /// room: removing them already shifted the next player into place.
    pub fn end_turn(
        &mut self,
        advance_turn_index: bool,
        player_count: usize,
        total_rounds: u32,
    ) -> TurnAdvance {
        if advance_turn_index {
            self.turn_index += 1;
        }
        if self.turn_index >= player_count {
            self.turn_index = 0;
            self.round += 1;
            if self.round > total_rounds {
                self.phase = CodePhase::GameOver;
                return TurnAdvance::GameOver;
            }
            self.phase = CodePhase::TurnEnd;
            return TurnAdvance::NextRound;
        }
        self.phase = CodePhase::TurnEnd;
        TurnAdvance::NextTurn
    }

    /// Adjusts turn bookkeeping after a player leaves mid-game.
    pub fn handle_departure(&mut self, departed_id: &str, removed_index: usize) -> DepartureImpact {
        if removed_index < self.turn_index {
            self.turn_index -= 1;
        }
        let turn_active = matches!(self.phase, CodePhase::Picking | CodePhase::Guessing);
        if turn_active && departed_id == self.code_maker_id {
            return DepartureImpact::RoleAbandoned;
        }
        DepartureImpact::None
    }

    fn validate_sequence(sequence: &[u8], difficulty: Difficulty) -> Result<(), CommandError> {
        if sequence.len() != difficulty.code_length() {
            return Err(CommandError::InvalidPayload(format!(
                "sequence must be {} values long",
                difficulty.code_length()
            )));
        }
        if sequence.iter().any(|v| *v >= ALPHABET_SIZE) {
            return Err(CommandError::InvalidPayload(format!(
                "sequence values must be below {}",
                ALPHABET_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for CodeBreakerState {
    fn default() -> Self {
        Self::new()
    }
}
