//! State machine for the drawing-and-guessing game.
//!
//! The machine owns phase transitions, reveal-mask progression, and
//! per-guess scoring decisions. It never talks to connections or timers;
//! the service applies its outcomes.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use serde::Serialize;

use super::{scoring, TurnAdvance};
use crate::shared::CommandError;

/// Character shown for letters that have not been revealed yet.
const MASK_CHAR: char = '_';

/// Seconds remaining at which the whole word is shown to everyone.
const FULL_REVEAL_THRESHOLD: u32 = 10;

const DEFAULT_CANVAS_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingPhase {
    TurnStart,
    WordSelection,
    Drawing,
    TurnEnd,
    RoundEnd,
    GameOver,
}

/// A single drawn stroke. Stroke geometry is client-defined and passed
/// through untouched.
pub type Stroke = serde_json::Value;

/// Outcome of a guess submission during the drawing phase.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessOutcome {
    Correct {
        guesser_points: i64,
        drawer_points: i64,
        all_guessed: bool,
    },
    Incorrect,
    /// Duplicate correct guess from the same participant.
    Ignored,
}

/// Effect of a player departure on the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureImpact {
    None,
    /// The drawer left mid-turn; the turn cannot continue.
    RoleAbandoned,
    /// Every remaining non-drawer has now guessed the word.
    AllGuessed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawingState {
    pub phase: DrawingPhase,
    pub round: u32,
    pub turn_index: usize,
    pub drawer_id: String,
    #[serde(skip)]
    pub word_options: Vec<String>,
    #[serde(skip)]
    pub chosen_word: Option<String>,
    /// Underscore mask over the chosen word; safe to broadcast.
    pub mask: String,
    pub strokes: Vec<Stroke>,
    pub correct_guessers: HashSet<String>,
    pub seconds_remaining: u32,
    pub canvas_color: String,
}

impl DrawingState {
    pub fn new() -> Self {
        Self {
            phase: DrawingPhase::TurnStart,
            round: 1,
            turn_index: 0,
            drawer_id: String::new(),
            word_options: Vec::new(),
            chosen_word: None,
            mask: String::new(),
            strokes: Vec::new(),
            correct_guessers: HashSet::new(),
            seconds_remaining: 0,
            canvas_color: DEFAULT_CANVAS_COLOR.to_string(),
        }
    }

    /// Starts the turn for the player at `turn_index`, handing the new
    /// drawer their private word options.
    pub fn begin_turn(&mut self, player_ids: &[String], options: [String; 2]) {
        self.drawer_id = player_ids
            .get(self.turn_index)
            .cloned()
            .unwrap_or_default();
        self.word_options = options.to_vec();
        self.chosen_word = None;
        self.mask.clear();
        self.strokes.clear();
        self.correct_guessers.clear();
        self.seconds_remaining = 0;
        self.canvas_color = DEFAULT_CANVAS_COLOR.to_string();
        self.phase = DrawingPhase::WordSelection;
    }

    /// The drawer picks one of their two word options. Seeds the reveal
    /// mask and moves the turn into the drawing phase.
    pub fn select_word(
        &mut self,
        participant_id: &str,
        option_index: usize,
        round_seconds: u32,
    ) -> Result<String, CommandError> {
        if self.phase != DrawingPhase::WordSelection {
            return Err(CommandError::WrongPhase);
        }
        if participant_id != self.drawer_id {
            return Err(CommandError::NotAuthorized("only the drawer picks the word"));
        }
        let word = self
            .word_options
            .get(option_index)
            .cloned()
            .ok_or_else(|| CommandError::InvalidPayload("word option out of range".to_string()))?;

        self.mask = word.chars().map(|_| MASK_CHAR).collect();
        self.chosen_word = Some(word.clone());
        self.seconds_remaining = round_seconds;
        self.phase = DrawingPhase::Drawing;
        Ok(word)
    }

    /// Records a guess from a non-drawer. Matching is case-insensitive
    /// and ignores surrounding whitespace.
    pub fn guess(
        &mut self,
        participant_id: &str,
        text: &str,
        non_drawer_count: usize,
    ) -> Result<GuessOutcome, CommandError> {
        if self.phase != DrawingPhase::Drawing {
            return Err(CommandError::WrongPhase);
        }
        if participant_id == self.drawer_id {
            return Err(CommandError::NotAuthorized("the drawer cannot guess"));
        }
        if self.correct_guessers.contains(participant_id) {
            return Ok(GuessOutcome::Ignored);
        }

        let chosen = match &self.chosen_word {
            Some(word) => word,
            None => return Err(CommandError::WrongPhase),
        };
        if !text.trim().eq_ignore_ascii_case(chosen) {
            return Ok(GuessOutcome::Incorrect);
        }

        self.correct_guessers.insert(participant_id.to_string());
        Ok(GuessOutcome::Correct {
            guesser_points: scoring::drawing_guesser_points(self.seconds_remaining),
            drawer_points: scoring::DRAWER_POINTS_PER_GUESS,
            all_guessed: self.correct_guessers.len() >= non_drawer_count,
        })
    }

    /// Applies a timer tick: updates the clock and advances the reveal
    /// mask. Returns true when the mask changed.
    pub fn apply_tick(&mut self, remaining: u32, round_seconds: u32) -> bool {
        self.seconds_remaining = remaining;
        if self.phase != DrawingPhase::Drawing {
            return false;
        }
        let word: Vec<char> = match &self.chosen_word {
            Some(word) => word.chars().collect(),
            None => return false,
        };
        if word.is_empty() {
            return false;
        }

        let target = if remaining <= FULL_REVEAL_THRESHOLD {
            word.len()
        } else {
            // One character per round_seconds / word_len elapsed.
            let interval = round_seconds as f64 / word.len() as f64;
            let elapsed = round_seconds.saturating_sub(remaining) as f64;
            ((elapsed / interval).floor() as usize).min(word.len())
        };

        let mut mask: Vec<char> = self.mask.chars().collect();
        let mut revealed = mask.iter().filter(|c| **c != MASK_CHAR).count();
        let mut changed = false;
        while revealed < target {
            let hidden: Vec<usize> = mask
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == MASK_CHAR)
                .map(|(i, _)| i)
                .collect();
            let index = match hidden.choose(&mut rand::rng()) {
                Some(index) => *index,
                None => break,
            };
            mask[index] = word[index];
            revealed += 1;
            changed = true;
        }
        if changed {
            self.mask = mask.into_iter().collect();
        }
        changed
    }

    pub fn append_stroke(&mut self, participant_id: &str, stroke: Stroke) -> Result<(), CommandError> {
        self.require_drawing(participant_id)?;
        self.strokes.push(stroke);
        Ok(())
    }

    pub fn clear_canvas(&mut self, participant_id: &str) -> Result<(), CommandError> {
        self.require_drawing(participant_id)?;
        self.strokes.clear();
        Ok(())
    }

    pub fn set_canvas_color(
        &mut self,
        participant_id: &str,
        color: String,
    ) -> Result<(), CommandError> {
        self.require_drawing(participant_id)?;
        self.canvas_color = color;
        Ok(())
    }

    fn require_drawing(&self, participant_id: &str) -> Result<(), CommandError> {
        if self.phase != DrawingPhase::Drawing {
            return Err(CommandError::WrongPhase);
        }
        if participant_id != self.drawer_id {
            return Err(CommandError::NotAuthorized("only the drawer may draw"));
        }
        Ok(())
    }

    /// Closes the current turn and advances the turn/round bookkeeping.
    ///
    /// `advance_turn_index` is false when the drawer just left the room:
    /// removing them already shifted the next drawer into place.
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
                self.phase = DrawingPhase::GameOver;
                return TurnAdvance::GameOver;
            }
            self.phase = DrawingPhase::RoundEnd;
            return TurnAdvance::NextRound;
        }
        self.phase = DrawingPhase::TurnEnd;
        TurnAdvance::NextTurn
    }

    /// Adjusts turn bookkeeping after a player leaves mid-game.
    pub fn handle_departure(
        &mut self,
        departed_id: &str,
        removed_index: usize,
        remaining_count: usize,
    ) -> DepartureImpact {
        self.correct_guessers.remove(departed_id);
        if removed_index < self.turn_index {
            self.turn_index -= 1;
        }

        let turn_active = matches!(
            self.phase,
            DrawingPhase::WordSelection | DrawingPhase::Drawing
        );
        if !turn_active {
            return DepartureImpact::None;
        }
        if departed_id == self.drawer_id {
            return DepartureImpact::RoleAbandoned;
        }
        let non_drawers = remaining_count.saturating_sub(1);
        if self.phase == DrawingPhase::Drawing && self.correct_guessers.len() >= non_drawers {
            return DepartureImpact::AllGuessed;
        }
        DepartureImpact::None
    }
}

impl Default for DrawingState {
    fn default() -> Self {
        Self::new()
    }
}
