//! State machine for the timed multiple-choice quiz game.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::questions::QuizRound;
use super::scoring;
use crate::shared::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Waiting,
    Answering,
    Results,
    GameOver,
}

/// One participant's submission for the current round.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    pub choice: usize,
    pub submitted_at: DateTime<Utc>,
    pub correct: bool,
}

/// Outcome of an answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded { all_answered: bool },
    /// The participant already answered this round.
    Duplicate,
}

/// Per-participant scoring line for a finished round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundScore {
    pub participant_id: String,
    pub choice: Option<usize>,
    pub correct: bool,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizState {
    pub phase: QuizPhase,
    pub round: u32,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip)]
    pub correct_answer: String,
    #[serde(skip)]
    pub answers: HashMap<String, AnswerRecord>,
    pub seconds_remaining: u32,
    #[serde(skip)]
    pub started_at: Option<DateTime<Utc>>,
}

impl QuizState {
    pub fn new() -> Self {
        Self {
            phase: QuizPhase::Waiting,
            round: 0,
            prompt: String::new(),
            options: Vec::new(),
            correct_answer: String::new(),
            answers: HashMap::new(),
            seconds_remaining: 0,
            started_at: None,
        }
    }

    /// Opens the answer window for the next round.
    pub fn begin_round(&mut self, question: QuizRound, round_seconds: u32, now: DateTime<Utc>) {
        self.round += 1;
        self.prompt = question.prompt;
        self.options = question.options;
        self.correct_answer = question.correct;
        self.answers.clear();
        self.seconds_remaining = round_seconds;
        self.started_at = Some(now);
        self.phase = QuizPhase::Answering;
    }

    /// Records a participant's answer. Correctness is decided at
    /// submission time; later option edits cannot change it.
    pub fn submit_answer(
        &mut self,
        participant_id: &str,
        choice: usize,
        now: DateTime<Utc>,
        participant_count: usize,
    ) -> Result<AnswerOutcome, CommandError> {
        if self.phase != QuizPhase::Answering {
            return Err(CommandError::WrongPhase);
        }
        if choice >= self.options.len() {
            return Err(CommandError::InvalidPayload(
                "answer choice out of range".to_string(),
            ));
        }
        if self.answers.contains_key(participant_id) {
            return Ok(AnswerOutcome::Duplicate);
        }

        let correct = self.options[choice] == self.correct_answer;
        self.answers.insert(
            participant_id.to_string(),
            AnswerRecord {
                choice,
                submitted_at: now,
                correct,
            },
        );
        Ok(AnswerOutcome::Recorded {
            all_answered: self.answers.len() >= participant_count,
        })
    }

    /// Closes the round and computes each participant's points from
    /// their recorded submission time.
    pub fn finish_round(
        &mut self,
        participant_ids: &[String],
        round_seconds: u32,
    ) -> Vec<RoundScore> {
        self.phase = QuizPhase::Results;
        let started = self.started_at;

        participant_ids
            .iter()
            .map(|participant_id| match self.answers.get(participant_id) {
                Some(record) => {
                    let elapsed = match started {
                        Some(start) => {
                            (record.submitted_at - start).num_milliseconds().max(0) as f64 / 1000.0
                        }
                        None => round_seconds as f64,
                    };
                    RoundScore {
                        participant_id: participant_id.clone(),
                        choice: Some(record.choice),
                        correct: record.correct,
                        points: scoring::quiz_points(record.correct, elapsed, round_seconds),
                    }
                }
                None => RoundScore {
                    participant_id: participant_id.clone(),
                    choice: None,
                    correct: false,
                    points: 0,
                },
            })
            .collect()
    }

    /// Whether every listed participant has answered the current round.
    pub fn all_answered(&self, participant_count: usize) -> bool {
        self.phase == QuizPhase::Answering && self.answers.len() >= participant_count
    }

    pub fn complete(&mut self) {
        self.phase = QuizPhase::GameOver;
    }
}

impl Default for QuizState {
    fn default() -> Self {
        Self::new()
    }
}
