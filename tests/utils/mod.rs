use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use gamenight::boundary::LoggingNotificationSink;
use gamenight::connections::{Fanout, MessageType, WireMessage};
use gamenight::games::questions::{QuestionSource, QuizRound};
use gamenight::registry::models::Room;
use gamenight::registry::{GameService, InMemorySessionRegistry};
use gamenight::timer::TimerEngine;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Fanout that records every delivered message per participant instead
/// of pushing it down a socket.
pub struct RecordingFanout {
    messages: RwLock<HashMap<String, Vec<WireMessage>>>,
}

impl RecordingFanout {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
        }
    }

    async fn record(&self, participant_id: &str, message: &WireMessage) {
        self.messages
            .write()
            .await
            .entry(participant_id.to_string())
            .or_default()
            .push(message.clone());
    }

    pub async fn messages_for(&self, participant_id: &str) -> Vec<WireMessage> {
        self.messages
            .read()
            .await
            .get(participant_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Payloads of every message of one type delivered to a participant.
    pub async fn payloads_of(
        &self,
        participant_id: &str,
        message_type: MessageType,
    ) -> Vec<serde_json::Value> {
        self.messages_for(participant_id)
            .await
            .into_iter()
            .filter(|m| m.message_type == message_type)
            .map(|m| m.payload)
            .collect()
    }

    pub async fn received(&self, participant_id: &str, message_type: MessageType) -> bool {
        !self.payloads_of(participant_id, message_type).await.is_empty()
    }
}

#[async_trait]
impl Fanout for RecordingFanout {
    async fn to_room(&self, room: &Room, message: &WireMessage) {
        for player in &room.players {
            self.record(&player.participant_id, message).await;
        }
    }

    async fn to_participant(&self, participant_id: &str, message: &WireMessage) {
        self.record(participant_id, message).await;
    }
}

/// Question source that always deals the same round, so tests know the
/// correct option index up front.
pub struct FixedQuestionSource {
    round: QuizRound,
}

impl FixedQuestionSource {
    pub fn new(round: QuizRound) -> Self {
        Self { round }
    }
}

impl QuestionSource for FixedQuestionSource {
    fn draw(&self) -> QuizRound {
        self.round.clone()
    }
}

/// A fixed quiz round: "Paris" is correct and sits at index 1.
pub fn fixed_quiz_round() -> QuizRound {
    QuizRound {
        prompt: "What is the capital of France?".to_string(),
        options: vec![
            "Oslo".to_string(),
            "Paris".to_string(),
            "Cairo".to_string(),
            "Tokyo".to_string(),
        ],
        correct: "Paris".to_string(),
    }
}

pub const CORRECT_CHOICE: usize = 1;
pub const WRONG_CHOICE: usize = 0;

// ============================================================================
// Test setup
// ============================================================================

pub struct TestSetup {
    pub service: Arc<GameService>,
    pub registry: Arc<InMemorySessionRegistry>,
    pub fanout: Arc<RecordingFanout>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_questions(fixed_quiz_round())
    }

    pub fn with_questions(round: QuizRound) -> Self {
        let registry = Arc::new(InMemorySessionRegistry::new());
        let fanout = Arc::new(RecordingFanout::new());
        let service = GameService::new(
            registry.clone(),
            fanout.clone(),
            TimerEngine::new(),
            Arc::new(LoggingNotificationSink),
            Arc::new(FixedQuestionSource::new(round)),
        );
        Self {
            service,
            registry,
            fanout,
        }
    }
}
