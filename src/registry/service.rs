use std::sync::{Arc, Weak};

use chrono::Utc;
use futures::FutureExt;
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::lobby::{open_rooms, LobbyDirectory, LobbyScope};
use super::models::{Room, RoomConfig, RoomStatus, RoomSummary, MIN_PLAYERS_TO_START};
use super::store::{SessionRegistry, SharedRoom};
use crate::boundary::NotificationSink;
use crate::connections::fanout::Fanout;
use crate::connections::messages::WireMessage;
use crate::games::codebreaker::{
    CodeAlphabet, CodeGuessOutcome, DepartureImpact as CodeDeparture, Difficulty,
};
use crate::games::drawing::{DepartureImpact as DrawingDeparture, GuessOutcome, Stroke};
use crate::games::questions::QuestionSource;
use crate::games::quiz::AnswerOutcome;
use crate::games::{words, GameState, GameType, TurnAdvance};
use crate::shared::CommandError;
use crate::timer::TimerEngine;

/// Pause between a turn or round closing and the next one starting.
const INTER_TURN_DELAY_SECONDS: u32 = 5;

/// How long a finished room lingers so final results reach everyone.
const FINISHED_GRACE_SECONDS: u32 = 60;

/// Owns the room lifecycle and routes every inbound event to the right
/// room and state machine. All state under one room is accessed with the
/// room's lock held, so its transitions are totally ordered; timer
/// callbacks re-enter through here and are dropped when their epoch no
/// longer matches the room's.
pub struct GameService {
    weak: Weak<GameService>,
    registry: Arc<dyn SessionRegistry>,
    fanout: Arc<dyn Fanout>,
    timers: Arc<TimerEngine>,
    lobby: LobbyDirectory,
    notifier: Arc<dyn NotificationSink>,
    questions: Arc<dyn QuestionSource>,
}

impl GameService {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        fanout: Arc<dyn Fanout>,
        timers: Arc<TimerEngine>,
        notifier: Arc<dyn NotificationSink>,
        questions: Arc<dyn QuestionSource>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            registry,
            fanout,
            timers,
            lobby: LobbyDirectory::new(),
            notifier,
            questions,
        })
    }

    /// Creates a room with the host auto-joined and announces it to
    /// lobby watchers and the notification sink.
    #[instrument(skip(self, connection))]
    pub async fn create_room(
        &self,
        game_type: GameType,
        host_id: String,
        host_name: String,
        config: RoomConfig,
        scope: Option<String>,
        connection: Uuid,
    ) -> Result<RoomSummary, CommandError> {
        let room = Room::new(
            game_type,
            host_id,
            host_name.clone(),
            config,
            scope.clone(),
            connection,
        );
        let summary = room.summary();
        let shared = self.registry.insert(room).await;
        {
            let room = shared.lock().await;
            self.fanout
                .to_room(&room, &WireMessage::room_snapshot(&room))
                .await;
        }
        info!(room_id = %summary.id, game_type = %game_type, "Room created");

        // Fire-and-forget: a sink failure must never affect creation.
        if let Some(group) = scope {
            let notifier = Arc::clone(&self.notifier);
            let room_id = summary.id.clone();
            tokio::spawn(async move {
                if let Err(e) = notifier
                    .notify_room_hosted(&group, &host_name, &room_id, game_type)
                    .await
                {
                    warn!(room_id = %room_id, error = %e, "Room hosted notification failed");
                }
            });
        }

        self.push_lobby_update(game_type, &summary.scope).await;
        Ok(summary)
    }

    /// Admits a participant, or atomically swaps their connection handle
    /// when the same id rejoins (reconnect keeps score and turn order).
    #[instrument(skip(self, connection))]
    pub async fn join_room(
        &self,
        room_id: &str,
        participant_id: String,
        display_name: String,
        connection: Uuid,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        let added = room.admit(participant_id.clone(), display_name, connection)?;

        if added {
            info!(room_id = %room_id, participant_id = %participant_id, "Player joined");
            if let Some(player) = room.player(&participant_id) {
                self.fanout
                    .to_room(
                        &room,
                        &WireMessage::player_joined(player, room.players.len()),
                    )
                    .await;
            }
        } else {
            info!(room_id = %room_id, participant_id = %participant_id, "Player reconnected");
        }
        // The (re)joined connection always gets a current snapshot.
        self.fanout
            .to_participant(&participant_id, &WireMessage::room_snapshot(&room))
            .await;

        let game_type = room.game_type;
        let scope = room.scope.clone();
        let in_lobby = room.status == RoomStatus::Lobby;
        drop(room);
        if added && in_lobby {
            self.push_lobby_update(game_type, &scope).await;
        }
        Ok(())
    }

    /// Removes the player holding `connection`. Stale handles (already
    /// superseded by a reconnect, or the room is gone) are ignored.
    #[instrument(skip(self, connection))]
    pub async fn leave_room(&self, room_id: &str, connection: Uuid) {
        let shared = match self.registry.get(room_id).await {
            Some(shared) => shared,
            None => {
                debug!(room_id = %room_id, "Leave for unknown room ignored");
                return;
            }
        };
        let mut room = shared.lock().await;
        let (removed_index, player) = match room.remove_by_connection(connection) {
            Some(removed) => removed,
            None => {
                debug!(room_id = %room_id, "Leave with stale connection handle ignored");
                return;
            }
        };
        info!(
            room_id = %room_id,
            participant_id = %player.participant_id,
            remaining = room.players.len(),
            "Player left"
        );

        if room.players.is_empty() {
            let game_type = room.game_type;
            let scope = room.scope.clone();
            drop(room);
            self.destroy_room(room_id, game_type, &scope).await;
            return;
        }

        if let Some(new_host) = room.reassign_host() {
            info!(room_id = %room_id, host_id = %new_host, "Host reassigned");
            self.fanout
                .to_room(&room, &WireMessage::host_change(new_host))
                .await;
        }
        self.fanout
            .to_room(
                &room,
                &WireMessage::player_left(player.participant_id.clone(), room.players.len()),
            )
            .await;

        match room.status {
            RoomStatus::Lobby => {
                let game_type = room.game_type;
                let scope = room.scope.clone();
                drop(room);
                self.push_lobby_update(game_type, &scope).await;
            }
            RoomStatus::Playing => {
                self.handle_mid_game_departure(&mut room, removed_index, &player.participant_id)
                    .await;
            }
            RoomStatus::Finished => {}
        }
    }

    /// Starts the game: host only, at least two players, turn order
    /// randomized.
    #[instrument(skip(self))]
    pub async fn start_game(&self, room_id: &str, requester_id: &str) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        if room.status != RoomStatus::Lobby {
            return Err(CommandError::WrongPhase);
        }
        if requester_id != room.host_id {
            return Err(CommandError::NotAuthorized("only the host may start the game"));
        }
        if room.players.len() < MIN_PLAYERS_TO_START {
            return Err(CommandError::NotEnoughPlayers(MIN_PLAYERS_TO_START));
        }

        room.players.shuffle(&mut rand::rng());
        room.status = RoomStatus::Playing;
        info!(room_id = %room_id, players = room.players.len(), "Game started");
        self.fanout
            .to_room(&room, &WireMessage::game_started(&room))
            .await;

        match room.game_type {
            GameType::DrawingGuess => self.begin_drawing_turn(&mut room).await,
            GameType::CodeBreaker => self.begin_code_turn(&mut room).await,
            GameType::QuizMatch => self.begin_quiz_round(&mut room).await,
        }

        let game_type = room.game_type;
        let scope = room.scope.clone();
        drop(room);
        self.push_lobby_update(game_type, &scope).await;
        Ok(())
    }

    /// Registers the caller as a lobby watcher and sends the current
    /// listing for the requested scope.
    #[instrument(skip(self))]
    pub async fn list_open_rooms(
        &self,
        game_type: GameType,
        scope: Option<String>,
        participant_id: &str,
    ) {
        self.lobby
            .watch(
                LobbyScope {
                    game_type,
                    group: scope.clone(),
                },
                participant_id,
            )
            .await;
        let rooms = open_rooms(self.registry.as_ref(), game_type, &scope).await;
        self.fanout
            .to_participant(
                participant_id,
                &WireMessage::room_list(game_type, scope, rooms),
            )
            .await;
    }

    /// Drops every lobby watch for a disconnected participant.
    pub async fn forget_watcher(&self, participant_id: &str) {
        self.lobby.forget(participant_id).await;
    }

    // --- Drawing-guess events ---

    #[instrument(skip(self))]
    pub async fn select_word(
        &self,
        room_id: &str,
        participant_id: &str,
        option_index: usize,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let round_seconds = room.config.round_seconds;

        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        state.select_word(participant_id, option_index, round_seconds)?;
        let mask = state.mask.clone();

        let epoch = room.bump_epoch();
        self.fanout
            .to_room(&room, &WireMessage::drawing_started(mask, round_seconds))
            .await;
        self.start_round_timer(room_id, round_seconds, epoch).await;
        Ok(())
    }

    pub async fn submit_stroke(
        &self,
        room_id: &str,
        participant_id: &str,
        stroke: Stroke,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        state.append_stroke(participant_id, stroke.clone())?;
        self.fanout
            .to_room(
                &room,
                &WireMessage::stroke(participant_id.to_string(), stroke),
            )
            .await;
        Ok(())
    }

    pub async fn clear_canvas(&self, room_id: &str, participant_id: &str) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        state.clear_canvas(participant_id)?;
        self.fanout
            .to_room(&room, &WireMessage::canvas_cleared())
            .await;
        Ok(())
    }

    pub async fn change_canvas_color(
        &self,
        room_id: &str,
        participant_id: &str,
        color: String,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        state.set_canvas_color(participant_id, color.clone())?;
        self.fanout
            .to_room(&room, &WireMessage::canvas_color(color))
            .await;
        Ok(())
    }

    /// Replays the current stroke log to one connection (reconnects).
    pub async fn sync_strokes(&self, room_id: &str, participant_id: &str) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let room = shared.lock().await;
        if room.player(participant_id).is_none() {
            return Err(CommandError::NotAuthorized("not a member of this room"));
        }
        let state = match &room.state {
            GameState::DrawingGuess(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        self.fanout
            .to_participant(
                participant_id,
                &WireMessage::stroke_sync(
                    state.strokes.clone(),
                    state.canvas_color.clone(),
                    state.mask.clone(),
                ),
            )
            .await;
        Ok(())
    }

    /// A guess for either guessing game; the room's game type decides
    /// which payload field applies.
    #[instrument(skip(self, word, sequence))]
    pub async fn submit_guess(
        &self,
        room_id: &str,
        participant_id: &str,
        word: Option<String>,
        sequence: Option<Vec<u8>>,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        match room.game_type {
            GameType::DrawingGuess => {
                let text = word.ok_or_else(|| {
                    CommandError::InvalidPayload("missing word guess".to_string())
                })?;
                self.apply_word_guess(&mut room, participant_id, &text).await
            }
            GameType::CodeBreaker => {
                let sequence = sequence.ok_or_else(|| {
                    CommandError::InvalidPayload("missing guess sequence".to_string())
                })?;
                self.apply_code_guess(&mut room, participant_id, sequence).await
            }
            GameType::QuizMatch => Err(CommandError::WrongGameType),
        }
    }

    // --- Code-breaker events ---

    #[instrument(skip(self))]
    pub async fn set_code_options(
        &self,
        room_id: &str,
        participant_id: &str,
        alphabet: CodeAlphabet,
        difficulty: Difficulty,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let state = match &mut room.state {
            GameState::CodeBreaker(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        state.set_options(participant_id, alphabet, difficulty)?;
        self.fanout
            .to_room(&room, &WireMessage::code_options_set(alphabet, difficulty))
            .await;
        Ok(())
    }

    #[instrument(skip(self, sequence))]
    pub async fn submit_secret(
        &self,
        room_id: &str,
        participant_id: &str,
        sequence: Vec<u8>,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let state = match &mut room.state {
            GameState::CodeBreaker(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        let (attempts_remaining, seconds) = state.submit_secret(participant_id, sequence)?;

        let epoch = room.bump_epoch();
        info!(room_id = %room_id, "Secret set, guessing begins");
        self.fanout
            .to_room(&room, &WireMessage::secret_set(attempts_remaining, seconds))
            .await;
        self.start_round_timer(room_id, seconds, epoch).await;
        Ok(())
    }

    // --- Quiz events ---

    #[instrument(skip(self))]
    pub async fn submit_answer(
        &self,
        room_id: &str,
        participant_id: &str,
        choice: usize,
    ) -> Result<(), CommandError> {
        let shared = self.room(room_id).await?;
        let mut room = shared.lock().await;
        Self::require_playing_member(&room, participant_id)?;
        let participant_count = room.players.len();
        let state = match &mut room.state {
            GameState::QuizMatch(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        match state.submit_answer(participant_id, choice, Utc::now(), participant_count)? {
            AnswerOutcome::Recorded { all_answered } => {
                self.fanout
                    .to_participant(participant_id, &WireMessage::answer_ack(choice))
                    .await;
                if all_answered {
                    // Everyone is in; no reason to wait out the clock.
                    self.finish_quiz_round(&mut room).await;
                }
            }
            AnswerOutcome::Duplicate => {
                debug!(room_id = %room_id, participant_id = %participant_id, "Duplicate answer ignored");
            }
        }
        Ok(())
    }

    // --- Timer re-entry ---

    async fn round_tick(&self, room_id: &str, epoch: u64, remaining: u32) {
        let shared = match self.registry.get(room_id).await {
            Some(shared) => shared,
            None => return,
        };
        let mut room = shared.lock().await;
        if room.epoch != epoch {
            debug!(room_id = %room_id, "Stale tick dropped");
            return;
        }
        let round_seconds = room.config.round_seconds;

        let mut reveal = None;
        match &mut room.state {
            GameState::DrawingGuess(state) => {
                if state.apply_tick(remaining, round_seconds) {
                    reveal = Some(state.mask.clone());
                }
            }
            GameState::CodeBreaker(state) => state.seconds_remaining = remaining,
            GameState::QuizMatch(state) => state.seconds_remaining = remaining,
        }
        if let Some(mask) = reveal {
            self.fanout
                .to_room(&room, &WireMessage::reveal_update(mask))
                .await;
        }
        self.fanout.to_room(&room, &WireMessage::tick(remaining)).await;
    }

    async fn round_expired(&self, room_id: &str, epoch: u64) {
        let shared = match self.registry.get(room_id).await {
            Some(shared) => shared,
            None => return,
        };
        let mut room = shared.lock().await;
        if room.epoch != epoch || room.status != RoomStatus::Playing {
            debug!(room_id = %room_id, "Stale expiry dropped");
            return;
        }
        info!(room_id = %room_id, "Round timer expired");
        match room.game_type {
            GameType::DrawingGuess => self.finish_drawing_turn(&mut room, true).await,
            GameType::CodeBreaker => self.finish_code_turn(&mut room, true).await,
            GameType::QuizMatch => self.finish_quiz_round(&mut room).await,
        }
    }

    /// Starts the next turn or round once the inter-turn pause elapses.
    async fn advance_turn(&self, room_id: &str, epoch: u64) {
        let shared = match self.registry.get(room_id).await {
            Some(shared) => shared,
            None => return,
        };
        let mut room = shared.lock().await;
        if room.epoch != epoch || room.status != RoomStatus::Playing {
            debug!(room_id = %room_id, "Stale advance dropped");
            return;
        }
        match room.game_type {
            GameType::DrawingGuess => self.begin_drawing_turn(&mut room).await,
            GameType::CodeBreaker => self.begin_code_turn(&mut room).await,
            GameType::QuizMatch => self.begin_quiz_round(&mut room).await,
        }
    }

    async fn destroy_finished(&self, room_id: &str) {
        let shared = match self.registry.get(room_id).await {
            Some(shared) => shared,
            None => return,
        };
        let (game_type, scope, finished) = {
            let room = shared.lock().await;
            (
                room.game_type,
                room.scope.clone(),
                room.status == RoomStatus::Finished,
            )
        };
        if finished {
            self.destroy_room(room_id, game_type, &scope).await;
        }
    }

    // --- Turn helpers (room lock held) ---

    async fn begin_drawing_turn(&self, room: &mut Room) {
        let ids = room.participant_ids();
        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return,
        };
        state.begin_turn(&ids, words::draw_word_pair());
        let round = state.round;
        let turn_index = state.turn_index;
        let drawer = state.drawer_id.clone();
        let options = state.word_options.clone();
        room.bump_epoch();

        self.fanout
            .to_room(&room, &WireMessage::turn_start(round, turn_index, drawer.clone()))
            .await;
        // Word options are for the drawer's eyes only.
        self.fanout
            .to_participant(&drawer, &WireMessage::word_options(options))
            .await;
    }

    async fn begin_code_turn(&self, room: &mut Room) {
        let ids = room.participant_ids();
        let state = match &mut room.state {
            GameState::CodeBreaker(state) => state,
            _ => return,
        };
        state.begin_turn(&ids);
        let round = state.round;
        let turn_index = state.turn_index;
        let code_maker = state.code_maker_id.clone();
        room.bump_epoch();

        self.fanout
            .to_room(&room, &WireMessage::turn_start(round, turn_index, code_maker))
            .await;
    }

    async fn begin_quiz_round(&self, room: &mut Room) {
        let round_seconds = room.config.round_seconds;
        let question = self.questions.draw();
        let state = match &mut room.state {
            GameState::QuizMatch(state) => state,
            _ => return,
        };
        state.begin_round(question, round_seconds, Utc::now());
        let round = state.round;
        let prompt = state.prompt.clone();
        let options = state.options.clone();
        let epoch = room.bump_epoch();
        let room_id = room.id.clone();

        self.fanout
            .to_room(&room, &WireMessage::question(round, prompt, options, round_seconds))
            .await;
        self.start_round_timer(&room_id, round_seconds, epoch).await;
    }

    async fn apply_word_guess(
        &self,
        room: &mut Room,
        participant_id: &str,
        text: &str,
    ) -> Result<(), CommandError> {
        let non_drawer_count = room.players.len().saturating_sub(1);
        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        let drawer = state.drawer_id.clone();
        match state.guess(participant_id, text, non_drawer_count)? {
            GuessOutcome::Correct {
                guesser_points,
                drawer_points,
                all_guessed,
            } => {
                if let Some(player) = room.player_mut(participant_id) {
                    player.score += guesser_points;
                    player.turn_score = guesser_points;
                }
                if let Some(player) = room.player_mut(&drawer) {
                    player.score += drawer_points;
                    player.turn_score += drawer_points;
                }
                info!(
                    room_id = %room.id,
                    guesser = %participant_id,
                    points = guesser_points,
                    "Correct guess"
                );
                self.fanout
                    .to_room(
                        &room,
                        &WireMessage::correct_guess(
                            participant_id.to_string(),
                            guesser_points,
                            drawer_points,
                        ),
                    )
                    .await;
                if all_guessed {
                    self.finish_drawing_turn(room, true).await;
                }
            }
            GuessOutcome::Incorrect => {
                debug!(room_id = %room.id, guesser = %participant_id, "Incorrect guess");
            }
            GuessOutcome::Ignored => {}
        }
        Ok(())
    }

    async fn apply_code_guess(
        &self,
        room: &mut Room,
        participant_id: &str,
        sequence: Vec<u8>,
    ) -> Result<(), CommandError> {
        let state = match &mut room.state {
            GameState::CodeBreaker(state) => state,
            _ => return Err(CommandError::WrongGameType),
        };
        let outcome = state.guess(participant_id, sequence.clone())?;
        let attempts_remaining = state.attempts_remaining;
        match outcome {
            CodeGuessOutcome::Progress { clue, .. } => {
                self.fanout
                    .to_room(
                        &room,
                        &WireMessage::guess_result(
                            participant_id.to_string(),
                            sequence,
                            clue,
                            attempts_remaining,
                        ),
                    )
                    .await;
            }
            CodeGuessOutcome::Solved { clue, points } => {
                if let Some(player) = room.player_mut(participant_id) {
                    player.score += points;
                    player.turn_score = points;
                }
                info!(
                    room_id = %room.id,
                    solver = %participant_id,
                    points = points,
                    "Code solved"
                );
                self.fanout
                    .to_room(
                        &room,
                        &WireMessage::guess_result(
                            participant_id.to_string(),
                            sequence,
                            clue,
                            attempts_remaining,
                        ),
                    )
                    .await;
                self.finish_code_turn(room, true).await;
            }
            CodeGuessOutcome::Exhausted { clue } => {
                info!(room_id = %room.id, "Attempts exhausted");
                self.fanout
                    .to_room(
                        &room,
                        &WireMessage::guess_result(
                            participant_id.to_string(),
                            sequence,
                            clue,
                            attempts_remaining,
                        ),
                    )
                    .await;
                self.finish_code_turn(room, true).await;
            }
        }
        Ok(())
    }

    /// Closes the drawing turn: cancels the round timer, reveals the
    /// word, and either schedules the next turn or ends the game.
    async fn finish_drawing_turn(&self, room: &mut Room, advance_turn_index: bool) {
        self.timers.cancel(&room.id).await;
        let player_count = room.players.len();
        let total_rounds = room.config.total_rounds;
        let state = match &mut room.state {
            GameState::DrawingGuess(state) => state,
            _ => return,
        };
        let word = state.chosen_word.clone().unwrap_or_default();
        let correct_guessers: Vec<String> = state.correct_guessers.iter().cloned().collect();
        let advance = state.end_turn(advance_turn_index, player_count, total_rounds);
        let epoch = room.bump_epoch();

        self.fanout
            .to_room(
                &room,
                &WireMessage::drawing_turn_end(word, correct_guessers, room.leaderboard()),
            )
            .await;
        match advance {
            TurnAdvance::GameOver => self.finish_room(room).await,
            _ => self.schedule_advance(&room.id, epoch).await,
        }
    }

    /// Closes the code-breaker turn: cancels the timer, reveals the
    /// secret and clue history, and rotates or ends the game.
    async fn finish_code_turn(&self, room: &mut Room, advance_turn_index: bool) {
        self.timers.cancel(&room.id).await;
        let player_count = room.players.len();
        let total_rounds = room.config.total_rounds;
        let state = match &mut room.state {
            GameState::CodeBreaker(state) => state,
            _ => return,
        };
        let secret = state.secret.clone();
        let solver = state.solver_id.clone();
        let attempts = state.attempts.clone();
        let advance = state.end_turn(advance_turn_index, player_count, total_rounds);
        let epoch = room.bump_epoch();

        let solver_points = solver
            .as_deref()
            .and_then(|id| room.player(id))
            .map(|player| player.turn_score)
            .unwrap_or(0);
        self.fanout
            .to_room(
                &room,
                &WireMessage::code_turn_end(
                    secret,
                    solver,
                    solver_points,
                    attempts,
                    room.leaderboard(),
                ),
            )
            .await;
        match advance {
            TurnAdvance::GameOver => self.finish_room(room).await,
            _ => self.schedule_advance(&room.id, epoch).await,
        }
    }

    /// Closes the quiz round: scores every participant, broadcasts the
    /// results, and either schedules the next round or ends the game.
    async fn finish_quiz_round(&self, room: &mut Room) {
        self.timers.cancel(&room.id).await;
        let ids = room.participant_ids();
        let round_seconds = room.config.round_seconds;
        let total_rounds = room.config.total_rounds;
        let state = match &mut room.state {
            GameState::QuizMatch(state) => state,
            _ => return,
        };
        let scores = state.finish_round(&ids, round_seconds);
        let round = state.round;
        let correct_answer = state.correct_answer.clone();
        let last_round = round >= total_rounds;
        let epoch = room.bump_epoch();

        for line in &scores {
            if let Some(player) = room.player_mut(&line.participant_id) {
                player.score += line.points;
                player.turn_score = line.points;
            }
        }
        self.fanout
            .to_room(
                &room,
                &WireMessage::round_results(round, correct_answer, scores, room.leaderboard()),
            )
            .await;

        if last_round {
            room.state.complete();
            self.finish_room(room).await;
        } else {
            self.schedule_advance(&room.id, epoch).await;
        }
    }

    /// Marks the room finished, broadcasts the final leaderboard, and
    /// schedules destruction after the grace period. Finished rooms are
    /// immutable: every game command is rejected from here on.
    async fn finish_room(&self, room: &mut Room) {
        room.status = RoomStatus::Finished;
        room.state.complete();
        info!(room_id = %room.id, "Game over");
        self.fanout
            .to_room(&room, &WireMessage::game_over(room.leaderboard()))
            .await;
        self.schedule_destroy(&room.id).await;
    }

    async fn handle_mid_game_departure(
        &self,
        room: &mut Room,
        removed_index: usize,
        departed_id: &str,
    ) {
        if room.players.len() < MIN_PLAYERS_TO_START {
            // A game cannot continue solo; settle it now.
            self.timers.cancel(&room.id).await;
            room.bump_epoch();
            self.finish_room(room).await;
            return;
        }
        let remaining = room.players.len();
        match &mut room.state {
            GameState::DrawingGuess(state) => {
                match state.handle_departure(departed_id, removed_index, remaining) {
                    DrawingDeparture::RoleAbandoned => {
                        self.finish_drawing_turn(room, false).await;
                    }
                    DrawingDeparture::AllGuessed => {
                        self.finish_drawing_turn(room, true).await;
                    }
                    DrawingDeparture::None => {}
                }
            }
            GameState::CodeBreaker(state) => {
                match state.handle_departure(departed_id, removed_index) {
                    CodeDeparture::RoleAbandoned => {
                        self.finish_code_turn(room, false).await;
                    }
                    CodeDeparture::None => {}
                }
            }
            GameState::QuizMatch(state) => {
                if state.all_answered(remaining) {
                    self.finish_quiz_round(room).await;
                }
            }
        }
    }

    // --- Plumbing ---

    async fn room(&self, room_id: &str) -> Result<SharedRoom, CommandError> {
        self.registry
            .get(room_id)
            .await
            .ok_or_else(|| CommandError::RoomNotFound(room_id.to_string()))
    }

    fn require_playing_member(room: &Room, participant_id: &str) -> Result<(), CommandError> {
        if room.status != RoomStatus::Playing {
            return Err(CommandError::WrongPhase);
        }
        if room.player(participant_id).is_none() {
            return Err(CommandError::NotAuthorized("not a member of this room"));
        }
        Ok(())
    }

    async fn start_round_timer(&self, room_id: &str, seconds: u32, epoch: u64) {
        let tick_weak = self.weak.clone();
        let tick_room = room_id.to_string();
        let expire_weak = self.weak.clone();
        let expire_room = room_id.to_string();
        self.timers
            .start(
                room_id,
                seconds,
                move |remaining| {
                    let weak = tick_weak.clone();
                    let room_id = tick_room.clone();
                    async move {
                        if let Some(service) = weak.upgrade() {
                            service.round_tick(&room_id, epoch, remaining).await;
                        }
                    }
                    .boxed()
                },
                move || {
                    async move {
                        if let Some(service) = expire_weak.upgrade() {
                            service.round_expired(&expire_room, epoch).await;
                        }
                    }
                    .boxed()
                },
            )
            .await;
    }

    fn schedule_advance<'a>(
        &'a self,
        room_id: &'a str,
        epoch: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let weak = self.weak.clone();
            let room_id_owned = room_id.to_string();
            self.timers
                .schedule(room_id, INTER_TURN_DELAY_SECONDS, move || {
                    async move {
                        if let Some(service) = weak.upgrade() {
                            service.advance_turn(&room_id_owned, epoch).await;
                        }
                    }
                    .boxed()
                })
                .await;
        })
    }

    async fn schedule_destroy(&self, room_id: &str) {
        let weak = self.weak.clone();
        let room_id_owned = room_id.to_string();
        self.timers
            .schedule(room_id, FINISHED_GRACE_SECONDS, move || {
                async move {
                    if let Some(service) = weak.upgrade() {
                        service.destroy_finished(&room_id_owned).await;
                    }
                }
                .boxed()
            })
            .await;
    }

    async fn destroy_room(&self, room_id: &str, game_type: GameType, scope: &Option<String>) {
        self.timers.cancel(room_id).await;
        if self.registry.remove(room_id).await {
            info!(room_id = %room_id, "Room destroyed");
        }
        self.push_lobby_update(game_type, scope).await;
    }

    /// Recomputes and pushes listings to every scope interested in a
    /// lifecycle change. Must not be called with a room lock held.
    async fn push_lobby_update(&self, game_type: GameType, scope: &Option<String>) {
        for (key, watchers) in self.lobby.interested_scopes(game_type, scope).await {
            let rooms = open_rooms(self.registry.as_ref(), game_type, &key.group).await;
            let message = WireMessage::room_list(game_type, key.group.clone(), rooms);
            for participant_id in watchers {
                self.fanout.to_participant(&participant_id, &message).await;
            }
        }
    }
}
