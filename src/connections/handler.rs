use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::boundary::Identity;
use crate::registry::models::RoomConfig;
use crate::registry::service::GameService;
use crate::shared::{AppError, AppState, CommandError};

use super::directory::ConnectionHandle;
use super::messages::{
    ChangeCanvasColorPayload, CreateRoomPayload, JoinRoomPayload, ListOpenRoomsPayload,
    MessageType, SelectWordPayload, SetCodeOptionsPayload, SubmitAnswerPayload,
    SubmitGuessPayload, SubmitSecretPayload, SubmitStrokePayload, WireMessage,
};
use super::socket::{Connection, InboundHandler};

/// Connection parameters. Identity is treated as already authenticated;
/// the provider only enriches it with the canonical name and groups.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub participant_id: String,
    pub name: String,
}

/// Routes one connection's inbound messages to the game service. The
/// participant id is bound at connect time, so a connection cannot act
/// as a different participant mid-session.
pub struct MessageRouter {
    service: Arc<GameService>,
    identity: Identity,
    connection_id: Uuid,
    reply: mpsc::UnboundedSender<String>,
    current_room: Mutex<Option<String>>,
}

impl MessageRouter {
    pub fn new(
        service: Arc<GameService>,
        identity: Identity,
        connection_id: Uuid,
        reply: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            service,
            identity,
            connection_id,
            reply,
            current_room: Mutex::new(None),
        }
    }

    /// The room this connection is currently bound to, if any.
    async fn bound_room(&self) -> Result<String, CommandError> {
        self.current_room
            .lock()
            .await
            .clone()
            .ok_or_else(|| CommandError::RoomNotFound("not in a room".to_string()))
    }

    fn reply_error(&self, error: &CommandError) {
        let message = WireMessage::error(error.to_string());
        if let Ok(json) = serde_json::to_string(&message) {
            let _ = self.reply.send(json);
        }
    }

    fn parse<P: serde::de::DeserializeOwned>(
        payload: serde_json::Value,
    ) -> Result<P, CommandError> {
        serde_json::from_value(payload).map_err(|e| CommandError::InvalidPayload(e.to_string()))
    }

    async fn dispatch(&self, message: WireMessage) -> Result<(), CommandError> {
        let participant_id = self.identity.participant_id.as_str();
        match message.message_type {
            MessageType::CreateRoom => {
                let payload: CreateRoomPayload = Self::parse(message.payload)?;
                if let Some(scope) = &payload.scope {
                    if !self.identity.groups.contains(scope) {
                        return Err(CommandError::NotAuthorized(
                            "not a member of the requested scope",
                        ));
                    }
                }
                let defaults = RoomConfig::default();
                let config = RoomConfig {
                    total_rounds: payload.total_rounds.unwrap_or(defaults.total_rounds),
                    round_seconds: payload.round_seconds.unwrap_or(defaults.round_seconds),
                };
                let summary = self
                    .service
                    .create_room(
                        payload.game_type,
                        participant_id.to_string(),
                        self.identity.display_name.clone(),
                        config,
                        payload.scope,
                        self.connection_id,
                    )
                    .await?;
                *self.current_room.lock().await = Some(summary.id);
                Ok(())
            }
            MessageType::JoinRoom => {
                let payload: JoinRoomPayload = Self::parse(message.payload)?;
                self.service
                    .join_room(
                        &payload.room_id,
                        participant_id.to_string(),
                        self.identity.display_name.clone(),
                        self.connection_id,
                    )
                    .await?;
                *self.current_room.lock().await = Some(payload.room_id);
                Ok(())
            }
            MessageType::StartGame => {
                let room_id = self.bound_room().await?;
                self.service.start_game(&room_id, participant_id).await
            }
            MessageType::LeaveRoom => {
                let room_id = self.bound_room().await?;
                self.service.leave_room(&room_id, self.connection_id).await;
                *self.current_room.lock().await = None;
                Ok(())
            }
            MessageType::ListOpenRooms => {
                let payload: ListOpenRoomsPayload = Self::parse(message.payload)?;
                self.service
                    .list_open_rooms(payload.game_type, payload.scope, participant_id)
                    .await;
                Ok(())
            }
            MessageType::SelectWord => {
                let payload: SelectWordPayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .select_word(&room_id, participant_id, payload.index)
                    .await
            }
            MessageType::SubmitStroke => {
                let payload: SubmitStrokePayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .submit_stroke(&room_id, participant_id, payload.stroke)
                    .await
            }
            MessageType::ClearCanvas => {
                let room_id = self.bound_room().await?;
                self.service.clear_canvas(&room_id, participant_id).await
            }
            MessageType::ChangeCanvasColor => {
                let payload: ChangeCanvasColorPayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .change_canvas_color(&room_id, participant_id, payload.color)
                    .await
            }
            MessageType::SyncStrokes => {
                let room_id = self.bound_room().await?;
                self.service.sync_strokes(&room_id, participant_id).await
            }
            MessageType::SubmitGuess => {
                let payload: SubmitGuessPayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .submit_guess(&room_id, participant_id, payload.word, payload.sequence)
                    .await
            }
            MessageType::SetCodeOptions => {
                let payload: SetCodeOptionsPayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .set_code_options(
                        &room_id,
                        participant_id,
                        payload.alphabet,
                        payload.difficulty,
                    )
                    .await
            }
            MessageType::SubmitSecret => {
                let payload: SubmitSecretPayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .submit_secret(&room_id, participant_id, payload.sequence)
                    .await
            }
            MessageType::SubmitAnswer => {
                let payload: SubmitAnswerPayload = Self::parse(message.payload)?;
                let room_id = self.bound_room().await?;
                self.service
                    .submit_answer(&room_id, participant_id, payload.choice)
                    .await
            }
            other => {
                debug!(message_type = ?other, "Ignoring server-only message type");
                Ok(())
            }
        }
    }

    /// Socket termination: whatever room the connection occupies sees it
    /// as a leave.
    pub async fn disconnected(&self) {
        if let Some(room_id) = self.current_room.lock().await.take() {
            self.service.leave_room(&room_id, self.connection_id).await;
        }
        self.service
            .forget_watcher(&self.identity.participant_id)
            .await;
    }
}

#[async_trait]
impl InboundHandler for MessageRouter {
    async fn handle(&self, raw: String) {
        let message = match serde_json::from_str::<WireMessage>(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    participant_id = %self.identity.participant_id,
                    error = %e,
                    "Failed to parse inbound message"
                );
                self.reply_error(&CommandError::InvalidPayload(e.to_string()));
                return;
            }
        };
        if let Err(error) = self.dispatch(message).await {
            debug!(
                participant_id = %self.identity.participant_id,
                error = %error,
                "Command rejected"
            );
            self.reply_error(&error);
        }
    }
}

/// WebSocket endpoint: GET /ws?participant_id=...&name=...
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    if query.participant_id.trim().is_empty() || query.name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "participant_id and name are required".to_string(),
        ));
    }

    let identity = app_state
        .identity
        .resolve(&query.participant_id, &query.name)
        .await;
    info!(
        participant_id = %identity.participant_id,
        "WebSocket connection requested"
    );

    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, identity, app_state)))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    identity: Identity,
    app_state: AppState,
) {
    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    let handle = ConnectionHandle::new(outbound_sender.clone());
    let connection_id = handle.id;
    app_state
        .directory
        .register(identity.participant_id.clone(), handle)
        .await;
    info!(
        participant_id = %identity.participant_id,
        connection_id = %connection_id,
        "WebSocket connection established"
    );

    let router = Arc::new(MessageRouter::new(
        app_state.service.clone(),
        identity.clone(),
        connection_id,
        outbound_sender,
    ));

    let connection = Connection::new(Box::new(socket), outbound_receiver, router.clone());
    match connection.run().await {
        Ok(()) => {
            info!(
                participant_id = %identity.participant_id,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                participant_id = %identity.participant_id,
                error = ?e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup: a dropped socket is a leave for whatever room it was in.
    app_state
        .directory
        .unregister(&identity.participant_id, connection_id)
        .await;
    router.disconnected().await;
}
