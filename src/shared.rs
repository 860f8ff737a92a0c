use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::boundary::IdentityProvider;
use crate::connections::directory::ConnectionDirectory;
use crate::registry::service::GameService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GameService>,
    pub directory: Arc<dyn ConnectionDirectory>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        service: Arc<GameService>,
        directory: Arc<dyn ConnectionDirectory>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            service,
            directory,
            identity,
        }
    }
}

/// Rejection of an inbound game command. Reported to the originating
/// connection only; no state is mutated.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("action is not valid in the current phase")]
    WrongPhase,

    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),

    #[error("room is full")]
    RoomFull,

    #[error("at least {0} players are required to start")]
    NotEnoughPlayers(usize),

    #[error("operation does not apply to this game type")]
    WrongGameType,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// HTTP-level errors for the upgrade endpoint.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
