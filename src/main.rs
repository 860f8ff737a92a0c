use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamenight::boundary::{LoggingNotificationSink, PassThroughIdentityProvider};
use gamenight::connections::{websocket_handler, ConnectionFanout, InMemoryConnectionDirectory};
use gamenight::games::questions::BuiltinQuestionBank;
use gamenight::registry::{GameService, InMemorySessionRegistry};
use gamenight::shared::AppState;
use gamenight::timer::TimerEngine;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gamenight=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mini-game server");

    // Wire up shared application state with dependency injection
    let registry = Arc::new(InMemorySessionRegistry::new());
    let directory = Arc::new(InMemoryConnectionDirectory::new());
    let fanout = Arc::new(ConnectionFanout::new(directory.clone()));
    let service = GameService::new(
        registry,
        fanout,
        TimerEngine::new(),
        Arc::new(LoggingNotificationSink),
        Arc::new(BuiltinQuestionBank),
    );
    let app_state = AppState::new(service, directory, Arc::new(PassThroughIdentityProvider));

    let app = Router::new()
        .route("/", get(|| async { "gamenight" }))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
