//! Boundary collaborators: everything outside the game core is reached
//! through these narrow interfaces.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::games::GameType;

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Alerts other members of a grouping that a room was opened. Strictly
/// fire-and-forget: failures are logged and never affect room creation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_room_hosted(
        &self,
        group_id: &str,
        host_name: &str,
        room_id: &str,
        game_type: GameType,
    ) -> Result<(), NotifyError>;
}

/// Default sink that only records the event in the log stream.
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify_room_hosted(
        &self,
        group_id: &str,
        host_name: &str,
        room_id: &str,
        game_type: GameType,
    ) -> Result<(), NotifyError> {
        info!(
            group_id = %group_id,
            host_name = %host_name,
            room_id = %room_id,
            game_type = %game_type,
            "Room hosted notification"
        );
        Ok(())
    }
}

/// Already-authenticated participant identity. The id is supplied by the
/// caller and trusted as-is; see DESIGN.md for the open question around
/// re-verification.
#[derive(Debug, Clone)]
pub struct Identity {
    pub participant_id: String,
    pub display_name: String,
    pub groups: Vec<String>,
}

/// Resolves a participant id to its display name and group memberships.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, participant_id: &str, claimed_name: &str) -> Identity;
}

/// Trusts the claimed name and grants no group memberships.
pub struct PassThroughIdentityProvider;

#[async_trait]
impl IdentityProvider for PassThroughIdentityProvider {
    async fn resolve(&self, participant_id: &str, claimed_name: &str) -> Identity {
        Identity {
            participant_id: participant_id.to_string(),
            display_name: claimed_name.to_string(),
            groups: Vec::new(),
        }
    }
}

/// Registry-backed provider for tests and embedded deployments.
pub struct InMemoryIdentityProvider {
    entries: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, identity: Identity) {
        let mut entries = self.entries.write().await;
        entries.insert(identity.participant_id.clone(), identity);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn resolve(&self, participant_id: &str, claimed_name: &str) -> Identity {
        let entries = self.entries.read().await;
        match entries.get(participant_id) {
            Some(identity) => identity.clone(),
            None => Identity {
                participant_id: participant_id.to_string(),
                display_name: claimed_name.to_string(),
                groups: Vec::new(),
            },
        }
    }
}
