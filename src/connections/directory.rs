use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// The transient delivery endpoint for a participant. Game logic never
/// touches this; it only ever sees the stable participant id.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub sender: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }
}

/// Maps stable participant identities to their current live connection.
/// Reconnection replaces the handle in a single atomic swap.
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    async fn register(&self, participant_id: String, handle: ConnectionHandle);

    /// Removes the entry only when `connection_id` is still the current
    /// handle, so a reconnect-superseded socket cannot unregister its
    /// replacement.
    async fn unregister(&self, participant_id: &str, connection_id: Uuid);

    async fn send_to(&self, participant_id: &str, message: &str);
}

pub struct InMemoryConnectionDirectory {
    // participant id -> current handle
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl InMemoryConnectionDirectory {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryConnectionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionDirectory for InMemoryConnectionDirectory {
    async fn register(&self, participant_id: String, handle: ConnectionHandle) {
        let mut connections = self.connections.write().await;
        if connections.insert(participant_id.clone(), handle).is_some() {
            debug!(participant_id = %participant_id, "Connection handle replaced");
        }
    }

    async fn unregister(&self, participant_id: &str, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(current) = connections.get(participant_id) {
            if current.id == connection_id {
                connections.remove(participant_id);
            }
        }
    }

    async fn send_to(&self, participant_id: &str, message: &str) {
        let connections = self.connections.read().await;
        if let Some(handle) = connections.get(participant_id) {
            // Delivery failure means the socket is going away; the
            // disconnect path owns the cleanup.
            let _ = handle.sender.send(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_registered_participant() {
        let directory = InMemoryConnectionDirectory::new();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        directory
            .register("alice".to_string(), ConnectionHandle::new(sender))
            .await;

        directory.send_to("alice", "hello").await;
        assert_eq!(receiver.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_send_to_unknown_participant_is_noop() {
        let directory = InMemoryConnectionDirectory::new();
        directory.send_to("ghost", "hello").await;
    }

    #[tokio::test]
    async fn test_reconnect_redirects_delivery() {
        let directory = InMemoryConnectionDirectory::new();
        let (old_sender, mut old_receiver) = mpsc::unbounded_channel();
        let (new_sender, mut new_receiver) = mpsc::unbounded_channel();

        let old_handle = ConnectionHandle::new(old_sender);
        let old_id = old_handle.id;
        directory.register("alice".to_string(), old_handle).await;
        directory
            .register("alice".to_string(), ConnectionHandle::new(new_sender))
            .await;

        directory.send_to("alice", "after-reconnect").await;
        assert_eq!(new_receiver.recv().await.unwrap(), "after-reconnect");
        assert!(old_receiver.try_recv().is_err());

        // The stale socket's teardown must not evict the replacement.
        directory.unregister("alice", old_id).await;
        directory.send_to("alice", "still-there").await;
        assert_eq!(new_receiver.recv().await.unwrap(), "still-there");
    }

    #[tokio::test]
    async fn test_unregister_current_handle_removes_entry() {
        let directory = InMemoryConnectionDirectory::new();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(sender);
        let connection_id = handle.id;
        directory.register("alice".to_string(), handle).await;

        directory.unregister("alice", connection_id).await;
        directory.send_to("alice", "dropped").await;
        assert!(receiver.try_recv().is_err());
    }
}
