use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use arena_types::ServerMessage;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Session {
    user_id: Option<Uuid>,
    last_seen: Instant,
    outbox: mpsc::UnboundedSender<ServerMessage>,
}

impl Session {
    fn push(&self, message: ServerMessage) -> Result<(), String> {
        self.outbox
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }
}

/// Both directions of the socket/user binding, kept under one lock so they never disagree.
#[derive(Default)]
struct Registry {
    sessions: HashMap<ConnectionId, Session>,
    online: HashMap<Uuid, ConnectionId>,
}

impl Registry {
    fn drop_session(&mut self, id: ConnectionId) -> Option<Uuid> {
        let user_id = self.sessions.remove(&id)?.user_id?;
        if self.online.get(&user_id) == Some(&id) {
            self.online.remove(&user_id);
        }
        Some(user_id)
    }
}

/// Live realtime connections and the user each one is signed in as.
#[derive(Default)]
pub struct ConnectionManager {
    registry: RwLock<Registry>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let session = Session {
            user_id: None,
            last_seen: Instant::now(),
            outbox,
        };
        self.registry.write().await.sessions.insert(id, session);
        inbox
    }

    /// Forget a connection, returning the user it was signed in as.
    pub async fn remove_connection(&self, id: ConnectionId) -> Option<Uuid> {
        self.registry.write().await.drop_session(id)
    }

    pub async fn user_of(&self, id: ConnectionId) -> Option<Uuid> {
        self.registry
            .read()
            .await
            .sessions
            .get(&id)
            .and_then(|session| session.user_id)
    }

    /// Bind a connection to a user. A user can hold one realtime session at a time.
    pub async fn authenticate_connection(
        &self,
        id: ConnectionId,
        user_id: Uuid,
    ) -> Result<(), String> {
        let mut registry = self.registry.write().await;
        match registry.online.get(&user_id) {
            Some(existing) if *existing != id => return Err("User already connected".to_string()),
            _ => {}
        }

        let session = registry
            .sessions
            .get_mut(&id)
            .ok_or("Connection not found")?;
        session.user_id = Some(user_id);
        registry.online.insert(user_id, id);
        Ok(())
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        if let Some(session) = self.registry.write().await.sessions.get_mut(&id) {
            session.last_seen = Instant::now();
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let registry = self.registry.read().await;
        let session = registry.sessions.get(&id).ok_or("Connection not found")?;
        session.push(message)
    }

    pub async fn send_to_user(&self, user_id: Uuid, message: ServerMessage) -> Result<(), String> {
        let registry = self.registry.read().await;
        let session = registry
            .online
            .get(&user_id)
            .and_then(|id| registry.sessions.get(id))
            .ok_or("User not connected")?;
        session.push(message)
    }

    /// Push to a user if they are online. Offline users pick the change up on their next fetch.
    pub async fn notify_user(&self, user_id: Uuid, message: ServerMessage) {
        if let Err(e) = self.send_to_user(user_id, message).await {
            debug!("Skipped realtime push to {}: {}", user_id, e);
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.registry.read().await.online.contains_key(&user_id)
    }

    pub async fn online_among(&self, user_ids: &[Uuid]) -> HashSet<Uuid> {
        let registry = self.registry.read().await;
        user_ids
            .iter()
            .filter(|id| registry.online.contains_key(id))
            .copied()
            .collect()
    }

    /// Drop connections silent for longer than `timeout`; returns the users that went offline.
    pub async fn cleanup_inactive_connections(&self, timeout: Duration) -> Vec<Uuid> {
        let mut registry = self.registry.write().await;
        let silent: Vec<ConnectionId> = registry
            .sessions
            .iter()
            .filter(|(_, session)| session.last_seen.elapsed() > timeout)
            .map(|(id, _)| *id)
            .collect();

        let mut users = Vec::new();
        for id in silent {
            info!("Removing inactive connection: {}", id);
            users.extend(registry.drop_session(id));
        }
        users
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.sessions.len()
    }

    pub async fn user_connection_count(&self) -> usize {
        self.registry.read().await.online.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_message(text: &str) -> ServerMessage {
        ServerMessage::Error {
            message: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        manager.remove_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_authentication_prevents_duplicate_users() {
        let manager = ConnectionManager::new();
        let (first, second) = (ConnectionId::new(), ConnectionId::new());
        let user = Uuid::new_v4();

        let _receiver1 = manager.create_connection(first).await;
        let _receiver2 = manager.create_connection(second).await;

        assert!(manager.authenticate_connection(first, user).await.is_ok());
        // Re-authenticating the same connection is harmless
        assert!(manager.authenticate_connection(first, user).await.is_ok());

        let result = manager.authenticate_connection(second, user).await;
        assert_eq!(result.unwrap_err(), "User already connected");
        assert_eq!(manager.user_connection_count().await, 1);
        assert_eq!(manager.user_of(first).await, Some(user));
        assert_eq!(manager.user_of(second).await, None);
    }

    #[tokio::test]
    async fn test_authentication_cleanup_on_disconnect() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let user = Uuid::new_v4();

        let _receiver = manager.create_connection(conn_id).await;
        manager.authenticate_connection(conn_id, user).await.unwrap();
        assert!(manager.is_online(user).await);

        assert_eq!(manager.remove_connection(conn_id).await, Some(user));
        assert!(!manager.is_online(user).await);
        assert_eq!(manager.user_connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_send_to_user() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let user = Uuid::new_v4();

        let mut receiver = manager.create_connection(conn_id).await;
        manager.authenticate_connection(conn_id, user).await.unwrap();

        manager.send_to_user(user, error_message("hello")).await.unwrap();
        assert!(matches!(
            receiver.try_recv(),
            Ok(ServerMessage::Error { message }) if message == "hello"
        ));

        let offline = manager
            .send_to_user(Uuid::new_v4(), error_message("lost"))
            .await;
        assert_eq!(offline.unwrap_err(), "User not connected");
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager.send_to_connection(conn_id, error_message("test")).await;
        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let user = Uuid::new_v4();

        let _receiver = manager.create_connection(conn_id).await;
        manager.authenticate_connection(conn_id, user).await.unwrap();

        let short_timeout = Duration::from_millis(10);
        assert!(manager.cleanup_inactive_connections(short_timeout).await.is_empty());
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let removed = manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(removed, vec![user]);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_online_among() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let (online, offline) = (Uuid::new_v4(), Uuid::new_v4());

        let _receiver = manager.create_connection(conn_id).await;
        manager.authenticate_connection(conn_id, online).await.unwrap();

        let found = manager.online_among(&[online, offline]).await;
        assert!(found.contains(&online));
        assert!(!found.contains(&offline));
    }
}
