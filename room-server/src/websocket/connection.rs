use room_types::{PlayerId, RoomId, ServerMessage, User};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc};
use tracing::info;
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
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("Connection closed")]
    Closed,
    #[error("Connection not found")]
    UnknownConnection,
}

/// One websocket session: who is on it, which room it watches, and the
/// queue feeding its outbound half.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub user: Option<User>,
    pub room_id: Option<RoomId>,
    pub last_activity: Instant,
    outbox: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    fn open(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let connection = Self {
            id,
            user: None,
            room_id: None,
            last_activity: Instant::now(),
            outbox,
        };
        (connection, inbox)
    }

    /// Authenticated players keep their account id across reconnects;
    /// anonymous players are identified by the socket.
    pub fn player_id(&self) -> PlayerId {
        match &self.user {
            Some(user) => user.id.clone(),
            None => self.id.to_string(),
        }
    }

    pub fn auth_uid(&self) -> Option<String> {
        self.user.as_ref().map(|user| user.id.clone())
    }

    pub fn send(&self, message: ServerMessage) -> Result<(), SendError> {
        self.outbox.send(message).map_err(|_| SendError::Closed)
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// Registry of live sockets and the room each one is attached to.
#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket and hand back the queue its writer drains.
    pub async fn register(&self, id: ConnectionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (connection, inbox) = Connection::open(id);
        self.connections.write().await.insert(id, connection);
        inbox
    }

    pub async fn unregister(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
    }

    pub async fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.read().await.get(&id).cloned()
    }

    async fn update(&self, id: ConnectionId, edit: impl FnOnce(&mut Connection)) {
        if let Some(connection) = self.connections.write().await.get_mut(&id) {
            edit(connection);
        }
    }

    pub async fn touch(&self, id: ConnectionId) {
        self.update(id, |c| c.last_activity = Instant::now()).await;
    }

    pub async fn set_user(&self, id: ConnectionId, user: User) {
        self.update(id, |c| c.user = Some(user)).await;
    }

    pub async fn set_room(&self, id: ConnectionId, room_id: Option<RoomId>) {
        self.update(id, |c| c.room_id = room_id).await;
    }

    pub async fn send(&self, id: ConnectionId, message: ServerMessage) -> Result<(), SendError> {
        match self.connections.read().await.get(&id) {
            Some(connection) => connection.send(message),
            None => Err(SendError::UnknownConnection),
        }
    }

    /// Snapshot of every connection watching `room_id`.
    pub async fn in_room(&self, room_id: &str) -> Vec<Connection> {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.room_id.as_deref() == Some(room_id))
            .cloned()
            .collect()
    }

    /// Forget sockets silent for longer than `timeout`. Their players stay in
    /// their rooms until the stale sweep decides otherwise.
    pub async fn drop_idle(&self, timeout: Duration) -> usize {
        let mut connections = self.connections.write().await;
        let before = connections.len();
        connections.retain(|id, c| {
            let keep = c.idle_for() <= timeout;
            if !keep {
                info!("Dropping idle connection {}", id);
            }
            keep
        });
        before - connections.len()
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@test.com"),
            display_name: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_player_id_prefers_account() {
        let registry = ConnectionManager::new();
        let id = ConnectionId::new();
        let _inbox = registry.register(id).await;

        let anonymous = registry.get(id).await.unwrap();
        assert_eq!(anonymous.player_id(), id.to_string());
        assert!(anonymous.auth_uid().is_none());

        registry.set_user(id, account("acct-1")).await;
        let signed_in = registry.get(id).await.unwrap();
        assert_eq!(signed_in.player_id(), "acct-1");
        assert_eq!(signed_in.auth_uid().as_deref(), Some("acct-1"));
    }

    #[tokio::test]
    async fn test_room_membership() {
        let registry = ConnectionManager::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let _ia = registry.register(a).await;
        let _ib = registry.register(b).await;

        registry.set_room(a, Some("ROOM1".to_string())).await;
        registry.set_room(b, Some("ROOM2".to_string())).await;
        let watching = registry.in_room("ROOM1").await;
        assert_eq!(watching.len(), 1);
        assert_eq!(watching[0].id, a);

        registry.set_room(a, None).await;
        assert!(registry.in_room("ROOM1").await.is_empty());
        assert_eq!(registry.in_room("ROOM2").await.len(), 1);
    }

    #[tokio::test]
    async fn test_idle_sockets_are_dropped() {
        let registry = ConnectionManager::new();
        let quiet = ConnectionId::new();
        let _inbox = registry.register(quiet).await;

        assert_eq!(registry.drop_idle(Duration::from_secs(60)).await, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.drop_idle(Duration::from_millis(10)).await, 1);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_send_reports_closed_and_unknown() {
        let registry = ConnectionManager::new();
        let id = ConnectionId::new();
        drop(registry.register(id).await);

        assert_eq!(
            registry.send(id, ServerMessage::RoomLeft).await,
            Err(SendError::Closed)
        );
        assert_eq!(
            registry.send(ConnectionId::new(), ServerMessage::RoomLeft).await,
            Err(SendError::UnknownConnection)
        );
    }
}
