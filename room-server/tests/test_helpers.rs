#![allow(dead_code)]

use async_trait::async_trait;
use room_core::WordBank;
use room_persistence::{MemoryRoomStore, RoomStore, StoreResult, VersionedRoom};
use room_server::auth::AuthService;
use room_server::lookup::{LookupError, WordLookup};
use room_server::room_manager::RoomManager;
use room_server::websocket::{ConnectionId, ConnectionManager};
use room_types::{GameMode, LookupKind, Player, PlayerId, Room, RoomSettings, ServerMessage};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;

pub const TEST_WORDS: &str = "otter\nraven\nmaple\ncedar";

/// Lookup with canned answers. `None` fields behave like an unreachable service.
#[derive(Default)]
pub struct StubLookup {
    pub hint: Option<String>,
    pub known_words: Option<Vec<&'static str>>,
}

#[async_trait]
impl WordLookup for StubLookup {
    async fn hint(&self, word: &str, kind: LookupKind) -> Result<String, LookupError> {
        self.hint.clone().ok_or(LookupError::NoResult {
            word: word.to_string(),
            kind,
        })
    }

    async fn is_word(&self, word: &str) -> Result<bool, LookupError> {
        match &self.known_words {
            Some(words) => Ok(words.contains(&word)),
            None => Err(LookupError::Disabled),
        }
    }
}

/// Store whose first `failures` compare-and-swaps lose, as if another writer
/// had committed in between.
pub struct FlakyStore {
    inner: MemoryRoomStore,
    failures: AtomicUsize,
    pub swaps: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryRoomStore::new(),
            failures: AtomicUsize::new(failures),
            swaps: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RoomStore for FlakyStore {
    async fn load(&self, room_id: &str) -> StoreResult<Option<VersionedRoom>> {
        self.inner.load(room_id).await
    }

    async fn insert(&self, room: &Room) -> StoreResult<VersionedRoom> {
        self.inner.insert(room).await
    }

    async fn compare_and_swap(&self, room: &Room, expected: u64) -> StoreResult<Option<u64>> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Ok(None);
        }
        self.inner.compare_and_swap(room, expected).await
    }

    async fn delete_if_version(&self, room_id: &str, expected: u64) -> StoreResult<bool> {
        self.inner.delete_if_version(room_id, expected).await
    }

    async fn list_room_ids(&self) -> StoreResult<Vec<String>> {
        self.inner.list_room_ids().await
    }
}

/// Store that lets one more player join between a writer's read and its
/// delete, the way a concurrent `join_room` would.
pub struct JoinBeforeDelete {
    inner: MemoryRoomStore,
    late: Mutex<Option<Player>>,
}

impl JoinBeforeDelete {
    pub fn new(late: Player) -> Self {
        Self {
            inner: MemoryRoomStore::new(),
            late: Mutex::new(Some(late)),
        }
    }

    pub fn joined(&self) -> bool {
        self.late.lock().unwrap().is_none()
    }
}

#[async_trait]
impl RoomStore for JoinBeforeDelete {
    async fn load(&self, room_id: &str) -> StoreResult<Option<VersionedRoom>> {
        self.inner.load(room_id).await
    }

    async fn insert(&self, room: &Room) -> StoreResult<VersionedRoom> {
        self.inner.insert(room).await
    }

    async fn compare_and_swap(&self, room: &Room, expected: u64) -> StoreResult<Option<u64>> {
        self.inner.compare_and_swap(room, expected).await
    }

    async fn delete_if_version(&self, room_id: &str, expected: u64) -> StoreResult<bool> {
        let late = self.late.lock().unwrap().take();
        if let Some(player) = late {
            if let Some(VersionedRoom { mut room, version }) = self.inner.load(room_id).await? {
                room.players.insert(player.id.clone(), player);
                self.inner.compare_and_swap(&room, version).await?;
            }
        }
        self.inner.delete_if_version(room_id, expected).await
    }

    async fn list_room_ids(&self) -> StoreResult<Vec<String>> {
        self.inner.list_room_ids().await
    }
}

/// A socket-less client: a registered connection and its outbound queue.
pub struct TestClient {
    pub connection_id: ConnectionId,
    pub player_id: PlayerId,
    pub receiver: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    /// Everything queued for this client so far.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// The most recent room state this client was sent.
    pub fn latest_state(&mut self) -> Option<Room> {
        self.drain().into_iter().rev().find_map(|message| match message {
            ServerMessage::RoomStateUpdate { state } => Some(state),
            _ => None,
        })
    }
}

pub struct TestServer {
    pub connection_manager: Arc<ConnectionManager>,
    pub room_manager: Arc<RoomManager>,
    pub auth_service: Arc<AuthService>,
    pub store: Arc<dyn RoomStore>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with(Arc::new(MemoryRoomStore::new()), StubLookup::default())
    }

    pub fn with(store: Arc<dyn RoomStore>, lookup: StubLookup) -> Self {
        let connection_manager = Arc::new(ConnectionManager::new());
        let room_manager = RoomManager::new(
            store.clone(),
            connection_manager.clone(),
            Arc::new(lookup),
            Arc::new(WordBank::from_word_list(TEST_WORDS)),
        );
        Self {
            connection_manager,
            room_manager: Arc::new(room_manager),
            auth_service: Arc::new(AuthService::new_dev_mode()),
            store,
        }
    }

    pub fn with_retries(store: Arc<dyn RoomStore>, max_retries: usize) -> Self {
        let mut server = Self::with(store, StubLookup::default());
        let manager = RoomManager::new(
            server.store.clone(),
            server.connection_manager.clone(),
            Arc::new(StubLookup::default()),
            Arc::new(WordBank::from_word_list(TEST_WORDS)),
        )
        .with_max_retries(max_retries);
        server.room_manager = Arc::new(manager);
        server
    }

    /// Register an anonymous connection.
    pub async fn connect(&self) -> TestClient {
        let connection_id = ConnectionId::new();
        let receiver = self
            .connection_manager
            .register(connection_id)
            .await;
        TestClient {
            connection_id,
            player_id: connection_id.to_string(),
            receiver,
        }
    }

    pub async fn attach(&self, client: &TestClient, room_id: &str) {
        self.connection_manager
            .set_room(client.connection_id, Some(room_id.to_string()))
            .await;
    }

    /// Host creates a room and everyone else joins it, all attached.
    pub async fn room_with(&self, clients: &[&TestClient]) -> String {
        let host = clients[0];
        let room = self
            .room_manager
            .create_room(&host.player_id, "Host", None)
            .await
            .unwrap();
        self.attach(host, &room.id).await;
        for (i, client) in clients.iter().enumerate().skip(1) {
            self.attach(client, &room.id).await;
            self.room_manager
                .join_room(&room.id, &client.player_id, &format!("Player {i}"), None)
                .await
                .unwrap();
        }
        room.id
    }

    /// Room with every player's word submitted and the game started.
    pub async fn started_game(&self, clients: &[(&TestClient, &str)], settings: RoomSettings) -> String {
        let players: Vec<&TestClient> = clients.iter().map(|(c, _)| *c).collect();
        let room_id = self.room_with(&players).await;
        self.room_manager
            .configure_room(
                &room_id,
                &players[0].player_id,
                GameMode::LastOneStanding,
                false,
                None,
                settings,
            )
            .await
            .unwrap();
        for (client, word) in clients {
            self.room_manager
                .submit_word(&room_id, &client.player_id, word)
                .await
                .unwrap();
        }
        self.room_manager
            .start_game(&room_id, &players[0].player_id)
            .await
            .unwrap();
        room_id
    }

    pub async fn stored(&self, room_id: &str) -> Room {
        self.store.load(room_id).await.unwrap().unwrap().room
    }

    /// Overwrite the stored room, bypassing the resolvers.
    pub async fn rewrite(&self, room_id: &str, edit: impl FnOnce(&mut Room)) {
        let VersionedRoom { mut room, version } = self.store.load(room_id).await.unwrap().unwrap();
        edit(&mut room);
        self.store
            .compare_and_swap(&room, version)
            .await
            .unwrap()
            .unwrap();
    }
}
