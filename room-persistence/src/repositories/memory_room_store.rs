use async_trait::async_trait;
use room_types::{Room, RoomId};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{RoomStore, StoreError, StoreResult, VersionedRoom};

/// Process-local store, used by tests and single-node dev setups.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, VersionedRoom>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn load(&self, room_id: &str) -> StoreResult<Option<VersionedRoom>> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn insert(&self, room: &Room) -> StoreResult<VersionedRoom> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return Err(StoreError::AlreadyExists(room.id.clone()));
        }
        let stored = VersionedRoom {
            room: room.clone(),
            version: 0,
        };
        rooms.insert(room.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn compare_and_swap(&self, room: &Room, expected: u64) -> StoreResult<Option<u64>> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&room.id) {
            Some(stored) if stored.version == expected => {
                stored.room = room.clone();
                stored.version = expected + 1;
                Ok(Some(stored.version))
            }
            _ => Ok(None),
        }
    }

    async fn delete_if_version(&self, room_id: &str, expected: u64) -> StoreResult<bool> {
        let mut rooms = self.rooms.write().await;
        if rooms.get(room_id).is_some_and(|stored| stored.version == expected) {
            rooms.remove(room_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_room_ids(&self) -> StoreResult<Vec<RoomId>> {
        let mut ids: Vec<RoomId> = self.rooms.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
