pub mod connection;
pub mod entities;
pub mod repositories;

use async_trait::async_trait;
use room_types::{Room, RoomId};
use sea_orm::DbErr;

pub use repositories::{MemoryRoomStore, SqlRoomStore};

/// A room document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRoom {
    pub room: Room,
    pub version: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Room {0} already exists")]
    AlreadyExists(RoomId),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Malformed room document: {0}")]
    Document(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Versioned storage for room documents.
///
/// Writers read a [`VersionedRoom`], compute their change against it and
/// commit with [`RoomStore::compare_and_swap`]. A write only lands if nobody
/// else committed in between.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn load(&self, room_id: &str) -> StoreResult<Option<VersionedRoom>>;

    async fn insert(&self, room: &Room) -> StoreResult<VersionedRoom>;

    /// Replace the stored room if its version is still `expected`.
    /// Returns the new version, or `None` when another writer got there
    /// first or the room is gone.
    async fn compare_and_swap(&self, room: &Room, expected: u64) -> StoreResult<Option<u64>>;

    /// Remove the room if its version is still `expected`. Returns false
    /// when it changed since it was read or is already gone.
    async fn delete_if_version(&self, room_id: &str, expected: u64) -> StoreResult<bool>;

    async fn list_room_ids(&self) -> StoreResult<Vec<RoomId>>;
}
