mod memory_room_store;
mod room_repository;

pub use memory_room_store::MemoryRoomStore;
pub use room_repository::SqlRoomStore;
