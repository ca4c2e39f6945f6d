use room_persistence::connection::connect_to_memory_database;
use room_persistence::{MemoryRoomStore, RoomStore, SqlRoomStore, StoreError};
use room_types::{Phase, Player, Room};

fn sample_room(id: &str) -> Room {
    Room::new(id, Player::new("host", "Host", 1_000), 1_000)
}

async fn sql_store() -> SqlRoomStore {
    let db = connect_to_memory_database().await.unwrap();
    SqlRoomStore::new(db)
}

/// Behaviour every store implementation must share
async fn exercise_store(store: &dyn RoomStore) {
    assert!(store.load("missing").await.unwrap().is_none());

    let inserted = store.insert(&sample_room("alpha")).await.unwrap();
    assert_eq!(inserted.version, 0);
    assert!(matches!(
        store.insert(&sample_room("alpha")).await,
        Err(StoreError::AlreadyExists(_))
    ));

    let mut changed = inserted.room.clone();
    changed.phase = Phase::Submit;
    assert_eq!(store.compare_and_swap(&changed, 0).await.unwrap(), Some(1));

    // a writer still holding version 0 loses
    let mut stale = inserted.room.clone();
    stale.phase = Phase::Ended;
    assert_eq!(store.compare_and_swap(&stale, 0).await.unwrap(), None);

    let loaded = store.load("alpha").await.unwrap().unwrap();
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.room, changed);

    store.insert(&sample_room("beta")).await.unwrap();
    let mut ids = store.list_room_ids().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["alpha".to_string(), "beta".to_string()]);

    // deleting from a stale read leaves the room alone
    assert!(!store.delete_if_version("alpha", 0).await.unwrap());
    assert!(store.load("alpha").await.unwrap().is_some());
    assert!(store.delete_if_version("alpha", 1).await.unwrap());
    assert!(!store.delete_if_version("alpha", 1).await.unwrap());
    assert!(store.load("alpha").await.unwrap().is_none());
    assert_eq!(store.compare_and_swap(&changed, 1).await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_store() {
    exercise_store(&MemoryRoomStore::new()).await;
}

#[tokio::test]
async fn test_sql_store() {
    let store = sql_store().await;
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_sql_store_round_trips_full_document() {
    let store = sql_store().await;
    let mut room = sample_room("gamma");
    room.phase = Phase::Playing;
    room.turn_order = vec!["host".to_string()];
    room.current_turn_index = Some(0);
    if let Some(host) = room.players.get_mut("host") {
        host.word = "apple".to_string();
        host.revealed = vec!['p', 'p'];
        host.wordmoney = 7;
    }

    store.insert(&room).await.unwrap();
    let loaded = store.load("gamma").await.unwrap().unwrap();

    assert_eq!(loaded.room, room);
}
