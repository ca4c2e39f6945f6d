mod common;

use common::*;
use room_core::{WordBank, create_room, join_room};
use room_types::{Phase, PowerUpId};

#[test]
fn test_room_creation() {
    let room = create_room("room-1", "host", "Host", None, NOW);
    assert_eq!(room.phase, Phase::Lobby);
    assert_eq!(room.host_id.as_deref(), Some("host"));
    assert_eq!(room.players.len(), 1);
}

#[test]
fn test_join_is_idempotent() {
    let mut room = create_room("room-1", "host", "Host", None, NOW);
    let changes = join_room(&room, "guest", "Guest", None, NOW + 1);
    commit(&mut room, &changes);
    let changes = join_room(&room, "guest", "Renamed", Some("uid".to_string()), NOW + 2);
    commit(&mut room, &changes);

    assert_eq!(room.players.len(), 2);
    assert_eq!(room.players["guest"].name, "Renamed");
    assert_eq!(room.players["guest"].auth_uid.as_deref(), Some("uid"));
    assert_eq!(room.players["guest"].last_seen, NOW + 2);
}

#[test]
fn test_playing_fixture_is_consistent() {
    let room = playing_room(&[("alice", "apple"), ("bob", "ghost")]);
    assert_invariants(&room);
    assert_eq!(mover(&room), "alice");
}

#[test]
fn test_builtin_word_bank() {
    let bank = WordBank::builtin();
    assert!(bank.contains("lantern"));
}

#[test]
fn test_catalog_prices() {
    assert_eq!(PowerUpId::LetterForLetter.base_price(), 2);
    assert_eq!(PowerUpId::WhatDoYouMean.base_price(), 6);
    assert_eq!(PowerUpId::DoubleDown.base_price(), 1);
}
