mod common;

use common::*;
use room_core::{already_handled, resolve_timeout};
use room_types::{Room, TimeoutRecord};

fn timed_room() -> Room {
    let mut room = playing_room(&[("a", "apple"), ("b", "banana"), ("c", "cherry")]);
    room.timed = true;
    room.turn_timeout_seconds = Some(60);
    for id in ["a", "b", "c"] {
        set_wallet(&mut room, id, 5);
    }
    room
}

const LATE: i64 = NOW + 61_000;

#[test]
fn test_expired_turn_is_penalized_and_advanced() {
    let mut room = timed_room();

    let resolution = resolve_timeout(&room, LATE).unwrap();
    commit(&mut room, &resolution);

    assert_eq!(wallet(&room, "a"), 3);
    assert_eq!(mover(&room), "b");
    assert_eq!(room.current_turn_started_at, Some(LATE));
    assert_eq!(room.timeouts.len(), 1);
    let record = room.timeouts.values().next().unwrap();
    assert_eq!(record.player, "a");
    assert_eq!(record.deducted, 2);
    assert_eq!(record.turn_started_at, NOW);
}

#[test]
fn test_replay_is_idempotent() {
    let mut room = timed_room();
    let changes = resolve_timeout(&room, LATE).unwrap();
    commit(&mut room, &changes);
    let after_first = room.clone();

    // the sweep fires again within the same tick
    assert!(resolve_timeout(&room, LATE).is_none());
    assert!(resolve_timeout(&room, LATE + 1_000).is_none());
    assert_eq!(room, after_first);
}

#[test]
fn test_existing_record_for_current_turn_is_skipped() {
    let mut room = timed_room();
    room.timeouts.insert(
        "other-writer".to_string(),
        TimeoutRecord {
            player: "a".to_string(),
            deducted: 2,
            ts: LATE,
            turn_started_at: NOW,
            next_turn_started_at: None,
        },
    );

    assert!(already_handled(&room));
    assert!(resolve_timeout(&room, LATE).is_none());
    assert_eq!(wallet(&room, "a"), 5);
    assert_eq!(room.timeouts.len(), 1);
}

#[test]
fn test_consecutive_expired_turns_each_penalized_once() {
    let mut room = timed_room();
    let changes = resolve_timeout(&room, LATE).unwrap();
    commit(&mut room, &changes);

    let later = LATE + 61_000;
    let changes = resolve_timeout(&room, later).unwrap();
    commit(&mut room, &changes);

    assert_eq!(wallet(&room, "a"), 3);
    assert_eq!(wallet(&room, "b"), 3);
    assert_eq!(room.timeouts.len(), 2);
    assert_eq!(mover(&room), "c");
}

#[test]
fn test_guess_before_sweep_resets_deadline() {
    let mut room = timed_room();
    // a guess lands just before the sweep runs
    let resolved = room_core::resolve_guess(&room, &guess_event("a", "b", "q"), LATE - 1).unwrap();
    commit(&mut room, &resolved.resolution);

    assert!(resolve_timeout(&room, LATE).is_none());
    assert!(room.timeouts.is_empty());
}
