mod common;

use common::*;
use room_core::{StaleSweep, SweepOutcome, evict_players};
use room_types::{Phase, Room};

fn team_of(room: &Room, id: &str) -> String {
    room.players[id].team.clone().unwrap_or_default()
}

fn three_vs_two() -> Room {
    team_room(&[
        ("r1", "apple", "red"),
        ("r2", "lemon", "red"),
        ("r3", "mango", "red"),
        ("b1", "grape", "blue"),
        ("b2", "melon", "blue"),
    ])
}

/// Any living opponent on another team, for wrong-letter guesses
fn opponent(room: &Room, mover: &str) -> String {
    room.alive_players()
        .find(|p| p.id != mover && p.team != room.players[mover].team)
        .map(|p| p.id.clone())
        .unwrap()
}

#[test]
fn test_teams_of_three_and_two_alternate() {
    let mut room = three_vs_two();
    let mut movers = vec![mover(&room)];

    for _ in 0..20 {
        let current = mover(&room);
        let target = opponent(&room, &current);
        apply_guess(&mut room, &current, &target, "z");
        movers.push(mover(&room));
    }

    for pair in movers.windows(2) {
        assert_ne!(
            team_of(&room, &pair[0]),
            team_of(&room, &pair[1]),
            "back-to-back moves in {movers:?}"
        );
    }
    // everyone gets a turn
    for id in ["r1", "r2", "r3", "b1", "b2"] {
        assert!(movers.contains(&id.to_string()), "{id} never moved");
    }
}

#[test]
fn test_alternation_survives_elimination() {
    let mut room = three_vs_two();
    let mut movers = Vec::new();

    for turn in 0..16 {
        let current = mover(&room);
        movers.push(current.clone());
        let target = opponent(&room, &current);
        if turn == 1 {
            let word = room.players[&target].word.clone();
            apply_guess(&mut room, &current, &target, &word);
        } else {
            apply_guess(&mut room, &current, &target, "z");
        }
        if room.phase != Phase::Playing {
            break;
        }
    }

    for pair in movers.windows(2) {
        assert_ne!(team_of(&room, &pair[0]), team_of(&room, &pair[1]));
    }
}

#[test]
fn test_default_rotation_wraps() {
    let mut room = playing_room(&[("a", "apple"), ("b", "banana"), ("c", "cherry")]);
    let mut movers = Vec::new();
    for _ in 0..4 {
        let current = mover(&room);
        let target = if current == "a" { "b" } else { "a" };
        apply_guess(&mut room, &current, target, "q");
        movers.push(mover(&room));
    }
    assert_eq!(movers, vec!["b", "c", "a", "b"]);
}

#[test]
fn test_evicting_mover_starts_followers_turn() {
    let mut room = playing_room(&[("a", "apple"), ("b", "banana"), ("c", "cherry")]);
    set_mover(&mut room, "c");

    let SweepOutcome::Updated(resolution) = evict_players(&room, &["c".to_string()], NOW + 9)
    else {
        panic!("expected an update");
    };
    commit(&mut room, &resolution);

    assert_eq!(room.turn_order, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(mover(&room), "a");
    assert_eq!(room.current_turn_started_at, Some(NOW + 9));
}

#[test]
fn test_stale_sweep_ends_game_when_one_left() {
    let mut room = playing_room(&[("a", "apple"), ("b", "banana")]);
    room.players.get_mut("a").unwrap().last_seen = NOW + 30 * 60_000;

    let sweep = StaleSweep::default();
    let SweepOutcome::Updated(resolution) = sweep.sweep_room(&room, NOW + 30 * 60_000) else {
        panic!("expected an update");
    };
    commit(&mut room, &resolution);

    assert!(!room.players.contains_key("b"));
    assert_eq!(room.phase, Phase::Ended);
    assert_eq!(room.winner.as_deref(), Some("a"));
}
