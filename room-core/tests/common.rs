#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use room_core::{PurchaseContext, PurchaseRequest, Resolution, available_funds, purchase, resolve_guess};
use room_types::{
    GameMode, GuessEvent, GuessOutcome, Phase, Player, PowerResult, PowerUpId, PowerUpParams,
    Room, Timestamp,
};
use std::collections::HashMap;

pub const NOW: Timestamp = 1_700_000_000_000;

/// Seeded RNG so random reveals are reproducible
pub fn test_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

/// Creates a player holding a secret word
pub fn player_with_word(id: &str, word: &str, wordmoney: u32) -> Player {
    let mut player = Player::new(id, &id.to_uppercase(), NOW);
    player.word = word.to_string();
    player.wordmoney = wordmoney;
    player
}

/// Creates a room mid-game; turn order follows the slice and the first player moves
pub fn playing_room(players: &[(&str, &str)]) -> Room {
    let mut room = Room::default();
    room.id = "test-room".to_string();
    room.phase = Phase::Playing;
    room.created_at = NOW;
    room.current_turn_started_at = Some(NOW);
    for (id, word) in players {
        room.players
            .insert(id.to_string(), player_with_word(id, word, 0));
        room.turn_order.push(id.to_string());
    }
    room.host_id = room.turn_order.first().cloned();
    room.current_turn_index = Some(0);
    room
}

/// Creates a team-mode room from (id, word, team) triples
pub fn team_room(players: &[(&str, &str, &str)]) -> Room {
    let pairs: Vec<(&str, &str)> = players.iter().map(|(id, word, _)| (*id, *word)).collect();
    let mut room = playing_room(&pairs);
    room.game_mode = GameMode::LastTeamStanding;
    for (id, _, team) in players {
        room.players.get_mut(*id).unwrap().team = Some(team.to_string());
    }
    let anchor = room.turn_order[0].clone();
    room.turn_order = room_core::alternating_order(&room, &anchor);
    room
}

pub fn set_wallet(room: &mut Room, id: &str, amount: u32) {
    room.players.get_mut(id).unwrap().wordmoney = amount;
}

pub fn wallet(room: &Room, id: &str) -> u32 {
    available_funds(room, id)
}

pub fn set_mover(room: &mut Room, id: &str) {
    room.current_turn_index = room.turn_order.iter().position(|p| p == id);
}

pub fn mover(room: &Room) -> String {
    room.current_player_id().cloned().unwrap_or_default()
}

pub fn guess_event(from: &str, target: &str, value: &str) -> GuessEvent {
    GuessEvent::new(from, target, value, NOW)
}

pub fn commit(room: &mut Room, resolution: &Resolution) {
    resolution.patch.apply(room);
    assert_invariants(room);
}

/// Resolves and commits a guess, panicking if it is rejected
pub fn apply_guess(room: &mut Room, from: &str, target: &str, value: &str) -> GuessOutcome {
    let resolved = resolve_guess(room, &guess_event(from, target, value), NOW + 1)
        .unwrap_or_else(|e| panic!("guess {value} from {from} rejected: {e}"));
    commit(room, &resolved.resolution);
    resolved.outcome
}

pub fn buy(
    room: &mut Room,
    buyer: &str,
    power_id: PowerUpId,
    target: Option<&str>,
    params: PowerUpParams,
) -> PowerResult {
    let request = PurchaseRequest {
        buyer: buyer.to_string(),
        power_id,
        target: target.map(str::to_string),
        params,
    };
    let context = PurchaseContext {
        now: NOW + 1,
        hint: None,
    };
    let resolved = purchase(room, &request, &context, &mut test_rng())
        .unwrap_or_else(|e| panic!("{power_id:?} from {buyer} rejected: {e}"));
    commit(room, &resolved.resolution);
    resolved.result
}

/// Checks the invariants every committed room must hold
pub fn assert_invariants(room: &Room) {
    if room.turn_order.is_empty() {
        assert_eq!(room.current_turn_index, None);
    } else {
        let index = room.current_turn_index.expect("index set for non-empty order");
        assert!(
            index < room.turn_order.len(),
            "index {index} out of range for {:?}",
            room.turn_order
        );
    }

    let mut seen = Vec::new();
    for id in &room.turn_order {
        assert!(!seen.contains(id), "{id} appears twice in turn order");
        seen.push(id.clone());
    }

    for player in room.players.values() {
        let mut budget: HashMap<char, usize> = HashMap::new();
        for c in player.word.chars() {
            *budget.entry(c).or_default() += 1;
        }
        for c in &player.revealed {
            let left = budget.entry(*c).or_default();
            assert!(*left > 0, "{} revealed more {c} than the word holds", player.id);
            *left -= 1;
        }
    }
}
