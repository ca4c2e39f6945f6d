mod common;

use common::*;
use room_core::{
    LookupHint, PurchaseContext, PurchaseRequest, ResolveError, effective_price, purchase,
    resolve_guess,
};
use room_types::{LookupKind, PowerResult, PowerUpId, PowerUpParams, Room};

fn rich_room() -> Room {
    let mut room = playing_room(&[("alice", "apple"), ("bob", "banana"), ("carol", "cherry")]);
    for id in ["alice", "bob", "carol"] {
        set_wallet(&mut room, id, 20);
    }
    room
}

fn request(buyer: &str, power_id: PowerUpId, target: Option<&str>) -> PurchaseRequest {
    PurchaseRequest {
        buyer: buyer.to_string(),
        power_id,
        target: target.map(str::to_string),
        params: PowerUpParams::default(),
    }
}

fn stake(amount: u32) -> PowerUpParams {
    PowerUpParams {
        stake: Some(amount),
        ..Default::default()
    }
}

#[test]
fn test_double_down_win_pays_fifteen() {
    let mut room = rich_room();

    buy(&mut room, "alice", PowerUpId::DoubleDown, Some("bob"), stake(7));
    assert_eq!(wallet(&room, "alice"), 12);
    assert_eq!(mover(&room), "alice", "double down keeps the turn");

    apply_guess(&mut room, "alice", "bob", "n");

    assert_eq!(wallet(&room, "alice"), 12 + 15);
    assert!(room.players["alice"].double_down.is_none());
    assert_eq!(mover(&room), "bob");
}

#[test]
fn test_double_down_cleared_by_guess_on_other_target() {
    let mut room = rich_room();
    buy(&mut room, "alice", PowerUpId::DoubleDown, Some("bob"), stake(3));

    apply_guess(&mut room, "alice", "carol", "c");

    assert_eq!(wallet(&room, "alice"), 16 + 2);
    assert!(room.players["alice"].double_down.is_none());
}

#[test]
fn test_double_down_stake_limit() {
    let mut room = rich_room();
    set_wallet(&mut room, "alice", 9);

    let too_much = PurchaseRequest {
        params: stake(8),
        ..request("alice", PowerUpId::DoubleDown, Some("bob"))
    };
    let result = purchase(&room, &too_much, &PurchaseContext::default(), &mut test_rng());
    assert!(matches!(result, Err(ResolveError::InsufficientFunds { .. })));

    let allowed = PurchaseRequest {
        params: stake(7),
        ..request("alice", PowerUpId::DoubleDown, Some("bob"))
    };
    assert!(purchase(&room, &allowed, &PurchaseContext::default(), &mut test_rng()).is_ok());
}

#[test]
fn test_insufficient_funds_changes_nothing() {
    let mut room = rich_room();
    set_wallet(&mut room, "alice", 2);

    let result = purchase(
        &room,
        &request("alice", PowerUpId::ZetaDrop, Some("bob")),
        &PurchaseContext::default(),
        &mut test_rng(),
    );

    assert_eq!(
        result.unwrap_err(),
        ResolveError::InsufficientFunds {
            price: 5,
            available: 2
        }
    );
}

#[test]
fn test_zeta_drop_reveals_last_letter_and_pays() {
    let mut room = rich_room();

    let result = buy(&mut room, "alice", PowerUpId::ZetaDrop, Some("bob"), PowerUpParams::default());

    assert_eq!(
        result,
        PowerResult::Revealed {
            letters: vec!['a'],
            awarded: 6
        }
    );
    assert_eq!(wallet(&room, "alice"), 20 - 5 + 6);
    assert_eq!(room.players["bob"].revealed.len(), 3);
    assert_eq!(mover(&room), "bob");
}

#[test]
fn test_every_purchase_is_recorded_for_both_sides() {
    let mut room = rich_room();
    buy(&mut room, "alice", PowerUpId::VowelVision, Some("bob"), PowerUpParams::default());

    let buyer_side = &room.players["alice"].private_power_reveals["bob"];
    let target_side = &room.players["bob"].private_power_reveals["alice"];
    assert_eq!(buyer_side.len(), 1);
    assert_eq!(target_side.len(), 1);
    let record = buyer_side.values().next().unwrap();
    assert_eq!(record.result, PowerResult::VowelCount { count: 3 });
    assert_eq!(wallet(&room, "alice"), 17);
}

#[test]
fn test_repeated_letter_peek_pays_once() {
    let mut room = rich_room();
    let peek = PowerUpParams {
        position: Some(0),
        ..Default::default()
    };

    buy(&mut room, "alice", PowerUpId::LetterPeek, Some("bob"), peek.clone());
    assert_eq!(wallet(&room, "alice"), 20 - 3 + 2);

    set_mover(&mut room, "alice");
    buy(&mut room, "alice", PowerUpId::LetterPeek, Some("bob"), peek);
    assert_eq!(wallet(&room, "alice"), 20 - 3 + 2 - 3);
    assert!(room.players["bob"].revealed.is_empty());
}

#[test]
fn test_letter_scope_pays_per_unknown_occurrence() {
    let mut room = rich_room();
    room.players.get_mut("bob").unwrap().revealed = vec!['n'];
    let scope = PowerUpParams {
        letter: Some('n'),
        ..Default::default()
    };

    let result = buy(&mut room, "alice", PowerUpId::LetterScope, Some("bob"), scope);

    assert_eq!(result, PowerResult::LetterCount { letter: 'n', count: 2 });
    assert_eq!(wallet(&room, "alice"), 20 - 4 + 2);
}

#[test]
fn test_lookup_hint_used_when_fresh() {
    let room = rich_room();
    let context = PurchaseContext {
        now: NOW,
        hint: Some(LookupHint {
            word: "banana".to_string(),
            kind: LookupKind::Related,
            text: "plantain".to_string(),
        }),
    };

    let resolved = purchase(
        &room,
        &request("alice", PowerUpId::RelatedWord, Some("bob")),
        &context,
        &mut test_rng(),
    )
    .unwrap();

    assert_eq!(
        resolved.result,
        PowerResult::Hint {
            kind: LookupKind::Related,
            text: "plantain".to_string()
        }
    );
}

#[test]
fn test_lookup_failure_falls_back_to_two_letters() {
    let mut room = rich_room();

    let result = buy(&mut room, "alice", PowerUpId::SoundCheck, Some("carol"), PowerUpParams::default());

    let PowerResult::HintFallback { letters, awarded } = result else {
        panic!("expected fallback, got {result:?}");
    };
    assert_eq!(letters.len(), 2);
    let revealed = room.players["carol"].revealed.len() as u32;
    assert_eq!(awarded, 2 * revealed);
    assert_eq!(wallet(&room, "alice"), 20 - 5 + awarded);
}

#[test]
fn test_crowd_hint_reveals_without_scoring() {
    let mut room = rich_room();

    buy(&mut room, "alice", PowerUpId::CrowdHint, None, PowerUpParams::default());

    assert_eq!(wallet(&room, "alice"), 15);
    assert_eq!(wallet(&room, "bob"), 20);
    assert!(!room.players["bob"].revealed.is_empty());
    assert!(!room.players["carol"].revealed.is_empty());
    assert!(room.players["alice"].revealed.is_empty());
    let record = room.players["alice"].private_power_reveals["alice"]
        .values()
        .next()
        .unwrap();
    assert!(!record.scoring);
}

#[test]
fn test_price_surge_hits_everyone_else_until_author_moves() {
    let mut room = rich_room();

    buy(&mut room, "alice", PowerUpId::PriceSurge, None, PowerUpParams::default());

    assert_eq!(effective_price(&room, "alice", PowerUpId::LetterPeek), 3);
    assert_eq!(effective_price(&room, "bob", PowerUpId::LetterPeek), 5);

    apply_guess(&mut room, "bob", "carol", "z");
    apply_guess(&mut room, "carol", "bob", "z");
    assert_eq!(mover(&room), "alice");
    assert!(room.price_surge.is_empty());
}

#[test]
fn test_word_freeze_blocks_targeting_until_own_turn() {
    let mut room = rich_room();
    buy(&mut room, "alice", PowerUpId::WordFreeze, None, PowerUpParams::default());
    assert!(room.players["alice"].frozen);

    let frozen = purchase(
        &room,
        &request("bob", PowerUpId::ZetaDrop, Some("alice")),
        &PurchaseContext::default(),
        &mut test_rng(),
    );
    assert_eq!(frozen.unwrap_err(), ResolveError::TargetFrozen);
    let guess = resolve_guess(&room, &guess_event("bob", "alice", "a"), NOW);
    assert!(guess.unwrap_err().is_silent());

    apply_guess(&mut room, "bob", "carol", "z");
    apply_guess(&mut room, "carol", "bob", "z");
    assert!(!room.players["alice"].frozen);
}

#[test]
fn test_team_word_freeze_lasts_until_buyer_moves_again() {
    let mut room = team_room(&[
        ("a1", "apple", "red"),
        ("b1", "grape", "blue"),
        ("a2", "lemon", "red"),
        ("b2", "melon", "blue"),
    ]);
    for id in ["a1", "b1", "a2", "b2"] {
        set_wallet(&mut room, id, 20);
    }
    let first = mover(&room);
    let target = if room.players[&first].team.as_deref() == Some("red") { "b1" } else { "a1" };
    apply_guess(&mut room, &first, target, "z");
    let buyer = mover(&room);

    buy(&mut room, &buyer, PowerUpId::WordFreeze, None, PowerUpParams::default());
    assert_ne!(mover(&room), buyer);

    let mut turns = 0;
    while mover(&room) != buyer {
        assert!(room.players[&buyer].frozen, "freeze lifted before {buyer} moved again");
        let current = mover(&room);
        let target = room
            .alive_players()
            .find(|p| p.team != room.players[&current].team && !p.frozen)
            .map(|p| p.id.clone())
            .unwrap();
        apply_guess(&mut room, &current, &target, "z");
        turns += 1;
        assert!(turns < 8, "{buyer} never got the turn back");
    }
    assert!(turns >= 1);
    assert!(!room.players[&buyer].frozen);
    assert_eq!(room.players[&buyer].frozen_until_turn_index, None);
}

#[test]
fn test_longest_word_bonus_splits_ties_once() {
    let mut room = rich_room();

    let result = buy(&mut room, "alice", PowerUpId::LongestWordBonus, None, PowerUpParams::default());

    assert_eq!(
        result,
        PowerResult::LongestWordBonus {
            winners: vec!["bob".to_string(), "carol".to_string()],
            each: 5
        }
    );
    assert_eq!(wallet(&room, "bob"), 25);
    assert_eq!(wallet(&room, "carol"), 25);
    assert_eq!(wallet(&room, "alice"), 17);

    set_mover(&mut room, "alice");
    let again = purchase(
        &room,
        &request("alice", PowerUpId::LongestWordBonus, None),
        &PurchaseContext::default(),
        &mut test_rng(),
    );
    assert!(matches!(again, Err(ResolveError::InvalidPurchase(_))));
}

#[test]
fn test_opponent_power_needs_other_live_target() {
    let mut room = rich_room();
    room.players.get_mut("carol").unwrap().eliminated = true;

    let own = purchase(
        &room,
        &request("alice", PowerUpId::ZetaDrop, Some("alice")),
        &PurchaseContext::default(),
        &mut test_rng(),
    );
    assert!(matches!(own, Err(ResolveError::InvalidPurchase(_))));

    let eliminated = purchase(
        &room,
        &request("alice", PowerUpId::ZetaDrop, Some("carol")),
        &PurchaseContext::default(),
        &mut test_rng(),
    );
    assert!(matches!(eliminated, Err(ResolveError::StaleTurn(_))));
}
