use std::collections::BTreeMap;

use rand::Rng;
use room_types::{
    DoubleDown, GainReason, LookupKind, Phase, Player, PlayerId, PowerResult, PowerRevealRecord,
    PowerUpId, PowerUpParams, PriceSurge, Room, RoomEvent, Timestamp,
};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::patch::{Draft, Resolution, RoomCommand};
use crate::reveal::{pick_unrevealed, pick_unrevealed_many};
use crate::turn_order::advance_turn;
use crate::wallet::available_funds;

const REVEAL_REWARD: i64 = 2;
const SURGE_AMOUNT: u32 = 2;
const LONGEST_WORD_PRIZE: u32 = 10;
const FALLBACK_LETTERS: usize = 2;
const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];
const RARE_LETTERS: &[char] = &['j', 'k', 'q', 'v', 'x', 'z'];

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRequest {
    pub buyer: PlayerId,
    pub power_id: PowerUpId,
    pub target: Option<PlayerId>,
    pub params: PowerUpParams,
}

/// Result of an external lookup fetched before the purchase is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupHint {
    /// The word the lookup was made for; a hint for a stale word is ignored.
    pub word: String,
    pub kind: LookupKind,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseContext {
    pub now: Timestamp,
    pub hint: Option<LookupHint>,
}

#[derive(Debug, Clone)]
pub struct PurchaseResolution {
    pub resolution: Resolution,
    pub result: PowerResult,
}

pub fn lookup_kind(power_id: PowerUpId) -> Option<LookupKind> {
    match power_id {
        PowerUpId::WhatDoYouMean => Some(LookupKind::Definition),
        PowerUpId::RelatedWord => Some(LookupKind::Related),
        PowerUpId::SoundCheck => Some(LookupKind::Rhyme),
        _ => None,
    }
}

/// Base price plus every active surge not authored by the buyer or a teammate.
pub fn effective_price(room: &Room, buyer: &str, power_id: PowerUpId) -> u32 {
    room.price_surge
        .values()
        .filter(|surge| surge.by != buyer && !room.are_teammates(buyer, &surge.by))
        .fold(power_id.base_price(), |price, surge| {
            price.saturating_add(surge.amount)
        })
}

/// Highest count of each letter the buyer has already learned privately about
/// this target through scoring power-ups.
fn learned_counts(buyer: &Player, target: &str) -> BTreeMap<char, u32> {
    let mut learned = BTreeMap::new();
    let Some(records) = buyer.private_power_reveals.get(target) else {
        return learned;
    };
    for record in records.values().filter(|r| r.scoring) {
        let (letter, count) = match &record.result {
            PowerResult::LetterPeek {
                letter: Some(letter),
                ..
            } => (*letter, 1),
            PowerResult::LetterCount { letter, count } => (*letter, *count),
            _ => continue,
        };
        let known = learned.entry(letter).or_insert(0);
        *known = (*known).max(count);
    }
    learned
}

struct Effect {
    result: PowerResult,
    scoring: bool,
}

impl Effect {
    fn scoring(result: PowerResult) -> Self {
        Self {
            result,
            scoring: true,
        }
    }

    fn informational(result: PowerResult) -> Self {
        Self {
            result,
            scoring: false,
        }
    }
}

fn check_preconditions(room: &Room, request: &PurchaseRequest, price: u32) -> ResolveResult<()> {
    if room.phase != Phase::Playing {
        return Err(ResolveError::InvalidPhase(format!("{:?}", room.phase)));
    }
    let buyer = room
        .player(&request.buyer)
        .ok_or_else(|| ResolveError::PlayerNotFound(request.buyer.clone()))?;
    if !room.is_current_player(&buyer.id) {
        return Err(ResolveError::StaleTurn(format!(
            "{} is not the current mover",
            buyer.id
        )));
    }

    if request.power_id.is_opponent_type() {
        let target_id = request
            .target
            .as_deref()
            .ok_or_else(|| ResolveError::InvalidPurchase("a target is required".to_string()))?;
        if target_id == buyer.id {
            return Err(ResolveError::InvalidPurchase(
                "cannot target yourself".to_string(),
            ));
        }
        let target = room
            .player(target_id)
            .ok_or_else(|| ResolveError::PlayerNotFound(target_id.to_string()))?;
        if target.eliminated || !target.has_word() {
            return Err(ResolveError::StaleTurn(format!(
                "{target_id} is no longer in play"
            )));
        }
        if target.frozen {
            return Err(ResolveError::TargetFrozen);
        }
    }

    let available = available_funds(room, &buyer.id);
    if price > available {
        return Err(ResolveError::InsufficientFunds { price, available });
    }

    match request.power_id {
        PowerUpId::DoubleDown => {
            if buyer.double_down.as_ref().is_some_and(|dd| dd.active) {
                return Err(ResolveError::InvalidPurchase(
                    "a double down is already active".to_string(),
                ));
            }
            let stake = request.params.stake.unwrap_or(0);
            if stake == 0 {
                return Err(ResolveError::InvalidPurchase(
                    "double down needs a stake of at least 1".to_string(),
                ));
            }
            let limit = available.saturating_sub(price).saturating_sub(1);
            if stake > limit {
                return Err(ResolveError::InsufficientFunds {
                    price: price.saturating_add(stake).saturating_add(1),
                    available,
                });
            }
        }
        PowerUpId::LongestWordBonus => {
            if room.used_longest_word_bonus.contains(&buyer.id) {
                return Err(ResolveError::InvalidPurchase(
                    "longest word bonus already used".to_string(),
                ));
            }
        }
        PowerUpId::LetterScope => {
            if !request
                .params
                .letter
                .is_some_and(|c| c.is_ascii_alphabetic())
            {
                return Err(ResolveError::InvalidPurchase(
                    "letter scope needs a letter".to_string(),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resolve a power-up purchase against a snapshot.
pub fn purchase(
    room: &Room,
    request: &PurchaseRequest,
    context: &PurchaseContext,
    rng: &mut impl Rng,
) -> ResolveResult<PurchaseResolution> {
    let price = effective_price(room, &request.buyer, request.power_id);
    check_preconditions(room, request, price)?;

    let now = context.now;
    let buyer_id = request.buyer.clone();
    let mut draft = Draft::new(room);
    draft.credit(&buyer_id, -i64::from(price), GainReason::PowerUpCost, now);

    let target_id = request
        .target
        .clone()
        .filter(|_| request.power_id.is_opponent_type());
    let effect = match &target_id {
        Some(target_id) => apply_opponent_effect(&mut draft, request, target_id, context, rng)?,
        None => apply_self_effect(&mut draft, request, now, rng)?,
    };

    let record = PowerRevealRecord {
        power_id: request.power_id,
        from: buyer_id.clone(),
        to: target_id.clone().unwrap_or_else(|| buyer_id.clone()),
        result: effect.result.clone(),
        ts: now,
        scoring: effect.scoring,
    };
    let event_id = format!("{now}-{}", uuid::Uuid::new_v4().simple());
    draft.push(RoomCommand::RecordPowerReveal {
        owner: buyer_id.clone(),
        counterpart: record.to.clone(),
        event_id: event_id.clone(),
        record: record.clone(),
    });
    if let Some(target_id) = &target_id {
        draft.push(RoomCommand::RecordPowerReveal {
            owner: target_id.clone(),
            counterpart: buyer_id.clone(),
            event_id,
            record,
        });
    }

    draft.emit(RoomEvent::PowerUpUsed {
        room_id: room.id.clone(),
        from: buyer_id.clone(),
        target: target_id,
        power_id: request.power_id,
    });
    debug!(room_id = %room.id, buyer = %buyer_id, power = ?request.power_id, price, "Power-up resolved");

    if request.power_id.advances_turn() {
        advance_turn(&mut draft, now);
    }

    Ok(PurchaseResolution {
        resolution: draft.finish(),
        result: effect.result,
    })
}

/// Reveal letters publicly and pay the buyer for each new occurrence.
fn reveal_and_reward(
    draft: &mut Draft,
    buyer: &str,
    target: &str,
    letters: &[char],
    now: Timestamp,
) -> u32 {
    let added = draft.reveal(target, letters);
    let awarded = REVEAL_REWARD * added as i64;
    draft.credit(buyer, awarded, GainReason::PowerUpReveal, now);
    awarded as u32
}

fn apply_opponent_effect(
    draft: &mut Draft,
    request: &PurchaseRequest,
    target_id: &str,
    context: &PurchaseContext,
    rng: &mut impl Rng,
) -> ResolveResult<Effect> {
    let now = context.now;
    let buyer_id = request.buyer.as_str();
    let target = draft
        .room()
        .player(target_id)
        .cloned()
        .ok_or_else(|| ResolveError::PlayerNotFound(target_id.to_string()))?;
    let buyer = draft
        .room()
        .player(buyer_id)
        .cloned()
        .ok_or_else(|| ResolveError::PlayerNotFound(buyer_id.to_string()))?;
    let learned = learned_counts(&buyer, target_id);
    let letters: Vec<char> = target.word.chars().collect();

    let effect = match request.power_id {
        PowerUpId::LetterPeek => {
            let position = match request.params.position {
                Some(position) if position < letters.len() => position,
                Some(position) => {
                    return Err(ResolveError::InvalidPurchase(format!(
                        "position {position} is outside the word"
                    )));
                }
                None => {
                    let hidden: Vec<usize> = (0..letters.len())
                        .filter(|&i| target.revealed_count(letters[i]) == 0)
                        .collect();
                    if hidden.is_empty() {
                        rng.gen_range(0..letters.len())
                    } else {
                        hidden[rng.gen_range(0..hidden.len())]
                    }
                }
            };
            let letter = letters[position];
            let already_known =
                target.revealed_count(letter) > 0 || learned.get(&letter).is_some_and(|&c| c > 0);
            if !already_known {
                draft.credit(buyer_id, REVEAL_REWARD, GainReason::PowerUpReveal, now);
            }
            Effect::scoring(PowerResult::LetterPeek {
                position,
                letter: Some(letter),
            })
        }
        PowerUpId::VowelVision => {
            let count = letters.iter().filter(|c| VOWELS.contains(c)).count() as u32;
            Effect::informational(PowerResult::VowelCount { count })
        }
        PowerUpId::LetterScope => {
            let letter = request
                .params
                .letter
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or_default();
            let count = target.occurrences(letter) as u32;
            let known = (target.revealed_count(letter) as u32)
                .max(learned.get(&letter).copied().unwrap_or(0));
            let fresh = count.saturating_sub(known);
            draft.credit(
                buyer_id,
                REVEAL_REWARD * i64::from(fresh),
                GainReason::PowerUpReveal,
                now,
            );
            Effect::scoring(PowerResult::LetterCount { letter, count })
        }
        PowerUpId::RareTrace => {
            let count = letters.iter().filter(|c| RARE_LETTERS.contains(c)).count() as u32;
            Effect::informational(PowerResult::RareCount { count })
        }
        PowerUpId::OneRandomLetter => match pick_unrevealed(&target, rng) {
            Some(letter) => {
                let awarded = reveal_and_reward(draft, buyer_id, target_id, &[letter], now);
                Effect::scoring(PowerResult::Revealed {
                    letters: vec![letter],
                    awarded,
                })
            }
            None => Effect::scoring(PowerResult::NoEffect),
        },
        PowerUpId::ZetaDrop => match letters.last() {
            Some(&letter) => {
                let awarded = reveal_and_reward(draft, buyer_id, target_id, &[letter], now);
                Effect::scoring(PowerResult::Revealed {
                    letters: vec![letter],
                    awarded,
                })
            }
            None => Effect::scoring(PowerResult::NoEffect),
        },
        PowerUpId::LetterForLetter => {
            let target_letter = pick_unrevealed(&target, rng);
            let awarded = match target_letter {
                Some(letter) => reveal_and_reward(draft, buyer_id, target_id, &[letter], now),
                None => 0,
            };
            let own_letter = pick_unrevealed(&buyer, rng);
            if let Some(letter) = own_letter {
                draft.reveal(buyer_id, &[letter]);
            }
            Effect::scoring(PowerResult::LetterForLetter {
                target_letter,
                own_letter,
                awarded,
            })
        }
        PowerUpId::WhatDoYouMean | PowerUpId::RelatedWord | PowerUpId::SoundCheck => {
            let expected = lookup_kind(request.power_id);
            let hint = context
                .hint
                .as_ref()
                .filter(|hint| Some(hint.kind) == expected && hint.word == target.word);
            match hint {
                Some(hint) => Effect::informational(PowerResult::Hint {
                    kind: hint.kind,
                    text: hint.text.clone(),
                }),
                None => {
                    debug!(power = ?request.power_id, "Lookup unavailable, revealing letters instead");
                    let picked = pick_unrevealed_many(&target, FALLBACK_LETTERS, rng);
                    let awarded = reveal_and_reward(draft, buyer_id, target_id, &picked, now);
                    Effect::scoring(PowerResult::HintFallback {
                        letters: picked,
                        awarded,
                    })
                }
            }
        }
        PowerUpId::DoubleDown => {
            let stake = request.params.stake.unwrap_or(0);
            draft.credit(
                buyer_id,
                -i64::from(stake),
                GainReason::DoubleDownStake,
                now,
            );
            draft.push(RoomCommand::SetDoubleDown {
                player: buyer_id.to_string(),
                double_down: Some(DoubleDown {
                    active: true,
                    stake,
                    target: target_id.to_string(),
                }),
            });
            Effect::informational(PowerResult::DoubleDown { stake })
        }
        other => {
            return Err(ResolveError::InvalidPurchase(format!(
                "{other:?} does not take a target"
            )));
        }
    };
    Ok(effect)
}

fn apply_self_effect(
    draft: &mut Draft,
    request: &PurchaseRequest,
    now: Timestamp,
    rng: &mut impl Rng,
) -> ResolveResult<Effect> {
    let buyer_id = request.buyer.as_str();
    let current_index = draft.room().current_turn_index.unwrap_or(0);

    let effect = match request.power_id {
        PowerUpId::CrowdHint => {
            let others: Vec<Player> = draft
                .room()
                .players
                .values()
                .filter(|p| p.id != buyer_id && p.is_alive() && !p.frozen)
                .cloned()
                .collect();
            let mut revealed = BTreeMap::new();
            for player in others {
                if let Some(letter) = pick_unrevealed(&player, rng) {
                    draft.reveal(&player.id, &[letter]);
                    revealed.insert(player.id.clone(), letter);
                }
            }
            Effect::informational(PowerResult::CrowdHint { letters: revealed })
        }
        PowerUpId::WordFreeze => {
            draft.push(RoomCommand::Freeze {
                player: buyer_id.to_string(),
                until_turn_index: current_index,
            });
            Effect::informational(PowerResult::Frozen {
                until_turn_index: current_index,
            })
        }
        PowerUpId::PriceSurge => {
            draft.push(RoomCommand::SetPriceSurge {
                author: buyer_id.to_string(),
                surge: Some(PriceSurge {
                    amount: SURGE_AMOUNT,
                    by: buyer_id.to_string(),
                    expires_at_turn_index: Some(current_index),
                }),
            });
            Effect::informational(PowerResult::PriceSurge {
                amount: SURGE_AMOUNT,
            })
        }
        PowerUpId::LongestWordBonus => {
            let room = draft.room();
            let longest = room
                .players
                .values()
                .filter(|p| p.has_word())
                .map(|p| p.word.chars().count())
                .max()
                .unwrap_or(0);
            let winners: Vec<PlayerId> = room
                .players
                .values()
                .filter(|p| p.has_word() && p.word.chars().count() == longest)
                .map(|p| p.id.clone())
                .collect();
            let each = if winners.is_empty() {
                0
            } else {
                LONGEST_WORD_PRIZE / winners.len() as u32
            };
            for winner in &winners {
                draft.credit(winner, i64::from(each), GainReason::LongestWordBonus, now);
            }
            draft.push(RoomCommand::MarkLongestWordBonus {
                player: buyer_id.to_string(),
            });
            Effect::informational(PowerResult::LongestWordBonus { winners, each })
        }
        other => {
            return Err(ResolveError::InvalidPurchase(format!(
                "{other:?} needs a target"
            )));
        }
    };
    Ok(effect)
}
