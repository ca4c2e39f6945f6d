use room_types::{
    GainReason, GuessEvent, GuessOutcome, Phase, PrivateHit, Room, RoomEvent, Timestamp, WORD_UNIT,
};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::lifecycle::finish_if_over;
use crate::patch::{Draft, Resolution, RoomCommand, RoomPatch};
use crate::reveal::unseen_distinct_letters;
use crate::turn_order::{advance_turn, remove_from_turn};

const LETTER_REWARD: i64 = 2;
const WORD_REWARD: i64 = 5;
const WRONG_GUESS_REWARD: i64 = 2;
const PARTICIPATION_REWARD: i64 = 1;

#[derive(Debug, Clone)]
pub struct GuessResolution {
    pub resolution: Resolution,
    pub outcome: GuessOutcome,
}

/// Result of draining one event from a room's inbound queue. The patch always
/// deletes the event, whether or not the guess itself was accepted.
#[derive(Debug, Clone)]
pub struct ProcessedGuess {
    pub key: String,
    pub event: GuessEvent,
    pub resolution: Resolution,
    pub outcome: ResolveResult<GuessOutcome>,
}

fn normalize(value: &str) -> ResolveResult<String> {
    let value = value.trim().to_lowercase();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ResolveError::MalformedEvent(format!(
            "guess must be letters only, got {value:?}"
        )));
    }
    Ok(value)
}

/// Checks shared by every guess. Returns the target id and normalized value.
fn validate(room: &Room, event: &GuessEvent) -> ResolveResult<(String, String)> {
    let target = event
        .target
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ResolveError::MalformedEvent("missing target".to_string()))?;
    let value = event
        .payload
        .value
        .as_deref()
        .ok_or_else(|| ResolveError::MalformedEvent("missing value".to_string()))?;
    let value = normalize(value)?;

    if room.phase != Phase::Playing {
        return Err(ResolveError::StaleTurn(format!(
            "room is in {:?}",
            room.phase
        )));
    }
    if !room.is_current_player(&event.from) {
        return Err(ResolveError::StaleTurn(format!(
            "{} is not the current mover",
            event.from
        )));
    }
    if target == event.from {
        return Err(ResolveError::MalformedEvent(
            "cannot guess against yourself".to_string(),
        ));
    }
    let target_player = room
        .player(target)
        .filter(|p| p.has_word())
        .ok_or_else(|| ResolveError::MalformedEvent(format!("{target} has no word")))?;
    if target_player.eliminated {
        return Err(ResolveError::StaleTurn(format!("{target} is already eliminated")));
    }
    if target_player.frozen {
        return Err(ResolveError::StaleTurn(format!("{target} is frozen")));
    }

    Ok((target.to_string(), value))
}

/// Resolve one guess against a snapshot.
pub fn resolve_guess(
    room: &Room,
    event: &GuessEvent,
    now: Timestamp,
) -> ResolveResult<GuessResolution> {
    let mut draft = Draft::new(room);
    let outcome = apply_guess(&mut draft, event, now)?;
    Ok(GuessResolution {
        resolution: draft.finish(),
        outcome,
    })
}

fn apply_guess(draft: &mut Draft, event: &GuessEvent, now: Timestamp) -> ResolveResult<GuessOutcome> {
    let (target_id, value) = validate(draft.room(), event)?;
    let from = event.from.clone();
    let room_id = draft.room().id.clone();

    let double_down = draft
        .room()
        .player(&from)
        .and_then(|p| p.double_down.clone())
        .filter(|dd| dd.active);
    let doubled = double_down.as_ref().is_some_and(|dd| dd.target == target_id);
    let multiplier = if doubled { 2 } else { 1 };

    let target = draft
        .room()
        .player(&target_id)
        .cloned()
        .ok_or_else(|| ResolveError::PlayerNotFound(target_id.clone()))?;
    let mut new_attempt = true;
    let mut eliminated = false;

    let outcome = if value.chars().count() == 1 {
        let letter = value.chars().next().unwrap_or_default();
        let count = target.occurrences(letter);
        let outcome = if count > 0 {
            let added = draft.reveal(&target_id, &[letter]);
            if added > 0 {
                let awarded = LETTER_REWARD * added as i64 * multiplier;
                draft.credit(&from, awarded, GainReason::LetterHit, now);
                draft.push(RoomCommand::MergePrivateHit {
                    guesser: from.clone(),
                    target: target_id.clone(),
                    hit: PrivateHit::Letter {
                        letter,
                        count: added as u32,
                    },
                });
                if let (true, Some(dd)) = (doubled, double_down.as_ref()) {
                    draft.credit(&from, i64::from(dd.stake), GainReason::DoubleDownReturn, now);
                }
                GuessOutcome::LetterHit {
                    letter,
                    revealed: added as u32,
                    awarded: awarded as u32,
                }
            } else {
                new_attempt = false;
                draft.push(RoomCommand::RecordPrivateWrong {
                    guesser: from.clone(),
                    target: target_id.clone(),
                    letter,
                });
                draft.credit(
                    &target_id,
                    WRONG_GUESS_REWARD * multiplier,
                    GainReason::WrongGuessAgainstYou,
                    now,
                );
                GuessOutcome::LetterRepeat { letter }
            }
        } else {
            new_attempt = !draft
                .room()
                .player(&from)
                .and_then(|p| p.private_wrong.get(&target_id))
                .is_some_and(|wrong| wrong.contains(&letter));
            draft.push(RoomCommand::RecordPrivateWrong {
                guesser: from.clone(),
                target: target_id.clone(),
                letter,
            });
            draft.credit(
                &target_id,
                WRONG_GUESS_REWARD * multiplier,
                GainReason::WrongGuessAgainstYou,
                now,
            );
            GuessOutcome::LetterMiss { letter }
        };
        if count > 0 {
            draft.push(RoomCommand::RecordGuessedBy {
                target: target_id.clone(),
                unit: letter.to_string(),
                guesser: from.clone(),
            });
        }
        outcome
    } else if value == target.word {
        let letters = unseen_distinct_letters(&target);
        if !letters.is_empty() {
            draft.push(RoomCommand::RevealLetters {
                player: target_id.clone(),
                letters,
            });
        }
        draft.credit(&from, WORD_REWARD, GainReason::WordSolved, now);
        if let (true, Some(dd)) = (doubled, double_down.as_ref()) {
            draft.credit(&from, i64::from(dd.stake), GainReason::DoubleDownReturn, now);
        }
        draft.push(RoomCommand::Eliminate {
            player: target_id.clone(),
            at: now,
        });
        draft.push(RoomCommand::RecordGuessedBy {
            target: target_id.clone(),
            unit: WORD_UNIT.to_string(),
            guesser: from.clone(),
        });
        remove_from_turn(draft, &target_id);
        draft.push(RoomCommand::MergePrivateHit {
            guesser: from.clone(),
            target: target_id.clone(),
            hit: PrivateHit::Word {
                word: value.clone(),
            },
        });
        draft.emit(RoomEvent::PlayerEliminated {
            room_id: room_id.clone(),
            player_id: target_id.clone(),
            by: from.clone(),
        });
        eliminated = true;
        GuessOutcome::WordSolved { word: value }
    } else {
        new_attempt = !draft
            .room()
            .player(&from)
            .and_then(|p| p.private_wrong_words.get(&target_id))
            .is_some_and(|wrong| wrong.contains(&value));
        draft.push(RoomCommand::RecordPrivateWrongWord {
            guesser: from.clone(),
            target: target_id.clone(),
            word: value.clone(),
        });
        draft.credit(
            &target_id,
            WRONG_GUESS_REWARD,
            GainReason::WrongGuessAgainstYou,
            now,
        );
        GuessOutcome::WordMiss { word: value }
    };

    if double_down.is_some() {
        draft.push(RoomCommand::SetDoubleDown {
            player: from.clone(),
            double_down: None,
        });
    }

    if new_attempt && !draft.wallet_touched(&from) {
        draft.credit(&from, PARTICIPATION_REWARD, GainReason::Participation, now);
    }

    draft.emit(RoomEvent::GuessResolved {
        room_id,
        from,
        target: target_id,
        outcome: outcome.clone(),
    });

    if !(eliminated && finish_if_over(draft)) {
        advance_turn(draft, now);
    }

    Ok(outcome)
}

/// Append a guess to the room's inbound queue.
pub fn enqueue_guess(event: GuessEvent) -> (String, RoomPatch) {
    let key = format!("{:013}-{}", event.queued_at, uuid::Uuid::new_v4().simple());
    let patch = RoomPatch::single(RoomCommand::EnqueueGuess {
        key: key.clone(),
        event,
    });
    (key, patch)
}

/// Oldest queued guess.
pub fn next_queued(room: &Room) -> Option<(&String, &GuessEvent)> {
    room.queue
        .iter()
        .min_by(|(ka, a), (kb, b)| a.queued_at.cmp(&b.queued_at).then_with(|| ka.cmp(kb)))
}

/// Resolve the oldest queued guess. The returned patch deletes the event in
/// the same commit as its effect; rejected guesses produce a delete-only patch.
pub fn process_next_guess(room: &Room, now: Timestamp) -> Option<ProcessedGuess> {
    let (key, event) = next_queued(room)?;
    let (key, event) = (key.clone(), event.clone());

    let mut draft = Draft::new(room);
    draft.push(RoomCommand::DequeueGuess { key: key.clone() });
    let outcome = apply_guess(&mut draft, &event, now);

    let resolution = match &outcome {
        Ok(_) => draft.finish(),
        Err(error) => {
            debug!(room_id = %room.id, from = %event.from, %error, "Dropping queued guess");
            Resolution::from_patch(RoomPatch::single(RoomCommand::DequeueGuess {
                key: key.clone(),
            }))
        }
    };

    Some(ProcessedGuess {
        key,
        event,
        resolution,
        outcome,
    })
}
