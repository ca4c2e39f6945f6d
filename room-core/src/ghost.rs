use rand::Rng;
use room_types::{GhostChallenge, GhostGuess, GhostState, Phase, Player, Room, RoomEvent, Timestamp};
use tracing::{info, warn};

use crate::error::{ResolveError, ResolveResult};
use crate::patch::{Draft, Resolution, RoomCommand};
use crate::turn_order::reinsert_player;
use crate::word_bank::WordBank;

#[derive(Debug, Clone)]
pub struct GhostGuessResolution {
    pub resolution: Resolution,
    pub positions: Vec<usize>,
    pub correct: bool,
}

fn eligible_ghost<'a>(room: &'a Room, player_id: &str) -> ResolveResult<&'a Player> {
    if room.phase != Phase::Playing {
        return Err(ResolveError::InvalidPhase(format!("{:?}", room.phase)));
    }
    if !room.settings.ghost_reentry_enabled {
        return Err(ResolveError::GhostUnavailable(
            "ghost re-entry is disabled".to_string(),
        ));
    }
    let player = room
        .player(player_id)
        .ok_or_else(|| ResolveError::PlayerNotFound(player_id.to_string()))?;
    if !player.eliminated {
        return Err(ResolveError::GhostUnavailable(
            "only eliminated players can re-enter".to_string(),
        ));
    }
    if player.has_reentered() {
        return Err(ResolveError::GhostUnavailable(
            "already re-entered this game".to_string(),
        ));
    }
    if room.alive_count() < 2 {
        return Err(ResolveError::GhostUnavailable(
            "too few players remain".to_string(),
        ));
    }
    Ok(player)
}

fn new_challenge(
    room: &Room,
    bank: &WordBank,
    exclude: Option<&str>,
    rng: &mut impl Rng,
    now: Timestamp,
) -> anyhow::Result<GhostChallenge> {
    let word = bank.random_word(room.settings.theme.as_deref(), exclude, rng)?;
    Ok(GhostChallenge {
        key: uuid::Uuid::new_v4().to_string(),
        word,
        ts: now,
    })
}

/// Enroll an eliminated player in the room's shared re-entry challenge,
/// creating the challenge if nobody has yet.
pub fn request_reentry(
    room: &Room,
    player_id: &str,
    bank: &WordBank,
    rng: &mut impl Rng,
    now: Timestamp,
) -> ResolveResult<Resolution> {
    let player = eligible_ghost(room, player_id)?;
    let mut draft = Draft::new(room);

    let challenge = match &room.ghost_challenge {
        Some(challenge) => challenge.clone(),
        None => {
            let challenge = new_challenge(room, bank, None, rng, now)
                .map_err(|e| ResolveError::GhostUnavailable(e.to_string()))?;
            draft.push(RoomCommand::SetGhostChallenge {
                challenge: Some(challenge.clone()),
            });
            draft.emit(RoomEvent::GhostChallengeCreated {
                room_id: room.id.clone(),
            });
            challenge
        }
    };

    let mut state = player.ghost_state.clone().unwrap_or_default();
    state.attempted_at = Some(now);
    state.challenge_key = Some(challenge.key);
    draft.push(RoomCommand::SetGhostState {
        player: player_id.to_string(),
        state,
    });
    Ok(draft.finish())
}

/// Positions (0-based) of `letter` in `word`.
pub fn letter_positions(word: &str, letter: char) -> Vec<usize> {
    word.chars()
        .enumerate()
        .filter(|(_, c)| *c == letter)
        .map(|(i, _)| i)
        .collect()
}

pub fn ghost_guess(
    room: &Room,
    player_id: &str,
    value: &str,
    bank: &WordBank,
    rng: &mut impl Rng,
    now: Timestamp,
) -> ResolveResult<GhostGuessResolution> {
    let player = eligible_ghost(room, player_id)?;
    if player.ghost_state.is_none() {
        return Err(ResolveError::GhostUnavailable(
            "request re-entry first".to_string(),
        ));
    }
    let challenge = room
        .ghost_challenge
        .clone()
        .ok_or_else(|| ResolveError::GhostUnavailable("no active challenge".to_string()))?;

    let cooldown_ms = room.settings.ghost_cooldown_seconds.saturating_mul(1000) as i64;
    if let Some(last) = player.ghost_last_guess_at {
        let ready_at = last.saturating_add(cooldown_ms);
        if now < ready_at {
            let remaining_ms = (ready_at - now) as u64;
            return Err(ResolveError::GhostCooldown {
                retry_after_seconds: remaining_ms.div_ceil(1000),
            });
        }
    }

    let value = value.trim().to_lowercase();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ResolveError::InvalidWord(
            "guesses may only contain letters a-z".to_string(),
        ));
    }

    let (positions, correct) = if value.chars().count() == 1 {
        let letter = value.chars().next().unwrap_or_default();
        let positions = letter_positions(&challenge.word, letter);
        let hit = !positions.is_empty();
        (positions, hit)
    } else {
        (Vec::new(), value == challenge.word)
    };

    let mut draft = Draft::new(room);
    draft.push(RoomCommand::RecordGhostGuess {
        player: player_id.to_string(),
        guess: GhostGuess {
            challenge_key: challenge.key.clone(),
            value: value.clone(),
            positions: positions.clone(),
            correct,
            ts: now,
        },
        at: now,
    });

    if correct && value.chars().count() > 1 {
        reenter(&mut draft, player_id, &challenge, bank, rng, now);
    }

    Ok(GhostGuessResolution {
        resolution: draft.finish(),
        positions,
        correct,
    })
}

fn reenter(
    draft: &mut Draft,
    player_id: &str,
    solved: &GhostChallenge,
    bank: &WordBank,
    rng: &mut impl Rng,
    now: Timestamp,
) {
    let room_id = draft.room().id.clone();
    draft.push(RoomCommand::Reenter {
        player: player_id.to_string(),
        word: solved.word.clone(),
    });
    draft.push(RoomCommand::SetGhostState {
        player: player_id.to_string(),
        state: GhostState {
            reentered: true,
            attempted_at: Some(now),
            challenge_key: Some(solved.key.clone()),
        },
    });

    let next = match new_challenge(draft.room(), bank, Some(&solved.word), rng, now) {
        Ok(challenge) => Some(challenge),
        Err(error) => {
            warn!(%room_id, %error, "Could not rotate ghost challenge");
            None
        }
    };
    draft.push(RoomCommand::SetGhostChallenge { challenge: next });
    draft.push(RoomCommand::ClearGhostGuesses);
    draft.push(RoomCommand::ScrubHistoryOf {
        player: player_id.to_string(),
    });
    reinsert_player(draft, player_id);

    draft.emit(RoomEvent::GhostReentered {
        room_id: room_id.clone(),
        player_id: player_id.to_string(),
    });
    info!(%room_id, player = player_id, "Ghost re-entered the game");
}
