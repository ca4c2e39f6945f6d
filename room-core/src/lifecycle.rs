use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use room_types::{
    GameMode, Phase, Player, PlayerId, Room, RoomEvent, RoomSettings, TeamName, Timestamp,
};
use tracing::info;

use crate::error::{ResolveError, ResolveResult};
use crate::patch::{Draft, Resolution, RoomCommand};
use crate::turn_order::{alternating_order, begin_turn};
use crate::wallet::available_funds;

fn phase_name(phase: Phase) -> String {
    format!("{phase:?}")
}

fn require_host(room: &Room, requester: &str) -> ResolveResult<()> {
    if room.host_id.as_deref() == Some(requester) {
        Ok(())
    } else {
        Err(ResolveError::NotHost)
    }
}

fn require_setup_phase(room: &Room) -> ResolveResult<()> {
    match room.phase {
        Phase::Lobby | Phase::Submit => Ok(()),
        other => Err(ResolveError::InvalidPhase(phase_name(other))),
    }
}

fn require_player<'a>(room: &'a Room, player_id: &str) -> ResolveResult<&'a Player> {
    room.player(player_id)
        .ok_or_else(|| ResolveError::PlayerNotFound(player_id.to_string()))
}

/// New room in the lobby with its creator as host.
pub fn create_room(
    room_id: &str,
    host_id: &str,
    host_name: &str,
    auth_uid: Option<String>,
    now: Timestamp,
) -> Room {
    let mut host = Player::new(host_id, host_name, now);
    host.auth_uid = auth_uid;
    info!(room_id, host_id, "Room created");
    Room::new(room_id, host, now)
}

/// Add a player, or refresh an existing player's identity and presence.
pub fn join_room(
    room: &Room,
    player_id: &str,
    name: &str,
    auth_uid: Option<String>,
    now: Timestamp,
) -> Resolution {
    let mut draft = Draft::new(room);
    if room.players.contains_key(player_id) {
        draft.push(RoomCommand::SetIdentity {
            player: player_id.to_string(),
            name: name.to_string(),
            auth_uid,
        });
        draft.push(RoomCommand::Touch {
            player: player_id.to_string(),
            ts: now,
        });
    } else {
        let mut player = Player::new(player_id, name, now);
        player.auth_uid = auth_uid;
        draft.push(RoomCommand::AddPlayer { player });
        draft.emit(RoomEvent::PlayerJoined {
            room_id: room.id.clone(),
            player_id: player_id.to_string(),
        });
    }
    if room.host_id.is_none() {
        draft.push(RoomCommand::SetHost {
            player: Some(player_id.to_string()),
        });
    }
    draft.finish()
}

/// Record activity so the stale sweep leaves the player alone.
pub fn touch(room: &Room, player_id: &str, now: Timestamp) -> ResolveResult<Resolution> {
    require_player(room, player_id)?;
    let mut draft = Draft::new(room);
    draft.push(RoomCommand::Touch {
        player: player_id.to_string(),
        ts: now,
    });
    Ok(draft.finish())
}

pub fn configure_room(
    room: &Room,
    requester: &str,
    game_mode: GameMode,
    timed: bool,
    turn_timeout_seconds: Option<u64>,
    settings: RoomSettings,
) -> ResolveResult<Resolution> {
    require_host(room, requester)?;
    require_setup_phase(room)?;
    if timed && turn_timeout_seconds.is_none_or(|s| s == 0) {
        return Err(ResolveError::InvalidSettings(
            "timed rooms need a positive turn timeout".to_string(),
        ));
    }
    if settings.min_word_length == 0 || settings.min_word_length > settings.max_word_length {
        return Err(ResolveError::InvalidSettings(format!(
            "word length bounds {}..={} are invalid",
            settings.min_word_length, settings.max_word_length
        )));
    }

    let mut draft = Draft::new(room);
    draft.push(RoomCommand::Configure {
        game_mode,
        timed,
        turn_timeout_seconds,
        settings,
    });
    Ok(draft.finish())
}

pub fn set_team(room: &Room, player_id: &str, team: Option<TeamName>) -> ResolveResult<Resolution> {
    require_setup_phase(room)?;
    require_player(room, player_id)?;
    let team = team
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let mut draft = Draft::new(room);
    draft.push(RoomCommand::SetTeam {
        player: player_id.to_string(),
        team,
    });
    Ok(draft.finish())
}

/// Normalize and check a secret word against the room's length bounds.
pub fn validate_word(settings: &RoomSettings, word: &str) -> ResolveResult<String> {
    let word = word.trim().to_lowercase();
    if word.is_empty() || !word.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ResolveError::InvalidWord(
            "words may only contain letters a-z".to_string(),
        ));
    }
    let len = word.chars().count();
    if len < settings.min_word_length || len > settings.max_word_length {
        return Err(ResolveError::InvalidWord(format!(
            "words must be {} to {} letters long",
            settings.min_word_length, settings.max_word_length
        )));
    }
    Ok(word)
}

/// Store a player's secret word.
///
/// `in_dictionary` is the lookup verdict when dictionary validation ran; `None`
/// means it was skipped or unavailable and the word is accepted.
pub fn submit_word(
    room: &Room,
    player_id: &str,
    word: &str,
    in_dictionary: Option<bool>,
) -> ResolveResult<Resolution> {
    require_setup_phase(room)?;
    require_player(room, player_id)?;
    let word = validate_word(&room.settings, word)?;
    if room.settings.validate_words && in_dictionary == Some(false) {
        return Err(ResolveError::InvalidWord(format!(
            "{word} is not in the dictionary"
        )));
    }

    let mut draft = Draft::new(room);
    draft.push(RoomCommand::SetWord {
        player: player_id.to_string(),
        word,
    });
    if room.phase == Phase::Lobby {
        draft.push(RoomCommand::SetPhase {
            phase: Phase::Submit,
        });
    }
    Ok(draft.finish())
}

/// Put unteamed players on the smallest team so every seat alternates.
fn balance_teams(room: &Room) -> Vec<(PlayerId, TeamName)> {
    let mut sizes: BTreeMap<TeamName, usize> = BTreeMap::new();
    for team in room.players.values().filter_map(|p| p.team.clone()) {
        *sizes.entry(team).or_default() += 1;
    }
    let mut assignments = Vec::new();
    if sizes.is_empty() {
        return assignments;
    }
    for player in room.players.values().filter(|p| p.team.is_none()) {
        if let Some((team, size)) = sizes.iter_mut().min_by_key(|(_, size)| **size) {
            *size += 1;
            assignments.push((player.id.clone(), team.clone()));
        }
    }
    assignments
}

pub fn start_game(
    room: &Room,
    requester: &str,
    rng: &mut impl Rng,
    now: Timestamp,
) -> ResolveResult<Resolution> {
    require_host(room, requester)?;
    require_setup_phase(room)?;
    if room.players.len() < 2 {
        return Err(ResolveError::InvalidPhase(
            "at least two players are needed".to_string(),
        ));
    }
    if let Some(missing) = room.players.values().find(|p| !p.has_word()) {
        return Err(ResolveError::InvalidPhase(format!(
            "waiting for {} to submit a word",
            missing.name
        )));
    }

    let mut draft = Draft::new(room);
    if room.is_team_mode() {
        for (player, team) in balance_teams(room) {
            draft.push(RoomCommand::SetTeam {
                player,
                team: Some(team),
            });
        }
        let teams: Vec<&TeamName> = draft
            .room()
            .players
            .values()
            .filter_map(|p| p.team.as_ref())
            .collect();
        if teams.iter().all(|t| *t == teams[0]) {
            return Err(ResolveError::InvalidPhase(
                "team mode needs at least two teams".to_string(),
            ));
        }
    }

    let mut order: Vec<PlayerId> = room.players.keys().cloned().collect();
    order.shuffle(rng);
    draft.push(RoomCommand::FundWallets {
        starting_wordmoney: room.settings.starting_wordmoney,
    });
    draft.push(RoomCommand::SetTurnOrder {
        order: order.clone(),
        index: Some(0),
    });
    if room.is_team_mode() {
        let order = alternating_order(draft.room(), &order[0]);
        draft.push(RoomCommand::SetTurnOrder {
            order,
            index: Some(0),
        });
    }
    draft.push(RoomCommand::SetWinner { winner: None });
    draft.push(RoomCommand::SetPhase {
        phase: Phase::Playing,
    });
    draft.emit(RoomEvent::GameStarted {
        room_id: room.id.clone(),
    });
    begin_turn(&mut draft, now);

    info!(room_id = %room.id, players = room.players.len(), "Game started");
    Ok(draft.finish())
}

/// Host sends everyone back to the lobby.
pub fn reset_room(room: &Room, requester: &str) -> ResolveResult<Resolution> {
    require_host(room, requester)?;
    Ok(reset(room))
}

fn reset(room: &Room) -> Resolution {
    let mut draft = Draft::new(room);
    draft.push(RoomCommand::ResetGameState);
    draft.emit(RoomEvent::RoomReset {
        room_id: room.id.clone(),
    });
    info!(room_id = %room.id, "Room reset to lobby");
    draft.finish()
}

/// Opt in to a rematch; the room resets once every player has opted in.
pub fn vote_rematch(room: &Room, player_id: &str) -> ResolveResult<Resolution> {
    if room.phase != Phase::Ended {
        return Err(ResolveError::InvalidPhase(phase_name(room.phase)));
    }
    require_player(room, player_id)?;

    let unanimous = room
        .players
        .values()
        .all(|p| p.rematch || p.id == player_id);
    if unanimous {
        return Ok(reset(room));
    }

    let mut draft = Draft::new(room);
    draft.push(RoomCommand::SetRematch {
        player: player_id.to_string(),
        vote: true,
    });
    Ok(draft.finish())
}

/// Winner if the game in `room` is over: `Some(winner)` once over, where the
/// winner is a player id, a team name, or nobody.
pub fn game_over_winner(room: &Room) -> Option<Option<String>> {
    if room.phase != Phase::Playing {
        return None;
    }
    let alive: Vec<&Player> = room.alive_players().collect();
    match room.game_mode {
        GameMode::LastOneStanding => {
            (alive.len() <= 1).then(|| alive.first().map(|p| p.id.clone()))
        }
        GameMode::Money => (alive.len() <= 1).then(|| {
            room.players
                .values()
                .filter(|p| p.has_word())
                .max_by_key(|p| available_funds(room, &p.id))
                .map(|p| p.id.clone())
        }),
        GameMode::LastTeamStanding => {
            let mut sides: Vec<String> = Vec::new();
            for player in &alive {
                let side = player.team.clone().unwrap_or_else(|| player.id.clone());
                if !sides.contains(&side) {
                    sides.push(side);
                }
            }
            (sides.len() <= 1).then(|| sides.pop())
        }
        GameMode::WordSeeker => None,
    }
}

/// End the game in the draft if it is over. Returns whether it ended.
pub fn finish_if_over(draft: &mut Draft) -> bool {
    let Some(winner) = game_over_winner(draft.room()) else {
        return false;
    };
    let room_id = draft.room().id.clone();
    draft.push(RoomCommand::SetPhase { phase: Phase::Ended });
    draft.push(RoomCommand::SetWinner {
        winner: winner.clone(),
    });
    draft.emit(RoomEvent::GameOver {
        room_id: room_id.clone(),
        winner: winner.clone(),
    });
    info!(%room_id, ?winner, "Game over");
    true
}
