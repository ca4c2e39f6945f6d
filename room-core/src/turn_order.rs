use std::collections::{BTreeMap, VecDeque};

use room_types::{PlayerId, Room, RoomEvent, TeamName, Timestamp};

use crate::patch::{Draft, RoomCommand};

/// Default rotation: `(current + 1) mod len`.
pub fn next_index(len: usize, current: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(current.map(|index| (index + 1) % len).unwrap_or(0))
}

/// Filter `player` out of the order. When the removed slot sat at or before the
/// current index, the index steps back one (floored at zero) so it keeps
/// pointing at the same mover.
pub fn remove_from_order(
    order: &[PlayerId],
    current: Option<usize>,
    player: &str,
) -> (Vec<PlayerId>, Option<usize>) {
    let Some(removed) = order.iter().position(|id| id == player) else {
        return (order.to_vec(), current);
    };
    let next: Vec<PlayerId> = order.iter().filter(|id| *id != player).cloned().collect();
    if next.is_empty() {
        return (next, None);
    }
    let index = current.map(|index| {
        let index = if removed <= index {
            index.saturating_sub(1)
        } else {
            index
        };
        index.min(next.len() - 1)
    });
    (next, index.or(Some(0)))
}

/// Splice `player` in immediately before the current mover so they act last
/// among everyone already seated.
pub fn insert_before_current(
    order: &[PlayerId],
    current: Option<usize>,
    player: &str,
) -> (Vec<PlayerId>, Option<usize>) {
    if order.iter().any(|id| id == player) {
        return (order.to_vec(), current);
    }
    let mut next = order.to_vec();
    match current {
        Some(index) if index < order.len() => {
            next.insert(index, player.to_string());
            (next, Some(index + 1))
        }
        _ => {
            next.push(player.to_string());
            (next, Some(current.unwrap_or(0)))
        }
    }
}

/// Fully alternating team order beginning with `anchor`.
///
/// Living players are taken in their current rotation starting just after the
/// anchor, grouped into per-team queues and merged round-robin beginning with
/// the team after the anchor's own. Unteamed players go last.
pub fn alternating_order(room: &Room, anchor: &str) -> Vec<PlayerId> {
    let mut rotation: Vec<PlayerId> = Vec::new();
    if let Some(position) = room.turn_order.iter().position(|id| id == anchor) {
        let len = room.turn_order.len();
        for step in 1..len {
            rotation.push(room.turn_order[(position + step) % len].clone());
        }
    } else {
        rotation.extend(room.turn_order.iter().cloned());
    }
    for id in room.players.keys() {
        if !rotation.contains(id) {
            rotation.push(id.clone());
        }
    }

    let mut queues: BTreeMap<TeamName, VecDeque<PlayerId>> = BTreeMap::new();
    let mut unteamed = Vec::new();
    for id in rotation {
        if id == anchor {
            continue;
        }
        let Some(player) = room.players.get(&id).filter(|p| p.is_alive()) else {
            continue;
        };
        match &player.team {
            Some(team) => queues.entry(team.clone()).or_default().push_back(id),
            None => unteamed.push(id),
        }
    }

    let anchor_player = room.players.get(anchor).filter(|p| p.is_alive());
    let anchor_team = anchor_player.and_then(|p| p.team.clone());
    let mut team_names: Vec<TeamName> = queues.keys().cloned().collect();
    if let Some(team) = &anchor_team {
        if let Some(position) = team_names.iter().position(|name| name == team) {
            team_names.rotate_left(position + 1);
        }
    }

    let mut order = Vec::new();
    if anchor_player.is_some() {
        order.push(anchor.to_string());
    }
    loop {
        let mut took = false;
        for name in &team_names {
            if let Some(id) = queues.get_mut(name).and_then(|queue| queue.pop_front()) {
                order.push(id);
                took = true;
            }
        }
        if !took {
            break;
        }
    }
    order.extend(unteamed);
    order
}

/// Apply turn-start effects for whoever sits at the current index.
pub fn begin_turn(draft: &mut Draft, now: Timestamp) {
    draft.push(RoomCommand::StartTurn { started_at: now });
    if let Some(mover) = draft.room().current_player_id().cloned() {
        let room_id = draft.room().id.clone();
        draft.emit(RoomEvent::TurnStarted {
            room_id,
            player_id: mover,
            started_at: now,
        });
    }
}

/// Hand the turn to the next mover and start it.
pub fn advance_turn(draft: &mut Draft, now: Timestamp) {
    let room = draft.room();
    let (order, index) = match (room.is_team_mode(), room.current_player_id()) {
        (true, Some(mover)) => {
            let order = alternating_order(room, mover);
            let index = next_index(order.len(), Some(0));
            (order, index)
        }
        _ => (
            room.turn_order.clone(),
            next_index(room.turn_order.len(), room.current_turn_index),
        ),
    };
    draft.push(RoomCommand::SetTurnOrder { order, index });
    begin_turn(draft, now);
}

/// Remove a player from the rotation.
///
/// Returns true when the removed player held the turn; the index then points
/// at whoever followed them and the caller is expected to start that turn.
pub fn remove_from_turn(draft: &mut Draft, player: &str) -> bool {
    let room = draft.room();
    let Some(removed) = room.turn_order.iter().position(|id| id == player) else {
        return false;
    };
    let was_mover = room.current_turn_index == Some(removed);

    let (order, index) = if was_mover {
        let order: Vec<PlayerId> = room
            .turn_order
            .iter()
            .filter(|id| *id != player)
            .cloned()
            .collect();
        let index = if order.is_empty() {
            None
        } else {
            Some(removed % order.len())
        };
        (order, index)
    } else {
        remove_from_order(&room.turn_order, room.current_turn_index, player)
    };

    let anchor = index.and_then(|i| order.get(i)).cloned();
    let (order, index) = match (room.is_team_mode(), anchor) {
        (true, Some(anchor)) => {
            let mut trimmed = room.clone();
            trimmed.turn_order = order;
            trimmed.players.remove(player);
            (alternating_order(&trimmed, &anchor), Some(0))
        }
        _ => (order, index),
    };

    draft.push(RoomCommand::SetTurnOrder { order, index });
    was_mover
}

/// Seat a returning player. Outside team mode they act last among current
/// entrants; team mode rebuilds the alternation around the current mover.
pub fn reinsert_player(draft: &mut Draft, player: &str) {
    let room = draft.room();
    let (order, index) = match (room.is_team_mode(), room.current_player_id()) {
        (true, Some(mover)) => (alternating_order(room, mover), Some(0)),
        _ => insert_before_current(&room.turn_order, room.current_turn_index, player),
    };
    draft.push(RoomCommand::SetTurnOrder { order, index });
}
