use room_types::{GainReason, Phase, Room, RoomEvent, TimeoutRecord, Timestamp};
use tracing::{debug, info};

use crate::patch::{Draft, Resolution, RoomCommand};
use crate::turn_order::advance_turn;
use crate::wallet::available_funds;

pub const TIMEOUT_PENALTY: u32 = 2;

/// Whether the current turn has outlived its deadline.
pub fn turn_expired(room: &Room, now: Timestamp) -> bool {
    if room.phase != Phase::Playing || !room.timed {
        return false;
    }
    let (Some(started_at), Some(seconds)) = (room.current_turn_started_at, room.turn_timeout_seconds)
    else {
        return false;
    };
    let deadline = started_at.saturating_add(seconds.saturating_mul(1000) as i64);
    now > deadline
}

/// True when this exact turn has already been penalized.
pub fn already_handled(room: &Room) -> bool {
    room.current_turn_started_at.is_some_and(|started_at| {
        room.timeouts
            .values()
            .any(|record| record.turn_started_at == started_at)
    })
}

/// Penalize and advance an expired turn. `None` when the turn has not expired
/// or the expiry was already handled by another writer.
pub fn resolve_timeout(room: &Room, now: Timestamp) -> Option<Resolution> {
    if !turn_expired(room, now) {
        return None;
    }
    if already_handled(room) {
        debug!(room_id = %room.id, "Turn timeout already recorded, skipping");
        return None;
    }
    let started_at = room.current_turn_started_at?;
    let mover = room.current_player_id()?.clone();

    let mut draft = Draft::new(room);
    let before = available_funds(room, &mover);
    draft.credit(
        &mover,
        -i64::from(TIMEOUT_PENALTY),
        GainReason::TimeoutPenalty,
        now,
    );
    let deducted = before - available_funds(draft.room(), &mover);
    advance_turn(&mut draft, now);

    draft.push(RoomCommand::RecordTimeout {
        key: format!("{started_at}-{mover}"),
        record: TimeoutRecord {
            player: mover.clone(),
            deducted,
            ts: now,
            turn_started_at: started_at,
            next_turn_started_at: draft.room().current_turn_started_at,
        },
    });
    draft.emit(RoomEvent::TurnTimedOut {
        room_id: room.id.clone(),
        player_id: mover.clone(),
        deducted,
    });
    info!(room_id = %room.id, player = %mover, deducted, "Turn timed out");
    Some(draft.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_types::Player;

    fn timed_room() -> Room {
        let mut room = Room::default();
        room.id = "r".to_string();
        room.phase = Phase::Playing;
        room.timed = true;
        room.turn_timeout_seconds = Some(30);
        room.current_turn_started_at = Some(1_000);
        for id in ["a", "b"] {
            let mut player = Player::new(id, id, 0);
            player.word = "word".to_string();
            player.wordmoney = 5;
            room.players.insert(id.to_string(), player);
            room.turn_order.push(id.to_string());
        }
        room.current_turn_index = Some(0);
        room
    }

    #[test]
    fn test_not_expired_before_deadline() {
        let room = timed_room();
        assert!(resolve_timeout(&room, 31_000).is_none());
        assert!(resolve_timeout(&room, 31_001).is_some());
    }

    #[test]
    fn test_untimed_rooms_never_expire() {
        let mut room = timed_room();
        room.timed = false;
        assert!(resolve_timeout(&room, 1_000_000).is_none());
    }

    #[test]
    fn test_penalty_is_floored_at_zero() {
        let mut room = timed_room();
        room.players.get_mut("a").unwrap().wordmoney = 1;

        let resolution = resolve_timeout(&room, 40_000).unwrap();
        resolution.patch.apply(&mut room);

        assert_eq!(room.players["a"].wordmoney, 0);
        let record = room.timeouts.values().next().unwrap();
        assert_eq!(record.deducted, 1);
        assert_eq!(record.turn_started_at, 1_000);
        assert_eq!(record.next_turn_started_at, Some(40_000));
        assert_eq!(room.current_player_id().map(String::as_str), Some("b"));
    }
}
