use std::time::Duration;

use room_types::{Phase, PlayerId, Room, RoomEvent, Timestamp};
use tracing::info;

use crate::lifecycle::finish_if_over;
use crate::patch::{Draft, Resolution, RoomCommand};
use crate::turn_order::{begin_turn, remove_from_turn};

/// What a sweep decided for one room.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    Unchanged,
    Updated(Resolution),
    /// Nobody is left; the room document should be deleted.
    Emptied,
}

pub struct StaleSweep {
    pub idle_threshold: Duration, // 20 minutes without activity
}

impl Default for StaleSweep {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(20 * 60),
        }
    }
}

impl StaleSweep {
    pub fn new(idle_threshold: Duration) -> Self {
        Self { idle_threshold }
    }

    /// Anonymous players idle for longer than the threshold. Players carrying
    /// an auth marker are never stale.
    pub fn stale_players(&self, room: &Room, now: Timestamp) -> Vec<PlayerId> {
        let threshold_ms = self.idle_threshold.as_millis() as i64;
        room.players
            .values()
            .filter(|p| p.auth_uid.is_none())
            .filter(|p| now.saturating_sub(p.last_seen) > threshold_ms)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn sweep_room(&self, room: &Room, now: Timestamp) -> SweepOutcome {
        let stale = self.stale_players(room, now);
        if stale.is_empty() {
            return SweepOutcome::Unchanged;
        }
        info!(room_id = %room.id, count = stale.len(), "Evicting stale players");
        evict_players(room, &stale, now)
    }
}

/// Hard-delete players from a room, handing off the host role and the turn
/// as needed.
pub fn evict_players(room: &Room, players: &[PlayerId], now: Timestamp) -> SweepOutcome {
    let evicted: Vec<&PlayerId> = players
        .iter()
        .filter(|id| room.players.contains_key(*id))
        .collect();
    if evicted.is_empty() {
        return SweepOutcome::Unchanged;
    }
    if room.players.keys().all(|id| evicted.contains(&id)) {
        return SweepOutcome::Emptied;
    }

    let mut draft = Draft::new(room);
    let mut mover_removed = false;
    for id in &evicted {
        mover_removed |= remove_from_turn(&mut draft, id);
        draft.push(RoomCommand::RemovePlayer {
            player: (*id).clone(),
        });
        draft.emit(RoomEvent::PlayerEvicted {
            room_id: room.id.clone(),
            player_id: (*id).clone(),
        });
    }

    let host_gone = room
        .host_id
        .as_ref()
        .is_none_or(|host| evicted.contains(&host));
    if host_gone {
        let next_host = draft
            .room()
            .players
            .values()
            .min_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)))
            .map(|p| p.id.clone());
        if let Some(host_id) = &next_host {
            draft.emit(RoomEvent::HostChanged {
                room_id: room.id.clone(),
                host_id: host_id.clone(),
            });
        }
        draft.push(RoomCommand::SetHost { player: next_host });
    }

    if room.phase == Phase::Playing && !finish_if_over(&mut draft) && mover_removed {
        begin_turn(&mut draft, now);
    }

    SweepOutcome::Updated(draft.finish())
}
