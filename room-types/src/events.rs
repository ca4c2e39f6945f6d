use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{PlayerId, PowerUpId, Room, RoomId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum GuessOutcome {
    LetterHit { letter: char, revealed: u32, awarded: u32 },
    LetterRepeat { letter: char },
    LetterMiss { letter: char },
    WordSolved { word: String },
    WordMiss { word: String },
    /// A miss as seen from outside the guesser's side.
    Missed,
}

impl GuessOutcome {
    /// Wrong letters and words belong to the guesser's private history.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            GuessOutcome::LetterRepeat { .. }
                | GuessOutcome::LetterMiss { .. }
                | GuessOutcome::WordMiss { .. }
        )
    }
}

/// Something observable that happened to a room, published after a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum RoomEvent {
    PlayerJoined { room_id: RoomId, player_id: PlayerId },
    PlayerEvicted { room_id: RoomId, player_id: PlayerId },
    HostChanged { room_id: RoomId, host_id: PlayerId },
    GameStarted { room_id: RoomId },
    GuessResolved {
        room_id: RoomId,
        from: PlayerId,
        target: PlayerId,
        outcome: GuessOutcome,
    },
    PlayerEliminated { room_id: RoomId, player_id: PlayerId, by: PlayerId },
    PowerUpUsed {
        room_id: RoomId,
        from: PlayerId,
        target: Option<PlayerId>,
        power_id: PowerUpId,
    },
    TurnTimedOut { room_id: RoomId, player_id: PlayerId, deducted: u32 },
    TurnStarted { room_id: RoomId, player_id: PlayerId, started_at: Timestamp },
    GhostChallengeCreated { room_id: RoomId },
    GhostReentered { room_id: RoomId, player_id: PlayerId },
    GameOver { room_id: RoomId, winner: Option<String> },
    RoomReset { room_id: RoomId },
    RoomDeleted { room_id: RoomId },
}

impl RoomEvent {
    pub fn room_id(&self) -> &RoomId {
        match self {
            RoomEvent::PlayerJoined { room_id, .. } => room_id,
            RoomEvent::PlayerEvicted { room_id, .. } => room_id,
            RoomEvent::HostChanged { room_id, .. } => room_id,
            RoomEvent::GameStarted { room_id } => room_id,
            RoomEvent::GuessResolved { room_id, .. } => room_id,
            RoomEvent::PlayerEliminated { room_id, .. } => room_id,
            RoomEvent::PowerUpUsed { room_id, .. } => room_id,
            RoomEvent::TurnTimedOut { room_id, .. } => room_id,
            RoomEvent::TurnStarted { room_id, .. } => room_id,
            RoomEvent::GhostChallengeCreated { room_id } => room_id,
            RoomEvent::GhostReentered { room_id, .. } => room_id,
            RoomEvent::GameOver { room_id, .. } => room_id,
            RoomEvent::RoomReset { room_id } => room_id,
            RoomEvent::RoomDeleted { room_id } => room_id,
        }
    }

    /// The event as `viewer` may see it. Misses are reduced to
    /// [`GuessOutcome::Missed`] for anyone outside the guesser's side.
    pub fn visible_to(&self, viewer: &str, room: Option<&Room>) -> RoomEvent {
        match self {
            RoomEvent::GuessResolved {
                room_id,
                from,
                target,
                outcome,
            } if outcome.is_private()
                && from != viewer
                && !room.is_some_and(|room| room.are_teammates(from, viewer)) =>
            {
                RoomEvent::GuessResolved {
                    room_id: room_id.clone(),
                    from: from.clone(),
                    target: target.clone(),
                    outcome: GuessOutcome::Missed,
                }
            }
            _ => self.clone(),
        }
    }
}
