use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Client-facing rejection codes. Silent drops never reach the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ActionError {
    InsufficientFunds { price: u32, available: u32 },
    InvalidPurchase { reason: String },
    TargetFrozen,
    GhostCooldown { retry_after_seconds: u64 },
    GhostUnavailable { reason: String },
    InvalidPhase { current: String },
    InvalidWord { reason: String },
    InvalidSettings { reason: String },
    NotHost,
    PlayerNotFound { player_id: String },
    RoomNotFound { room_id: String },
    RoomBusy,
    Internal { message: String },
}
