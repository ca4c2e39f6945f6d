use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    ActionError, GameMode, PlayerId, PowerUpId, PowerUpParams, Room, RoomEvent, RoomId,
    RoomSettings, TeamName,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Authenticate { token: String },
    CreateRoom { name: String },
    JoinRoom { room_id: RoomId, name: String },
    LeaveRoom,
    UpdateSettings {
        game_mode: GameMode,
        timed: bool,
        turn_timeout_seconds: Option<u64>,
        settings: RoomSettings,
    },
    SetTeam { team: Option<TeamName> },
    SubmitWord { word: String },
    StartGame,
    SubmitGuess { target: PlayerId, value: String },
    PurchasePowerUp {
        power_id: PowerUpId,
        target: Option<PlayerId>,
        #[serde(default)]
        params: PowerUpParams,
    },
    RequestGhostReentry,
    GhostGuess { value: String },
    VoteRematch,
    ResetRoom,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    AuthenticationSuccess { user: crate::User },
    AuthenticationFailed { reason: String },
    RoomJoined { room_id: RoomId, player_id: PlayerId },
    RoomLeft,
    /// Room as the receiving player may see it.
    RoomStateUpdate { state: Room },
    RoomEvent { event: RoomEvent },
    GhostGuessResult {
        value: String,
        positions: Vec<usize>,
        correct: bool,
    },
    ActionRejected { error: ActionError },
    Error { message: String },
}
