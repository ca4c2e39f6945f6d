use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::AuthService;
use crate::room_manager::{ManagerError, RoomManager};
use crate::websocket::connection::{Connection, ConnectionId, ConnectionManager, SendError};
use room_types::{ClientMessage, RoomId, ServerMessage};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        room_manager: Arc<RoomManager>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            room_manager,
            auth_service,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), SendError> {
        self.connection_manager.touch(self.connection_id).await;

        match message {
            ClientMessage::Authenticate { token } => self.handle_authenticate(token).await,
            ClientMessage::CreateRoom { name } => self.handle_create_room(name).await,
            ClientMessage::JoinRoom { room_id, name } => self.handle_join_room(room_id, name).await,
            ClientMessage::LeaveRoom => self.handle_leave_room().await,
            ClientMessage::Heartbeat => self.handle_heartbeat().await,
            other => self.handle_room_action(other).await,
        }
    }

    /// Disconnecting leaves the player in the room; the stale sweep removes
    /// anonymous players who never come back.
    pub async fn handle_disconnect(&self) {
        if let Some(connection) = self.connection().await {
            if let Some(room_id) = connection.room_id {
                info!(
                    "Connection {} left room {} without leaving",
                    self.connection_id, room_id
                );
            }
        }
    }

    async fn connection(&self) -> Option<Connection> {
        self.connection_manager.get(self.connection_id).await
    }

    async fn handle_authenticate(&self, token: String) -> Result<(), SendError> {
        info!("Authenticating connection {}", self.connection_id);

        if self
            .connection()
            .await
            .is_some_and(|connection| connection.room_id.is_some())
        {
            return self
                .reply(ServerMessage::AuthenticationFailed {
                    reason: "Leave the room before signing in".to_string(),
                })
                .await;
        }

        match self.auth_service.validate_token(&token).await {
            Ok(user) => {
                self.connection_manager
                    .set_user(self.connection_id, user.clone())
                    .await;
                self.reply(ServerMessage::AuthenticationSuccess { user })
                    .await
            }
            Err(e) => {
                warn!(
                    "Authentication failed for connection {}: {}",
                    self.connection_id, e
                );
                self.reply(ServerMessage::AuthenticationFailed {
                    reason: e.to_string(),
                })
                .await
            }
        }
    }

    async fn handle_create_room(&self, name: String) -> Result<(), SendError> {
        let connection = self.connection().await.ok_or(SendError::UnknownConnection)?;
        if connection.room_id.is_some() {
            return self.send_error("Already in a room").await;
        }

        let player_id = connection.player_id();
        match self
            .room_manager
            .create_room(&player_id, &name, connection.auth_uid())
            .await
        {
            Ok(room) => {
                info!("Connection {} created room {}", self.connection_id, room.id);
                self.connection_manager
                    .set_room(self.connection_id, Some(room.id.clone()))
                    .await;
                self.reply(ServerMessage::RoomJoined {
                    room_id: room.id.clone(),
                    player_id: player_id.clone(),
                })
                .await?;
                self.reply(ServerMessage::RoomStateUpdate {
                    state: room.personalized_for_player(&player_id),
                })
                .await
            }
            Err(e) => self.report(e).await,
        }
    }

    async fn handle_join_room(&self, room_id: RoomId, name: String) -> Result<(), SendError> {
        let connection = self.connection().await.ok_or(SendError::UnknownConnection)?;
        if connection
            .room_id
            .as_ref()
            .is_some_and(|current| current != &room_id)
        {
            return self.send_error("Already in another room").await;
        }

        let player_id = connection.player_id();
        // Attach first so the join broadcast reaches this socket too.
        self.connection_manager
            .set_room(self.connection_id, Some(room_id.clone()))
            .await;
        self.reply(ServerMessage::RoomJoined {
            room_id: room_id.clone(),
            player_id: player_id.clone(),
        })
        .await?;

        match self
            .room_manager
            .join_room(&room_id, &player_id, &name, connection.auth_uid())
            .await
        {
            Ok(_) => {
                info!("Player {} joined room {}", player_id, room_id);
                Ok(())
            }
            Err(e) => {
                self.connection_manager.set_room(self.connection_id, None).await;
                self.reply(ServerMessage::RoomLeft).await?;
                self.report(e).await
            }
        }
    }

    async fn handle_leave_room(&self) -> Result<(), SendError> {
        let Some((connection, room_id)) = self.current_room().await? else {
            return Ok(());
        };

        if let Err(e) = self
            .room_manager
            .leave_room(&room_id, &connection.player_id())
            .await
        {
            if !matches!(e, ManagerError::RoomNotFound(_)) {
                return self.report(e).await;
            }
        }

        // The broadcast already detached us unless the player was not in the room.
        if self
            .connection()
            .await
            .is_some_and(|connection| connection.room_id.is_some())
        {
            self.connection_manager.set_room(self.connection_id, None).await;
            self.reply(ServerMessage::RoomLeft).await?;
        }
        Ok(())
    }

    async fn handle_heartbeat(&self) -> Result<(), SendError> {
        let Some(connection) = self.connection().await else {
            return Ok(());
        };
        if let Some(room_id) = &connection.room_id {
            if let Err(e) = self
                .room_manager
                .heartbeat(room_id, &connection.player_id())
                .await
            {
                debug!("Heartbeat for {} not recorded: {}", self.connection_id, e);
            }
        }
        Ok(())
    }

    async fn handle_room_action(&self, message: ClientMessage) -> Result<(), SendError> {
        let Some((connection, room_id)) = self.current_room().await? else {
            return Ok(());
        };
        let player_id = connection.player_id();
        let rooms = &self.room_manager;

        let result = match message {
            ClientMessage::UpdateSettings {
                game_mode,
                timed,
                turn_timeout_seconds,
                settings,
            } => {
                rooms
                    .configure_room(
                        &room_id,
                        &player_id,
                        game_mode,
                        timed,
                        turn_timeout_seconds,
                        settings,
                    )
                    .await
            }
            ClientMessage::SetTeam { team } => rooms.set_team(&room_id, &player_id, team).await,
            ClientMessage::SubmitWord { word } => {
                rooms.submit_word(&room_id, &player_id, &word).await
            }
            ClientMessage::StartGame => rooms.start_game(&room_id, &player_id).await,
            ClientMessage::SubmitGuess { target, value } => rooms
                .submit_guess(&room_id, &player_id, &target, &value)
                .await
                .map(|_| ()),
            ClientMessage::PurchasePowerUp {
                power_id,
                target,
                params,
            } => rooms
                .purchase(&room_id, &player_id, power_id, target, params)
                .await
                .map(|result| debug!(?result, "Power-up resolved")),
            ClientMessage::RequestGhostReentry => {
                rooms.request_ghost_reentry(&room_id, &player_id).await
            }
            ClientMessage::GhostGuess { value } => {
                match rooms.ghost_guess(&room_id, &player_id, &value).await {
                    Ok((positions, correct)) => {
                        return self
                            .reply(ServerMessage::GhostGuessResult {
                                value,
                                positions,
                                correct,
                            })
                            .await;
                    }
                    Err(e) => Err(e),
                }
            }
            ClientMessage::VoteRematch => rooms.vote_rematch(&room_id, &player_id).await,
            ClientMessage::ResetRoom => rooms.reset_room(&room_id, &player_id).await,
            ClientMessage::Authenticate { .. }
            | ClientMessage::CreateRoom { .. }
            | ClientMessage::JoinRoom { .. }
            | ClientMessage::LeaveRoom
            | ClientMessage::Heartbeat => Ok(()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.report(e).await,
        }
    }

    /// The connection and the room it is attached to, or an error sent back
    /// when it is not in one.
    async fn current_room(&self) -> Result<Option<(Connection, RoomId)>, SendError> {
        let connection = self.connection().await.ok_or(SendError::UnknownConnection)?;
        match connection.room_id.clone() {
            Some(room_id) => Ok(Some((connection, room_id))),
            None => {
                self.send_error("Not in a room").await?;
                Ok(None)
            }
        }
    }

    async fn report(&self, error: ManagerError) -> Result<(), SendError> {
        if error.is_silent() {
            debug!("Dropped action from {}: {}", self.connection_id, error);
            return Ok(());
        }
        if let ManagerError::Store(e) = &error {
            error!("Storage failure for {}: {}", self.connection_id, e);
            return self.send_error("Internal server error").await;
        }
        debug!("Rejected action from {}: {}", self.connection_id, error);
        self.reply(ServerMessage::ActionRejected {
            error: error.into(),
        })
        .await
    }

    async fn reply(&self, message: ServerMessage) -> Result<(), SendError> {
        self.connection_manager.send(self.connection_id, message).await
    }

    async fn send_error(&self, error_message: &str) -> Result<(), SendError> {
        self.reply(ServerMessage::Error {
            message: error_message.to_string(),
        })
        .await
    }
}
