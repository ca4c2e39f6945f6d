use std::sync::Arc;

use room_core::{
    LookupHint, PurchaseContext, PurchaseRequest, Resolution, ResolveError, ResolveResult,
    SweepOutcome, WordBank, lookup_kind, now_millis,
};
use room_persistence::{RoomStore, StoreError, VersionedRoom};
use room_types::{
    ActionError, GameMode, GuessEvent, PlayerId, PowerResult, PowerUpId, PowerUpParams, Room,
    RoomEvent, RoomId, RoomSettings, ServerMessage, TeamName,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::lookup::WordLookup;
use crate::websocket::ConnectionManager;

pub const DEFAULT_MAX_CAS_RETRIES: usize = 16;
const ROOM_CODE_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),
    #[error(transparent)]
    Rejected(#[from] ResolveError),
    #[error("Room {0} is busy, gave up after repeated write conflicts")]
    Contention(RoomId),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ManagerError {
    /// Rejections nobody needs to hear about.
    pub fn is_silent(&self) -> bool {
        matches!(self, ManagerError::Rejected(error) if error.is_silent())
    }
}

impl From<ManagerError> for ActionError {
    fn from(error: ManagerError) -> Self {
        match error {
            ManagerError::RoomNotFound(room_id) => ActionError::RoomNotFound { room_id },
            ManagerError::Rejected(error) => error.into(),
            ManagerError::Contention(_) => ActionError::RoomBusy,
            ManagerError::Store(error) => ActionError::Internal {
                message: error.to_string(),
            },
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// What a transaction step wants done with the room it was shown.
pub(crate) enum Plan<T> {
    Commit(Resolution, T),
    Delete(T),
}

/// The room as written by a successful transaction and the events produced.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub room: Option<Room>,
    pub events: Vec<RoomEvent>,
    pub value: T,
}

/// Runs every room mutation as read / resolve / compare-and-swap, retrying
/// from a fresh read when another writer got there first.
pub struct RoomManager {
    store: Arc<dyn RoomStore>,
    connections: Arc<ConnectionManager>,
    lookup: Arc<dyn WordLookup>,
    word_bank: Arc<WordBank>,
    max_retries: usize,
    default_settings: RoomSettings,
}

impl RoomManager {
    pub fn new(
        store: Arc<dyn RoomStore>,
        connections: Arc<ConnectionManager>,
        lookup: Arc<dyn WordLookup>,
        word_bank: Arc<WordBank>,
    ) -> Self {
        Self {
            store,
            connections,
            lookup,
            word_bank,
            max_retries: DEFAULT_MAX_CAS_RETRIES,
            default_settings: RoomSettings::default(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Settings new rooms start with.
    pub fn with_default_settings(mut self, settings: RoomSettings) -> Self {
        self.default_settings = settings;
        self
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    pub(crate) async fn run<T, F>(&self, room_id: &str, mut step: F) -> ManagerResult<Committed<T>>
    where
        F: FnMut(&Room) -> ResolveResult<Plan<T>> + Send,
        T: Send,
    {
        for attempt in 1..=self.max_retries {
            let Some(VersionedRoom { room, version }) = self.store.load(room_id).await? else {
                return Err(ManagerError::RoomNotFound(room_id.to_string()));
            };

            match step(&room)? {
                Plan::Delete(value) => {
                    if !self.store.delete_if_version(room_id, version).await? {
                        debug!(room_id, attempt, "Room changed before delete, retrying");
                        continue;
                    }
                    info!(room_id, "Room deleted");
                    return Ok(Committed {
                        room: None,
                        events: vec![RoomEvent::RoomDeleted {
                            room_id: room_id.to_string(),
                        }],
                        value,
                    });
                }
                Plan::Commit(resolution, value) => {
                    if resolution.patch.is_empty() {
                        return Ok(Committed {
                            room: Some(room),
                            events: resolution.events,
                            value,
                        });
                    }
                    let mut next = room;
                    resolution.patch.apply(&mut next);
                    if self.store.compare_and_swap(&next, version).await?.is_some() {
                        return Ok(Committed {
                            room: Some(next),
                            events: resolution.events,
                            value,
                        });
                    }
                    debug!(room_id, attempt, "Write conflict, retrying");
                }
            }
        }

        warn!(room_id, retries = self.max_retries, "Giving up after repeated write conflicts");
        Err(ManagerError::Contention(room_id.to_string()))
    }

    /// Apply a single resolver step under optimistic concurrency.
    pub(crate) async fn transact<T, F>(&self, room_id: &str, mut step: F) -> ManagerResult<Committed<T>>
    where
        F: FnMut(&Room) -> ResolveResult<(Resolution, T)> + Send,
        T: Send,
    {
        self.run(room_id, |room| {
            let (resolution, value) = step(room)?;
            Ok(Plan::Commit(resolution, value))
        })
        .await
    }

    /// Apply a sweep decision, deleting the room when it empties.
    pub(crate) async fn apply_sweep<F>(&self, room_id: &str, mut decide: F) -> ManagerResult<bool>
    where
        F: FnMut(&Room) -> SweepOutcome + Send,
    {
        let committed = self
            .run(room_id, |room| {
                Ok(match decide(room) {
                    SweepOutcome::Unchanged => Plan::Commit(Resolution::default(), false),
                    SweepOutcome::Updated(resolution) => Plan::Commit(resolution, true),
                    SweepOutcome::Emptied => Plan::Delete(true),
                })
            })
            .await?;
        if committed.value {
            self.publish(room_id, &committed).await;
        }
        Ok(committed.value)
    }

    /// Push the events and a personalized state to everyone attached to the room.
    pub(crate) async fn publish<T>(&self, room_id: &str, committed: &Committed<T>) {
        let connections = self.connections.in_room(room_id).await;
        for connection in connections {
            let viewer = connection.player_id();
            for event in &committed.events {
                let _ = connection.send(ServerMessage::RoomEvent {
                    event: event.visible_to(&viewer, committed.room.as_ref()),
                });
            }

            match &committed.room {
                Some(room) if room.players.contains_key(&viewer) => {
                    let _ = connection.send(ServerMessage::RoomStateUpdate {
                        state: room.personalized_for_player(&viewer),
                    });
                }
                _ => {
                    self.connections.set_room(connection.id, None).await;
                    let _ = connection.send(ServerMessage::RoomLeft);
                }
            }
        }
    }

    async fn load(&self, room_id: &str) -> ManagerResult<Room> {
        self.store
            .load(room_id)
            .await?
            .map(|stored| stored.room)
            .ok_or_else(|| ManagerError::RoomNotFound(room_id.to_string()))
    }

    /// A room as `viewer` is allowed to see it.
    pub async fn room_view(&self, room_id: &str, viewer: Option<&str>) -> ManagerResult<Room> {
        let room = self.load(room_id).await?;
        Ok(room.personalized_for_player(viewer.unwrap_or_default()))
    }

    pub async fn create_room(
        &self,
        player_id: &str,
        name: &str,
        auth_uid: Option<String>,
    ) -> ManagerResult<Room> {
        let now = now_millis();
        for _ in 0..ROOM_CODE_ATTEMPTS {
            let code = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
            let mut room = room_core::create_room(&code, player_id, name, auth_uid.clone(), now);
            room.settings = self.default_settings.clone();
            match self.store.insert(&room).await {
                Ok(stored) => return Ok(stored.room),
                Err(StoreError::AlreadyExists(_)) => continue,
                Err(error) => return Err(error.into()),
            }
        }
        Err(ManagerError::Contention("new room".to_string()))
    }

    pub async fn join_room(
        &self,
        room_id: &str,
        player_id: &str,
        name: &str,
        auth_uid: Option<String>,
    ) -> ManagerResult<Room> {
        let now = now_millis();
        let committed = self
            .transact(room_id, |room| {
                Ok((room_core::join_room(room, player_id, name, auth_uid.clone(), now), ()))
            })
            .await?;
        self.publish(room_id, &committed).await;
        committed
            .room
            .ok_or_else(|| ManagerError::RoomNotFound(room_id.to_string()))
    }

    pub async fn leave_room(&self, room_id: &str, player_id: &str) -> ManagerResult<()> {
        let now = now_millis();
        let leaving = [player_id.to_string()];
        self.apply_sweep(room_id, |room| {
            if room.player(player_id).is_none() {
                SweepOutcome::Unchanged
            } else {
                room_core::evict_players(room, &leaving, now)
            }
        })
        .await?;
        info!(room_id, player_id, "Player left room");
        Ok(())
    }

    pub async fn configure_room(
        &self,
        room_id: &str,
        player_id: &str,
        game_mode: GameMode,
        timed: bool,
        turn_timeout_seconds: Option<u64>,
        settings: RoomSettings,
    ) -> ManagerResult<()> {
        let committed = self
            .transact(room_id, |room| {
                let resolution = room_core::configure_room(
                    room,
                    player_id,
                    game_mode,
                    timed,
                    turn_timeout_seconds,
                    settings.clone(),
                )?;
                Ok((resolution, ()))
            })
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    pub async fn set_team(
        &self,
        room_id: &str,
        player_id: &str,
        team: Option<TeamName>,
    ) -> ManagerResult<()> {
        let committed = self
            .transact(room_id, |room| {
                Ok((room_core::set_team(room, player_id, team.clone())?, ()))
            })
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    /// Dictionary verdict for a submitted word, when the room asks for one.
    /// An unreachable lookup yields `None`, which accepts the word.
    async fn dictionary_check(&self, room_id: &str, word: &str) -> ManagerResult<Option<bool>> {
        let room = self.load(room_id).await?;
        if !room.settings.validate_words {
            return Ok(None);
        }
        let word = word.trim().to_lowercase();
        if self.word_bank.contains(&word) {
            return Ok(Some(true));
        }
        match self.lookup.is_word(&word).await {
            Ok(found) => Ok(Some(found)),
            Err(error) => {
                warn!(room_id, %error, "Dictionary lookup unavailable, accepting word");
                Ok(None)
            }
        }
    }

    pub async fn submit_word(&self, room_id: &str, player_id: &str, word: &str) -> ManagerResult<()> {
        let in_dictionary = self.dictionary_check(room_id, word).await?;
        let committed = self
            .transact(room_id, |room| {
                Ok((room_core::submit_word(room, player_id, word, in_dictionary)?, ()))
            })
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    pub async fn start_game(&self, room_id: &str, player_id: &str) -> ManagerResult<()> {
        let committed = self
            .transact(room_id, |room| {
                let mut rng = rand::thread_rng();
                Ok((room_core::start_game(room, player_id, &mut rng, now_millis())?, ()))
            })
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    /// Queue a guess, then resolve the queue. The enqueue and each resolution
    /// are separate commits.
    pub async fn submit_guess(
        &self,
        room_id: &str,
        player_id: &str,
        target: &str,
        value: &str,
    ) -> ManagerResult<usize> {
        let event = GuessEvent::new(player_id, target, value, now_millis());
        self.transact(room_id, |_| {
            let (_, patch) = room_core::enqueue_guess(event.clone());
            Ok((Resolution::from_patch(patch), ()))
        })
        .await?;
        self.drain_queue(room_id).await
    }

    /// Resolve queued guesses oldest first until none remain.
    pub async fn drain_queue(&self, room_id: &str) -> ManagerResult<usize> {
        let mut processed = 0;
        loop {
            let committed = self
                .transact(room_id, |room| {
                    Ok(match room_core::process_next_guess(room, now_millis()) {
                        Some(guess) => (guess.resolution, Some((guess.event, guess.outcome))),
                        None => (Resolution::default(), None),
                    })
                })
                .await?;

            let Some((event, outcome)) = &committed.value else {
                return Ok(processed);
            };
            processed += 1;
            match outcome {
                Ok(outcome) => {
                    debug!(room_id, from = %event.from, ?outcome, "Guess resolved");
                    self.publish(room_id, &committed).await;
                }
                Err(error) => debug!(room_id, from = %event.from, %error, "Guess dropped"),
            }
        }
    }

    /// Fetch the external hint a lookup power-up needs before resolving it.
    async fn prefetch_hint(
        &self,
        room_id: &str,
        power_id: PowerUpId,
        target: Option<&str>,
    ) -> ManagerResult<Option<LookupHint>> {
        let (Some(kind), Some(target)) = (lookup_kind(power_id), target) else {
            return Ok(None);
        };
        let room = self.load(room_id).await?;
        let Some(word) = room
            .player(target)
            .map(|p| p.word.clone())
            .filter(|w| !w.is_empty())
        else {
            return Ok(None);
        };

        match self.lookup.hint(&word, kind).await {
            Ok(text) => Ok(Some(LookupHint { word, kind, text })),
            Err(error) => {
                warn!(room_id, ?kind, %error, "Lookup unavailable, falling back to letters");
                Ok(None)
            }
        }
    }

    pub async fn purchase(
        &self,
        room_id: &str,
        player_id: &str,
        power_id: PowerUpId,
        target: Option<PlayerId>,
        params: PowerUpParams,
    ) -> ManagerResult<PowerResult> {
        let hint = self
            .prefetch_hint(room_id, power_id, target.as_deref())
            .await?;
        let request = PurchaseRequest {
            buyer: player_id.to_string(),
            power_id,
            target,
            params,
        };

        let committed = self
            .transact(room_id, |room| {
                let context = PurchaseContext {
                    now: now_millis(),
                    hint: hint.clone(),
                };
                let mut rng = rand::thread_rng();
                let resolved = room_core::purchase(room, &request, &context, &mut rng)?;
                Ok((resolved.resolution, resolved.result))
            })
            .await?;
        info!(room_id, player_id, ?power_id, "Power-up purchased");
        self.publish(room_id, &committed).await;
        Ok(committed.value)
    }

    pub async fn request_ghost_reentry(&self, room_id: &str, player_id: &str) -> ManagerResult<()> {
        let committed = self
            .transact(room_id, |room| {
                let mut rng = rand::thread_rng();
                let resolution = room_core::request_reentry(
                    room,
                    player_id,
                    &self.word_bank,
                    &mut rng,
                    now_millis(),
                )?;
                Ok((resolution, ()))
            })
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    /// Returns the letter positions revealed to the ghost and whether the
    /// guess was correct.
    pub async fn ghost_guess(
        &self,
        room_id: &str,
        player_id: &str,
        value: &str,
    ) -> ManagerResult<(Vec<usize>, bool)> {
        let committed = self
            .transact(room_id, |room| {
                let mut rng = rand::thread_rng();
                let resolved = room_core::ghost_guess(
                    room,
                    player_id,
                    value,
                    &self.word_bank,
                    &mut rng,
                    now_millis(),
                )?;
                Ok((resolved.resolution, (resolved.positions, resolved.correct)))
            })
            .await?;
        self.publish(room_id, &committed).await;
        Ok(committed.value)
    }

    pub async fn vote_rematch(&self, room_id: &str, player_id: &str) -> ManagerResult<()> {
        let committed = self
            .transact(room_id, |room| Ok((room_core::vote_rematch(room, player_id)?, ())))
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    pub async fn reset_room(&self, room_id: &str, player_id: &str) -> ManagerResult<()> {
        let committed = self
            .transact(room_id, |room| Ok((room_core::reset_room(room, player_id)?, ())))
            .await?;
        self.publish(room_id, &committed).await;
        Ok(())
    }

    /// Record presence without broadcasting.
    pub async fn heartbeat(&self, room_id: &str, player_id: &str) -> ManagerResult<()> {
        let now = now_millis();
        self.transact(room_id, |room| Ok((room_core::touch(room, player_id, now)?, ())))
            .await?;
        Ok(())
    }
}
