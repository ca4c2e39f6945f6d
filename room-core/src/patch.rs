use room_types::{
    DoubleDown, GainReason, GameMode, GhostChallenge, GhostGuess, GhostState, GuessEvent, Phase,
    Player, PlayerId, PowerRevealRecord, PriceSurge, PrivateHit, Room, RoomEvent, RoomSettings,
    TeamName, TeamWallet, TimeoutRecord, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reveal::reveal_occurrences;
use crate::wallet::{WalletRef, award_wallet, wallet_for};

/// One typed mutation of a room document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RoomCommand {
    RevealLetters { player: PlayerId, letters: Vec<char> },
    CreditWallet { player: PlayerId, amount: i64, reason: GainReason, ts: Timestamp },
    Eliminate { player: PlayerId, at: Timestamp },
    RecordGuessedBy { target: PlayerId, unit: String, guesser: PlayerId },
    MergePrivateHit { guesser: PlayerId, target: PlayerId, hit: PrivateHit },
    RecordPrivateWrong { guesser: PlayerId, target: PlayerId, letter: char },
    RecordPrivateWrongWord { guesser: PlayerId, target: PlayerId, word: String },
    RecordPowerReveal {
        owner: PlayerId,
        counterpart: PlayerId,
        event_id: String,
        record: PowerRevealRecord,
    },
    SetDoubleDown { player: PlayerId, double_down: Option<DoubleDown> },
    Freeze { player: PlayerId, until_turn_index: usize },
    SetPriceSurge { author: PlayerId, surge: Option<PriceSurge> },
    MarkLongestWordBonus { player: PlayerId },
    SetTurnOrder { order: Vec<PlayerId>, index: Option<usize> },
    StartTurn { started_at: Timestamp },
    RecordTimeout { key: String, record: TimeoutRecord },
    SetGhostChallenge { challenge: Option<GhostChallenge> },
    SetGhostState { player: PlayerId, state: GhostState },
    RecordGhostGuess { player: PlayerId, guess: GhostGuess, at: Timestamp },
    ClearGhostGuesses,
    Reenter { player: PlayerId, word: String },
    ScrubHistoryOf { player: PlayerId },
    EnqueueGuess { key: String, event: GuessEvent },
    DequeueGuess { key: String },
    AddPlayer { player: Player },
    RemovePlayer { player: PlayerId },
    Touch { player: PlayerId, ts: Timestamp },
    SetIdentity { player: PlayerId, name: String, auth_uid: Option<String> },
    SetHost { player: Option<PlayerId> },
    SetWord { player: PlayerId, word: String },
    SetTeam { player: PlayerId, team: Option<TeamName> },
    SetRematch { player: PlayerId, vote: bool },
    Configure {
        game_mode: GameMode,
        timed: bool,
        turn_timeout_seconds: Option<u64>,
        settings: RoomSettings,
    },
    SetPhase { phase: Phase },
    SetWinner { winner: Option<String> },
    ResetGameState,
    FundWallets { starting_wordmoney: u32 },
}

/// Ordered list of commands computed against one snapshot and committed
/// together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomPatch {
    pub commands: Vec<RoomCommand>,
}

impl RoomPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(command: RoomCommand) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn push(&mut self, command: RoomCommand) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn apply(&self, room: &mut Room) {
        for command in &self.commands {
            apply_command(room, command);
        }
    }
}

/// Computed effect of one action: the patch to commit and the events to publish
/// once it lands.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub patch: RoomPatch,
    pub events: Vec<RoomEvent>,
}

impl Resolution {
    pub fn from_patch(patch: RoomPatch) -> Self {
        Self {
            patch,
            events: Vec::new(),
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// The single interpreter every room mutation goes through.
pub fn apply_command(room: &mut Room, command: &RoomCommand) {
    match command {
        RoomCommand::RevealLetters { player, letters } => {
            if let Some(target) = room.players.get_mut(player) {
                let added = reveal_occurrences(target, letters);
                target.revealed.extend(added);
            }
        }
        RoomCommand::CreditWallet {
            player,
            amount,
            reason,
            ts,
        } => {
            award_wallet(room, player, *amount, *reason, *ts);
        }
        RoomCommand::Eliminate { player, at } => {
            if let Some(target) = room.players.get_mut(player) {
                target.eliminated = true;
                target.eliminated_at = Some(*at);
                target.frozen = false;
                target.frozen_until_turn_index = None;
            }
        }
        RoomCommand::RecordGuessedBy {
            target,
            unit,
            guesser,
        } => {
            if let Some(target) = room.players.get_mut(target) {
                push_unique(
                    target.guessed_by.entry(unit.clone()).or_default(),
                    guesser.clone(),
                );
            }
        }
        RoomCommand::MergePrivateHit {
            guesser,
            target,
            hit,
        } => {
            if let Some(guesser) = room.players.get_mut(guesser) {
                let hits = guesser.private_hits.entry(target.clone()).or_default();
                merge_hit(hits, hit.clone());
            }
        }
        RoomCommand::RecordPrivateWrong {
            guesser,
            target,
            letter,
        } => {
            if let Some(guesser) = room.players.get_mut(guesser) {
                push_unique(
                    guesser.private_wrong.entry(target.clone()).or_default(),
                    *letter,
                );
            }
        }
        RoomCommand::RecordPrivateWrongWord {
            guesser,
            target,
            word,
        } => {
            if let Some(guesser) = room.players.get_mut(guesser) {
                guesser
                    .private_wrong_words
                    .entry(target.clone())
                    .or_default()
                    .push(word.clone());
            }
        }
        RoomCommand::RecordPowerReveal {
            owner,
            counterpart,
            event_id,
            record,
        } => {
            if let Some(owner) = room.players.get_mut(owner) {
                owner
                    .private_power_reveals
                    .entry(counterpart.clone())
                    .or_default()
                    .entry(event_id.clone())
                    .or_insert_with(|| record.clone());
            }
        }
        RoomCommand::SetDoubleDown {
            player,
            double_down,
        } => {
            if let Some(player) = room.players.get_mut(player) {
                player.double_down = double_down.clone();
            }
        }
        RoomCommand::Freeze {
            player,
            until_turn_index,
        } => {
            if let Some(player) = room.players.get_mut(player) {
                player.frozen = true;
                player.frozen_until_turn_index = Some(*until_turn_index);
            }
        }
        RoomCommand::SetPriceSurge { author, surge } => match surge {
            Some(surge) => {
                room.price_surge.insert(author.clone(), surge.clone());
            }
            None => {
                room.price_surge.remove(author);
            }
        },
        RoomCommand::MarkLongestWordBonus { player } => {
            room.used_longest_word_bonus.insert(player.clone());
        }
        RoomCommand::SetTurnOrder { order, index } => {
            room.turn_order = order.clone();
            room.current_turn_index = match (*index, order.len()) {
                (_, 0) => None,
                (Some(index), len) => Some(index.min(len - 1)),
                (None, _) => Some(0),
            };
        }
        RoomCommand::StartTurn { started_at } => start_turn(room, *started_at),
        RoomCommand::RecordTimeout { key, record } => {
            room.timeouts
                .entry(key.clone())
                .or_insert_with(|| record.clone());
        }
        RoomCommand::SetGhostChallenge { challenge } => {
            room.ghost_challenge = challenge.clone();
        }
        RoomCommand::SetGhostState { player, state } => {
            if let Some(player) = room.players.get_mut(player) {
                player.ghost_state = Some(state.clone());
            }
        }
        RoomCommand::RecordGhostGuess { player, guess, at } => {
            if let Some(player) = room.players.get_mut(player) {
                player.ghost_guesses.push(guess.clone());
                player.ghost_last_guess_at = Some(*at);
            }
        }
        RoomCommand::ClearGhostGuesses => {
            for player in room.players.values_mut() {
                player.ghost_guesses.clear();
            }
        }
        RoomCommand::Reenter { player, word } => {
            if let Some(player) = room.players.get_mut(player) {
                player.eliminated = false;
                player.eliminated_at = None;
                player.word = word.clone();
                player.revealed.clear();
                player.guessed_by.clear();
                player.frozen = false;
                player.frozen_until_turn_index = None;
                player.double_down = None;
                let state = player.ghost_state.get_or_insert_with(GhostState::default);
                state.reentered = true;
            }
        }
        RoomCommand::ScrubHistoryOf { player } => {
            for (id, other) in room.players.iter_mut() {
                if id == player {
                    continue;
                }
                other.private_hits.remove(player);
                other.private_wrong.remove(player);
                other.private_wrong_words.remove(player);
                other.private_power_reveals.remove(player);
            }
        }
        RoomCommand::EnqueueGuess { key, event } => {
            room.queue.insert(key.clone(), event.clone());
        }
        RoomCommand::DequeueGuess { key } => {
            room.queue.remove(key);
        }
        RoomCommand::AddPlayer { player } => {
            room.players
                .entry(player.id.clone())
                .or_insert_with(|| player.clone());
        }
        RoomCommand::RemovePlayer { player } => {
            room.players.remove(player);
            room.price_surge.remove(player);
            room.used_longest_word_bonus.remove(player);
            for other in room.players.values_mut() {
                other.private_hits.remove(player);
                other.private_wrong.remove(player);
                other.private_wrong_words.remove(player);
                other.private_power_reveals.remove(player);
                for guessers in other.guessed_by.values_mut() {
                    guessers.retain(|id| id != player);
                }
            }
        }
        RoomCommand::Touch { player, ts } => {
            if let Some(player) = room.players.get_mut(player) {
                player.last_seen = player.last_seen.max(*ts);
            }
        }
        RoomCommand::SetIdentity {
            player,
            name,
            auth_uid,
        } => {
            if let Some(player) = room.players.get_mut(player) {
                player.name = name.clone();
                if auth_uid.is_some() {
                    player.auth_uid = auth_uid.clone();
                }
            }
        }
        RoomCommand::SetHost { player } => room.host_id = player.clone(),
        RoomCommand::SetWord { player, word } => {
            if let Some(player) = room.players.get_mut(player) {
                player.word = word.clone();
                player.revealed.clear();
            }
        }
        RoomCommand::SetTeam { player, team } => {
            if let Some(player) = room.players.get_mut(player) {
                player.team = team.clone();
            }
        }
        RoomCommand::SetRematch { player, vote } => {
            if let Some(player) = room.players.get_mut(player) {
                player.rematch = *vote;
            }
        }
        RoomCommand::Configure {
            game_mode,
            timed,
            turn_timeout_seconds,
            settings,
        } => {
            room.game_mode = *game_mode;
            room.timed = *timed;
            room.turn_timeout_seconds = *turn_timeout_seconds;
            room.settings = settings.clone();
        }
        RoomCommand::SetPhase { phase } => room.phase = *phase,
        RoomCommand::SetWinner { winner } => room.winner = winner.clone(),
        RoomCommand::ResetGameState => reset_game_state(room),
        RoomCommand::FundWallets { starting_wordmoney } => {
            room.teams.clear();
            let team_mode = room.is_team_mode();
            for player in room.players.values_mut() {
                player.wordmoney = *starting_wordmoney;
                if let (true, Some(team)) = (team_mode, player.team.as_ref()) {
                    let wallet = room.teams.entry(team.clone()).or_insert(TeamWallet {
                        wordmoney: 0,
                        last_gain: None,
                    });
                    wallet.wordmoney = wallet.wordmoney.saturating_add(*starting_wordmoney);
                }
            }
        }
    }
}

fn merge_hit(hits: &mut Vec<PrivateHit>, hit: PrivateHit) {
    if let PrivateHit::Letter { letter, count } = &hit {
        for existing in hits.iter_mut() {
            if let PrivateHit::Letter {
                letter: existing_letter,
                count: existing_count,
            } = existing
            {
                if existing_letter == letter {
                    *existing_count += count;
                    return;
                }
            }
        }
    }
    hits.push(hit);
}

/// Turn-start effects for whoever now holds the turn.
fn start_turn(room: &mut Room, started_at: Timestamp) {
    room.current_turn_started_at = Some(started_at);
    let Some(index) = room.current_turn_index else {
        return;
    };
    let Some(mover) = room.turn_order.get(index).cloned() else {
        return;
    };

    // A freeze ends when its owner moves again.
    if let Some(player) = room.players.get_mut(&mover) {
        player.frozen = false;
        player.frozen_until_turn_index = None;
    }
    room.price_surge.retain(|_, surge| surge.by != mover);

    if room.settings.starter_bonus {
        award_wallet(room, &mover, 1, GainReason::StarterBonus, started_at);
    }
}

fn reset_game_state(room: &mut Room) {
    room.phase = Phase::Lobby;
    room.turn_order.clear();
    room.current_turn_index = None;
    room.current_turn_started_at = None;
    room.teams.clear();
    room.price_surge.clear();
    room.timeouts.clear();
    room.ghost_challenge = None;
    room.used_longest_word_bonus.clear();
    room.queue.clear();
    room.winner = None;

    for player in room.players.values_mut() {
        *player = Player {
            id: std::mem::take(&mut player.id),
            name: std::mem::take(&mut player.name),
            team: player.team.take(),
            auth_uid: player.auth_uid.take(),
            joined_at: player.joined_at,
            last_seen: player.last_seen,
            ..Default::default()
        };
    }
}

/// Working copy of a room that records every command applied to it.
///
/// Resolvers push commands here so later steps observe earlier ones, then hand
/// back the patch to commit against the original snapshot.
#[derive(Debug)]
pub struct Draft {
    room: Room,
    resolution: Resolution,
    touched: Vec<WalletRef>,
}

impl Draft {
    pub fn new(snapshot: &Room) -> Self {
        Self {
            room: snapshot.clone(),
            resolution: Resolution::default(),
            touched: Vec::new(),
        }
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn push(&mut self, command: RoomCommand) {
        apply_command(&mut self.room, &command);
        self.resolution.patch.push(command);
    }

    pub fn emit(&mut self, event: RoomEvent) {
        self.resolution.events.push(event);
    }

    /// Route a signed award through the ledger and remember whose wallet moved.
    pub fn credit(&mut self, player: &str, amount: i64, reason: GainReason, ts: Timestamp) {
        if amount == 0 {
            return;
        }
        let wallet = wallet_for(&self.room, player);
        if !self.touched.contains(&wallet) {
            self.touched.push(wallet);
        }
        self.push(RoomCommand::CreditWallet {
            player: player.to_string(),
            amount,
            reason,
            ts,
        });
    }

    /// Publicly reveal every missing occurrence of `letters` and return the
    /// newly revealed count.
    pub fn reveal(&mut self, target: &str, letters: &[char]) -> usize {
        let Some(player) = self.room.players.get(target) else {
            debug!(target, "Reveal against unknown player ignored");
            return 0;
        };
        let added = reveal_occurrences(player, letters);
        let count = added.len();
        if count > 0 {
            self.push(RoomCommand::RevealLetters {
                player: target.to_string(),
                letters: added,
            });
        }
        count
    }

    pub fn wallet_touched(&self, player: &str) -> bool {
        self.touched.contains(&wallet_for(&self.room, player))
    }

    pub fn finish(self) -> Resolution {
        self.resolution
    }
}
