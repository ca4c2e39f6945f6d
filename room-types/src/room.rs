use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use ts_rs::TS;

use crate::power::{DoubleDown, PowerRevealRecord, PriceSurge};
use crate::{PlayerId, RoomId, TeamName, Timestamp};

/// `guessedBy` key recording full-word solvers.
pub const WORD_UNIT: &str = "__word";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Phase {
    #[default]
    Lobby,
    Submit,
    Playing,
    Ended,
    WordseekerWait,
    WordseekerPlaying,
    WordseekerVoting,
    WordseekerSpyguess,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum GameMode {
    #[default]
    LastOneStanding,
    LastTeamStanding,
    Money,
    WordSeeker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GainReason {
    LetterHit,
    WordSolved,
    WrongGuessAgainstYou,
    Participation,
    StarterBonus,
    PowerUpReveal,
    PowerUpCost,
    DoubleDownStake,
    DoubleDownReturn,
    LongestWordBonus,
    TimeoutPenalty,
}

/// Most recent wallet movement, kept for observability only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LastGain {
    pub amount: i64,
    pub reason: GainReason,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct TeamWallet {
    pub wordmoney: u32,
    pub last_gain: Option<LastGain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TimeoutRecord {
    pub player: PlayerId,
    pub deducted: u32,
    pub ts: Timestamp,
    /// Start stamp of the turn that expired, used to skip a turn that was
    /// already penalized. This is not the stamp of the turn that followed;
    /// read `next_turn_started_at` for that.
    pub turn_started_at: Timestamp,
    /// Start stamp of the turn that replaced the expired one.
    pub next_turn_started_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GhostChallenge {
    pub key: String,
    pub word: String,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct GhostState {
    pub reentered: bool,
    pub attempted_at: Option<Timestamp>,
    pub challenge_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GhostGuess {
    pub challenge_key: String,
    pub value: String,
    pub positions: Vec<usize>,
    pub correct: bool,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum PrivateHit {
    Letter { letter: char, count: u32 },
    Word { word: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct GuessPayload {
    pub value: Option<String>,
}

/// Inbound guess, appended to the room queue and consumed exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct GuessEvent {
    pub from: PlayerId,
    pub target: Option<PlayerId>,
    pub payload: GuessPayload,
    pub queued_at: Timestamp,
}

impl GuessEvent {
    pub fn new(from: &str, target: &str, value: &str, queued_at: Timestamp) -> Self {
        Self {
            from: from.to_string(),
            target: Some(target.to_string()),
            payload: GuessPayload {
                value: Some(value.to_string()),
            },
            queued_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct RoomSettings {
    pub starter_bonus: bool,
    pub min_word_length: usize,
    pub max_word_length: usize,
    pub starting_wordmoney: u32,
    pub ghost_reentry_enabled: bool,
    pub ghost_cooldown_seconds: u64,
    pub theme: Option<String>,
    pub validate_words: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            starter_bonus: false,
            min_word_length: 3,
            max_word_length: 12,
            starting_wordmoney: 2,
            ghost_reentry_enabled: true,
            ghost_cooldown_seconds: 20,
            theme: None,
            validate_words: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub word: String,
    pub revealed: Vec<char>,
    pub eliminated: bool,
    pub eliminated_at: Option<Timestamp>,
    pub wordmoney: u32,
    pub team: Option<TeamName>,
    pub guessed_by: BTreeMap<String, Vec<PlayerId>>,
    pub private_hits: BTreeMap<PlayerId, Vec<PrivateHit>>,
    pub private_wrong: BTreeMap<PlayerId, Vec<char>>,
    pub private_wrong_words: BTreeMap<PlayerId, Vec<String>>,
    pub private_power_reveals: BTreeMap<PlayerId, BTreeMap<String, PowerRevealRecord>>,
    pub double_down: Option<DoubleDown>,
    pub frozen: bool,
    pub frozen_until_turn_index: Option<usize>,
    pub ghost_state: Option<GhostState>,
    pub ghost_last_guess_at: Option<Timestamp>,
    pub ghost_guesses: Vec<GhostGuess>,
    pub last_gain: Option<LastGain>,
    /// Present when the player joined with a verified identity; such players are
    /// never evicted for idleness.
    pub auth_uid: Option<String>,
    pub joined_at: Timestamp,
    pub last_seen: Timestamp,
    pub rematch: bool,
}

impl Player {
    pub fn new(id: &str, name: &str, now: Timestamp) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            joined_at: now,
            last_seen: now,
            ..Default::default()
        }
    }

    pub fn has_word(&self) -> bool {
        !self.word.is_empty()
    }

    pub fn occurrences(&self, letter: char) -> usize {
        self.word.chars().filter(|&c| c == letter).count()
    }

    pub fn revealed_count(&self, letter: char) -> usize {
        self.revealed.iter().filter(|&&c| c == letter).count()
    }

    /// Letters of the word that still have unrevealed occurrences, in word order
    /// without duplicates.
    pub fn unrevealed_letters(&self) -> Vec<char> {
        let mut letters = Vec::new();
        for ch in self.word.chars() {
            if !letters.contains(&ch) && self.revealed_count(ch) < self.occurrences(ch) {
                letters.push(ch);
            }
        }
        letters
    }

    pub fn is_fully_revealed(&self) -> bool {
        self.has_word() && self.unrevealed_letters().is_empty()
    }

    /// Still in the game: not eliminated and holding a secret word.
    pub fn is_alive(&self) -> bool {
        !self.eliminated && self.has_word()
    }

    pub fn has_reentered(&self) -> bool {
        self.ghost_state.as_ref().is_some_and(|g| g.reentered)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Room {
    pub id: RoomId,
    pub host_id: Option<PlayerId>,
    pub phase: Phase,
    pub created_at: Timestamp,
    pub turn_order: Vec<PlayerId>,
    pub current_turn_index: Option<usize>,
    pub current_turn_started_at: Option<Timestamp>,
    pub timed: bool,
    pub turn_timeout_seconds: Option<u64>,
    pub game_mode: GameMode,
    pub teams: BTreeMap<TeamName, TeamWallet>,
    pub price_surge: BTreeMap<PlayerId, PriceSurge>,
    pub timeouts: BTreeMap<String, TimeoutRecord>,
    pub ghost_challenge: Option<GhostChallenge>,
    pub used_longest_word_bonus: BTreeSet<PlayerId>,
    pub players: BTreeMap<PlayerId, Player>,
    pub queue: BTreeMap<String, GuessEvent>,
    pub settings: RoomSettings,
    pub winner: Option<String>,
}

impl Room {
    pub fn new(id: &str, host: Player, now: Timestamp) -> Self {
        let mut players = BTreeMap::new();
        let host_id = host.id.clone();
        players.insert(host_id.clone(), host);
        Self {
            id: id.to_string(),
            host_id: Some(host_id),
            created_at: now,
            players,
            ..Default::default()
        }
    }

    pub fn is_team_mode(&self) -> bool {
        self.game_mode == GameMode::LastTeamStanding
    }

    pub fn current_player_id(&self) -> Option<&PlayerId> {
        self.current_turn_index
            .and_then(|index| self.turn_order.get(index))
    }

    pub fn is_current_player(&self, player_id: &str) -> bool {
        self.current_player_id().is_some_and(|id| id == player_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    /// Team whose wallet a player spends from, if any.
    pub fn wallet_team(&self, player_id: &str) -> Option<&TeamName> {
        if !self.is_team_mode() {
            return None;
        }
        self.players.get(player_id).and_then(|p| p.team.as_ref())
    }

    pub fn are_teammates(&self, a: &str, b: &str) -> bool {
        match (self.wallet_team(a), self.wallet_team(b)) {
            (Some(ta), Some(tb)) => ta == tb,
            _ => false,
        }
    }

    /// Copy of the room as one participant may see it: other players' words,
    /// their private histories and the ghost challenge word are withheld.
    /// Teammates in team mode share their private histories.
    pub fn personalized_for_player(&self, viewer: &str) -> Self {
        let mut view = self.clone();
        let game_over = self.phase == Phase::Ended;

        for (id, player) in view.players.iter_mut() {
            if id == viewer || self.are_teammates(id, viewer) {
                continue;
            }
            if !game_over && !player.eliminated {
                player.word = "*".repeat(player.word.chars().count());
            }
            player.private_hits.clear();
            player.private_wrong.clear();
            player.private_wrong_words.clear();
            player.private_power_reveals.clear();
            player.double_down = None;
            player.ghost_guesses.clear();
            player.auth_uid = None;
        }

        if let Some(challenge) = view.ghost_challenge.as_mut() {
            challenge.word = "*".repeat(challenge.word.chars().count());
        }
        view.queue.clear();
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with(words: &[(&str, &str)]) -> Room {
        let mut room = Room::new("room-1", Player::new("host", "Host", 0), 0);
        room.players.clear();
        for (id, word) in words {
            let mut player = Player::new(id, id, 0);
            player.word = word.to_string();
            room.players.insert(id.to_string(), player);
        }
        room
    }

    #[test]
    fn test_unrevealed_letters_respects_multiplicity() {
        let mut player = Player::new("a", "A", 0);
        player.word = "letter".to_string();
        player.revealed = vec!['t'];

        assert_eq!(player.unrevealed_letters(), vec!['l', 'e', 't', 'r']);

        player.revealed = vec!['t', 't', 'e', 'e', 'l', 'r'];
        assert!(player.unrevealed_letters().is_empty());
        assert!(player.is_fully_revealed());
    }

    #[test]
    fn test_personalized_view_hides_opponent_words() {
        let room = room_with(&[("alice", "apple"), ("bob", "ghost")]);
        let view = room.personalized_for_player("alice");

        assert_eq!(view.players["alice"].word, "apple");
        assert_eq!(view.players["bob"].word, "*****");
    }

    #[test]
    fn test_serialized_keys_match_client_shape() {
        let mut room = room_with(&[("alice", "apple")]);
        room.phase = Phase::WordseekerSpyguess;
        room.current_turn_index = Some(0);
        let json = serde_json::to_value(&room).unwrap();

        assert_eq!(json["phase"], "wordseeker_spyguess");
        assert_eq!(json["gameMode"], "lastOneStanding");
        assert!(json.get("currentTurnIndex").is_some());
        assert!(json["players"]["alice"].get("privatePowerReveals").is_some());
        assert!(json["players"]["alice"].get("frozenUntilTurnIndex").is_some());
    }

    #[test]
    fn test_partial_documents_deserialize_with_defaults() {
        let json = r#"{"id":"r","phase":"playing","players":{"a":{"id":"a","word":"cat"}}}"#;
        let room: Room = serde_json::from_str(json).unwrap();

        assert_eq!(room.phase, Phase::Playing);
        assert_eq!(room.players["a"].wordmoney, 0);
        assert_eq!(room.settings.ghost_cooldown_seconds, 20);
    }
}
