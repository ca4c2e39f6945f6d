use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::{PlayerId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PowerUpId {
    LetterPeek,
    VowelVision,
    LetterScope,
    RareTrace,
    OneRandomLetter,
    ZetaDrop,
    LetterForLetter,
    WhatDoYouMean,
    RelatedWord,
    SoundCheck,
    CrowdHint,
    WordFreeze,
    DoubleDown,
    PriceSurge,
    LongestWordBonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpClass {
    Opponent,
    SelfTargeted,
}

impl PowerUpId {
    pub const ALL: [PowerUpId; 15] = [
        PowerUpId::LetterPeek,
        PowerUpId::VowelVision,
        PowerUpId::LetterScope,
        PowerUpId::RareTrace,
        PowerUpId::OneRandomLetter,
        PowerUpId::ZetaDrop,
        PowerUpId::LetterForLetter,
        PowerUpId::WhatDoYouMean,
        PowerUpId::RelatedWord,
        PowerUpId::SoundCheck,
        PowerUpId::CrowdHint,
        PowerUpId::WordFreeze,
        PowerUpId::DoubleDown,
        PowerUpId::PriceSurge,
        PowerUpId::LongestWordBonus,
    ];

    pub fn base_price(self) -> u32 {
        match self {
            PowerUpId::LetterPeek => 3,
            PowerUpId::VowelVision => 3,
            PowerUpId::LetterScope => 4,
            PowerUpId::RareTrace => 3,
            PowerUpId::OneRandomLetter => 4,
            PowerUpId::ZetaDrop => 5,
            PowerUpId::LetterForLetter => 2,
            PowerUpId::WhatDoYouMean => 6,
            PowerUpId::RelatedWord => 6,
            PowerUpId::SoundCheck => 5,
            PowerUpId::CrowdHint => 5,
            PowerUpId::WordFreeze => 4,
            PowerUpId::DoubleDown => 1,
            PowerUpId::PriceSurge => 5,
            PowerUpId::LongestWordBonus => 3,
        }
    }

    pub fn class(self) -> PowerUpClass {
        match self {
            PowerUpId::CrowdHint
            | PowerUpId::WordFreeze
            | PowerUpId::PriceSurge
            | PowerUpId::LongestWordBonus => PowerUpClass::SelfTargeted,
            _ => PowerUpClass::Opponent,
        }
    }

    pub fn is_opponent_type(self) -> bool {
        self.class() == PowerUpClass::Opponent
    }

    /// Power-ups whose effect depends on the external word lookup.
    pub fn needs_lookup(self) -> bool {
        matches!(
            self,
            PowerUpId::WhatDoYouMean | PowerUpId::RelatedWord | PowerUpId::SoundCheck
        )
    }

    pub fn advances_turn(self) -> bool {
        self != PowerUpId::DoubleDown
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct PowerUpParams {
    pub letter: Option<char>,
    pub position: Option<usize>,
    pub stake: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LookupKind {
    Definition,
    Related,
    Rhyme,
}

/// Outcome of one purchase, stored verbatim in the power reveal history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum PowerResult {
    LetterPeek { position: usize, letter: Option<char> },
    VowelCount { count: u32 },
    LetterCount { letter: char, count: u32 },
    RareCount { count: u32 },
    Revealed { letters: Vec<char>, awarded: u32 },
    LetterForLetter { target_letter: Option<char>, own_letter: Option<char>, awarded: u32 },
    Hint { kind: LookupKind, text: String },
    HintFallback { letters: Vec<char>, awarded: u32 },
    CrowdHint { letters: BTreeMap<PlayerId, char> },
    Frozen { until_turn_index: usize },
    DoubleDown { stake: u32 },
    PriceSurge { amount: u32 },
    LongestWordBonus { winners: Vec<PlayerId>, each: u32 },
    NoEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PowerRevealRecord {
    pub power_id: PowerUpId,
    pub from: PlayerId,
    pub to: PlayerId,
    pub result: PowerResult,
    pub ts: Timestamp,
    /// False when the reveal must not feed any later reward computation.
    #[serde(default = "default_scoring")]
    pub scoring: bool,
}

fn default_scoring() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DoubleDown {
    pub active: bool,
    pub stake: u32,
    pub target: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceSurge {
    pub amount: u32,
    pub by: PlayerId,
    pub expires_at_turn_index: Option<usize>,
}
