use room_types::{GainReason, LastGain, PlayerId, Room, TeamName, Timestamp};

/// The wallet a player's credits and debits land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletRef {
    Player(PlayerId),
    Team(TeamName),
}

/// Resolve which wallet backs a player. Team mode routes teamed players to
/// their team's shared wallet.
pub fn wallet_for(room: &Room, player_id: &str) -> WalletRef {
    match room.wallet_team(player_id) {
        Some(team) => WalletRef::Team(team.clone()),
        None => WalletRef::Player(player_id.to_string()),
    }
}

/// Funds a player can currently spend.
pub fn available_funds(room: &Room, player_id: &str) -> u32 {
    match wallet_for(room, player_id) {
        WalletRef::Team(team) => room.teams.get(&team).map(|t| t.wordmoney).unwrap_or(0),
        WalletRef::Player(id) => room.players.get(&id).map(|p| p.wordmoney).unwrap_or(0),
    }
}

/// Apply a signed delta to a balance, clamped at zero.
pub fn apply_delta(balance: u32, delta: i64) -> u32 {
    let next = i64::from(balance).saturating_add(delta);
    next.clamp(0, i64::from(u32::MAX)) as u32
}

/// Credit (or debit, for negative amounts) the wallet backing `beneficiary`.
///
/// Returns the delta that actually landed after clamping. Unknown players are
/// ignored and yield zero.
pub fn award_wallet(
    room: &mut Room,
    beneficiary: &str,
    amount: i64,
    reason: GainReason,
    ts: Timestamp,
) -> i64 {
    if amount == 0 || !room.players.contains_key(beneficiary) {
        return 0;
    }

    let gain = |applied: i64| LastGain {
        amount: applied,
        reason,
        ts,
    };

    match wallet_for(room, beneficiary) {
        WalletRef::Team(team) => {
            let wallet = room.teams.entry(team).or_default();
            let before = wallet.wordmoney;
            wallet.wordmoney = apply_delta(before, amount);
            let applied = i64::from(wallet.wordmoney) - i64::from(before);
            wallet.last_gain = Some(gain(applied));
            if let Some(player) = room.players.get_mut(beneficiary) {
                player.last_gain = Some(gain(applied));
            }
            applied
        }
        WalletRef::Player(id) => match room.players.get_mut(&id) {
            Some(player) => {
                let before = player.wordmoney;
                player.wordmoney = apply_delta(before, amount);
                let applied = i64::from(player.wordmoney) - i64::from(before);
                player.last_gain = Some(gain(applied));
                applied
            }
            None => 0,
        },
    }
}
