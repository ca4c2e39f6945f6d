use room_types::ActionError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
    #[error("Stale turn: {0}")]
    StaleTurn(String),
    #[error("Insufficient funds: price {price}, available {available}")]
    InsufficientFunds { price: u32, available: u32 },
    #[error("Invalid purchase: {0}")]
    InvalidPurchase(String),
    #[error("Target is frozen")]
    TargetFrozen,
    #[error("Ghost guess on cooldown for {retry_after_seconds}s")]
    GhostCooldown { retry_after_seconds: u64 },
    #[error("Ghost re-entry unavailable: {0}")]
    GhostUnavailable(String),
    #[error("Action not allowed in phase {0}")]
    InvalidPhase(String),
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
    #[error("Invalid word: {0}")]
    InvalidWord(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Only the host can do that")]
    NotHost,
}

impl ResolveError {
    /// Errors that are consumed without telling anyone.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            ResolveError::MalformedEvent(_) | ResolveError::StaleTurn(_)
        )
    }
}

impl From<ResolveError> for ActionError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::InsufficientFunds { price, available } => {
                ActionError::InsufficientFunds { price, available }
            }
            ResolveError::InvalidPurchase(reason) => ActionError::InvalidPurchase { reason },
            ResolveError::TargetFrozen => ActionError::TargetFrozen,
            ResolveError::GhostCooldown {
                retry_after_seconds,
            } => ActionError::GhostCooldown {
                retry_after_seconds,
            },
            ResolveError::GhostUnavailable(reason) => ActionError::GhostUnavailable { reason },
            ResolveError::InvalidPhase(current) => ActionError::InvalidPhase { current },
            ResolveError::InvalidWord(reason) => ActionError::InvalidWord { reason },
            ResolveError::InvalidSettings(reason) => ActionError::InvalidSettings { reason },
            ResolveError::NotHost => ActionError::NotHost,
            ResolveError::PlayerNotFound(player_id) => ActionError::PlayerNotFound { player_id },
            ResolveError::MalformedEvent(message) | ResolveError::StaleTurn(message) => {
                ActionError::Internal { message }
            }
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
