use thiserror::Error;

/// Error taxonomy for all core operations.
///
/// Validation and resource errors surface to the caller with no state change.
/// Conflict errors are either retried by the store or surfaced. Invariant
/// violations abort the enclosing transaction and are treated as bugs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    // Validation
    #[error("bid too low: offered {offered}, minimum {minimum}")]
    BidTooLow { offered: i64, minimum: i64 },

    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    #[error("contract below floor: offered {offered}, floor {floor}")]
    ContractBelowFloor { offered: i64, floor: i64 },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    // Conflict
    #[error("stale day: expected {expected}, stored {stored}")]
    StaleDay { expected: u8, stored: u8 },

    #[error("auction closed: listing {0}")]
    AuctionClosed(u32),

    #[error("listing busy: listing {0}")]
    ListingBusy(u32),

    // Insufficient resources
    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("insufficient gems: required {required}, available {available}")]
    InsufficientGems { required: u32, available: u32 },

    #[error("insufficient lineup: team {team_id} has {fieldable} fieldable players, need {needed}")]
    InsufficientLineup {
        team_id: u32,
        fieldable: usize,
        needed: usize,
    },

    // Not found
    #[error("team not found: {0}")]
    TeamNotFound(u32),

    #[error("player not found: {0}")]
    PlayerNotFound(u32),

    #[error("staff not found: {0}")]
    StaffNotFound(u32),

    #[error("game not found: {0}")]
    GameNotFound(u32),

    #[error("tournament not found: {0}")]
    TournamentNotFound(u32),

    #[error("listing not found: {0}")]
    ListingNotFound(u32),

    #[error("no current season")]
    SeasonNotFound,

    // Invariant violation: a bug, not a runtime condition. The transaction
    // rolls back and the error is logged at the boundary.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl CoreError {
    /// Transient conflicts the store gateway retries internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ListingBusy(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, CoreError::Invariant(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listing_conflicts_are_retryable() {
        assert!(CoreError::ListingBusy(1).is_retryable());
        assert!(!CoreError::AuctionClosed(1).is_retryable());
        assert!(!CoreError::StaleDay { expected: 1, stored: 2 }.is_retryable());
    }

    #[test]
    fn messages_carry_their_context() {
        let error = CoreError::InsufficientCredits {
            required: 5_000,
            available: 1_000,
        };

        assert_eq!(
            "insufficient credits: required 5000, available 1000",
            error.to_string()
        );
    }
}
