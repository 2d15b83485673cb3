use serde::{Deserialize, Serialize};

pub const MIN_CONTRACT_SEASONS: u8 = 1;
pub const MAX_CONTRACT_SEASONS: u8 = 3;

/// A player or staff contract. Salaries are annual and paid in full at
/// season rollover; the signing bonus is paid once at signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub salary: i64,
    pub seasons_remaining: u8,
    pub signing_bonus: i64,
}

impl Contract {
    pub fn new(salary: i64, seasons: u8, signing_bonus: i64) -> Self {
        Contract {
            salary,
            seasons_remaining: seasons.clamp(MIN_CONTRACT_SEASONS, MAX_CONTRACT_SEASONS),
            signing_bonus,
        }
    }

    /// Season-boundary tick. Returns true when the contract has expired.
    pub fn tick_season(&mut self) -> bool {
        self.seasons_remaining = self.seasons_remaining.saturating_sub(1);
        self.seasons_remaining == 0
    }
}
