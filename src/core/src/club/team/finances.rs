use serde::{Deserialize, Serialize};

/// Team balances. Credits may only go negative through salary settlement at
/// season rollover; escrow balances back active marketplace bids and are
/// never spendable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFinances {
    pub credits: i64,
    pub gems: u32,
    pub escrow_credits: i64,
    pub escrow_gems: u32,
}

impl TeamFinances {
    pub fn new(credits: i64, gems: u32) -> Self {
        TeamFinances {
            credits,
            gems,
            escrow_credits: 0,
            escrow_gems: 0,
        }
    }

    /// Credits available for spending or bidding.
    pub fn free_credits(&self) -> i64 {
        self.credits
    }

    /// A team in the red cannot open new marketplace listings.
    pub fn can_list(&self) -> bool {
        self.credits >= 0
    }
}
