use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerKind {
    OpeningBalance,
    ListingFee,
    BidEscrow,
    BidRelease,
    SaleProceeds,
    PurchaseSettled,
    Prize,
    Salary,
    SigningBonus,
    StadiumRevenue,
    StadiumMaintenance,
    TournamentEntryFee,
    TournamentEntryRefund,
}

/// Append-only financial ledger row. Written in the same transaction as the
/// balance change it describes; per team, the running sums reconstruct the
/// current balances exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub team_id: u32,
    /// Change to the free credit balance.
    pub delta_credits: i64,
    /// Change to the escrowed credit balance.
    pub delta_escrow: i64,
    /// Change to the gem balance.
    pub delta_gems: i64,
    pub kind: LedgerKind,
    pub note: String,
    pub at: NaiveDateTime,
}
