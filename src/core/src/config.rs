use serde::{Deserialize, Serialize};

/// Enumerated configuration for the whole core. Nothing outside this struct
/// (and `RUST_LOG`) is consulted at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Civil time zone label. All calendar math is done on civil datetimes;
    /// the zone is never consulted for offsets.
    pub time_zone: String,
    /// Hour at which a new game day begins (03:00 local).
    pub day_start_hour: u32,
    /// Match simulation window on days 1-14.
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    /// Tournament bracket sizes.
    pub daily_tournament_size: usize,
    pub classic_tournament_size: usize,
    /// Live match tick rate in Hz.
    pub tick_rate_hz: u32,
    /// Live match checkpoint interval in simulated seconds.
    pub checkpoint_interval_s: u32,
    /// Advisory-lock key owned by the automation leader.
    pub leader_lock_key: String,
    /// Anti-snipe extension cap per listing.
    pub max_auction_extensions: u8,
    /// Non-refundable listing fee, percent.
    pub listing_fee_percent: u8,
    /// Market tax withheld from the seller at settlement, percent.
    pub market_tax_percent: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            time_zone: String::from("America/New_York"),
            day_start_hour: 3,
            window_start_hour: 16,
            window_end_hour: 22,
            daily_tournament_size: 8,
            classic_tournament_size: 16,
            tick_rate_hz: 1,
            checkpoint_interval_s: 15,
            leader_lock_key: String::from("automation_leader"),
            max_auction_extensions: 5,
            listing_fee_percent: 3,
            market_tax_percent: 5,
        }
    }
}
