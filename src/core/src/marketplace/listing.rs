use crate::error::{CoreError, CoreResult};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A seller may run at most this many listings at once.
pub const MAX_ACTIVE_LISTINGS: usize = 3;

/// Anti-snipe: a bid landing inside this window extends the auction.
pub const ANTI_SNIPE_WINDOW_S: i64 = 60;
pub const ANTI_SNIPE_EXTENSION_S: i64 = 60;

/// Minimum bid step: the larger of 100 credits or 5% of the current bid.
pub fn minimum_increment(current_bid: i64) -> i64 {
    (current_bid / 20).max(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Active,
    Sold,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceListing {
    pub id: u32,
    pub seller_team_id: u32,
    pub player_id: u32,
    pub start_bid: i64,
    pub buy_now: Option<i64>,
    pub current_bid: Option<i64>,
    pub current_high_bidder: Option<u32>,
    pub listed_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    /// Expiry as originally listed; `expires_at - original` tracks the
    /// anti-snipe extensions.
    pub original_expires_at: NaiveDateTime,
    pub extensions_used: u8,
    pub status: ListingStatus,
    /// Off-season listings are buy-now only.
    pub buy_now_only: bool,
}

impl MarketplaceListing {
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.status == ListingStatus::Active && now < self.expires_at
    }

    /// Lowest acceptable next bid.
    pub fn minimum_bid(&self) -> i64 {
        match self.current_bid {
            Some(current) => current + minimum_increment(current),
            None => self.start_bid,
        }
    }

    /// Validate a bid amount against the listing state. Returns the amount
    /// the outbid previous bidder must be refunded.
    pub fn validate_bid(&self, now: NaiveDateTime, amount: i64) -> CoreResult<Option<(u32, i64)>> {
        if self.status != ListingStatus::Active || now >= self.expires_at {
            return Err(CoreError::AuctionClosed(self.id));
        }

        if self.buy_now_only {
            return Err(CoreError::InvalidOperation(format!(
                "listing {} accepts buy-now only",
                self.id
            )));
        }

        let minimum = self.minimum_bid();
        if amount < minimum {
            return Err(CoreError::BidTooLow {
                offered: amount,
                minimum,
            });
        }

        Ok(self
            .current_high_bidder
            .zip(self.current_bid))
    }

    /// Record an accepted bid; applies the anti-snipe extension when inside
    /// the window and under the cap. At the cap, late bids still succeed
    /// without extending further.
    pub fn apply_bid(
        &mut self,
        now: NaiveDateTime,
        bidder_team_id: u32,
        amount: i64,
        max_extensions: u8,
    ) {
        self.current_bid = Some(amount);
        self.current_high_bidder = Some(bidder_team_id);

        let in_window = self.expires_at - now <= Duration::seconds(ANTI_SNIPE_WINDOW_S);
        if in_window && self.extensions_used < max_extensions {
            self.expires_at += Duration::seconds(ANTI_SNIPE_EXTENSION_S);
            self.extensions_used += 1;
        }
    }

    /// Listing fee charged up front: a percentage of buy-now when present,
    /// of the start bid otherwise. Non-refundable.
    pub fn listing_fee(basis_buy_now: Option<i64>, start_bid: i64, fee_percent: u8) -> i64 {
        let basis = basis_buy_now.unwrap_or(start_bid);
        basis * fee_percent as i64 / 100
    }

    /// Seller proceeds after the market tax.
    pub fn net_proceeds(final_price: i64, tax_percent: u8) -> i64 {
        final_price - final_price * tax_percent as i64 / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn listing() -> MarketplaceListing {
        MarketplaceListing {
            id: 1,
            seller_team_id: 10,
            player_id: 500,
            start_bid: 10_000,
            buy_now: Some(80_000),
            current_bid: None,
            current_high_bidder: None,
            listed_at: at(8, 0, 0),
            expires_at: at(20, 0, 0),
            original_expires_at: at(20, 0, 0),
            extensions_used: 0,
            status: ListingStatus::Active,
            buy_now_only: false,
        }
    }

    #[test]
    fn first_bid_must_meet_start_bid() {
        let listing = listing();

        assert!(matches!(
            listing.validate_bid(at(9, 0, 0), 9_999),
            Err(CoreError::BidTooLow { minimum: 10_000, .. })
        ));
        assert!(listing.validate_bid(at(9, 0, 0), 10_000).is_ok());
    }

    #[test]
    fn later_bids_require_the_increment() {
        let mut listing = listing();
        listing.apply_bid(at(9, 0, 0), 20, 50_000, 5);

        let minimum = 50_000 + minimum_increment(50_000);
        assert_eq!(minimum, listing.minimum_bid());
        assert!(matches!(
            listing.validate_bid(at(9, 30, 0), minimum - 1),
            Err(CoreError::BidTooLow { .. })
        ));
    }

    #[test]
    fn anti_snipe_extends_only_inside_window() {
        let mut listing = listing();

        // Well before expiry: no extension.
        listing.apply_bid(at(9, 0, 0), 20, 50_000, 5);
        assert_eq!(0, listing.extensions_used);
        assert_eq!(at(20, 0, 0), listing.expires_at);

        // 30 seconds before expiry: extend by 60s.
        listing.apply_bid(at(19, 59, 30), 21, 55_000, 5);
        assert_eq!(1, listing.extensions_used);
        assert_eq!(at(20, 1, 0), listing.expires_at);
    }

    #[test]
    fn extensions_cap_without_rejecting_bids() {
        let mut listing = listing();
        listing.extensions_used = 5;
        let expires = listing.expires_at;

        listing.apply_bid(expires - Duration::seconds(10), 22, 60_000, 5);

        assert_eq!(5, listing.extensions_used);
        assert_eq!(expires, listing.expires_at);
        assert_eq!(Some(60_000), listing.current_bid);
    }

    #[test]
    fn expired_listings_reject_bids() {
        let listing = listing();

        assert!(matches!(
            listing.validate_bid(at(20, 0, 0), 90_000),
            Err(CoreError::AuctionClosed(1))
        ));
    }

    #[test]
    fn fee_and_tax_math() {
        assert_eq!(2_400, MarketplaceListing::listing_fee(Some(80_000), 10_000, 3));
        assert_eq!(300, MarketplaceListing::listing_fee(None, 10_000, 3));
        assert_eq!(57_000, MarketplaceListing::net_proceeds(60_000, 5));
    }

    #[test]
    fn extension_arithmetic_matches_count() {
        let mut listing = listing();

        for i in 0..7u8 {
            let now = listing.expires_at - Duration::seconds(10);
            listing.apply_bid(now, 30 + i as u32, 50_000 + 10_000 * i as i64, 5);
        }

        assert_eq!(5, listing.extensions_used);
        assert_eq!(
            Duration::seconds(5 * ANTI_SNIPE_EXTENSION_S),
            listing.expires_at - listing.original_expires_at
        );
    }
}
