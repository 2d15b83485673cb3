use chrono::{Duration, NaiveDateTime};
use core::calendar::Phase;
use core::config::CoreConfig;
use core::error::{CoreError, CoreResult};
use core::marketplace::{ListingStatus, MarketplaceListing, MAX_ACTIVE_LISTINGS};
use log::info;
use std::sync::Arc;
use store::{LedgerKind, Store};

/// The marketplace auction engine: listing lifecycle, escrowed bidding with
/// anti-snipe extensions, and atomic settlement. Every operation is one
/// store transaction, so balances and listing state can never diverge.
pub struct MarketplaceService {
    store: Arc<Store>,
    config: CoreConfig,
}

impl MarketplaceService {
    pub fn new(store: Arc<Store>, config: CoreConfig) -> Self {
        MarketplaceService { store, config }
    }

    /// Create a listing. The listing fee (3% of buy-now, else of start bid)
    /// is charged up front and never refunded. Sellers in the red cannot
    /// list.
    pub fn list_player(
        &self,
        now: NaiveDateTime,
        seller_team_id: u32,
        player_id: u32,
        start_bid: i64,
        buy_now: Option<i64>,
        duration: Duration,
    ) -> CoreResult<u32> {
        let fee_percent = self.config.listing_fee_percent;

        self.store.with_tx(now, |tx| {
            let player = tx.player(player_id)?;
            if player.team_id != seller_team_id {
                return Err(CoreError::InvalidOperation(format!(
                    "player {} does not belong to team {}",
                    player_id, seller_team_id
                )));
            }
            if player.retired {
                return Err(CoreError::InvalidOperation(format!(
                    "player {} is retired",
                    player_id
                )));
            }

            let finances = tx.finances(seller_team_id)?;
            if !finances.can_list() {
                return Err(CoreError::InsufficientCredits {
                    required: 0,
                    available: finances.credits,
                });
            }

            if tx.active_listing_count(seller_team_id) >= MAX_ACTIVE_LISTINGS {
                return Err(CoreError::InvalidOperation(format!(
                    "team {} already has {} active listings",
                    seller_team_id, MAX_ACTIVE_LISTINGS
                )));
            }

            let already_listed = tx
                .listings_by_status(ListingStatus::Active)
                .iter()
                .any(|l| l.player_id == player_id);
            if already_listed {
                return Err(CoreError::InvalidOperation(format!(
                    "player {} is already listed",
                    player_id
                )));
            }

            // Off-season market is buy-now only.
            let offseason = tx.current_season()?.phase == Phase::Offseason;
            if offseason && buy_now.is_none() {
                return Err(CoreError::InvalidOperation(String::from(
                    "off-season listings must set a buy-now price",
                )));
            }

            let fee = MarketplaceListing::listing_fee(buy_now, start_bid, fee_percent);
            tx.debit(
                seller_team_id,
                fee,
                LedgerKind::ListingFee,
                &format!("listing fee, player {}", player_id),
                false,
            )?;

            let expires_at = now + duration;
            let id = tx.insert_listing(MarketplaceListing {
                id: 0,
                seller_team_id,
                player_id,
                start_bid,
                buy_now,
                current_bid: None,
                current_high_bidder: None,
                listed_at: now,
                expires_at,
                original_expires_at: expires_at,
                extensions_used: 0,
                status: ListingStatus::Active,
                buy_now_only: offseason,
            });

            Ok(id)
        })
    }

    /// Place an escrowed bid. In one transaction: validate the increment,
    /// reserve the bidder's credits, release the outbid bidder, update the
    /// listing, and extend expiry when inside the anti-snipe window.
    pub fn place_bid(
        &self,
        now: NaiveDateTime,
        listing_id: u32,
        bidder_team_id: u32,
        amount: i64,
    ) -> CoreResult<()> {
        let max_extensions = self.config.max_auction_extensions;

        self.store.with_tx(now, |tx| {
            let previous = {
                let listing = tx.listing(listing_id)?;

                if listing.seller_team_id == bidder_team_id {
                    return Err(CoreError::InvalidOperation(String::from(
                        "sellers cannot bid on their own listings",
                    )));
                }

                listing.validate_bid(now, amount)?
            };

            tx.reserve_bid(bidder_team_id, amount)?;

            if let Some((outbid_team, outbid_amount)) = previous {
                tx.release_bid(outbid_team, outbid_amount)?;
            }

            tx.listing_mut(listing_id)?
                .apply_bid(now, bidder_team_id, amount, max_extensions);

            tx.audit_team(bidder_team_id)
        })
    }

    /// Immediate settlement at the buy-now price; any standing bid is
    /// refunded in the same transaction.
    pub fn buy_now(
        &self,
        now: NaiveDateTime,
        listing_id: u32,
        buyer_team_id: u32,
    ) -> CoreResult<()> {
        let tax_percent = self.config.market_tax_percent;

        self.store.with_tx(now, |tx| {
            let (seller, player_id, price, previous) = {
                let listing = tx.listing(listing_id)?;

                if !listing.is_active(now) {
                    return Err(CoreError::AuctionClosed(listing_id));
                }
                if listing.seller_team_id == buyer_team_id {
                    return Err(CoreError::InvalidOperation(String::from(
                        "sellers cannot buy their own listings",
                    )));
                }

                let price = listing.buy_now.ok_or_else(|| {
                    CoreError::InvalidOperation(format!(
                        "listing {} has no buy-now price",
                        listing_id
                    ))
                })?;

                (
                    listing.seller_team_id,
                    listing.player_id,
                    price,
                    listing.current_high_bidder.zip(listing.current_bid),
                )
            };

            tx.debit(
                buyer_team_id,
                price,
                LedgerKind::PurchaseSettled,
                &format!("buy-now, listing {}", listing_id),
                false,
            )?;

            if let Some((outbid_team, outbid_amount)) = previous {
                tx.release_bid(outbid_team, outbid_amount)?;
            }

            Self::pay_seller(tx, listing_id, seller, player_id, price, tax_percent)?;

            let listing = tx.listing_mut(listing_id)?;
            listing.status = ListingStatus::Sold;
            listing.current_bid = Some(price);
            listing.current_high_bidder = Some(buyer_team_id);

            tx.player_mut(player_id)?.team_id = buyer_team_id;
            tx.player_mut(player_id)?.on_taxi_squad = false;

            tx.audit_team(buyer_team_id)?;
            tx.audit_team(seller)
        })
    }

    /// Seller-side cancellation: only while active and before any bid.
    pub fn cancel_listing(
        &self,
        now: NaiveDateTime,
        listing_id: u32,
        seller_team_id: u32,
    ) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            let listing = tx.listing(listing_id)?;

            if listing.seller_team_id != seller_team_id {
                return Err(CoreError::InvalidOperation(String::from(
                    "only the seller may cancel a listing",
                )));
            }
            if listing.status != ListingStatus::Active {
                return Err(CoreError::AuctionClosed(listing_id));
            }
            if listing.current_bid.is_some() {
                return Err(CoreError::InvalidOperation(String::from(
                    "listings with bids cannot be cancelled",
                )));
            }

            tx.listing_mut(listing_id)?.status = ListingStatus::Cancelled;
            Ok(())
        })
    }

    /// Settle every listing past its expiry. Invoked on a short cadence by
    /// the timing automation; settlement is idempotent per listing because
    /// only ACTIVE listings settle.
    pub fn settle_expired(&self, now: NaiveDateTime) -> CoreResult<usize> {
        let tax_percent = self.config.market_tax_percent;

        self.store.with_tx(now, |tx| {
            let due = tx.expired_active_listings(now);
            let settled = due.len();

            for listing_id in due {
                Self::settle_one(tx, now, listing_id, tax_percent)?;
            }

            Ok(settled)
        })
    }

    /// Off-season conversion: every ACTIVE auction settles immediately,
    /// sold or expired, regardless of remaining time.
    pub fn force_expire_all(&self, now: NaiveDateTime) -> CoreResult<usize> {
        let tax_percent = self.config.market_tax_percent;

        self.store.with_tx(now, |tx| {
            let active: Vec<u32> = tx
                .listings_by_status(ListingStatus::Active)
                .iter()
                .map(|l| l.id)
                .collect();
            let settled = active.len();

            for listing_id in active {
                Self::settle_one(tx, now, listing_id, tax_percent)?;
            }

            Ok(settled)
        })
    }

    fn settle_one(
        tx: &mut store::Tx,
        now: NaiveDateTime,
        listing_id: u32,
        tax_percent: u8,
    ) -> CoreResult<()> {
        let (seller, player_id, winner) = {
            let listing = tx.listing(listing_id)?;
            if listing.status != ListingStatus::Active {
                return Ok(());
            }
            (
                listing.seller_team_id,
                listing.player_id,
                listing.current_high_bidder.zip(listing.current_bid),
            )
        };

        match winner {
            Some((winner_team, final_price)) => {
                tx.settle_escrow(
                    winner_team,
                    final_price,
                    &format!("auction won, listing {}", listing_id),
                )?;

                Self::pay_seller(tx, listing_id, seller, player_id, final_price, tax_percent)?;

                tx.player_mut(player_id)?.team_id = winner_team;
                tx.player_mut(player_id)?.on_taxi_squad = false;
                tx.listing_mut(listing_id)?.status = ListingStatus::Sold;

                info!(
                    "listing {} sold to team {} for {}",
                    listing_id, winner_team, final_price
                );
            }
            None => {
                tx.listing_mut(listing_id)?.status = ListingStatus::Expired;
            }
        }

        Ok(())
    }

    fn pay_seller(
        tx: &mut store::Tx,
        listing_id: u32,
        seller: u32,
        player_id: u32,
        final_price: i64,
        tax_percent: u8,
    ) -> CoreResult<()> {
        let proceeds = MarketplaceListing::net_proceeds(final_price, tax_percent);

        tx.credit(
            seller,
            proceeds,
            LedgerKind::SaleProceeds,
            &format!("sale of player {}, listing {}", player_id, listing_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::club::{
        FieldSize, InjuryStatus, Player, PlayerAttributes, PlayerRole, Race, SeasonalMinutes,
        TacticalFocus, Team, TeamFinances, TeamRecord,
    };
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn team(name: &str) -> Team {
        Team {
            id: 0,
            owner_id: 1,
            name: String::from(name),
            division: 4,
            subdivision: String::from("alpha"),
            tactical_focus: TacticalFocus::Balanced,
            home_field_size: FieldSize::Standard,
            camaraderie: 50,
            fan_loyalty: 50,
            record: TeamRecord::default(),
            ai_controlled: false,
            stadium_investment: 0,
        }
    }

    fn player(team_id: u32) -> Player {
        Player {
            id: 0,
            team_id,
            name: String::from("Listed Player"),
            role: PlayerRole::Runner,
            race: Race::Human,
            age: 25,
            attributes: PlayerAttributes {
                speed: 20,
                power: 20,
                agility: 20,
                throwing: 20,
                catching: 20,
                kicking: 20,
                stamina: 20,
                leadership: 20,
            },
            potential: 3.0,
            daily_stamina: 100,
            injury: InjuryStatus::Healthy,
            injury_recovery_points: 0,
            career_injuries: 0,
            minutes: SeasonalMinutes::default(),
            minutes_today: SeasonalMinutes::default(),
            on_taxi_squad: false,
            retired: false,
            contract: None,
        }
    }

    struct Fixture {
        service: MarketplaceService,
        store: Arc<Store>,
        seller: u32,
        bidder_a: u32,
        bidder_b: u32,
        player_id: u32,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(Store::new(1));
        let service = MarketplaceService::new(store.clone(), CoreConfig::default());

        let (seller, bidder_a, bidder_b, player_id) = store
            .with_tx(at(8, 0, 0), |tx| {
                tx.create_season(1, at(1, 0, 0));
                let seller = tx.insert_team(team("Seller"), TeamFinances::new(100_000, 0));
                let bidder_a = tx.insert_team(team("Bidder A"), TeamFinances::new(200_000, 0));
                let bidder_b = tx.insert_team(team("Bidder B"), TeamFinances::new(200_000, 0));
                let player_id = tx.insert_player(player(seller));
                Ok((seller, bidder_a, bidder_b, player_id))
            })
            .unwrap();

        Fixture {
            service,
            store,
            seller,
            bidder_a,
            bidder_b,
            player_id,
        }
    }

    #[test]
    fn listing_charges_nonrefundable_fee() {
        let f = fixture();

        f.service
            .list_player(at(9, 0, 0), f.seller, f.player_id, 10_000, Some(80_000), Duration::hours(12))
            .unwrap();

        // 3% of the 80k buy-now.
        f.store.read(|world| {
            assert_eq!(100_000 - 2_400, world.finances[&f.seller].credits);
        });
    }

    #[test]
    fn late_bid_extends_expiry_and_swaps_escrow() {
        // Listing expiring at T0 with a 50k bid from A; B bids 55k at
        // T0 - 30s.
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, None, Duration::hours(12))
            .unwrap();

        f.service
            .place_bid(at(9, 0, 0), listing_id, f.bidder_a, 50_000)
            .unwrap();

        let t0 = at(20, 0, 0);
        f.service
            .place_bid(t0 - Duration::seconds(30), listing_id, f.bidder_b, 55_000)
            .unwrap();

        f.store.read(|world| {
            let listing = &world.listings[&listing_id];
            assert_eq!(Some(55_000), listing.current_bid);
            assert_eq!(Some(f.bidder_b), listing.current_high_bidder);
            assert_eq!(1, listing.extensions_used);
            assert_eq!(t0 + Duration::seconds(60), listing.expires_at);

            // A refunded in full, B escrowed in full.
            assert_eq!(200_000, world.finances[&f.bidder_a].credits);
            assert_eq!(0, world.finances[&f.bidder_a].escrow_credits);
            assert_eq!(200_000 - 55_000, world.finances[&f.bidder_b].credits);
            assert_eq!(55_000, world.finances[&f.bidder_b].escrow_credits);
        });
    }

    #[test]
    fn outbid_nets_to_zero_across_accounts() {
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, None, Duration::hours(12))
            .unwrap();

        let seller_before = f.store.read(|w| w.finances[&f.seller].credits);

        f.service
            .place_bid(at(9, 0, 0), listing_id, f.bidder_a, 50_000)
            .unwrap();
        f.service
            .place_bid(at(10, 0, 0), listing_id, f.bidder_b, 55_000)
            .unwrap();

        f.store.read(|world| {
            assert_eq!(seller_before, world.finances[&f.seller].credits);
            assert_eq!(200_000, world.finances[&f.bidder_a].credits + world.finances[&f.bidder_a].escrow_credits);
            assert_eq!(200_000, world.finances[&f.bidder_b].credits + world.finances[&f.bidder_b].escrow_credits);
            assert_eq!(0, world.finances[&f.bidder_a].escrow_credits);
        });
    }

    #[test]
    fn low_bids_are_rejected_without_escrow_change() {
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, None, Duration::hours(12))
            .unwrap();

        f.service
            .place_bid(at(9, 0, 0), listing_id, f.bidder_a, 50_000)
            .unwrap();

        let result = f
            .service
            .place_bid(at(9, 5, 0), listing_id, f.bidder_b, 50_000);
        assert!(matches!(result, Err(CoreError::BidTooLow { .. })));

        f.store.read(|world| {
            assert_eq!(0, world.finances[&f.bidder_b].escrow_credits);
            assert_eq!(200_000, world.finances[&f.bidder_b].credits);
        });
    }

    #[test]
    fn settlement_transfers_player_and_taxes_seller() {
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, None, Duration::hours(4))
            .unwrap();

        f.service
            .place_bid(at(9, 0, 0), listing_id, f.bidder_a, 60_000)
            .unwrap();

        let settled = f.service.settle_expired(at(12, 0, 1)).unwrap();
        assert_eq!(1, settled);

        f.store.read(|world| {
            assert_eq!(ListingStatus::Sold, world.listings[&listing_id].status);
            assert_eq!(f.bidder_a, world.players[&f.player_id].team_id);

            // Seller got 60k minus 5% tax minus the 300 listing fee already
            // paid.
            assert_eq!(100_000 - 300 + 57_000, world.finances[&f.seller].credits);
            assert_eq!(0, world.finances[&f.bidder_a].escrow_credits);
            assert_eq!(140_000, world.finances[&f.bidder_a].credits);
        });

        // Settling again is a no-op.
        assert_eq!(0, f.service.settle_expired(at(12, 30, 0)).unwrap());
    }

    #[test]
    fn expiry_without_bids_refunds_nobody_and_expires() {
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, None, Duration::hours(4))
            .unwrap();

        f.service.settle_expired(at(12, 0, 1)).unwrap();

        f.store.read(|world| {
            assert_eq!(ListingStatus::Expired, world.listings[&listing_id].status);
            assert_eq!(f.seller, world.players[&f.player_id].team_id);
        });
    }

    #[test]
    fn concurrent_equal_bids_produce_one_winner_and_no_leak() {
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, None, Duration::hours(12))
            .unwrap();

        f.service
            .place_bid(at(9, 0, 0), listing_id, f.bidder_a, 55_000)
            .unwrap();

        // Both bidders race with 60k at the same instant; transactions
        // serialize, so exactly one wins and the other sees BidTooLow.
        let now = at(10, 0, 0);
        let service = &f.service;
        let (first, second) = (
            service.place_bid(now, listing_id, f.bidder_a, 60_000),
            service.place_bid(now, listing_id, f.bidder_b, 60_000),
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(1, successes);
        assert!(matches!(
            [first, second].into_iter().find(|r| r.is_err()),
            Some(Err(CoreError::BidTooLow { .. }))
        ));

        f.store.read(|world| {
            let listing = &world.listings[&listing_id];
            assert_eq!(Some(60_000), listing.current_bid);

            // No escrow leaked anywhere.
            let a = &world.finances[&f.bidder_a];
            let b = &world.finances[&f.bidder_b];
            assert_eq!(200_000, a.credits + a.escrow_credits);
            assert_eq!(200_000, b.credits + b.escrow_credits);
            let escrowed = a.escrow_credits + b.escrow_credits;
            assert_eq!(60_000, escrowed);
        });
    }

    #[test]
    fn buy_now_refunds_standing_bid_atomically() {
        let f = fixture();

        let listing_id = f
            .service
            .list_player(at(8, 0, 0), f.seller, f.player_id, 10_000, Some(80_000), Duration::hours(12))
            .unwrap();

        f.service
            .place_bid(at(9, 0, 0), listing_id, f.bidder_a, 50_000)
            .unwrap();
        f.service.buy_now(at(10, 0, 0), listing_id, f.bidder_b).unwrap();

        f.store.read(|world| {
            assert_eq!(ListingStatus::Sold, world.listings[&listing_id].status);
            assert_eq!(f.bidder_b, world.players[&f.player_id].team_id);
            assert_eq!(200_000, world.finances[&f.bidder_a].credits);
            assert_eq!(0, world.finances[&f.bidder_a].escrow_credits);
            assert_eq!(200_000 - 80_000, world.finances[&f.bidder_b].credits);
        });
    }

    #[test]
    fn listing_cap_is_three() {
        let f = fixture();

        let mut ids = vec![f.player_id];
        f.store
            .with_tx(at(8, 0, 0), |tx| {
                for _ in 0..3 {
                    ids.push(tx.insert_player(player(f.seller)));
                }
                Ok(())
            })
            .unwrap();

        for player_id in ids.iter().take(3) {
            f.service
                .list_player(at(9, 0, 0), f.seller, *player_id, 5_000, None, Duration::hours(4))
                .unwrap();
        }

        let result =
            f.service
                .list_player(at(9, 0, 0), f.seller, ids[3], 5_000, None, Duration::hours(4));
        assert!(matches!(result, Err(CoreError::InvalidOperation(_))));
    }

    #[test]
    fn negative_balance_blocks_listing() {
        let f = fixture();

        f.store
            .with_tx(at(8, 0, 0), |tx| {
                tx.debit(f.seller, 150_000, LedgerKind::Salary, "salaries", true)
            })
            .unwrap();

        let result = f.service.list_player(
            at(9, 0, 0),
            f.seller,
            f.player_id,
            5_000,
            None,
            Duration::hours(4),
        );
        assert!(matches!(result, Err(CoreError::InsufficientCredits { .. })));
    }
}
