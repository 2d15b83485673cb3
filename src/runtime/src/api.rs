use crate::marketplace::MarketplaceService;
use crate::tournament::TournamentOrchestrator;
use chrono::{Duration, NaiveDateTime};
use core::calendar::Clock;
use core::club::{
    evaluate_offer, player_value, staff_value, Contract, FieldSize, OfferResponse, Player,
    TacticalFocus, Team, TeamFinances, TAXI_SQUAD_MAX,
};
use core::config::CoreConfig;
use core::error::{CoreError, CoreResult};
use core::events::{EventBus, LiveEvent};
use core::league::Season;
use core::marketplace::{ListingStatus, MarketplaceListing};
use core::r#match::{Game, MatchEvent, MatchSimulation, SimulationResult};
use core::tournament::Tournament;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store::{LedgerKind, Store};

/// Daily exhibitions allowed per team.
const EXHIBITION_DAILY_LIMIT: u8 = 3;

/// Outcome of a contract proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractOutcome {
    Accepted,
    Countered { counter_salary: i64 },
    Rejected,
}

/// Counterparty of a contract operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractParty {
    Player(u32),
    Staff(u32),
}

/// Filters for marketplace browsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingFilter {
    pub role: Option<core::club::PlayerRole>,
    pub max_price: Option<i64>,
}

/// The narrow typed surface the transport layers call into. Every
/// operation returns a value or a typed error; nothing partially succeeds.
pub struct CoreApi {
    store: Arc<Store>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    pub marketplace: MarketplaceService,
    pub tournaments: TournamentOrchestrator,
}

impl CoreApi {
    pub fn new(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> Self {
        let marketplace = MarketplaceService::new(store.clone(), config.clone());
        let tournaments = TournamentOrchestrator::new(store.clone(), config);

        CoreApi {
            store,
            bus,
            clock,
            marketplace,
            tournaments,
        }
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // --- team & roster ---

    pub fn get_team(&self, team_id: u32) -> CoreResult<(Team, TeamFinances)> {
        self.store.with_tx(self.now(), |tx| {
            Ok((tx.team(team_id)?.clone(), *tx.finances(team_id)?))
        })
    }

    pub fn set_tactics(&self, team_id: u32, focus: TacticalFocus) -> CoreResult<()> {
        self.store.with_tx(self.now(), |tx| {
            tx.team_mut(team_id)?.tactical_focus = focus;
            Ok(())
        })
    }

    pub fn set_home_field(&self, team_id: u32, size: FieldSize) -> CoreResult<()> {
        self.store.with_tx(self.now(), |tx| {
            tx.team_mut(team_id)?.home_field_size = size;
            Ok(())
        })
    }

    pub fn list_players(&self, team_id: u32) -> CoreResult<Vec<Player>> {
        self.store.with_tx(self.now(), |tx| {
            tx.team(team_id)?;
            Ok(tx.players_of_team(team_id).into_iter().cloned().collect())
        })
    }

    pub fn get_player(&self, player_id: u32) -> CoreResult<Player> {
        self.store
            .with_tx(self.now(), |tx| Ok(tx.player(player_id)?.clone()))
    }

    pub fn move_to_taxi_squad(&self, team_id: u32, player_id: u32) -> CoreResult<()> {
        self.store.with_tx(self.now(), |tx| {
            let on_taxi = tx
                .players_of_team(team_id)
                .iter()
                .filter(|p| p.on_taxi_squad && !p.retired)
                .count();

            if on_taxi >= TAXI_SQUAD_MAX {
                return Err(CoreError::InvalidRoster(format!(
                    "taxi squad is capped at {}",
                    TAXI_SQUAD_MAX
                )));
            }

            let player = tx.player_mut(player_id)?;
            if player.team_id != team_id {
                return Err(CoreError::PlayerNotFound(player_id));
            }

            player.on_taxi_squad = true;
            Ok(())
        })
    }

    pub fn promote_from_taxi_squad(&self, team_id: u32, player_id: u32) -> CoreResult<()> {
        self.store.with_tx(self.now(), |tx| {
            let player = tx.player_mut(player_id)?;
            if player.team_id != team_id {
                return Err(CoreError::PlayerNotFound(player_id));
            }

            player.on_taxi_squad = false;
            Ok(())
        })
    }

    // --- contracts ---

    /// UVF-governed negotiation: below the 70% floor is rejected, 95%+ is
    /// accepted and signed, in between draws a counter offer. Acceptance
    /// pays the signing bonus immediately.
    pub fn propose_contract(
        &self,
        team_id: u32,
        party: ContractParty,
        salary: i64,
        seasons: u8,
        signing_bonus: i64,
    ) -> CoreResult<ContractOutcome> {
        self.store.with_tx(self.now(), |tx| {
            let value = match party {
                ContractParty::Player(id) => {
                    let player = tx.player(id)?;
                    if player.team_id != team_id {
                        return Err(CoreError::PlayerNotFound(id));
                    }
                    player_value(player)
                }
                ContractParty::Staff(id) => {
                    let staff = tx.staff(id)?;
                    if staff.team_id != team_id {
                        return Err(CoreError::StaffNotFound(id));
                    }
                    staff_value(staff)
                }
            };

            match evaluate_offer(value, salary) {
                OfferResponse::Rejected => Ok(ContractOutcome::Rejected),
                OfferResponse::Countered { counter_salary } => {
                    Ok(ContractOutcome::Countered { counter_salary })
                }
                OfferResponse::Accepted => {
                    if signing_bonus > 0 {
                        tx.debit(
                            team_id,
                            signing_bonus,
                            LedgerKind::SigningBonus,
                            "contract signing bonus",
                            false,
                        )?;
                    }

                    let contract = Contract::new(salary, seasons, signing_bonus);
                    match party {
                        ContractParty::Player(id) => {
                            tx.player_mut(id)?.contract = Some(contract);
                        }
                        ContractParty::Staff(id) => {
                            tx.staff_mut(id)?.contract = Some(contract);
                        }
                    }

                    Ok(ContractOutcome::Accepted)
                }
            }
        })
    }

    pub fn cancel_contract(&self, team_id: u32, party: ContractParty) -> CoreResult<()> {
        self.store.with_tx(self.now(), |tx| {
            match party {
                ContractParty::Player(id) => {
                    let player = tx.player_mut(id)?;
                    if player.team_id != team_id {
                        return Err(CoreError::PlayerNotFound(id));
                    }
                    player.contract = None;
                }
                ContractParty::Staff(id) => {
                    let staff = tx.staff_mut(id)?;
                    if staff.team_id != team_id {
                        return Err(CoreError::StaffNotFound(id));
                    }
                    staff.contract = None;
                }
            }
            Ok(())
        })
    }

    // --- marketplace ---

    pub fn list_player(
        &self,
        seller_team_id: u32,
        player_id: u32,
        start_bid: i64,
        buy_now: Option<i64>,
        duration: Duration,
    ) -> CoreResult<u32> {
        self.marketplace
            .list_player(self.now(), seller_team_id, player_id, start_bid, buy_now, duration)
    }

    pub fn place_bid(&self, listing_id: u32, bidder_team_id: u32, amount: i64) -> CoreResult<()> {
        self.marketplace
            .place_bid(self.now(), listing_id, bidder_team_id, amount)
    }

    pub fn buy_now(&self, listing_id: u32, buyer_team_id: u32) -> CoreResult<()> {
        self.marketplace.buy_now(self.now(), listing_id, buyer_team_id)
    }

    pub fn cancel_listing(&self, listing_id: u32, seller_team_id: u32) -> CoreResult<()> {
        self.marketplace
            .cancel_listing(self.now(), listing_id, seller_team_id)
    }

    pub fn get_listings(&self, filter: &ListingFilter) -> CoreResult<Vec<MarketplaceListing>> {
        self.store.with_tx(self.now(), |tx| {
            let mut listings = Vec::new();

            for listing in tx.listings_by_status(ListingStatus::Active) {
                if let Some(max_price) = filter.max_price {
                    if listing.minimum_bid() > max_price {
                        continue;
                    }
                }

                if let Some(role) = filter.role {
                    if tx.player(listing.player_id)?.role != role {
                        continue;
                    }
                }

                listings.push(listing.clone());
            }

            Ok(listings)
        })
    }

    // --- tournaments ---

    pub fn register_for_tournament(&self, team_id: u32) -> CoreResult<u32> {
        self.tournaments.register_daily(self.now(), team_id)
    }

    pub fn register_for_classic(&self, team_id: u32, pay_with_gems: bool) -> CoreResult<u32> {
        self.tournaments
            .register_classic(self.now(), team_id, pay_with_gems)
    }

    pub fn get_bracket(&self, tournament_id: u32) -> CoreResult<Tournament> {
        self.store
            .with_tx(self.now(), |tx| Ok(tx.tournament(tournament_id)?.clone()))
    }

    // --- matches ---

    pub fn get_game(&self, game_id: u32) -> CoreResult<Game> {
        self.store
            .with_tx(self.now(), |tx| Ok(tx.game(game_id)?.clone()))
    }

    /// Subscribe to a live event stream; the receiver sees every event in
    /// order and a terminal MATCH_COMPLETE record.
    pub fn subscribe_live_events(&self, game_id: u32) -> CoreResult<Receiver<LiveEvent>> {
        self.store.with_tx(self.now(), |tx| {
            tx.game(game_id)?;
            Ok(())
        })?;

        Ok(self.bus.subscribe(game_id))
    }

    pub fn get_match_stats(&self, game_id: u32) -> CoreResult<(Game, Vec<MatchEvent>)> {
        self.store.with_tx(self.now(), |tx| {
            let game = tx.game(game_id)?.clone();
            let events = tx.match_events(game_id).cloned().unwrap_or_default();
            Ok((game, events))
        })
    }

    /// Friendly between two teams, played instantly. Does not touch league
    /// records; minutes count toward the exhibition bucket. Limited to
    /// three per team per day.
    pub fn play_exhibition(&self, home_team_id: u32, away_team_id: u32) -> CoreResult<SimulationResult> {
        let now = self.now();

        let input = self.store.with_tx(now, |tx| {
            for team_id in [home_team_id, away_team_id] {
                if tx.exhibitions_today(team_id) >= EXHIBITION_DAILY_LIMIT {
                    return Err(CoreError::InvalidOperation(format!(
                        "team {} reached the daily exhibition limit",
                        team_id
                    )));
                }
            }

            let season_number = tx.current_season()?.number;
            let game = core::r#match::Game::scheduled(
                season_number,
                home_team_id,
                away_team_id,
                core::r#match::MatchType::Exhibition,
                None,
                now,
            );
            let game_id = tx.insert_game(game);
            let game = tx.game(game_id)?.clone();

            let seed = crate::snapshot::seed_for_game(tx, &game)?;
            let input = crate::snapshot::build_match_input(tx, &game, seed)?;
            tx.mark_in_progress(game_id, seed)?;
            tx.count_exhibition(home_team_id);
            tx.count_exhibition(away_team_id);

            Ok(input)
        })?;

        let result = MatchSimulation::run_instant(input)?;

        self.store
            .with_tx(now, |tx| tx.persist_match_result(&result))?;

        Ok(result)
    }

    // --- season ---

    pub fn get_season_state(&self) -> CoreResult<Season> {
        self.store
            .with_tx(self.now(), |tx| Ok(tx.current_season()?.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core::calendar::FixedClock;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use store::generate_ai_team;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn fixture() -> (CoreApi, Arc<Store>, Vec<u32>) {
        let store = Arc::new(Store::new(9));
        let bus = Arc::new(EventBus::default());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(noon()));

        let teams = store
            .with_tx(noon(), |tx| {
                tx.create_season(1, noon());
                let mut rng = ChaCha8Rng::seed_from_u64(11);
                let mut ids = Vec::new();
                for _ in 0..2 {
                    let id = generate_ai_team(tx, 6, "alpha", &mut rng);
                    tx.team_mut(id)?.ai_controlled = false;
                    ids.push(id);
                }
                Ok(ids)
            })
            .unwrap();

        let api = CoreApi::new(store.clone(), bus, clock, CoreConfig::default());
        (api, store, teams)
    }

    #[test]
    fn tactics_and_home_field_persist() {
        let (api, _, teams) = fixture();

        api.set_tactics(teams[0], TacticalFocus::AllOutAttack).unwrap();
        api.set_home_field(teams[0], FieldSize::Large).unwrap();

        let (team, _) = api.get_team(teams[0]).unwrap();
        assert_eq!(TacticalFocus::AllOutAttack, team.tactical_focus);
        assert_eq!(FieldSize::Large, team.home_field_size);
    }

    #[test]
    fn contract_negotiation_follows_the_value_formula() {
        let (api, _, teams) = fixture();

        let roster = api.list_players(teams[0]).unwrap();
        let player = &roster[0];
        let value = player_value(player);

        // Below the 70% floor: rejected outright.
        let outcome = api
            .propose_contract(teams[0], ContractParty::Player(player.id), value / 2, 2, 0)
            .unwrap();
        assert_eq!(ContractOutcome::Rejected, outcome);

        // Between floor and 95%: countered at full value.
        let outcome = api
            .propose_contract(
                teams[0],
                ContractParty::Player(player.id),
                value * 80 / 100,
                2,
                0,
            )
            .unwrap();
        match outcome {
            ContractOutcome::Countered { counter_salary } => {
                assert_eq!((value + 50) / 100 * 100, counter_salary)
            }
            other => panic!("expected counter, got {:?}", other),
        }

        // A full-value offer signs.
        let outcome = api
            .propose_contract(teams[0], ContractParty::Player(player.id), value, 3, 0)
            .unwrap();
        assert_eq!(ContractOutcome::Accepted, outcome);

        let signed = api.get_player(player.id).unwrap();
        let contract = signed.contract.unwrap();
        assert_eq!(value, contract.salary);
        assert_eq!(3, contract.seasons_remaining);
    }

    #[test]
    fn signing_bonus_is_debited_on_acceptance() {
        let (api, store, teams) = fixture();

        let roster = api.list_players(teams[0]).unwrap();
        let player = &roster[0];
        let value = player_value(player);

        let before = store.read(|world| world.finances[&teams[0]].credits);
        api.propose_contract(teams[0], ContractParty::Player(player.id), value, 2, 2_000)
            .unwrap();

        store.read(|world| {
            assert_eq!(before - 2_000, world.finances[&teams[0]].credits);
        });
    }

    #[test]
    fn taxi_squad_cap_is_two() {
        let (api, _, teams) = fixture();
        let roster = api.list_players(teams[0]).unwrap();

        api.move_to_taxi_squad(teams[0], roster[0].id).unwrap();
        api.move_to_taxi_squad(teams[0], roster[1].id).unwrap();

        let third = api.move_to_taxi_squad(teams[0], roster[2].id);
        assert!(matches!(third, Err(CoreError::InvalidRoster(_))));

        api.promote_from_taxi_squad(teams[0], roster[0].id).unwrap();
        assert!(api.move_to_taxi_squad(teams[0], roster[2].id).is_ok());
    }

    #[test]
    fn exhibitions_play_instantly_and_respect_the_daily_limit() {
        let (api, store, teams) = fixture();

        let result = api.play_exhibition(teams[0], teams[1]).unwrap();
        assert!(matches!(
            result.events.last().unwrap().kind,
            core::r#match::MatchEventKind::MatchComplete { .. }
        ));

        // Exhibition minutes accrue to the exhibition bucket only.
        store.read(|world| {
            let minutes: u32 = world
                .players
                .values()
                .filter(|p| p.team_id == teams[0])
                .map(|p| p.minutes.exhibition as u32)
                .sum();
            assert!(minutes > 0);

            let league_minutes: u32 = world
                .players
                .values()
                .map(|p| p.minutes.league as u32)
                .sum();
            assert_eq!(0, league_minutes);
        });

        // League records untouched by friendlies.
        store.read(|world| {
            assert_eq!(0, world.teams[&teams[0]].record.games_played());
        });

        api.play_exhibition(teams[0], teams[1]).unwrap();
        api.play_exhibition(teams[0], teams[1]).unwrap();

        let fourth = api.play_exhibition(teams[0], teams[1]);
        assert!(matches!(fourth, Err(CoreError::InvalidOperation(_))));
    }

    #[test]
    fn listings_filter_by_price() {
        let (api, _, teams) = fixture();
        let roster = api.list_players(teams[0]).unwrap();

        api.list_player(teams[0], roster[0].id, 5_000, None, Duration::hours(6))
            .unwrap();
        api.list_player(teams[0], roster[1].id, 50_000, None, Duration::hours(6))
            .unwrap();

        let cheap = api
            .get_listings(&ListingFilter {
                max_price: Some(10_000),
                ..ListingFilter::default()
            })
            .unwrap();
        assert_eq!(1, cheap.len());
        assert_eq!(roster[0].id, cheap[0].player_id);

        let all = api.get_listings(&ListingFilter::default()).unwrap();
        assert_eq!(2, all.len());
    }

    #[test]
    fn unknown_games_cannot_be_subscribed() {
        let (api, _, _) = fixture();

        assert!(matches!(
            api.subscribe_live_events(404),
            Err(CoreError::GameNotFound(404))
        ));
    }

    #[test]
    fn season_state_reports_current_day_and_phase() {
        let (api, _, _) = fixture();

        let season = api.get_season_state().unwrap();
        assert_eq!(1, season.number);
        assert_eq!(1, season.current_day);
        assert_eq!(core::calendar::Phase::Regular, season.phase);
    }
}
