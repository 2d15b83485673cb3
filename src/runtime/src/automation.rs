use crate::live::LiveMatchWorker;
use crate::marketplace::MarketplaceService;
use crate::snapshot::{build_match_input, forfeit_winner, seed_for_game};
use crate::tournament::TournamentOrchestrator;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use core::calendar::{Clock, GameCalendar, Phase, PLAYOFF_DAY, SEASON_LENGTH_DAYS};
use core::club::{daily_progression, end_of_season, DailyProgressionInput, StaffType};
use core::config::CoreConfig;
use core::error::{CoreError, CoreResult};
use core::events::EventBus;
use core::league::{
    generate_from_day, generate_season_schedule, promotion_relegation, subdivision_capacity,
    subdivision_label, subdivision_standings, LeagueFixture,
};
use core::r#match::{derive_match_seed, Game, MatchInput, MatchSimulation, MatchType, SimulationResult};
use log::{error, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::sync::Arc;
use store::{generate_ai_team, LedgerKind, Store, Tx};

// Day-step markers, written transactionally with their effects.
const STEP_MATCH_CATCHUP: &str = "match_catchup";
const STEP_PROGRESSION: &str = "daily_progression";
const STEP_RECOVERY: &str = "recovery";
const STEP_MAINTENANCE: &str = "stadium_maintenance";
const STEP_LIMITS: &str = "daily_limits";
const STEP_LATE_SIGNUP: &str = "late_signup";
const STEP_PLAYOFFS: &str = "playoffs";
const STEP_OFFSEASON_MARKET: &str = "offseason_market";

// Rollover markers, keyed to the season being closed at day 17.
const STEP_ARCHIVE: &str = "archive_standings";
const STEP_PROMOTION: &str = "promotion_relegation";
const STEP_PURGE_AI: &str = "purge_ai";
const STEP_SALARIES: &str = "salaries";
const STEP_AGING: &str = "aging";
const STEP_OPEN_SEASON: &str = "open_next_season";
const STEP_FILL: &str = "subdivision_fill";
const STEP_SCHEDULE: &str = "schedule_generation";

// Seed salts keeping the deterministic step streams apart.
const PROGRESSION_SALT: u64 = 0x70726f67;
const AGING_SALT: u64 = 0x6167696e;
const FILL_SALT: u64 = 0x66696c6c;

const LATE_SIGNUP_HOUR: u32 = 15;
const LATE_SIGNUP_LAST_DAY: u8 = 9;
const OFFSEASON_MARKET_CLOSE_HOUR: u32 = 2;
const WINDOW_SCAN_MINUTES: i64 = 15;

/// The master scheduler: one 60-second tick reconciles the stored season
/// day against the calendar, starts due matches, drives tournaments, the
/// late-signup window, marketplace settlement, and season rollover.
///
/// Every day-bound effect is guarded by a persisted marker updated in the
/// same transaction, so restarting after arbitrary downtime converges to
/// the state a continuously-running leader would have produced.
pub struct AutomationEngine {
    store: Arc<Store>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
    calendar: GameCalendar,
    owner_token: u64,
    pub orchestrator: TournamentOrchestrator,
    pub marketplace: MarketplaceService,
    workers: Vec<LiveMatchWorker>,
    last_window_scan: Option<NaiveDateTime>,
}

impl AutomationEngine {
    pub fn new(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
        owner_token: u64,
    ) -> Self {
        let calendar = GameCalendar::new(&config);
        let orchestrator = TournamentOrchestrator::new(store.clone(), config.clone());
        let marketplace = MarketplaceService::new(store.clone(), config.clone());

        AutomationEngine {
            store,
            bus,
            clock,
            config,
            calendar,
            owner_token,
            orchestrator,
            marketplace,
            workers: Vec::new(),
            last_window_scan: None,
        }
    }

    /// True while this engine holds the leader lock. Non-leaders do nothing
    /// and retry on the next tick.
    pub fn is_leader(&self) -> bool {
        self.store
            .locks
            .is_held_by(&self.config.leader_lock_key, self.owner_token)
    }

    /// One 60-second tick. Each phase logs and swallows its own errors so a
    /// failing step retries next tick without blocking the others; markers
    /// only advance with their effects.
    pub fn tick(&mut self) {
        let key = self.config.leader_lock_key.clone();
        if !self.store.locks.acquire(&key, self.owner_token) {
            return;
        }

        let now = self.clock.now();

        if let Err(e) = self.reconcile_days(now) {
            error!("day reconciliation failed: {}", e);
        }
        if let Err(e) = self.scan_simulation_window(now) {
            error!("simulation window scan failed: {}", e);
        }
        if let Err(e) = self.start_due_tournament_matches(now) {
            error!("tournament match scan failed: {}", e);
        }
        if let Err(e) = self.orchestrator.auto_start_scan(now) {
            error!("tournament auto-start failed: {}", e);
        }
        if let Err(e) = self.orchestrator.schedule_next_rounds(now) {
            error!("tournament round scheduling failed: {}", e);
        }
        if let Err(e) = self.process_late_signup(now) {
            error!("late signup failed: {}", e);
        }
        if let Err(e) = self.ensure_playoffs(now) {
            error!("playoff creation failed: {}", e);
        }
        if let Err(e) = self.close_offseason_market(now) {
            error!("off-season market close failed: {}", e);
        }
        if let Err(e) = self.marketplace.settle_expired(now) {
            error!("auction settlement failed: {}", e);
        }
    }

    /// Drive the live match workers this leader owns. Called at the tick
    /// rate by the host loop.
    pub fn pump_live(&mut self, now: NaiveDateTime) {
        let mut keep = Vec::new();

        for mut worker in self.workers.drain(..) {
            match worker.tick_once(now) {
                Ok(true) => keep.push(worker),
                Ok(false) => {}
                Err(e) => error!("live worker for game {} failed: {}", worker.game_id, e),
            }
        }

        self.workers = keep;
    }

    pub fn live_worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Boot recovery: reattach to every IN_PROGRESS match, restore from its
    /// checkpoint, and replay to the expected wall-clock position without
    /// broadcasting.
    pub fn recover(&mut self) -> CoreResult<()> {
        let now = self.clock.now();

        let in_progress = self.store.with_tx(now, |tx| Ok(tx.games_in_progress()))?;

        for game_id in in_progress {
            let scheduled_at = self.store.with_tx(now, |tx| Ok(tx.game(game_id)?.scheduled_at))?;

            match LiveMatchWorker::resume(
                self.store.clone(),
                self.bus.clone(),
                self.config.clone(),
                now,
                game_id,
                self.owner_token,
            ) {
                Ok(mut worker) => {
                    let target = (now - scheduled_at).num_seconds().max(0) as u32;
                    worker.catch_up_to(now, target)?;

                    if !worker.is_finished() {
                        self.workers.push(worker);
                    }
                }
                Err(e) => warn!("could not recover game {}: {}", game_id, e),
            }
        }

        Ok(())
    }

    // --- day reconciliation ---

    fn reconcile_days(&mut self, now: NaiveDateTime) -> CoreResult<()> {
        loop {
            let (number, started_at, stored_day) = {
                let season = self.store.with_tx(now, |tx| Ok(tx.current_season()?.clone()))?;
                (season.number, season.started_at, season.current_day)
            };

            if self.calendar.season_over(now, started_at) {
                if stored_day < SEASON_LENGTH_DAYS {
                    self.run_day_steps(now, number, started_at, stored_day)?;
                    self.store
                        .with_tx(now, |tx| tx.advance_season_day(stored_day))?;
                    continue;
                }

                self.rollover(now, number, started_at)?;
                continue;
            }

            let expected = self.calendar.game_day(now, started_at).day;
            if stored_day < expected {
                self.run_day_steps(now, number, started_at, stored_day)?;
                self.store
                    .with_tx(now, |tx| tx.advance_season_day(stored_day))?;
                continue;
            }

            return Ok(());
        }
    }

    /// Steps 1a-1e for a day that has ended, in order, each marker-guarded.
    fn run_day_steps(
        &mut self,
        now: NaiveDateTime,
        season_number: u32,
        season_start: NaiveDateTime,
        day: u8,
    ) -> CoreResult<()> {
        if day == PLAYOFF_DAY {
            self.ensure_playoffs_marked(now, season_number, season_start)?;
        }

        self.step_match_catchup(now, season_number, season_start, day)?;
        self.step_daily_progression(now, season_number, day)?;
        self.step_recovery(now, season_number, day)?;
        self.step_maintenance(now, season_number, day)?;
        self.step_daily_limits(now, season_number, day)?;

        Ok(())
    }

    /// Step 1a: any match of the day still SCHEDULED is simulated in
    /// instant mode and persisted; tournament rounds spawned by those
    /// completions are swept in the same pass until the day drains.
    fn step_match_catchup(
        &mut self,
        now: NaiveDateTime,
        season_number: u32,
        season_start: NaiveDateTime,
        day: u8,
    ) -> CoreResult<()> {
        let already = self
            .store
            .with_tx(now, |tx| Ok(tx.step_done(season_number, day, STEP_MATCH_CATCHUP)))?;
        if already {
            return Ok(());
        }

        let day_from = self.calendar.day_start(season_start, day);
        let day_to = day_from + Duration::days(1);

        // Completions schedule next tournament rounds, which may land
        // inside the same day; sweep until nothing is due.
        loop {
            let batch = self.simulate_due_batch(now, day_from, day_to.min(now))?;
            if batch == 0 {
                break;
            }
            self.orchestrator.schedule_next_rounds(now)?;
        }

        self.store.with_tx(now, |tx| {
            tx.mark_step_done(season_number, day, STEP_MATCH_CATCHUP);
            Ok(())
        })
    }

    /// Instant-simulate every due SCHEDULED match in the window. Returns
    /// how many games reached a terminal state.
    fn simulate_due_batch(
        &self,
        now: NaiveDateTime,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> CoreResult<usize> {
        enum Prepared {
            Playable(MatchInput, u64),
            Forfeit(u32, u32),
        }

        let prepared: Vec<Prepared> = self.store.with_tx(now, |tx| {
            let mut out = Vec::new();

            for game_id in tx.list_due_matches(from, to) {
                let game = tx.game(game_id)?.clone();

                match forfeit_winner(tx, &game)? {
                    Some(winner) => out.push(Prepared::Forfeit(game_id, winner)),
                    None => {
                        let seed = seed_for_game(tx, &game)?;
                        out.push(Prepared::Playable(build_match_input(tx, &game, seed)?, seed));
                    }
                }
            }

            Ok(out)
        })?;

        if prepared.is_empty() {
            return Ok(0);
        }

        let mut forfeits = Vec::new();
        let mut inputs = Vec::new();
        for item in prepared {
            match item {
                Prepared::Forfeit(game_id, winner) => forfeits.push((game_id, winner)),
                Prepared::Playable(input, seed) => inputs.push((input, seed)),
            }
        }

        // The simulations are pure; fan them out.
        let results: Vec<CoreResult<(SimulationResult, u64)>> = inputs
            .into_par_iter()
            .map(|(input, seed)| MatchSimulation::run_instant(input).map(|r| (r, seed)))
            .collect();

        // Only games that actually reached a terminal state count toward
        // progress; a failed simulation stays SCHEDULED for the next pass.
        let count = results.iter().filter(|r| r.is_ok()).count() + forfeits.len();

        self.store.with_tx(now, |tx| {
            for (game_id, winner) in &forfeits {
                tx.record_forfeit(*game_id, *winner)?;
                info!("game {} forfeited, team {} advances", game_id, winner);
            }

            for result in &results {
                match result {
                    Ok((result, seed)) => {
                        tx.mark_in_progress(result.game_id, *seed)?;
                        tx.persist_match_result(result)?;
                    }
                    Err(e) => warn!("catch-up simulation failed: {}", e),
                }
            }

            Ok(())
        })?;

        Ok(count)
    }

    /// Step 1b: one progression pass per non-retired player, fed by that
    /// player's minutes since the previous rollover.
    fn step_daily_progression(
        &self,
        now: NaiveDateTime,
        season_number: u32,
        day: u8,
    ) -> CoreResult<()> {
        let nonce = self.store.read(|w| w.boot_nonce);

        self.store.with_tx(now, |tx| {
            if tx.step_done(season_number, day, STEP_PROGRESSION) {
                return Ok(());
            }

            let player_ids = tx.player_ids();

            for player_id in player_ids {
                let (team_id, role, retired) = {
                    let player = tx.player(player_id)?;
                    (player.team_id, player.role, player.retired)
                };
                if retired {
                    continue;
                }

                let input = DailyProgressionInput {
                    trainer_rating: tx.trainer_rating(team_id, StaffType::trainer_for(role)),
                    head_coach_rating: tx.trainer_rating(team_id, StaffType::HeadCoach),
                    camaraderie: tx.team(team_id).map(|t| t.camaraderie).unwrap_or(50),
                    performance_bonus: 0.0,
                };

                let mut rng = ChaCha8Rng::seed_from_u64(derive_match_seed(
                    player_id,
                    season_number * 64 + day as u32,
                    nonce ^ PROGRESSION_SALT,
                ));

                daily_progression(tx.player_mut(player_id)?, &input, &mut rng);
            }

            tx.mark_step_done(season_number, day, STEP_PROGRESSION);
            Ok(())
        })
    }

    /// Step 1c: injury recovery (faster with a recovery specialist) and
    /// overnight stamina restoration.
    fn step_recovery(&self, now: NaiveDateTime, season_number: u32, day: u8) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(season_number, day, STEP_RECOVERY) {
                return Ok(());
            }

            for player_id in tx.player_ids() {
                let team_id = tx.player(player_id)?.team_id;
                let specialist = tx.trainer_rating(team_id, StaffType::RecoverySpecialist);
                let recovery_points = 1 + (specialist / 10) as u16;

                let player = tx.player_mut(player_id)?;
                if player.retired {
                    continue;
                }

                player.recover_injury(recovery_points);
                player.restore_daily_stamina();
            }

            tx.mark_step_done(season_number, day, STEP_RECOVERY);
            Ok(())
        })
    }

    /// Step 1d: daily stadium maintenance, 1% of facility investment.
    /// Maintenance never drives a team negative; it collects what exists.
    fn step_maintenance(&self, now: NaiveDateTime, season_number: u32, day: u8) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(season_number, day, STEP_MAINTENANCE) {
                return Ok(());
            }

            for team_id in tx.all_team_ids() {
                let fee = tx.team(team_id)?.stadium_investment / 100;
                let available = tx.finances(team_id)?.credits.max(0);
                let charge = fee.min(available);

                if charge > 0 {
                    tx.debit(
                        team_id,
                        charge,
                        LedgerKind::StadiumMaintenance,
                        &format!("daily maintenance, day {}", day),
                        false,
                    )?;
                }
            }

            tx.mark_step_done(season_number, day, STEP_MAINTENANCE);
            Ok(())
        })
    }

    /// Step 1e: clear per-day counters.
    fn step_daily_limits(&self, now: NaiveDateTime, season_number: u32, day: u8) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(season_number, day, STEP_LIMITS) {
                return Ok(());
            }

            tx.reset_daily_limits();
            tx.mark_step_done(season_number, day, STEP_LIMITS);
            Ok(())
        })
    }

    // --- simulation window & tournament starts ---

    /// 16:00-22:00 scan on a 15-minute cadence: start every due league or
    /// exhibition match live. Matches missed by downtime start late, never
    /// skipped.
    fn scan_simulation_window(&mut self, now: NaiveDateTime) -> CoreResult<()> {
        let (started_at, _) = {
            let season = self.store.with_tx(now, |tx| Ok(tx.current_season()?.clone()))?;
            (season.started_at, season.number)
        };

        if !self.calendar.in_simulation_window(now, started_at) {
            return Ok(());
        }

        if let Some(last) = self.last_window_scan {
            if now - last < Duration::minutes(WINDOW_SCAN_MINUTES) {
                return Ok(());
            }
        }
        self.last_window_scan = Some(now);

        let day = self.calendar.game_day(now, started_at).day;
        let (window_start, _) = self.calendar.simulation_window(started_at, day);

        let due: Vec<u32> = self.store.with_tx(now, |tx| {
            Ok(tx
                .list_due_matches(window_start, now + Duration::seconds(1))
                .into_iter()
                .filter(|id| {
                    tx.game(*id)
                        .map(|g| g.tournament_id.is_none())
                        .unwrap_or(false)
                })
                .collect())
        })?;

        for game_id in due {
            self.start_live(now, game_id)?;
        }

        Ok(())
    }

    /// One-minute cadence for tournament and playoff matches; they run
    /// outside the simulation window.
    fn start_due_tournament_matches(&mut self, now: NaiveDateTime) -> CoreResult<()> {
        let due: Vec<u32> = self.store.with_tx(now, |tx| {
            Ok(tx
                .list_due_matches(now - Duration::days(1), now + Duration::seconds(1))
                .into_iter()
                .filter(|id| {
                    tx.game(*id)
                        .map(|g| g.tournament_id.is_some())
                        .unwrap_or(false)
                })
                .collect())
        })?;

        for game_id in due {
            self.start_live(now, game_id)?;
        }

        Ok(())
    }

    /// Start one match live, catching up any missed wall-clock silently.
    /// A side that cannot field six forfeits instead.
    fn start_live(&mut self, now: NaiveDateTime, game_id: u32) -> CoreResult<()> {
        let (scheduled_at, forfeit) = self.store.with_tx(now, |tx| {
            let game = tx.game(game_id)?.clone();
            Ok((game.scheduled_at, forfeit_winner(tx, &game)?))
        })?;

        if let Some(winner) = forfeit {
            self.store.with_tx(now, |tx| tx.record_forfeit(game_id, winner))?;
            info!("game {} forfeited, team {} advances", game_id, winner);
            return Ok(());
        }

        match LiveMatchWorker::start(
            self.store.clone(),
            self.bus.clone(),
            self.config.clone(),
            now,
            game_id,
            self.owner_token,
        ) {
            Ok(mut worker) => {
                let missed = (now - scheduled_at).num_seconds();
                if missed > 0 {
                    info!("game {} starting {}s late", game_id, missed);
                    worker.catch_up_to(now, missed as u32)?;
                }

                if !worker.is_finished() {
                    self.workers.push(worker);
                }
                Ok(())
            }
            // Another worker already owns it; that is fine.
            Err(CoreError::InvalidOperation(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    // --- late signup ---

    /// Days 1-9 at 15:00: div-8 subdivisions holding 1-7 teams are filled
    /// with AI and receive a shortened schedule through day 14.
    fn process_late_signup(&self, now: NaiveDateTime) -> CoreResult<()> {
        let season = self.store.with_tx(now, |tx| Ok(tx.current_season()?.clone()))?;
        let day = season.current_day;

        if day > LATE_SIGNUP_LAST_DAY || now.hour() < LATE_SIGNUP_HOUR {
            return Ok(());
        }

        let nonce = self.store.read(|w| w.boot_nonce);
        let season_start = season.started_at;
        let calendar = self.calendar.clone();

        self.store.with_tx(now, |tx| {
            if tx.step_done(season.number, day, STEP_LATE_SIGNUP) {
                return Ok(());
            }

            for subdivision in tx.subdivisions_of_division(8) {
                let occupancy = tx.teams_in_subdivision(8, &subdivision).len();
                if occupancy == 0 || occupancy >= subdivision_capacity(8) {
                    continue;
                }

                // Only subdivisions with no schedule yet: established ones
                // were already filled and scheduled at rollover.
                let has_games = tx.teams_in_subdivision(8, &subdivision).iter().any(|t| {
                    tx.games_of_team(t.id)
                        .iter()
                        .any(|g| g.match_type == MatchType::League && g.season_number == season.number)
                });
                if has_games {
                    continue;
                }

                let mut rng = ChaCha8Rng::seed_from_u64(derive_match_seed(
                    day as u32,
                    season.number,
                    nonce ^ FILL_SALT,
                ));

                while tx.teams_in_subdivision(8, &subdivision).len() < subdivision_capacity(8) {
                    generate_ai_team(tx, 8, &subdivision, &mut rng);
                }

                let mut team_ids: Vec<u32> = tx
                    .teams_in_subdivision(8, &subdivision)
                    .iter()
                    .map(|t| t.id)
                    .collect();
                team_ids.sort_unstable();

                let fixtures = generate_from_day(&team_ids, day);
                Self::insert_fixtures(tx, &calendar, season_start, season.number, &fixtures);

                info!(
                    "late signup: division 8 {} filled to {} and scheduled from day {}",
                    subdivision,
                    subdivision_capacity(8),
                    day
                );
            }

            tx.mark_step_done(season.number, day, STEP_LATE_SIGNUP);
            Ok(())
        })
    }

    fn insert_fixtures(
        tx: &mut Tx,
        calendar: &GameCalendar,
        season_start: NaiveDateTime,
        season_number: u32,
        fixtures: &[LeagueFixture],
    ) {
        for fixture in fixtures {
            let kickoff = calendar
                .day_start(season_start, fixture.day)
                .date()
                .and_time(
                    NaiveTime::from_hms_opt(fixture.kickoff_hour, fixture.kickoff_minute, 0)
                        .unwrap(),
                );

            tx.insert_game(Game::scheduled(
                season_number,
                fixture.home_team_id,
                fixture.away_team_id,
                MatchType::League,
                None,
                kickoff,
            ));
        }
    }

    // --- playoffs & off-season ---

    fn ensure_playoffs(&self, now: NaiveDateTime) -> CoreResult<()> {
        let season = self.store.with_tx(now, |tx| Ok(tx.current_season()?.clone()))?;

        if season.phase != Phase::Playoffs {
            return Ok(());
        }

        self.ensure_playoffs_marked(now, season.number, season.started_at)
    }

    fn ensure_playoffs_marked(
        &self,
        now: NaiveDateTime,
        season_number: u32,
        _season_start: NaiveDateTime,
    ) -> CoreResult<()> {
        let already = self.store.with_tx(now, |tx| {
            Ok(tx.step_done(season_number, PLAYOFF_DAY, STEP_PLAYOFFS))
        })?;
        if already {
            return Ok(());
        }

        self.orchestrator.create_playoffs(now)?;

        self.store.with_tx(now, |tx| {
            tx.mark_step_done(season_number, PLAYOFF_DAY, STEP_PLAYOFFS);
            Ok(())
        })
    }

    /// Day 17: every remaining auction settles by 02:00.
    fn close_offseason_market(&self, now: NaiveDateTime) -> CoreResult<()> {
        let season = self.store.with_tx(now, |tx| Ok(tx.current_season()?.clone()))?;

        if season.current_day < SEASON_LENGTH_DAYS {
            return Ok(());
        }

        let close_at = self
            .calendar
            .day_start(season.started_at, SEASON_LENGTH_DAYS)
            .date()
            .and_time(NaiveTime::from_hms_opt(OFFSEASON_MARKET_CLOSE_HOUR, 0, 0).unwrap())
            + Duration::days(1);

        if now < close_at {
            return Ok(());
        }

        let already = self.store.with_tx(now, |tx| {
            Ok(tx.step_done(season.number, SEASON_LENGTH_DAYS, STEP_OFFSEASON_MARKET))
        })?;
        if already {
            return Ok(());
        }

        self.marketplace.force_expire_all(now)?;

        self.store.with_tx(now, |tx| {
            tx.mark_step_done(season.number, SEASON_LENGTH_DAYS, STEP_OFFSEASON_MARKET);
            Ok(())
        })
    }

    // --- rollover ---

    /// Day 17 -> day 1: archive, promotion/relegation, AI purge, salaries,
    /// aging, next season, subdivision fill, schedule generation. Each step
    /// is marker-guarded against the season being closed, so the whole
    /// sequence is idempotent under restarts.
    fn rollover(
        &mut self,
        now: NaiveDateTime,
        old_number: u32,
        old_started_at: NaiveDateTime,
    ) -> CoreResult<()> {
        info!("season {} rolling over", old_number);

        self.step_archive_standings(now, old_number)?;
        self.step_promotion_relegation(now, old_number)?;
        self.step_purge_ai(now, old_number)?;
        self.step_salaries(now, old_number)?;
        self.step_aging(now, old_number)?;
        self.step_open_next_season(now, old_number, old_started_at)?;
        self.step_subdivision_fill(now, old_number)?;
        self.step_schedule_generation(now, old_number)?;

        Ok(())
    }

    fn step_archive_standings(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_ARCHIVE) {
                return Ok(());
            }

            for division in 1..=8u8 {
                for subdivision in tx.subdivisions_of_division(division) {
                    let teams = tx.teams_in_subdivision(division, &subdivision);
                    let rows = subdivision_standings(&teams);
                    tx.archive_standings(old_number, division, &subdivision, rows);
                }
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_ARCHIVE);
            Ok(())
        })
    }

    /// Top 2 of each subdivision up, bottom 2 down. Relegations apply
    /// top-down and promotions bottom-up, so lower divisions absorb the
    /// relegation volume through their freed seats.
    fn step_promotion_relegation(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_PROMOTION) {
                return Ok(());
            }

            let mut moves: Vec<(u32, u8)> = Vec::new();

            for division in 1..=8u8 {
                for subdivision in tx.subdivisions_of_division(division) {
                    let teams = tx.teams_in_subdivision(division, &subdivision);
                    let standings = subdivision_standings(&teams);
                    let outcome = promotion_relegation(&standings, division);

                    for team_id in outcome.promoted {
                        moves.push((team_id, division - 1));
                    }
                    for team_id in outcome.relegated {
                        moves.push((team_id, division + 1));
                    }
                }
            }

            for (team_id, target_division) in moves {
                let subdivision = Self::assign_subdivision(tx, target_division);
                let team = tx.team_mut(team_id)?;
                team.division = target_division;
                team.subdivision = subdivision;
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_PROMOTION);
            Ok(())
        })
    }

    /// First subdivision of the division with a free seat; a fresh label
    /// when all are full.
    fn assign_subdivision(tx: &Tx, division: u8) -> String {
        let capacity = subdivision_capacity(division);
        let existing = tx.subdivisions_of_division(division);

        for label in &existing {
            if tx.teams_in_subdivision(division, label).len() < capacity {
                return label.clone();
            }
        }

        subdivision_label(existing.len())
    }

    fn step_purge_ai(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_PURGE_AI) {
                return Ok(());
            }

            let ai_teams: Vec<u32> = tx
                .all_team_ids()
                .into_iter()
                .filter(|id| tx.team(*id).map(|t| t.ai_controlled).unwrap_or(false))
                .collect();

            for team_id in ai_teams {
                tx.remove_team(team_id)?;
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_PURGE_AI);
            Ok(())
        })
    }

    /// Every contract pays its annual salary, one ledger debit each, and
    /// negative balances are allowed; expired contracts come off the books.
    fn step_salaries(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_SALARIES) {
                return Ok(());
            }

            for player_id in tx.player_ids() {
                let (team_id, salary) = {
                    let player = tx.player(player_id)?;
                    match &player.contract {
                        Some(contract) if !player.retired => (player.team_id, contract.salary),
                        _ => continue,
                    }
                };

                tx.debit(
                    team_id,
                    salary,
                    LedgerKind::Salary,
                    &format!("season salary, player {}", player_id),
                    true,
                )?;

                let player = tx.player_mut(player_id)?;
                if let Some(contract) = player.contract.as_mut() {
                    if contract.tick_season() {
                        player.contract = None;
                    }
                }
            }

            let staff_ids: Vec<u32> = tx
                .all_team_ids()
                .iter()
                .flat_map(|team_id| tx.staff_of_team(*team_id).iter().map(|s| s.id).collect::<Vec<_>>())
                .collect();

            for staff_id in staff_ids {
                let (team_id, salary) = {
                    let staff = tx.staff(staff_id)?;
                    match &staff.contract {
                        Some(contract) => (staff.team_id, contract.salary),
                        None => continue,
                    }
                };

                tx.debit(
                    team_id,
                    salary,
                    LedgerKind::Salary,
                    &format!("season salary, staff {}", staff_id),
                    true,
                )?;

                let staff = tx.staff_mut(staff_id)?;
                if let Some(contract) = staff.contract.as_mut() {
                    if contract.tick_season() {
                        staff.contract = None;
                    }
                }
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_SALARIES);
            Ok(())
        })
    }

    fn step_aging(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        let nonce = self.store.read(|w| w.boot_nonce);

        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_AGING) {
                return Ok(());
            }

            for player_id in tx.player_ids() {
                let mut rng = ChaCha8Rng::seed_from_u64(derive_match_seed(
                    player_id,
                    old_number,
                    nonce ^ AGING_SALT,
                ));

                let outcome = end_of_season(tx.player_mut(player_id)?, &mut rng);
                if outcome.retired {
                    info!("player {} retired", player_id);
                }
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_AGING);
            Ok(())
        })
    }

    fn step_open_next_season(
        &self,
        now: NaiveDateTime,
        old_number: u32,
        old_started_at: NaiveDateTime,
    ) -> CoreResult<()> {
        let next_start = self.calendar.next_season_start(old_started_at);

        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_OPEN_SEASON) {
                return Ok(());
            }

            tx.create_season(old_number + 1, next_start);

            for team_id in tx.all_team_ids() {
                tx.team_mut(team_id)?.record.reset();
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_OPEN_SEASON);
            info!("season {} opened, day 1 at {}", old_number + 1, next_start);
            Ok(())
        })
    }

    /// AI fill completes every occupied subdivision before schedule
    /// generation touches it.
    fn step_subdivision_fill(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        let nonce = self.store.read(|w| w.boot_nonce);

        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_FILL) {
                return Ok(());
            }

            for division in 1..=8u8 {
                for subdivision in tx.subdivisions_of_division(division) {
                    let mut rng = ChaCha8Rng::seed_from_u64(derive_match_seed(
                        division as u32,
                        old_number + 1,
                        nonce ^ FILL_SALT,
                    ));

                    while tx.teams_in_subdivision(division, &subdivision).len()
                        < subdivision_capacity(division)
                    {
                        generate_ai_team(tx, division, &subdivision, &mut rng);
                    }
                }
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_FILL);
            Ok(())
        })
    }

    fn step_schedule_generation(&self, now: NaiveDateTime, old_number: u32) -> CoreResult<()> {
        let calendar = self.calendar.clone();

        self.store.with_tx(now, |tx| {
            if tx.step_done(old_number, SEASON_LENGTH_DAYS, STEP_SCHEDULE) {
                return Ok(());
            }

            let (new_number, new_start) = {
                let season = tx.current_season()?;
                (season.number, season.started_at)
            };

            for division in 1..=8u8 {
                for subdivision in tx.subdivisions_of_division(division) {
                    let mut team_ids: Vec<u32> = tx
                        .teams_in_subdivision(division, &subdivision)
                        .iter()
                        .map(|t| t.id)
                        .collect();
                    team_ids.sort_unstable();

                    let fixtures = generate_season_schedule(&team_ids);
                    Self::insert_fixtures(tx, &calendar, new_start, new_number, &fixtures);
                }
            }

            tx.mark_step_done(old_number, SEASON_LENGTH_DAYS, STEP_SCHEDULE);
            Ok(())
        })
    }
}
