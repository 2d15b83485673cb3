use chrono::{Duration, NaiveDateTime, NaiveTime};
use core::calendar::GameCalendar;
use core::config::CoreConfig;
use core::error::{CoreError, CoreResult};
use core::league::subdivision_standings;
use core::r#match::{derive_match_seed, Game, GameStatus, MatchType};
use core::tournament::{
    daily_registration_close, first_round_pairs, next_round_pairs, prize_table, round_count,
    seed_teams, EntryFee, StrengthInput, Tournament, TournamentStatus, TournamentType,
    CLASSIC_ENTRY_FEE_CREDITS, CLASSIC_ENTRY_FEE_GEMS, CLASSIC_FIRST_ROUND_HOUR,
    CLASSIC_FIRST_ROUND_MINUTE, CLASSIC_REGISTRATION_CLOSE_DAY, CLASSIC_REGISTRATION_CLOSE_HOUR,
    DAILY_REGISTRATION_OPEN_HOUR, DAILY_ROUND_GAP_MINUTES, DAILY_START_DELAY_MINUTES,
    PLAYOFF_FIRST_ROUND_HOUR, PLAYOFF_ROUND_BUFFER_MINUTES,
};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use store::{generate_ai_team, LedgerKind, Store, Tx};

/// Daily tournament entries allowed per team per day.
const DAILY_ENTRY_LIMIT: u8 = 1;

/// Bracket creation, dynamic round scheduling, AI fill, and prize
/// distribution for daily divisionals, the mid-season classic, and the
/// playoffs.
pub struct TournamentOrchestrator {
    store: Arc<Store>,
    config: CoreConfig,
    calendar: GameCalendar,
}

impl TournamentOrchestrator {
    pub fn new(store: Arc<Store>, config: CoreConfig) -> Self {
        let calendar = GameCalendar::new(&config);
        TournamentOrchestrator {
            store,
            config,
            calendar,
        }
    }

    /// Register for today's daily divisional tournament (divisions 2-8).
    /// A full tournament seeds immediately and a fresh one opens for
    /// further registrations.
    pub fn register_daily(&self, now: NaiveDateTime, team_id: u32) -> CoreResult<u32> {
        let size = self.config.daily_tournament_size;

        self.store.with_tx(now, |tx| {
            let team = tx.team(team_id)?;
            let division = team.division;

            if division < 2 {
                return Err(CoreError::InvalidOperation(String::from(
                    "division 1 has no daily tournament",
                )));
            }

            if tx.tournament_entries_today(team_id) >= DAILY_ENTRY_LIMIT {
                return Err(CoreError::InvalidOperation(format!(
                    "team {} already entered a daily tournament today",
                    team_id
                )));
            }

            let tournament_id = Self::open_daily_tournament(tx, now, division, size)?;

            {
                let tournament = tx.tournament_mut(tournament_id)?;
                if tournament.registrants.contains(&team_id) {
                    return Err(CoreError::InvalidOperation(format!(
                        "team {} is already registered",
                        team_id
                    )));
                }

                tournament.registrants.push(team_id);
                if tournament.first_registration_at.is_none() {
                    tournament.first_registration_at = Some(now);
                }
            }

            tx.count_tournament_entry(team_id);

            // Eight registrants: seed now and start in ten minutes.
            let full = tx.tournament(tournament_id)?.is_full();
            if full {
                Self::seed_and_schedule(
                    tx,
                    tournament_id,
                    now + Duration::minutes(DAILY_START_DELAY_MINUTES),
                )?;
            }

            Ok(tournament_id)
        })
    }

    /// Find the open daily tournament for a division, or create one inside
    /// today's registration window (07:00 to 01:00 next day).
    fn open_daily_tournament(
        tx: &mut Tx,
        now: NaiveDateTime,
        division: u8,
        size: usize,
    ) -> CoreResult<u32> {
        let season_number = tx.current_season()?.number;

        let existing = tx
            .tournament_ids()
            .into_iter()
            .filter_map(|id| tx.tournament(id).ok())
            .find(|t| {
                t.tournament_type == TournamentType::DailyDivisional
                    && t.division == division
                    && t.accepts_registration(now)
            })
            .map(|t| t.id);

        if let Some(id) = existing {
            return Ok(id);
        }

        // Registration day: before 01:00 we are still inside yesterday's
        // window.
        let open_date = if now.time() < NaiveTime::from_hms_opt(DAILY_REGISTRATION_OPEN_HOUR, 0, 0).unwrap()
        {
            now.date() - Duration::days(1)
        } else {
            now.date()
        };

        let opened_at =
            open_date.and_time(NaiveTime::from_hms_opt(DAILY_REGISTRATION_OPEN_HOUR, 0, 0).unwrap());

        Ok(tx.insert_tournament(Tournament {
            id: 0,
            tournament_type: TournamentType::DailyDivisional,
            division,
            season_number,
            status: TournamentStatus::Registering,
            size,
            round: 0,
            registrants: Vec::new(),
            fees: Vec::new(),
            bracket: Vec::new(),
            registration_opened_at: opened_at,
            registration_closes_at: daily_registration_close(open_date),
            first_registration_at: None,
            scheduled_start: None,
        }))
    }

    /// Register for the mid-season classic: one 16-team bracket per
    /// division, entry fee of 10 000 credits or 20 gems, refundable until
    /// registration closes at 13:00 on day 7.
    pub fn register_classic(
        &self,
        now: NaiveDateTime,
        team_id: u32,
        pay_with_gems: bool,
    ) -> CoreResult<u32> {
        let size = self.config.classic_tournament_size;
        let calendar = self.calendar.clone();

        self.store.with_tx(now, |tx| {
            let division = tx.team(team_id)?.division;
            let (season_number, season_start) = {
                let season = tx.current_season()?;
                (season.number, season.started_at)
            };

            let closes_at = calendar
                .day_start(season_start, CLASSIC_REGISTRATION_CLOSE_DAY)
                .date()
                .and_time(NaiveTime::from_hms_opt(CLASSIC_REGISTRATION_CLOSE_HOUR, 0, 0).unwrap());

            if now >= closes_at {
                return Err(CoreError::InvalidOperation(String::from(
                    "classic registration has closed",
                )));
            }

            let tournament_id = Self::open_classic_tournament(
                tx,
                division,
                season_number,
                size,
                calendar.season_anchor(season_start),
                closes_at,
            )?;

            {
                let tournament = tx.tournament(tournament_id)?;
                if tournament.registrants.contains(&team_id) {
                    return Err(CoreError::InvalidOperation(format!(
                        "team {} is already registered",
                        team_id
                    )));
                }
                if tournament.is_full() {
                    return Err(CoreError::InvalidOperation(String::from(
                        "classic bracket is full",
                    )));
                }
            }

            let fee = if pay_with_gems {
                tx.spend_gems(
                    team_id,
                    CLASSIC_ENTRY_FEE_GEMS,
                    LedgerKind::TournamentEntryFee,
                    "mid-season classic entry",
                )?;
                EntryFee::Gems(CLASSIC_ENTRY_FEE_GEMS)
            } else {
                tx.debit(
                    team_id,
                    CLASSIC_ENTRY_FEE_CREDITS,
                    LedgerKind::TournamentEntryFee,
                    "mid-season classic entry",
                    false,
                )?;
                EntryFee::Credits(CLASSIC_ENTRY_FEE_CREDITS)
            };

            let tournament = tx.tournament_mut(tournament_id)?;
            tournament.registrants.push(team_id);
            tournament.fees.push((team_id, fee));

            Ok(tournament_id)
        })
    }

    fn open_classic_tournament(
        tx: &mut Tx,
        division: u8,
        season_number: u32,
        size: usize,
        season_anchor: NaiveDateTime,
        closes_at: NaiveDateTime,
    ) -> CoreResult<u32> {
        let existing = tx
            .tournament_ids()
            .into_iter()
            .filter_map(|id| tx.tournament(id).ok())
            .find(|t| {
                t.tournament_type == TournamentType::MidSeasonClassic
                    && t.division == division
                    && t.season_number == season_number
            })
            .map(|t| t.id);

        if let Some(id) = existing {
            return Ok(id);
        }

        Ok(tx.insert_tournament(Tournament {
            id: 0,
            tournament_type: TournamentType::MidSeasonClassic,
            division,
            season_number,
            status: TournamentStatus::Registering,
            size,
            round: 0,
            registrants: Vec::new(),
            fees: Vec::new(),
            bracket: Vec::new(),
            registration_opened_at: season_anchor,
            registration_closes_at: closes_at,
            first_registration_at: None,
            scheduled_start: None,
        }))
    }

    /// Withdraw from the classic before registration closes; the entry fee
    /// comes back in the currency it was paid.
    pub fn cancel_classic_registration(
        &self,
        now: NaiveDateTime,
        tournament_id: u32,
        team_id: u32,
    ) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            let fee = {
                let tournament = tx.tournament(tournament_id)?;

                if tournament.tournament_type != TournamentType::MidSeasonClassic {
                    return Err(CoreError::InvalidOperation(String::from(
                        "only classic registrations can be cancelled",
                    )));
                }
                if now >= tournament.registration_closes_at {
                    return Err(CoreError::InvalidOperation(String::from(
                        "registration has closed",
                    )));
                }

                tournament
                    .fees
                    .iter()
                    .find(|(id, _)| *id == team_id)
                    .map(|(_, fee)| *fee)
                    .ok_or_else(|| {
                        CoreError::InvalidOperation(format!(
                            "team {} is not registered",
                            team_id
                        ))
                    })?
            };

            match fee {
                EntryFee::Credits(amount) => tx.credit(
                    team_id,
                    amount,
                    LedgerKind::TournamentEntryRefund,
                    "classic entry refund",
                )?,
                EntryFee::Gems(amount) => tx.add_gems(
                    team_id,
                    amount,
                    LedgerKind::TournamentEntryRefund,
                    "classic entry refund",
                )?,
            }

            let tournament = tx.tournament_mut(tournament_id)?;
            tournament.registrants.retain(|id| *id != team_id);
            tournament.fees.retain(|(id, _)| *id != team_id);

            Ok(())
        })
    }

    /// One-minute cadence: fire fill timers and registration closes.
    /// Daily tournaments AI-fill 60 minutes after their first registration;
    /// the classic AI-fills at its close.
    pub fn auto_start_scan(&self, now: NaiveDateTime) -> CoreResult<Vec<u32>> {
        self.store.with_tx(now, |tx| {
            let mut started = Vec::new();

            for id in tx.tournament_ids() {
                let (due, start_at) = {
                    let tournament = tx.tournament(id)?;
                    if tournament.status != TournamentStatus::Registering
                        || tournament.registrants.is_empty()
                    {
                        continue;
                    }

                    match tournament.tournament_type {
                        TournamentType::DailyDivisional => (
                            tournament.fill_timer_expired(now)
                                || now >= tournament.registration_closes_at,
                            now + Duration::minutes(DAILY_START_DELAY_MINUTES),
                        ),
                        TournamentType::MidSeasonClassic => (
                            now >= tournament.registration_closes_at,
                            now.date()
                                .and_time(
                                    NaiveTime::from_hms_opt(
                                        CLASSIC_FIRST_ROUND_HOUR,
                                        CLASSIC_FIRST_ROUND_MINUTE,
                                        0,
                                    )
                                    .unwrap(),
                                )
                                .max(now + Duration::minutes(DAILY_START_DELAY_MINUTES)),
                        ),
                        TournamentType::Playoff => continue,
                    }
                };

                if due {
                    Self::fill_with_ai(tx, id)?;
                    Self::seed_and_schedule(tx, id, start_at)?;
                    started.push(id);
                }
            }

            Ok(started)
        })
    }

    /// Top a registering tournament up to size. Existing AI teams in the
    /// division that are not already entered are preferred; new AI teams
    /// are generated only for the remainder.
    fn fill_with_ai(tx: &mut Tx, tournament_id: u32) -> CoreResult<()> {
        let (division, size, mut registrants) = {
            let tournament = tx.tournament(tournament_id)?;
            (
                tournament.division,
                tournament.size,
                tournament.registrants.clone(),
            )
        };

        let mut available_ai: Vec<u32> = tx
            .all_team_ids()
            .into_iter()
            .filter_map(|id| tx.team(id).ok())
            .filter(|t| t.ai_controlled && t.division == division && !registrants.contains(&t.id))
            .map(|t| t.id)
            .collect();
        available_ai.sort_unstable();

        while registrants.len() < size {
            if let Some(ai_id) = available_ai.pop() {
                registrants.push(ai_id);
            } else {
                let subdivision = tx
                    .subdivisions_of_division(division)
                    .first()
                    .cloned()
                    .unwrap_or_else(|| String::from("alpha"));

                let mut rng = ChaCha8Rng::seed_from_u64(
                    derive_match_seed(tournament_id, registrants.len() as u32, tx.boot_nonce()),
                );
                let ai_id = generate_ai_team(tx, division, &subdivision, &mut rng);
                registrants.push(ai_id);
            }
        }

        tx.tournament_mut(tournament_id)?.registrants = registrants;
        Ok(())
    }

    /// Deterministic true-strength seeding, then the first round's games.
    fn seed_and_schedule(tx: &mut Tx, tournament_id: u32, start_at: NaiveDateTime) -> CoreResult<()> {
        let (registrants, season_number, match_type) = {
            let tournament = tx.tournament(tournament_id)?;
            let match_type = match tournament.tournament_type {
                TournamentType::Playoff => MatchType::Playoff,
                _ => MatchType::Tournament,
            };
            (
                tournament.registrants.clone(),
                tournament.season_number,
                match_type,
            )
        };

        let mut strength_inputs = Vec::with_capacity(registrants.len());
        for team_id in &registrants {
            let team = tx.team(*team_id)?;
            let roster = tx.players_of_team(*team_id);
            let recent_form = team.record.win_percentage() as f64;
            strength_inputs.push((*team_id, StrengthInput::from_team(team, &roster, recent_form)));
        }

        let seeded = seed_teams(&strength_inputs);
        let pairs = first_round_pairs(&seeded);

        let mut round_games = Vec::with_capacity(pairs.len());
        for (home, away) in pairs {
            let game_id = tx.insert_game(Game::scheduled(
                season_number,
                home,
                away,
                match_type,
                Some(tournament_id),
                start_at,
            ));
            round_games.push(game_id);
        }

        let tournament = tx.tournament_mut(tournament_id)?;
        tournament.status = TournamentStatus::InProgress;
        tournament.round = 1;
        tournament.bracket = vec![round_games];
        tournament.scheduled_start = Some(start_at);

        info!(
            "tournament {} seeded, round 1 starts {}",
            tournament_id, start_at
        );

        Ok(())
    }

    /// Five-minute cadence: when a round finishes, schedule the next one
    /// (2 minutes later for daily/classic, 30 for playoffs) or complete the
    /// tournament and pay prizes with the final's completion.
    pub fn schedule_next_rounds(&self, now: NaiveDateTime) -> CoreResult<()> {
        self.store.with_tx(now, |tx| {
            for id in tx.tournament_ids() {
                Self::advance_one_tournament(tx, id)?;
            }
            Ok(())
        })
    }

    fn advance_one_tournament(tx: &mut Tx, tournament_id: u32) -> CoreResult<()> {
        let (tournament_type, season_number, round, bracket) = {
            let tournament = tx.tournament(tournament_id)?;
            if tournament.status != TournamentStatus::InProgress {
                return Ok(());
            }
            (
                tournament.tournament_type,
                tournament.season_number,
                tournament.round,
                tournament.bracket.clone(),
            )
        };

        let Some(current_round_games) = bracket.last() else {
            return Ok(());
        };

        let mut winners = Vec::with_capacity(current_round_games.len());
        let mut latest_completion: Option<NaiveDateTime> = None;

        for game_id in current_round_games {
            let game = tx.game(*game_id)?;
            if game.status != GameStatus::Completed {
                return Ok(());
            }

            let winner = game.winner().ok_or_else(|| {
                CoreError::Invariant(format!("tournament game {} completed drawn", game_id))
            })?;
            winners.push(winner);
            latest_completion = latest_completion.max(game.completed_at);
        }

        let latest_completion = latest_completion.unwrap_or(tx.now);
        let total_rounds = round_count({
            let tournament = tx.tournament(tournament_id)?;
            tournament.size
        });

        if round >= total_rounds {
            // Final decided: prizes land atomically with completion.
            let champion = winners[0];
            let final_game = tx.game(*current_round_games.first().unwrap())?;
            let runner_up = if final_game.home_team_id == champion {
                final_game.away_team_id
            } else {
                final_game.home_team_id
            };

            let division = tx.tournament(tournament_id)?.division;
            let ((champ_credits, champ_gems), (runner_credits, runner_gems)) =
                prize_table(tournament_type, division);

            tx.credit(
                champion,
                champ_credits,
                LedgerKind::Prize,
                &format!("champion, tournament {}", tournament_id),
            )?;
            if champ_gems > 0 {
                tx.add_gems(
                    champion,
                    champ_gems,
                    LedgerKind::Prize,
                    &format!("champion, tournament {}", tournament_id),
                )?;
            }
            tx.credit(
                runner_up,
                runner_credits,
                LedgerKind::Prize,
                &format!("runner-up, tournament {}", tournament_id),
            )?;
            if runner_gems > 0 {
                tx.add_gems(
                    runner_up,
                    runner_gems,
                    LedgerKind::Prize,
                    &format!("runner-up, tournament {}", tournament_id),
                )?;
            }

            let tournament = tx.tournament_mut(tournament_id)?;
            tournament.status = TournamentStatus::Completed;

            info!(
                "tournament {} complete: champion {}, runner-up {}",
                tournament_id, champion, runner_up
            );
            return Ok(());
        }

        // Schedule the next round.
        let gap_minutes = match tournament_type {
            TournamentType::Playoff => PLAYOFF_ROUND_BUFFER_MINUTES,
            _ => DAILY_ROUND_GAP_MINUTES,
        };
        let start_at = latest_completion + Duration::minutes(gap_minutes);

        let match_type = match tournament_type {
            TournamentType::Playoff => MatchType::Playoff,
            _ => MatchType::Tournament,
        };

        let mut next_games = Vec::new();
        for (home, away) in next_round_pairs(&winners) {
            let game_id = tx.insert_game(Game::scheduled(
                season_number,
                home,
                away,
                match_type,
                Some(tournament_id),
                start_at,
            ));
            next_games.push(game_id);
        }

        let tournament = tx.tournament_mut(tournament_id)?;
        tournament.round += 1;
        tournament.bracket.push(next_games);

        Ok(())
    }

    /// Day-15 playoffs: 8-team brackets in divisions 1-2, 4-team brackets
    /// in 3-8, seeded from final regular-season standings per subdivision,
    /// first round at 15:00.
    pub fn create_playoffs(&self, now: NaiveDateTime) -> CoreResult<Vec<u32>> {
        let calendar = self.calendar.clone();

        self.store.with_tx(now, |tx| {
            let (season_number, season_start) = {
                let season = tx.current_season()?;
                (season.number, season.started_at)
            };

            let first_round_at = calendar
                .day_start(season_start, core::calendar::PLAYOFF_DAY)
                .date()
                .and_time(NaiveTime::from_hms_opt(PLAYOFF_FIRST_ROUND_HOUR, 0, 0).unwrap());

            let mut created = Vec::new();

            for division in 1..=8u8 {
                let bracket_size = if division <= 2 { 8 } else { 4 };

                for subdivision in tx.subdivisions_of_division(division) {
                    let teams = tx.teams_in_subdivision(division, &subdivision);
                    if teams.len() < bracket_size {
                        continue;
                    }

                    let standings = subdivision_standings(&teams);
                    let qualified: Vec<u32> = standings
                        .iter()
                        .take(bracket_size)
                        .map(|row| row.team_id)
                        .collect();

                    let tournament_id = tx.insert_tournament(Tournament {
                        id: 0,
                        tournament_type: TournamentType::Playoff,
                        division,
                        season_number,
                        status: TournamentStatus::Registering,
                        size: bracket_size,
                        round: 0,
                        registrants: qualified,
                        fees: Vec::new(),
                        bracket: Vec::new(),
                        registration_opened_at: now,
                        registration_closes_at: now,
                        first_registration_at: None,
                        scheduled_start: Some(first_round_at),
                    });

                    Self::seed_playoff_bracket(tx, tournament_id, first_round_at)?;
                    created.push(tournament_id);
                }
            }

            Ok(created)
        })
    }

    /// Playoff seeding follows the final table, not true strength.
    fn seed_playoff_bracket(
        tx: &mut Tx,
        tournament_id: u32,
        start_at: NaiveDateTime,
    ) -> CoreResult<()> {
        let (registrants, season_number) = {
            let tournament = tx.tournament(tournament_id)?;
            (tournament.registrants.clone(), tournament.season_number)
        };

        let pairs = first_round_pairs(&registrants);

        let mut round_games = Vec::with_capacity(pairs.len());
        for (home, away) in pairs {
            let game_id = tx.insert_game(Game::scheduled(
                season_number,
                home,
                away,
                MatchType::Playoff,
                Some(tournament_id),
                start_at,
            ));
            round_games.push(game_id);
        }

        let tournament = tx.tournament_mut(tournament_id)?;
        tournament.status = TournamentStatus::InProgress;
        tournament.round = 1;
        tournament.bracket = vec![round_games];

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core::r#match::GameStatus;
    use store::generate_ai_team;

    fn day1() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    /// Season 1 with `count` player-controlled teams in division 5.
    fn fixture(count: usize) -> (Arc<Store>, TournamentOrchestrator, Vec<u32>) {
        let store = Arc::new(Store::new(42));
        let orchestrator = TournamentOrchestrator::new(store.clone(), CoreConfig::default());

        let teams = store
            .with_tx(day1(), |tx| {
                tx.create_season(1, day1());

                let mut rng = ChaCha8Rng::seed_from_u64(5);
                let mut ids = Vec::new();
                for _ in 0..count {
                    let id = generate_ai_team(tx, 5, "alpha", &mut rng);
                    tx.team_mut(id)?.ai_controlled = false;
                    ids.push(id);
                }
                Ok(ids)
            })
            .unwrap();

        (store, orchestrator, teams)
    }

    fn complete_game(store: &Store, game_id: u32, home: u8, away: u8, at: NaiveDateTime) {
        store
            .with_tx(at, |tx| {
                let game = tx.game_mut(game_id)?;
                game.status = GameStatus::Completed;
                game.home_score = home;
                game.away_score = away;
                game.completed_at = Some(at);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn eighth_registration_seeds_and_schedules_plus_ten_minutes() {
        let (store, orchestrator, teams) = fixture(8);
        let now = at(3, 9, 0);

        let mut tournament_id = 0;
        for team in &teams {
            tournament_id = orchestrator.register_daily(now, *team).unwrap();
        }

        store.read(|world| {
            let tournament = &world.tournaments[&tournament_id];
            assert_eq!(TournamentStatus::InProgress, tournament.status);
            assert_eq!(1, tournament.round);
            assert_eq!(4, tournament.bracket[0].len());

            for game_id in &tournament.bracket[0] {
                let game = &world.games[game_id];
                assert_eq!(MatchType::Tournament, game.match_type);
                assert_eq!(now + Duration::minutes(10), game.scheduled_at);
            }
        });
    }

    #[test]
    fn overflow_registrations_open_a_fresh_tournament() {
        let (store, orchestrator, teams) = fixture(9);
        let now = at(3, 9, 0);

        let mut first = 0;
        for team in teams.iter().take(8) {
            first = orchestrator.register_daily(now, *team).unwrap();
        }

        let second = orchestrator.register_daily(now, teams[8]).unwrap();
        assert_ne!(first, second);

        store.read(|world| {
            assert_eq!(
                TournamentStatus::Registering,
                world.tournaments[&second].status
            );
        });
    }

    #[test]
    fn one_daily_entry_per_team_per_day() {
        let (_, orchestrator, teams) = fixture(8);
        let now = at(3, 9, 0);

        orchestrator.register_daily(now, teams[0]).unwrap();
        let result = orchestrator.register_daily(now, teams[0]);
        assert!(matches!(result, Err(CoreError::InvalidOperation(_))));
    }

    #[test]
    fn division_one_is_excluded_from_dailies() {
        let (store, orchestrator, teams) = fixture(1);
        store
            .with_tx(day1(), |tx| {
                tx.team_mut(teams[0])?.division = 1;
                Ok(())
            })
            .unwrap();

        let result = orchestrator.register_daily(at(3, 9, 0), teams[0]);
        assert!(matches!(result, Err(CoreError::InvalidOperation(_))));
    }

    #[test]
    fn fill_timer_tops_up_with_ai_and_starts() {
        let (store, orchestrator, teams) = fixture(2);
        let registered_at = at(3, 9, 0);

        let tournament_id = orchestrator.register_daily(registered_at, teams[0]).unwrap();
        orchestrator.register_daily(registered_at, teams[1]).unwrap();

        // Before the timer: nothing fires.
        assert!(orchestrator
            .auto_start_scan(registered_at + Duration::minutes(59))
            .unwrap()
            .is_empty());

        let started = orchestrator
            .auto_start_scan(registered_at + Duration::minutes(60))
            .unwrap();
        assert_eq!(vec![tournament_id], started);

        store.read(|world| {
            let tournament = &world.tournaments[&tournament_id];
            assert_eq!(8, tournament.registrants.len());
            assert_eq!(TournamentStatus::InProgress, tournament.status);

            // The fill created or reused AI squads in the division.
            let ai_entrants = tournament
                .registrants
                .iter()
                .filter(|id| world.teams[id].ai_controlled)
                .count();
            assert_eq!(6, ai_entrants);
        });
    }

    #[test]
    fn rounds_chain_two_minutes_after_completion_and_final_pays_prizes() {
        let (store, orchestrator, teams) = fixture(8);
        let now = at(3, 9, 0);

        let mut tournament_id = 0;
        for team in &teams {
            tournament_id = orchestrator.register_daily(now, *team).unwrap();
        }

        // Complete the quarter finals, home side advancing.
        let round_one: Vec<u32> =
            store.read(|world| world.tournaments[&tournament_id].bracket[0].clone());
        let quarter_end = at(3, 9, 30);
        for game_id in &round_one {
            complete_game(&store, *game_id, 2, 1, quarter_end);
        }

        orchestrator.schedule_next_rounds(at(3, 9, 35)).unwrap();

        let round_two: Vec<u32> = store.read(|world| {
            let tournament = &world.tournaments[&tournament_id];
            assert_eq!(2, tournament.round);
            tournament.bracket[1].clone()
        });
        assert_eq!(2, round_two.len());
        store.read(|world| {
            assert_eq!(
                quarter_end + Duration::minutes(DAILY_ROUND_GAP_MINUTES),
                world.games[&round_two[0]].scheduled_at
            );
        });

        // Semis, then the final.
        let semi_end = at(3, 10, 0);
        for game_id in &round_two {
            complete_game(&store, *game_id, 3, 0, semi_end);
        }
        orchestrator.schedule_next_rounds(at(3, 10, 5)).unwrap();

        let final_game =
            store.read(|world| world.tournaments[&tournament_id].bracket[2][0]);
        let (champion, runner_up) = store.read(|world| {
            let game = &world.games[&final_game];
            (game.home_team_id, game.away_team_id)
        });

        let champion_before = store.read(|world| world.finances[&champion].credits);
        complete_game(&store, final_game, 4, 2, at(3, 10, 40));
        orchestrator.schedule_next_rounds(at(3, 10, 45)).unwrap();

        store.read(|world| {
            let tournament = &world.tournaments[&tournament_id];
            assert_eq!(TournamentStatus::Completed, tournament.status);

            let ((champ_credits, _), (runner_credits, _)) =
                prize_table(TournamentType::DailyDivisional, 5);
            assert_eq!(
                champion_before + champ_credits,
                world.finances[&champion].credits
            );

            let runner_prize_rows = world
                .ledger
                .iter()
                .filter(|e| e.team_id == runner_up && e.kind == LedgerKind::Prize)
                .count();
            assert!(runner_prize_rows >= 1);
            let _ = runner_credits;
        });

        // Settlement of a completed tournament is idempotent.
        let ledger_len = store.read(|world| world.ledger.len());
        orchestrator.schedule_next_rounds(at(3, 11, 0)).unwrap();
        assert_eq!(ledger_len, store.read(|world| world.ledger.len()));
    }

    #[test]
    fn classic_charges_and_refunds_entry_fees() {
        let (store, orchestrator, teams) = fixture(2);

        let credits_before = store.read(|world| world.finances[&teams[0]].credits);
        let tournament_id = orchestrator
            .register_classic(at(2, 10, 0), teams[0], false)
            .unwrap();

        store.read(|world| {
            assert_eq!(
                credits_before - CLASSIC_ENTRY_FEE_CREDITS,
                world.finances[&teams[0]].credits
            );
        });

        orchestrator
            .cancel_classic_registration(at(3, 10, 0), tournament_id, teams[0])
            .unwrap();

        store.read(|world| {
            assert_eq!(credits_before, world.finances[&teams[0]].credits);
            assert!(world.tournaments[&tournament_id].registrants.is_empty());
        });

        // Gems path.
        store
            .with_tx(at(3, 10, 0), |tx| {
                tx.add_gems(teams[1], 25, LedgerKind::Prize, "grant")
            })
            .unwrap();

        orchestrator
            .register_classic(at(3, 11, 0), teams[1], true)
            .unwrap();
        store.read(|world| {
            assert_eq!(5, world.finances[&teams[1]].gems);
        });
    }

    #[test]
    fn classic_registration_closes_on_day_seven() {
        let (_, orchestrator, teams) = fixture(1);

        // Day 7 at 13:00 is the cutoff.
        let result = orchestrator.register_classic(at(7, 13, 0), teams[0], false);
        assert!(matches!(result, Err(CoreError::InvalidOperation(_))));

        assert!(orchestrator
            .register_classic(at(7, 12, 59), teams[0], false)
            .is_ok());
    }

    #[test]
    fn playoffs_seed_top_four_from_standings() {
        let (store, orchestrator, teams) = fixture(8);

        // Give team k exactly k wins so the table is unambiguous.
        store
            .with_tx(day1(), |tx| {
                for (wins, team_id) in teams.iter().enumerate() {
                    let record = &mut tx.team_mut(*team_id)?.record;
                    for _ in 0..wins {
                        record.record_win();
                    }
                }
                Ok(())
            })
            .unwrap();

        let created = orchestrator.create_playoffs(at(15, 3, 30)).unwrap();
        assert_eq!(1, created.len());

        store.read(|world| {
            let tournament = &world.tournaments[&created[0]];
            assert_eq!(TournamentType::Playoff, tournament.tournament_type);
            assert_eq!(4, tournament.size);

            // The four winningest teams qualified; top seed hosts the
            // fourth.
            let top_four: Vec<u32> = teams.iter().rev().take(4).copied().collect();
            assert_eq!(top_four, tournament.registrants);

            let first_game = &world.games[&tournament.bracket[0][0]];
            assert_eq!(MatchType::Playoff, first_game.match_type);
            assert_eq!(at(15, 15, 0), first_game.scheduled_at);
            assert_eq!(top_four[0], first_game.home_team_id);
            assert_eq!(top_four[3], first_game.away_team_id);
        });
    }
}
