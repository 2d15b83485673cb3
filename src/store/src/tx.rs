use crate::ledger::{LedgerEntry, LedgerKind};
use crate::world::World;
use chrono::NaiveDateTime;
use core::calendar::Phase;
use core::club::{Player, Staff, StaffType, Team, TeamFinances};
use core::error::{CoreError, CoreResult};
use core::league::Season;
use core::marketplace::{ListingStatus, MarketplaceListing};
use core::r#match::{
    Game, GameStatus, MatchCheckpoint, MatchEvent, MatchEventKind, MatchType, SimulationResult,
};
use core::tournament::Tournament;

/// One transaction over the staged world. All mutation goes through these
/// typed operations; no partial write survives an error.
pub struct Tx<'a> {
    world: &'a mut World,
    pub now: NaiveDateTime,
}

impl<'a> Tx<'a> {
    pub fn new(world: &'a mut World, now: NaiveDateTime) -> Self {
        Tx { world, now }
    }

    pub fn boot_nonce(&self) -> u64 {
        self.world.boot_nonce
    }

    // --- seasons ---

    pub fn current_season(&self) -> CoreResult<&Season> {
        self.world.current_season().ok_or(CoreError::SeasonNotFound)
    }

    pub fn current_season_mut(&mut self) -> CoreResult<&mut Season> {
        self.world
            .seasons
            .iter_mut()
            .rev()
            .find(|s| !s.archived)
            .ok_or(CoreError::SeasonNotFound)
    }

    /// CAS on the canonical day counter. The automation leader is the only
    /// caller; a stale expectation means another pass already advanced.
    pub fn advance_season_day(&mut self, expected_day: u8) -> CoreResult<u8> {
        let season = self.current_season_mut()?;

        if season.current_day != expected_day {
            return Err(CoreError::StaleDay {
                expected: expected_day,
                stored: season.current_day,
            });
        }

        season.current_day = (season.current_day + 1).min(core::calendar::SEASON_LENGTH_DAYS);
        season.phase = Phase::of_day(season.current_day);

        Ok(season.current_day)
    }

    /// Archive the current season and open the next one at day 1.
    pub fn create_season(&mut self, number: u32, started_at: NaiveDateTime) -> u32 {
        for season in self.world.seasons.iter_mut() {
            season.archived = true;
        }

        let id = self.world.next_season_id;
        self.world.next_season_id += 1;
        self.world.seasons.push(Season::new(id, number, started_at));
        id
    }

    // --- teams, players, staff ---

    pub fn insert_team(&mut self, mut team: Team, finances: TeamFinances) -> u32 {
        let id = self.world.next_team_id;
        self.world.next_team_id += 1;
        team.id = id;

        self.world.teams.insert(id, team);
        self.world.finances.insert(id, finances);

        // Opening balance anchors the ledger audit.
        self.append_ledger(
            id,
            self.world.finances[&id].credits,
            0,
            self.world.finances[&id].gems as i64,
            LedgerKind::OpeningBalance,
            String::from("opening balance"),
        );

        id
    }

    pub fn team(&self, id: u32) -> CoreResult<&Team> {
        self.world.teams.get(&id).ok_or(CoreError::TeamNotFound(id))
    }

    pub fn team_mut(&mut self, id: u32) -> CoreResult<&mut Team> {
        self.world
            .teams
            .get_mut(&id)
            .ok_or(CoreError::TeamNotFound(id))
    }

    pub fn all_team_ids(&self) -> Vec<u32> {
        self.world.teams.keys().copied().collect()
    }

    pub fn teams_in_subdivision(&self, division: u8, subdivision: &str) -> Vec<&Team> {
        self.world
            .teams
            .values()
            .filter(|t| t.division == division && t.subdivision == subdivision)
            .collect()
    }

    pub fn subdivisions_of_division(&self, division: u8) -> Vec<String> {
        let mut labels: Vec<String> = self
            .world
            .teams
            .values()
            .filter(|t| t.division == division)
            .map(|t| t.subdivision.clone())
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Remove a team and its roster, staff, and balances. Ledger history is
    /// append-only and stays.
    pub fn remove_team(&mut self, id: u32) -> CoreResult<()> {
        self.world.teams.remove(&id).ok_or(CoreError::TeamNotFound(id))?;
        self.world.finances.remove(&id);
        self.world.players.retain(|_, p| p.team_id != id);
        self.world.staff.retain(|_, s| s.team_id != id);
        Ok(())
    }

    pub fn insert_player(&mut self, mut player: Player) -> u32 {
        let id = self.world.next_player_id;
        self.world.next_player_id += 1;
        player.id = id;
        self.world.players.insert(id, player);
        id
    }

    pub fn player(&self, id: u32) -> CoreResult<&Player> {
        self.world
            .players
            .get(&id)
            .ok_or(CoreError::PlayerNotFound(id))
    }

    pub fn player_mut(&mut self, id: u32) -> CoreResult<&mut Player> {
        self.world
            .players
            .get_mut(&id)
            .ok_or(CoreError::PlayerNotFound(id))
    }

    pub fn players_of_team(&self, team_id: u32) -> Vec<&Player> {
        self.world
            .players
            .values()
            .filter(|p| p.team_id == team_id)
            .collect()
    }

    pub fn player_ids(&self) -> Vec<u32> {
        self.world.players.keys().copied().collect()
    }

    pub fn insert_staff(&mut self, mut staff: Staff) -> u32 {
        let id = self.world.next_staff_id;
        self.world.next_staff_id += 1;
        staff.id = id;
        self.world.staff.insert(id, staff);
        id
    }

    pub fn staff(&self, id: u32) -> CoreResult<&Staff> {
        self.world.staff.get(&id).ok_or(CoreError::StaffNotFound(id))
    }

    pub fn staff_mut(&mut self, id: u32) -> CoreResult<&mut Staff> {
        self.world
            .staff
            .get_mut(&id)
            .ok_or(CoreError::StaffNotFound(id))
    }

    pub fn staff_of_team(&self, team_id: u32) -> Vec<&Staff> {
        self.world
            .staff
            .values()
            .filter(|s| s.team_id == team_id)
            .collect()
    }

    pub fn trainer_rating(&self, team_id: u32, staff_type: StaffType) -> u8 {
        self.staff_of_team(team_id)
            .iter()
            .filter(|s| s.staff_type == staff_type)
            .map(|s| s.attributes.rating())
            .max()
            .unwrap_or(0)
    }

    // --- finances & ledger ---

    pub fn finances(&self, team_id: u32) -> CoreResult<&TeamFinances> {
        self.world
            .finances
            .get(&team_id)
            .ok_or(CoreError::TeamNotFound(team_id))
    }

    fn finances_mut(&mut self, team_id: u32) -> CoreResult<&mut TeamFinances> {
        self.world
            .finances
            .get_mut(&team_id)
            .ok_or(CoreError::TeamNotFound(team_id))
    }

    fn append_ledger(
        &mut self,
        team_id: u32,
        delta_credits: i64,
        delta_escrow: i64,
        delta_gems: i64,
        kind: LedgerKind,
        note: String,
    ) {
        let id = self.world.next_ledger_id;
        self.world.next_ledger_id += 1;

        self.world.ledger.push(LedgerEntry {
            id,
            team_id,
            delta_credits,
            delta_escrow,
            delta_gems,
            kind,
            note,
            at: self.now,
        });
    }

    pub fn credit(
        &mut self,
        team_id: u32,
        amount: i64,
        kind: LedgerKind,
        note: &str,
    ) -> CoreResult<()> {
        if amount < 0 {
            return Err(CoreError::Invariant(format!(
                "negative credit amount {} for team {}",
                amount, team_id
            )));
        }

        self.finances_mut(team_id)?.credits += amount;
        self.append_ledger(team_id, amount, 0, 0, kind, note.to_string());
        Ok(())
    }

    /// Debit free credits. `allow_negative` exists for salary settlement
    /// only; everything else fails with InsufficientCredits.
    pub fn debit(
        &mut self,
        team_id: u32,
        amount: i64,
        kind: LedgerKind,
        note: &str,
        allow_negative: bool,
    ) -> CoreResult<()> {
        if amount < 0 {
            return Err(CoreError::Invariant(format!(
                "negative debit amount {} for team {}",
                amount, team_id
            )));
        }

        let finances = self.finances_mut(team_id)?;
        if !allow_negative && finances.credits < amount {
            return Err(CoreError::InsufficientCredits {
                required: amount,
                available: finances.credits,
            });
        }

        finances.credits -= amount;
        self.append_ledger(team_id, -amount, 0, 0, kind, note.to_string());
        Ok(())
    }

    pub fn add_gems(&mut self, team_id: u32, amount: u32, kind: LedgerKind, note: &str) -> CoreResult<()> {
        self.finances_mut(team_id)?.gems += amount;
        self.append_ledger(team_id, 0, 0, amount as i64, kind, note.to_string());
        Ok(())
    }

    pub fn spend_gems(
        &mut self,
        team_id: u32,
        amount: u32,
        kind: LedgerKind,
        note: &str,
    ) -> CoreResult<()> {
        let finances = self.finances_mut(team_id)?;
        if finances.gems < amount {
            return Err(CoreError::InsufficientGems {
                required: amount,
                available: finances.gems,
            });
        }

        finances.gems -= amount;
        self.append_ledger(team_id, 0, 0, -(amount as i64), kind, note.to_string());
        Ok(())
    }

    /// Move free credits into escrow backing a bid.
    pub fn reserve_bid(&mut self, team_id: u32, amount: i64) -> CoreResult<()> {
        let finances = self.finances_mut(team_id)?;

        if finances.credits < amount {
            return Err(CoreError::InsufficientCredits {
                required: amount,
                available: finances.credits,
            });
        }

        finances.credits -= amount;
        finances.escrow_credits += amount;
        self.append_ledger(
            team_id,
            -amount,
            amount,
            0,
            LedgerKind::BidEscrow,
            format!("escrow reserve {}", amount),
        );
        Ok(())
    }

    /// Return escrowed credits to the free balance (outbid or refund).
    pub fn release_bid(&mut self, team_id: u32, amount: i64) -> CoreResult<()> {
        let finances = self.finances_mut(team_id)?;

        if finances.escrow_credits < amount {
            return Err(CoreError::Invariant(format!(
                "escrow release {} exceeds escrow {} for team {}",
                amount, finances.escrow_credits, team_id
            )));
        }

        finances.escrow_credits -= amount;
        finances.credits += amount;
        self.append_ledger(
            team_id,
            amount,
            -amount,
            0,
            LedgerKind::BidRelease,
            format!("escrow release {}", amount),
        );
        Ok(())
    }

    /// Consume escrow to settle a purchase.
    pub fn settle_escrow(&mut self, team_id: u32, amount: i64, note: &str) -> CoreResult<()> {
        let finances = self.finances_mut(team_id)?;

        if finances.escrow_credits < amount {
            return Err(CoreError::Invariant(format!(
                "escrow settle {} exceeds escrow {} for team {}",
                amount, finances.escrow_credits, team_id
            )));
        }

        finances.escrow_credits -= amount;
        self.append_ledger(
            team_id,
            0,
            -amount,
            0,
            LedgerKind::PurchaseSettled,
            note.to_string(),
        );
        Ok(())
    }

    pub fn ledger_entries(&self, team_id: u32) -> Vec<&LedgerEntry> {
        self.world
            .ledger
            .iter()
            .filter(|e| e.team_id == team_id)
            .collect()
    }

    /// Audit invariant: ledger sums must equal current balances.
    pub fn audit_team(&self, team_id: u32) -> CoreResult<()> {
        let finances = self.finances(team_id)?;

        let mut credits = 0i64;
        let mut escrow = 0i64;
        let mut gems = 0i64;
        for entry in self.world.ledger.iter().filter(|e| e.team_id == team_id) {
            credits += entry.delta_credits;
            escrow += entry.delta_escrow;
            gems += entry.delta_gems;
        }

        if credits != finances.credits
            || escrow != finances.escrow_credits
            || gems != finances.gems as i64
        {
            return Err(CoreError::Invariant(format!(
                "ledger mismatch for team {}: ledger ({}, {}, {}) vs balances ({}, {}, {})",
                team_id, credits, escrow, gems, finances.credits, finances.escrow_credits, finances.gems
            )));
        }

        Ok(())
    }

    // --- games ---

    pub fn insert_game(&mut self, mut game: Game) -> u32 {
        let id = self.world.next_game_id;
        self.world.next_game_id += 1;
        game.id = id;
        self.world.games.insert(id, game);
        id
    }

    pub fn game(&self, id: u32) -> CoreResult<&Game> {
        self.world.games.get(&id).ok_or(CoreError::GameNotFound(id))
    }

    pub fn game_mut(&mut self, id: u32) -> CoreResult<&mut Game> {
        self.world
            .games
            .get_mut(&id)
            .ok_or(CoreError::GameNotFound(id))
    }

    pub fn games_of_team(&self, team_id: u32) -> Vec<&Game> {
        self.world
            .games
            .values()
            .filter(|g| g.involves(team_id))
            .collect()
    }

    /// SCHEDULED matches inside the half-open window, ordered by scheduled
    /// time then id.
    pub fn list_due_matches(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<u32> {
        let mut due: Vec<(&NaiveDateTime, u32)> = self
            .world
            .games
            .values()
            .filter(|g| {
                g.status == GameStatus::Scheduled && g.scheduled_at >= from && g.scheduled_at < to
            })
            .map(|g| (&g.scheduled_at, g.id))
            .collect();

        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    pub fn games_in_progress(&self) -> Vec<u32> {
        self.world
            .games
            .values()
            .filter(|g| g.status == GameStatus::InProgress)
            .map(|g| g.id)
            .collect()
    }

    pub fn mark_in_progress(&mut self, game_id: u32, seed: u64) -> CoreResult<()> {
        let game = self.game_mut(game_id)?;

        if game.status != GameStatus::Scheduled {
            return Err(CoreError::InvalidOperation(format!(
                "game {} is not SCHEDULED",
                game_id
            )));
        }

        game.status = GameStatus::InProgress;
        game.seed = Some(seed);
        Ok(())
    }

    /// Persist a finished simulation: scores, event log, per-player minutes
    /// and injuries, league records, and league home-match stadium revenue,
    /// all in this one transaction. A no-op for already-completed games so
    /// crash-replays cannot double-apply.
    pub fn persist_match_result(&mut self, result: &SimulationResult) -> CoreResult<()> {
        let (match_type, home_team_id, away_team_id) = {
            let game = self.game(result.game_id)?;
            if game.status == GameStatus::Completed {
                return Ok(());
            }
            (game.match_type, game.home_team_id, game.away_team_id)
        };

        {
            let now = self.now;
            let game = self.game_mut(result.game_id)?;
            game.status = GameStatus::Completed;
            game.home_score = result.home_score;
            game.away_score = result.away_score;
            game.completed_at = Some(now);
        }

        self.world
            .match_events
            .insert(result.game_id, result.events.clone());
        self.world.checkpoints.remove(&result.game_id);

        // Minutes and stamina drain per player.
        for (player_id, stats) in &result.player_stats {
            if let Some(player) = self.world.players.get_mut(player_id) {
                let minutes = (stats.seconds_played / 60) as u16;

                match match_type {
                    MatchType::League => {
                        player.minutes.league += minutes;
                        player.minutes_today.league += minutes;
                    }
                    MatchType::Exhibition => {
                        player.minutes.exhibition += minutes;
                        player.minutes_today.exhibition += minutes;
                    }
                    MatchType::Tournament | MatchType::Playoff => {
                        player.minutes.tournament += minutes;
                        player.minutes_today.tournament += minutes;
                    }
                }

                player.daily_stamina = player.daily_stamina.saturating_sub(minutes as u8);
            }
        }

        // In-match injuries become durable injuries.
        for event in &result.events {
            if let MatchEventKind::Injury { severity } = &event.kind {
                if let Some(victim) = event.actors.first() {
                    if let Some(player) = self.world.players.get_mut(victim) {
                        player.set_injury(*severity);
                    }
                }
            }
        }

        // League results feed the table.
        if match_type == MatchType::League {
            if result.home_score > result.away_score {
                self.team_mut(home_team_id)?.record.record_win();
                self.team_mut(away_team_id)?.record.record_loss();
            } else if result.away_score > result.home_score {
                self.team_mut(away_team_id)?.record.record_win();
                self.team_mut(home_team_id)?.record.record_loss();
            } else {
                self.team_mut(home_team_id)?.record.record_draw();
                self.team_mut(away_team_id)?.record.record_draw();
            }

            let home = self.team(home_team_id)?;
            let revenue = home.fan_loyalty as i64 * 100 + home.stadium_investment / 100;
            self.credit(
                home_team_id,
                revenue,
                LedgerKind::StadiumRevenue,
                &format!("gate revenue, game {}", result.game_id),
            )?;
        }

        Ok(())
    }

    /// Record a forfeit: the opponent advances with a nominal score.
    pub fn record_forfeit(&mut self, game_id: u32, winner_team_id: u32) -> CoreResult<()> {
        let now = self.now;
        let game = self.game_mut(game_id)?;

        if game.status == GameStatus::Completed {
            return Ok(());
        }

        game.status = GameStatus::Completed;
        game.forfeited = true;
        game.completed_at = Some(now);
        if game.home_team_id == winner_team_id {
            game.home_score = 1;
            game.away_score = 0;
        } else {
            game.home_score = 0;
            game.away_score = 1;
        }

        Ok(())
    }

    pub fn match_events(&self, game_id: u32) -> Option<&Vec<MatchEvent>> {
        self.world.match_events.get(&game_id)
    }

    // --- tournaments ---

    pub fn insert_tournament(&mut self, mut tournament: Tournament) -> u32 {
        let id = self.world.next_tournament_id;
        self.world.next_tournament_id += 1;
        tournament.id = id;
        self.world.tournaments.insert(id, tournament);
        id
    }

    pub fn tournament(&self, id: u32) -> CoreResult<&Tournament> {
        self.world
            .tournaments
            .get(&id)
            .ok_or(CoreError::TournamentNotFound(id))
    }

    pub fn tournament_mut(&mut self, id: u32) -> CoreResult<&mut Tournament> {
        self.world
            .tournaments
            .get_mut(&id)
            .ok_or(CoreError::TournamentNotFound(id))
    }

    pub fn tournament_ids(&self) -> Vec<u32> {
        self.world.tournaments.keys().copied().collect()
    }

    // --- marketplace ---

    pub fn insert_listing(&mut self, mut listing: MarketplaceListing) -> u32 {
        let id = self.world.next_listing_id;
        self.world.next_listing_id += 1;
        listing.id = id;
        self.world.listings.insert(id, listing);
        id
    }

    pub fn listing(&self, id: u32) -> CoreResult<&MarketplaceListing> {
        self.world
            .listings
            .get(&id)
            .ok_or(CoreError::ListingNotFound(id))
    }

    pub fn listing_mut(&mut self, id: u32) -> CoreResult<&mut MarketplaceListing> {
        self.world
            .listings
            .get_mut(&id)
            .ok_or(CoreError::ListingNotFound(id))
    }

    pub fn active_listing_count(&self, seller_team_id: u32) -> usize {
        self.world
            .listings
            .values()
            .filter(|l| l.seller_team_id == seller_team_id && l.status == ListingStatus::Active)
            .count()
    }

    pub fn listings_by_status(&self, status: ListingStatus) -> Vec<&MarketplaceListing> {
        self.world
            .listings
            .values()
            .filter(|l| l.status == status)
            .collect()
    }

    pub fn expired_active_listings(&self, now: NaiveDateTime) -> Vec<u32> {
        self.world
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Active && now >= l.expires_at)
            .map(|l| l.id)
            .collect()
    }

    // --- checkpoints ---

    pub fn save_checkpoint(&mut self, checkpoint: MatchCheckpoint) {
        self.world.checkpoints.insert(checkpoint.game_id, checkpoint);
    }

    pub fn checkpoint(&self, game_id: u32) -> Option<&MatchCheckpoint> {
        self.world.checkpoints.get(&game_id)
    }

    pub fn delete_checkpoint(&mut self, game_id: u32) {
        self.world.checkpoints.remove(&game_id);
    }

    // --- daily limits & archives ---

    pub fn exhibitions_today(&self, team_id: u32) -> u8 {
        self.world.exhibitions_today.get(&team_id).copied().unwrap_or(0)
    }

    pub fn count_exhibition(&mut self, team_id: u32) {
        *self.world.exhibitions_today.entry(team_id).or_insert(0) += 1;
    }

    pub fn tournament_entries_today(&self, team_id: u32) -> u8 {
        self.world
            .tournament_entries_today
            .get(&team_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn count_tournament_entry(&mut self, team_id: u32) {
        *self.world.tournament_entries_today.entry(team_id).or_insert(0) += 1;
    }

    /// Daily-limit reset, step 1e of day advancement.
    pub fn reset_daily_limits(&mut self) {
        self.world.exhibitions_today.clear();
        self.world.tournament_entries_today.clear();

        for player in self.world.players.values_mut() {
            player.minutes_today = Default::default();
        }
    }

    pub fn archive_standings(
        &mut self,
        season_number: u32,
        division: u8,
        subdivision: &str,
        rows: Vec<core::league::StandingRow>,
    ) {
        self.world
            .standings_archive
            .insert((season_number, division, subdivision.to_string()), rows);
    }

    pub fn archived_standings(
        &self,
        season_number: u32,
        division: u8,
        subdivision: &str,
    ) -> Option<&Vec<core::league::StandingRow>> {
        self.world
            .standings_archive
            .get(&(season_number, division, subdivision.to_string()))
    }

    // --- day markers ---

    pub fn step_done(&self, season_number: u32, day: u8, step: &str) -> bool {
        self.world
            .day_markers
            .contains(&(season_number, day, step.to_string()))
    }

    /// Set in the same transaction as the step's effects; a step that finds
    /// its marker already set is a no-op.
    pub fn mark_step_done(&mut self, season_number: u32, day: u8, step: &str) {
        self.world
            .day_markers
            .insert((season_number, day, step.to_string()));
    }
}
