use crate::club::player::{AttributeKind, InjuryStatus, PlayerAttributes, PlayerRole, Race};
use crate::club::team::{FieldSize, TacticalFocus, FIELD_PLAYERS};
use crate::commentary::{select_commentary, CommentaryContext};
use crate::error::{CoreError, CoreResult};
use crate::r#match::engine::actions::{
    clutch_factor, kick_success, pass_success, run_success, select_action, ActionContext,
    ActionKind, Posture, KICK_RANGE_YARDS,
};
use crate::r#match::engine::events::{MatchEvent, MatchEventKind};
use crate::r#match::engine::input::MatchInput;
use crate::r#match::engine::stats::{PlayerMatchStats, SimulationResult, TeamMatchStats};
use crate::r#match::game::MatchType;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const OVERTIME_SECONDS: u32 = 600;

/// Automatic substitution threshold on in-game stamina.
pub const SUBSTITUTION_STAMINA: f32 = 50.0;

/// Sudden death is force-settled after this many extra ticks; the team with
/// more total yards is awarded the decider.
const SUDDEN_DEATH_CAP: u32 = 3600;

const KNOCKDOWN_SECONDS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn other(&self) -> TeamSide {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    FirstHalf,
    SecondHalf,
    Overtime,
    SuddenDeath,
    Completed,
}

/// Live, mutable view of one player during simulation.
#[derive(Debug, Clone)]
pub struct FieldPlayer {
    pub id: u32,
    pub name: String,
    pub role: PlayerRole,
    pub race: Race,
    pub attributes: PlayerAttributes,
    pub stamina: f32,
    pub injury: InjuryStatus,
    pub knocked_down_until: u32,
    pub on_field: bool,
    pub stats: PlayerMatchStats,
}

impl FieldPlayer {
    /// Attribute with the low-stamina penalty applied: below 20 stamina,
    /// speed and agility lose 1 per 5 points lost, power loses 0.5 per 5.
    pub fn effective(&self, kind: AttributeKind) -> f32 {
        let base = self.attributes.get(kind) as f32;

        if self.stamina >= 20.0 {
            return base;
        }

        let lost = 20.0 - self.stamina;
        let penalized = match kind {
            AttributeKind::Speed | AttributeKind::Agility => base - lost / 5.0,
            AttributeKind::Power => base - lost / 10.0,
            _ => base,
        };

        penalized.max(1.0)
    }

    pub fn is_active(&self, tick: u32) -> bool {
        self.on_field && self.knocked_down_until <= tick && self.injury != InjuryStatus::Severe
    }
}

#[derive(Debug, Clone)]
struct SquadState {
    team_id: u32,
    tactical_focus: TacticalFocus,
    camaraderie: u8,
    /// Crowd pressure this squad's players play under.
    intimidation_faced: u8,
    leader_rating: u8,
    players: Vec<FieldPlayer>,
    stats: TeamMatchStats,
}

impl SquadState {
    fn active_indexes(&self, tick: u32) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active(tick))
            .map(|(i, _)| i)
            .collect()
    }

    fn role_count(&self, role: PlayerRole, tick: u32) -> usize {
        self.players
            .iter()
            .filter(|p| p.is_active(tick) && p.role == role)
            .count()
    }
}

/// A deterministic tick-based simulation of one dome ball match.
///
/// The same `MatchInput` (seed included) produces a byte-identical event
/// stream whether driven tick-by-tick (live) or to completion (instant):
/// both modes run exactly this state machine, and the seeded generator is
/// the only entropy source.
pub struct MatchSimulation {
    pub game_id: u32,
    pub match_type: MatchType,
    pub seed: u64,
    field_size: FieldSize,
    rng: ChaCha8Rng,
    pub tick: u32,
    phase: MatchPhase,
    possession: TeamSide,
    drive_yards: f32,
    home: SquadState,
    away: SquadState,
    sudden_death_from: u32,
    went_to_overtime: bool,
    pending_subs: Vec<(TeamSide, u32, u32)>,
    events: Vec<MatchEvent>,
}

/// Events emitted by one call to `tick`.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub tick: u32,
    pub events: Vec<MatchEvent>,
}

impl MatchSimulation {
    pub fn new(input: MatchInput) -> CoreResult<Self> {
        let home = Self::build_squad(&input, TeamSide::Home)?;
        let away = Self::build_squad(&input, TeamSide::Away)?;

        Ok(MatchSimulation {
            game_id: input.game_id,
            match_type: input.match_type,
            seed: input.seed,
            field_size: input.field_size,
            rng: ChaCha8Rng::seed_from_u64(input.seed),
            tick: 0,
            phase: MatchPhase::FirstHalf,
            possession: TeamSide::Home,
            drive_yards: 0.0,
            home,
            away,
            sudden_death_from: 0,
            went_to_overtime: false,
            pending_subs: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Instant mode: drive the identical state machine to completion.
    pub fn run_instant(input: MatchInput) -> CoreResult<SimulationResult> {
        let mut sim = MatchSimulation::new(input)?;
        while sim.tick().is_some() {}
        Ok(sim.result())
    }

    fn build_squad(input: &MatchInput, side: TeamSide) -> CoreResult<SquadState> {
        let sheet = match side {
            TeamSide::Home => &input.home,
            TeamSide::Away => &input.away,
        };

        if sheet.fieldable_count() < FIELD_PLAYERS {
            return Err(CoreError::InsufficientLineup {
                team_id: sheet.team_id,
                fieldable: sheet.fieldable_count(),
                needed: FIELD_PLAYERS,
            });
        }

        let mut players: Vec<FieldPlayer> = sheet
            .players
            .iter()
            .map(|p| FieldPlayer {
                id: p.id,
                name: p.name.clone(),
                role: p.role,
                race: p.race,
                attributes: p.attributes,
                stamina: p.starting_stamina as f32,
                injury: p.injury,
                knocked_down_until: 0,
                on_field: false,
                stats: PlayerMatchStats::default(),
            })
            .collect();

        Self::select_starting_six(&mut players);

        Ok(SquadState {
            team_id: sheet.team_id,
            tactical_focus: sheet.tactical_focus,
            camaraderie: sheet.camaraderie,
            intimidation_faced: match side {
                // Visitors play under the home crowd.
                TeamSide::Home => 0,
                TeamSide::Away => input.home.intimidation,
            },
            leader_rating: sheet.leader_rating,
            players,
            stats: TeamMatchStats::default(),
        })
    }

    /// Starting six: up to two per role by athleticism, best remaining fill.
    fn select_starting_six(players: &mut [FieldPlayer]) {
        let car = |p: &FieldPlayer| {
            (p.attributes.speed as u32
                + p.attributes.power as u32
                + p.attributes.agility as u32
                + p.attributes.throwing as u32
                + p.attributes.catching as u32
                + p.attributes.kicking as u32) as i32
        };

        let mut picked: Vec<usize> = Vec::with_capacity(FIELD_PLAYERS);

        for role in PlayerRole::ALL {
            let mut candidates: Vec<usize> = players
                .iter()
                .enumerate()
                .filter(|(_, p)| p.role == role && p.injury != InjuryStatus::Severe)
                .map(|(i, _)| i)
                .collect();
            candidates.sort_by_key(|&i| (-car(&players[i]), players[i].id));
            picked.extend(candidates.into_iter().take(2));
        }

        if picked.len() < FIELD_PLAYERS {
            let mut rest: Vec<usize> = players
                .iter()
                .enumerate()
                .filter(|(i, p)| !picked.contains(i) && p.injury != InjuryStatus::Severe)
                .map(|(i, _)| i)
                .collect();
            rest.sort_by_key(|&i| (-car(&players[i]), players[i].id));
            picked.extend(rest.into_iter().take(FIELD_PLAYERS - picked.len()));
        }

        for index in picked.into_iter().take(FIELD_PLAYERS) {
            players[index].on_field = true;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == MatchPhase::Completed
    }

    pub fn score(&self) -> (u8, u8) {
        (self.home.stats.score, self.away.stats.score)
    }

    pub fn possession(&self) -> TeamSide {
        self.possession
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn players(&self, side: TeamSide) -> &[FieldPlayer] {
        match side {
            TeamSide::Home => &self.home.players,
            TeamSide::Away => &self.away.players,
        }
    }

    /// Queue a manual substitution; applied at the next tick boundary.
    pub fn request_substitution(
        &mut self,
        side: TeamSide,
        player_out: u32,
        player_in: u32,
    ) -> CoreResult<()> {
        let squad = match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        };

        let out = squad
            .players
            .iter()
            .find(|p| p.id == player_out)
            .ok_or(CoreError::PlayerNotFound(player_out))?;
        let incoming = squad
            .players
            .iter()
            .find(|p| p.id == player_in)
            .ok_or(CoreError::PlayerNotFound(player_in))?;

        if !out.on_field {
            return Err(CoreError::InvalidOperation(format!(
                "player {} is not on the field",
                player_out
            )));
        }
        if incoming.on_field {
            return Err(CoreError::InvalidOperation(format!(
                "player {} is already on the field",
                player_in
            )));
        }
        if incoming.injury == InjuryStatus::Severe {
            return Err(CoreError::InvalidOperation(format!(
                "player {} is severely injured",
                player_in
            )));
        }

        self.pending_subs.push((side, player_out, player_in));
        Ok(())
    }

    /// Advance one simulated second. Returns None once the match completed.
    pub fn tick(&mut self) -> Option<TickOutput> {
        if self.phase == MatchPhase::Completed {
            return None;
        }

        let mut out = Vec::new();

        if self.tick == 0 {
            self.emit(&mut out, None, MatchEventKind::KickOff, vec![], None);
        }

        self.tick += 1;

        self.apply_pending_subs(&mut out);
        self.update_stamina();

        // One substitution check per tick; a triggered substitution is that
        // tick's primary event.
        let substituted = self.auto_substitute(TeamSide::Home, &mut out)
            || self.auto_substitute(TeamSide::Away, &mut out);

        if !substituted {
            self.run_action(&mut out);
        }

        self.accumulate_time();
        self.advance_phase(&mut out);

        Some(TickOutput {
            tick: self.tick,
            events: out,
        })
    }

    /// Assemble the final result. Valid at any point; complete after the
    /// terminal event has been emitted.
    pub fn result(&self) -> SimulationResult {
        let mut player_stats = Vec::new();
        for player in self.home.players.iter().chain(self.away.players.iter()) {
            player_stats.push((player.id, player.stats));
        }

        SimulationResult {
            game_id: self.game_id,
            home_team_id: self.home.team_id,
            away_team_id: self.away.team_id,
            home_score: self.home.stats.score,
            away_score: self.away.stats.score,
            went_to_overtime: self.went_to_overtime,
            events: self.events.clone(),
            home_stats: self.home.stats,
            away_stats: self.away.stats,
            player_stats,
        }
    }

    fn squad(&self, side: TeamSide) -> &SquadState {
        match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        }
    }

    fn squad_mut(&mut self, side: TeamSide) -> &mut SquadState {
        match side {
            TeamSide::Home => &mut self.home,
            TeamSide::Away => &mut self.away,
        }
    }

    fn apply_pending_subs(&mut self, out: &mut Vec<MatchEvent>) {
        let pending = std::mem::take(&mut self.pending_subs);

        for (side, player_out, player_in) in pending {
            let tick = self.tick;
            let squad = self.squad_mut(side);

            let out_ok = squad
                .players
                .iter()
                .find(|p| p.id == player_out)
                .map(|p| p.on_field)
                .unwrap_or(false);
            let in_ok = squad
                .players
                .iter()
                .find(|p| p.id == player_in)
                .map(|p| !p.on_field && p.injury != InjuryStatus::Severe)
                .unwrap_or(false);

            if !out_ok || !in_ok {
                continue;
            }

            for player in squad.players.iter_mut() {
                if player.id == player_out {
                    player.on_field = false;
                }
                if player.id == player_in {
                    player.on_field = true;
                    player.knocked_down_until = tick;
                }
            }

            self.emit(
                out,
                Some(side),
                MatchEventKind::Substitution {
                    player_out,
                    player_in,
                },
                vec![player_out, player_in],
                None,
            );
        }
    }

    /// Per-tick stamina decay plus race effects, in fixed home-then-away,
    /// index order so the draw sequence is reproducible.
    fn update_stamina(&mut self) {
        let field_factor = if self.field_size == FieldSize::Large {
            1.3
        } else {
            1.0
        };

        for side in [TeamSide::Home, TeamSide::Away] {
            let mut lumina_pulses = 0u32;

            {
                let squad = match side {
                    TeamSide::Home => &mut self.home,
                    TeamSide::Away => &mut self.away,
                };

                for player in squad.players.iter_mut() {
                    if !player.on_field {
                        continue;
                    }

                    player.stamina = (player.stamina - 0.022 * field_factor).max(0.0);

                    match player.race {
                        Race::Sylvan => {
                            if self.rng.gen_bool(0.10) {
                                player.stamina = (player.stamina + 2.0).min(100.0);
                            }
                        }
                        Race::Lumina => {
                            if self.rng.gen_bool(0.05) {
                                lumina_pulses += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }

            if lumina_pulses > 0 {
                let squad = match side {
                    TeamSide::Home => &mut self.home,
                    TeamSide::Away => &mut self.away,
                };
                for player in squad.players.iter_mut() {
                    if player.on_field {
                        player.stamina = (player.stamina + lumina_pulses as f32).min(100.0);
                    }
                }
            }
        }
    }

    /// Pull the first flagging field player for the next same-role bench
    /// player. With no eligible replacement the player stays on with
    /// penalties.
    fn auto_substitute(&mut self, side: TeamSide, out: &mut Vec<MatchEvent>) -> bool {
        let squad = self.squad(side);

        let flagged = squad.players.iter().find(|p| {
            p.on_field && (p.stamina < SUBSTITUTION_STAMINA || p.injury >= InjuryStatus::Moderate)
        });

        let Some(flagged) = flagged else {
            return false;
        };
        let out_id = flagged.id;
        let role = flagged.role;

        let replacement = squad
            .players
            .iter()
            .filter(|p| {
                !p.on_field
                    && p.role == role
                    && p.injury < InjuryStatus::Moderate
                    && p.stamina >= SUBSTITUTION_STAMINA
            })
            .max_by_key(|p| (p.stamina as u32, std::cmp::Reverse(p.id)))
            .map(|p| p.id);

        let Some(in_id) = replacement else {
            return false;
        };

        let tick = self.tick;
        let squad = self.squad_mut(side);
        for player in squad.players.iter_mut() {
            if player.id == out_id {
                player.on_field = false;
            }
            if player.id == in_id {
                player.on_field = true;
                player.knocked_down_until = tick;
            }
        }

        self.emit(
            out,
            Some(side),
            MatchEventKind::Substitution {
                player_out: out_id,
                player_in: in_id,
            },
            vec![out_id, in_id],
            None,
        );

        true
    }

    fn posture_for(&self, side: TeamSide) -> Posture {
        if self.phase != MatchPhase::SecondHalf {
            return Posture::Normal;
        }

        let diff = self.squad(side).stats.score as i16 - self.squad(side.other()).stats.score as i16;

        if diff <= -6 {
            Posture::Desperation
        } else if diff >= 6 {
            Posture::Conservative
        } else {
            Posture::Normal
        }
    }

    /// Clutch window: final five minutes of regulation in a tight game.
    fn clutch_multiplier(&self, side: TeamSide) -> f64 {
        let regulation = self.match_type.regulation_seconds();
        if self.tick + 300 < regulation || self.tick >= regulation {
            return 1.0;
        }

        let diff =
            (self.home.stats.score as i16 - self.away.stats.score as i16).abs();
        if diff > 2 {
            return 1.0;
        }

        let squad = self.squad(side);
        1.0 + clutch_factor(squad.camaraderie, squad.leader_rating)
    }

    fn run_action(&mut self, out: &mut Vec<MatchEvent>) {
        let attack = self.possession;
        let defense = attack.other();
        let tick = self.tick;

        let attack_squad = self.squad(attack);
        let sudden_death_boost = if self.phase == MatchPhase::SuddenDeath {
            ((tick - self.sudden_death_from) as f32 / 300.0).min(3.0)
        } else {
            0.0
        };

        let ctx = ActionContext {
            passers_on_field: attack_squad.role_count(PlayerRole::Passer, tick),
            runners_on_field: attack_squad.role_count(PlayerRole::Runner, tick),
            blockers_on_field: attack_squad.role_count(PlayerRole::Blocker, tick),
            tactical_focus: attack_squad.tactical_focus,
            field_size: self.field_size,
            posture: self.posture_for(attack),
            drive_yards: self.drive_yards,
            sudden_death_boost,
        };

        match select_action(&ctx, &mut self.rng) {
            ActionKind::Pass => self.resolve_pass(attack, out),
            ActionKind::Run => self.resolve_run(attack, out),
            ActionKind::Kick => self.resolve_kick(attack, out),
            ActionKind::Tackle => self.resolve_tackle(defense, out),
            ActionKind::Knockdown => self.resolve_knockdown(attack, out),
            ActionKind::Grind => {}
        }
    }

    /// Pick an active player by highest value of an attribute, ties by id.
    fn best_active(&self, side: TeamSide, kind: AttributeKind) -> Option<usize> {
        let squad = self.squad(side);
        squad
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active(self.tick))
            .max_by(|(_, a), (_, b)| {
                a.effective(kind)
                    .partial_cmp(&b.effective(kind))
                    .unwrap()
                    .then(b.id.cmp(&a.id))
            })
            .map(|(i, _)| i)
    }

    fn random_active(
        &mut self,
        side: TeamSide,
        prefer_role: Option<PlayerRole>,
        exclude: Option<u32>,
    ) -> Option<usize> {
        let tick = self.tick;
        let squad = self.squad(side);

        let preferred: Vec<usize> = match prefer_role {
            Some(role) => squad
                .players
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_active(tick) && p.role == role && Some(p.id) != exclude)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };

        let pool = if preferred.is_empty() {
            let mut active = squad.active_indexes(tick);
            active.retain(|&i| Some(squad.players[i].id) != exclude);
            active
        } else {
            preferred
        };

        if pool.is_empty() {
            return None;
        }

        Some(pool[self.rng.gen_range(0..pool.len())])
    }

    fn resolve_pass(&mut self, attack: TeamSide, out: &mut Vec<MatchEvent>) {
        let Some(passer_idx) = self.best_active(attack, AttributeKind::Throwing) else {
            return;
        };
        let passer_id_for_exclude = self.squad(attack).players[passer_idx].id;
        let Some(receiver_idx) = self.random_active(attack, None, Some(passer_id_for_exclude)) else {
            return;
        };

        let clutch = self.clutch_multiplier(attack);
        let squad = self.squad(attack);
        let passer = &squad.players[passer_idx];
        let receiver = &squad.players[receiver_idx];

        let p = pass_success(
            passer.effective(AttributeKind::Throwing),
            squad.camaraderie,
            squad.intimidation_faced,
            passer.stamina,
        ) * clutch;

        let passer_id = passer.id;
        let receiver_id = receiver.id;
        let receiver_agility = receiver.effective(AttributeKind::Agility);
        let receiver_race = receiver.race;
        let receiver_stamina = receiver.stamina;

        let success = self.rng.gen_bool(p.clamp(0.01, 0.99));

        if success {
            let yards = self.rng.gen_range(3.0..15.0) + receiver_agility / 10.0;

            {
                let squad = self.squad_mut(attack);
                let passer = &mut squad.players[passer_idx];
                passer.stats.passing_attempts += 1;
                passer.stats.passing_completions += 1;
                passer.stats.passing_yards += yards as i16;
                passer.stamina = (passer.stamina - 0.6).max(0.0);

                let receiver = &mut squad.players[receiver_idx];
                receiver.stats.catches += 1;
                receiver.stamina = (receiver.stamina - 0.6).max(0.0);

                squad.stats.total_yards += yards as i32;
            }

            self.gain_yards(attack, yards, vec![passer_id, receiver_id], out, || {
                MatchEventKind::Pass {
                    complete: true,
                    yards: yards as i16,
                }
            });
        } else {
            {
                let squad = self.squad_mut(attack);
                squad.players[passer_idx].stats.passing_attempts += 1;
                squad.players[passer_idx].stamina =
                    (squad.players[passer_idx].stamina - 0.6).max(0.0);
                squad.players[receiver_idx].stats.drops += 1;
            }

            // A quarter of failed passes are picked off.
            if self.rng.gen_bool(0.25) {
                self.turnover(attack, vec![passer_id], out);
            } else {
                self.emit(
                    out,
                    Some(attack),
                    MatchEventKind::Pass {
                        complete: false,
                        yards: 0,
                    },
                    vec![passer_id, receiver_id],
                    Some((receiver_race, receiver_stamina)),
                );
            }
        }
    }

    fn resolve_run(&mut self, attack: TeamSide, out: &mut Vec<MatchEvent>) {
        let Some(carrier_idx) = self.random_active(attack, Some(PlayerRole::Runner), None) else {
            return;
        };

        let clutch = self.clutch_multiplier(attack);
        let squad = self.squad(attack);
        let carrier = &squad.players[carrier_idx];

        let p = run_success(
            carrier.effective(AttributeKind::Speed),
            carrier.effective(AttributeKind::Agility),
            squad.camaraderie,
            carrier.stamina,
        ) * clutch;

        let carrier_id = carrier.id;
        let carrier_race = carrier.race;
        let carrier_stamina = carrier.stamina;
        let carrier_speed = carrier.effective(AttributeKind::Speed);

        // Umbra shadow-running slips tackles more often.
        let evasion = if carrier_race == Race::Umbra { 0.05 } else { 0.0 };
        let success = self.rng.gen_bool((p + evasion).clamp(0.01, 0.99));

        if success {
            let yards = self.rng.gen_range(2.0..10.0) + carrier_speed / 15.0;

            {
                let squad = self.squad_mut(attack);
                let carrier = &mut squad.players[carrier_idx];
                carrier.stats.carries += 1;
                carrier.stats.rushing_yards += yards as i16;
                carrier.stamina = (carrier.stamina - 0.8).max(0.0);
                squad.stats.total_yards += yards as i32;
            }

            self.gain_yards(attack, yards, vec![carrier_id], out, || MatchEventKind::Run {
                yards: yards as i16,
            });
        } else {
            {
                let squad = self.squad_mut(attack);
                let carrier = &mut squad.players[carrier_idx];
                carrier.stats.carries += 1;
                carrier.stamina = (carrier.stamina - 0.8).max(0.0);
            }

            // One failed run in ten pops the ball loose.
            if self.rng.gen_bool(0.10) {
                {
                    let squad = self.squad_mut(attack);
                    squad.players[carrier_idx].stats.fumbles += 1;
                }
                self.turnover(attack, vec![carrier_id], out);
            } else {
                let defense = attack.other();
                let tackler_idx = self.best_active(defense, AttributeKind::Power);
                let yards_lost = self.rng.gen_range(0.0..3.0);
                self.drive_yards = (self.drive_yards - yards_lost).max(0.0);

                let mut actors = vec![carrier_id];
                if let Some(tackler_idx) = tackler_idx {
                    let squad = self.squad_mut(defense);
                    squad.players[tackler_idx].stats.tackles += 1;
                    actors.push(squad.players[tackler_idx].id);
                }

                self.emit(
                    out,
                    Some(attack.other()),
                    MatchEventKind::Tackle {
                        yards_lost: yards_lost as i16,
                    },
                    actors,
                    Some((carrier_race, carrier_stamina)),
                );
            }
        }
    }

    fn resolve_kick(&mut self, attack: TeamSide, out: &mut Vec<MatchEvent>) {
        if self.drive_yards < KICK_RANGE_YARDS {
            return;
        }

        let Some(kicker_idx) = self.best_active(attack, AttributeKind::Kicking) else {
            return;
        };

        let clutch = self.clutch_multiplier(attack);
        let squad = self.squad(attack);
        let kicker = &squad.players[kicker_idx];

        let mut p = kick_success(
            kicker.effective(AttributeKind::Kicking),
            squad.camaraderie,
            squad.intimidation_faced,
            kicker.stamina,
        ) * clutch;

        // A small field punishes the long-range attempt.
        if self.field_size == FieldSize::Small {
            p *= 0.85;
        }

        let kicker_id = kicker.id;
        let kicker_race = kicker.race;
        let kicker_stamina = kicker.stamina;

        let success = self.rng.gen_bool(p.clamp(0.01, 0.99));

        {
            let squad = self.squad_mut(attack);
            squad.players[kicker_idx].stamina =
                (squad.players[kicker_idx].stamina - 0.5).max(0.0);
        }

        if success {
            self.score_for(attack, vec![kicker_id], out);
        } else {
            self.emit(
                out,
                Some(attack),
                MatchEventKind::Kick { good: false },
                vec![kicker_id],
                Some((kicker_race, kicker_stamina)),
            );
            self.change_possession(attack.other());
        }
    }

    fn resolve_tackle(&mut self, defense: TeamSide, out: &mut Vec<MatchEvent>) {
        let attack = defense.other();

        let Some(tackler_idx) = self.random_active(defense, Some(PlayerRole::Blocker), None) else {
            return;
        };
        let Some(victim_idx) = self.random_active(attack, None, None) else {
            return;
        };

        let yards_lost = self.rng.gen_range(0.0..4.0);
        self.drive_yards = (self.drive_yards - yards_lost).max(0.0);

        let tackler_power = {
            let squad = self.squad(defense);
            squad.players[tackler_idx].effective(AttributeKind::Power)
        };
        // A small field turns tackle contests into power contests.
        let power_bonus = if self.field_size == FieldSize::Small {
            2.0
        } else {
            0.0
        };

        let injury_chance = ((tackler_power + power_bonus) as f64 / 20.0 * 0.04).clamp(0.005, 0.10);
        let injured = self.rng.gen_bool(injury_chance);

        let (tackler_id, victim_id, victim_race, victim_stamina) = {
            let tackler_id = self.squad(defense).players[tackler_idx].id;
            let victim = &self.squad(attack).players[victim_idx];
            (tackler_id, victim.id, victim.race, victim.stamina)
        };

        {
            let squad = self.squad_mut(defense);
            squad.players[tackler_idx].stats.tackles += 1;
            squad.players[tackler_idx].stamina =
                (squad.players[tackler_idx].stamina - 0.5).max(0.0);
        }

        if injured {
            let severity = self.roll_injury_severity();
            {
                let squad = self.squad_mut(attack);
                let victim = &mut squad.players[victim_idx];
                if severity > victim.injury {
                    victim.injury = severity;
                }
            }

            self.emit(
                out,
                Some(defense),
                MatchEventKind::Injury { severity },
                vec![victim_id, tackler_id],
                Some((victim_race, victim_stamina)),
            );
        } else {
            self.emit(
                out,
                Some(defense),
                MatchEventKind::Tackle {
                    yards_lost: yards_lost as i16,
                },
                vec![victim_id, tackler_id],
                Some((victim_race, victim_stamina)),
            );
        }
    }

    fn resolve_knockdown(&mut self, attack: TeamSide, out: &mut Vec<MatchEvent>) {
        let defense = attack.other();

        let Some(blocker_idx) = self.random_active(attack, Some(PlayerRole::Blocker), None) else {
            return;
        };
        let Some(victim_idx) = self.random_active(defense, None, None) else {
            return;
        };

        let mut duration = KNOCKDOWN_SECONDS;

        let (victim_id, victim_race) = {
            let victim = &self.squad(defense).players[victim_idx];
            (victim.id, victim.race)
        };

        // Gryll shrug off knockdowns a third of the time.
        if victim_race == Race::Gryll && self.rng.gen_bool(0.30) {
            duration = duration.saturating_sub(5);
        }

        let injured = self.rng.gen_bool(0.04);

        let blocker_id = {
            let squad = self.squad_mut(attack);
            let blocker = &mut squad.players[blocker_idx];
            blocker.stats.knockdowns_inflicted += 1;
            blocker.stamina = (blocker.stamina - 0.7).max(0.0);
            squad.stats.knockdowns_inflicted += 1;
            blocker.id
        };

        let tick = self.tick;
        {
            let squad = self.squad_mut(defense);
            let victim = &mut squad.players[victim_idx];
            victim.knocked_down_until = tick + duration as u32;
            victim.stamina = (victim.stamina - 1.0).max(0.0);
        }

        if injured {
            let severity = self.roll_injury_severity();
            {
                let squad = self.squad_mut(defense);
                let victim = &mut squad.players[victim_idx];
                if severity > victim.injury {
                    victim.injury = severity;
                }
            }
            self.emit(
                out,
                Some(attack),
                MatchEventKind::Injury { severity },
                vec![victim_id, blocker_id],
                None,
            );
        } else {
            self.emit(
                out,
                Some(attack),
                MatchEventKind::Knockdown {
                    duration_s: duration,
                },
                vec![victim_id, blocker_id],
                None,
            );
        }
    }

    fn roll_injury_severity(&mut self) -> InjuryStatus {
        let roll: f64 = self.rng.r#gen();
        if roll < 0.70 {
            InjuryStatus::Minor
        } else if roll < 0.95 {
            InjuryStatus::Moderate
        } else {
            InjuryStatus::Severe
        }
    }

    /// Advance the drive; crossing the goal line converts the action into a
    /// score event.
    fn gain_yards<F>(
        &mut self,
        attack: TeamSide,
        yards: f32,
        actors: Vec<u32>,
        out: &mut Vec<MatchEvent>,
        action_event: F,
    ) where
        F: FnOnce() -> MatchEventKind,
    {
        self.drive_yards += yards;

        if self.drive_yards >= 100.0 {
            self.score_for(attack, actors, out);
        } else {
            let actor_ctx = actors
                .first()
                .and_then(|id| self.find_player(attack, *id))
                .map(|p| (p.race, p.stamina));
            self.emit(out, Some(attack), action_event(), actors, actor_ctx);
        }
    }

    fn find_player(&self, side: TeamSide, id: u32) -> Option<&FieldPlayer> {
        self.squad(side).players.iter().find(|p| p.id == id)
    }

    fn score_for(&mut self, side: TeamSide, actors: Vec<u32>, out: &mut Vec<MatchEvent>) {
        {
            let squad = self.squad_mut(side);
            squad.stats.score += 1;

            if let Some(scorer) = actors.last() {
                let scorer = *scorer;
                if let Some(player) = squad.players.iter_mut().find(|p| p.id == scorer) {
                    player.stats.scores += 1;
                }
            }
        }

        self.emit(out, Some(side), MatchEventKind::Score, actors, None);
        self.change_possession(side.other());

        // Sudden death ends on any score.
        if self.phase == MatchPhase::SuddenDeath {
            self.complete(out);
        }
    }

    fn turnover(&mut self, from: TeamSide, actors: Vec<u32>, out: &mut Vec<MatchEvent>) {
        {
            let squad = self.squad_mut(from);
            squad.stats.turnovers += 1;
        }

        self.emit(
            out,
            Some(from),
            MatchEventKind::LooseBall { turnover: true },
            actors,
            None,
        );
        self.change_possession(from.other());
    }

    fn change_possession(&mut self, to: TeamSide) {
        self.possession = to;
        self.drive_yards = 0.0;
    }

    fn accumulate_time(&mut self) {
        let possession = self.possession;
        self.squad_mut(possession).stats.possession_seconds += 1;

        for squad in [&mut self.home, &mut self.away] {
            for player in squad.players.iter_mut() {
                if player.on_field {
                    player.stats.seconds_played += 1;
                }
            }
        }
    }

    fn advance_phase(&mut self, out: &mut Vec<MatchEvent>) {
        let half = self.match_type.half_seconds();
        let regulation = self.match_type.regulation_seconds();

        if self.tick == half && self.phase == MatchPhase::FirstHalf {
            self.phase = MatchPhase::SecondHalf;
            self.change_possession(TeamSide::Away);
            self.halftime_recovery();
            self.emit(out, None, MatchEventKind::HalfTime, vec![], None);
            return;
        }

        if self.tick == regulation
            && matches!(self.phase, MatchPhase::FirstHalf | MatchPhase::SecondHalf)
        {
            let (home, away) = self.score();

            if home == away && self.match_type.has_overtime() {
                self.phase = MatchPhase::Overtime;
                self.went_to_overtime = true;
                self.change_possession(TeamSide::Home);
                self.emit(out, None, MatchEventKind::OvertimeStart, vec![], None);
            } else {
                self.complete(out);
            }
            return;
        }

        if self.phase == MatchPhase::Overtime && self.tick == regulation + OVERTIME_SECONDS {
            let (home, away) = self.score();

            if home == away {
                self.phase = MatchPhase::SuddenDeath;
                self.sudden_death_from = self.tick;
                self.change_possession(TeamSide::Away);
                self.emit(out, None, MatchEventKind::SuddenDeathStart, vec![], None);
            } else {
                self.complete(out);
            }
            return;
        }

        // Force-settle a sudden death that refuses to end.
        if self.phase == MatchPhase::SuddenDeath
            && self.tick >= self.sudden_death_from + SUDDEN_DEATH_CAP
        {
            let side = if self.away.stats.total_yards > self.home.stats.total_yards {
                TeamSide::Away
            } else {
                TeamSide::Home
            };
            self.score_for(side, vec![], out);
        }
    }

    fn halftime_recovery(&mut self) {
        for squad in [&mut self.home, &mut self.away] {
            for player in squad.players.iter_mut() {
                player.stamina = (player.stamina + 10.0).min(100.0);
            }
        }
    }

    fn complete(&mut self, out: &mut Vec<MatchEvent>) {
        if self.phase == MatchPhase::Completed {
            return;
        }

        self.phase = MatchPhase::Completed;
        let (home_score, away_score) = self.score();

        self.emit(
            out,
            None,
            MatchEventKind::MatchComplete {
                home_score,
                away_score,
            },
            vec![],
            None,
        );
    }

    /// Attach commentary and record the event in both the tick output and
    /// the match log.
    fn emit(
        &mut self,
        out: &mut Vec<MatchEvent>,
        side: Option<TeamSide>,
        kind: MatchEventKind,
        actors: Vec<u32>,
        actor_ctx: Option<(Race, f32)>,
    ) {
        let regulation = self.match_type.regulation_seconds();

        let ctx = CommentaryContext {
            actor_race: actor_ctx.map(|(race, _)| race),
            actor_stamina: actor_ctx.map(|(_, stamina)| stamina).unwrap_or(100.0),
            score_diff: self.home.stats.score as i16 - self.away.stats.score as i16,
            seconds_remaining: regulation.saturating_sub(self.tick),
            camaraderie: side.map(|s| self.squad(s).camaraderie).unwrap_or(50),
            home_crowd: side == Some(TeamSide::Home),
        };

        let commentary_id = select_commentary(&kind, &ctx, &mut self.rng);

        let event = MatchEvent {
            tick: self.tick,
            team_id: side.map(|s| self.squad(s).team_id),
            kind,
            actors,
            commentary_id,
        };

        self.events.push(event.clone());
        out.push(event);
    }
}
