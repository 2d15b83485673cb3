use crate::error::{CoreError, CoreResult};
use crate::r#match::engine::{MatchInput, MatchSimulation, TeamSide, TickOutput};
use crate::r#match::live::checkpoint::{CheckpointPlayer, MatchCheckpoint};
use chrono::NaiveDateTime;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    InProgress,
    Paused,
    Completed,
}

/// The authoritative in-memory state of one running match. Owned by exactly
/// one live worker; everything else observes through the event bus.
pub struct LiveMatchState {
    pub game_id: u32,
    pub status: LiveStatus,
    pub sim: MatchSimulation,
    pub last_checkpoint_tick: u32,
}

impl LiveMatchState {
    pub fn new(input: MatchInput) -> CoreResult<Self> {
        let game_id = input.game_id;
        let sim = MatchSimulation::new(input)?;

        Ok(LiveMatchState {
            game_id,
            status: LiveStatus::InProgress,
            sim,
            last_checkpoint_tick: 0,
        })
    }

    /// Advance one simulated second. Paused matches idle: the call is a
    /// no-op returning an empty output, so the tick loop stays idempotent
    /// under pause.
    pub fn tick(&mut self) -> Option<TickOutput> {
        match self.status {
            LiveStatus::Completed => None,
            LiveStatus::Paused => Some(TickOutput {
                tick: self.sim.tick,
                events: Vec::new(),
            }),
            LiveStatus::InProgress => {
                let output = self.sim.tick();

                if output.is_none() || self.sim.is_complete() {
                    self.status = LiveStatus::Completed;
                }

                output
            }
        }
    }

    pub fn pause(&mut self) {
        if self.status == LiveStatus::InProgress {
            self.status = LiveStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == LiveStatus::Paused {
            self.status = LiveStatus::InProgress;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == LiveStatus::Completed
    }

    /// Manual substitution; validated by the engine and applied at the next
    /// tick boundary.
    pub fn substitute(&mut self, side: TeamSide, player_out: u32, player_in: u32) -> CoreResult<()> {
        self.sim.request_substitution(side, player_out, player_in)
    }

    /// True every time the simulation crosses the checkpoint interval.
    pub fn checkpoint_due(&self, interval_s: u32) -> bool {
        self.sim.tick >= self.last_checkpoint_tick + interval_s
    }

    pub fn checkpoint(&mut self, written_at: NaiveDateTime) -> MatchCheckpoint {
        self.last_checkpoint_tick = self.sim.tick;

        let (home_score, away_score) = self.sim.score();

        let mut players = Vec::new();
        for side in [TeamSide::Home, TeamSide::Away] {
            for player in self.sim.players(side) {
                players.push(CheckpointPlayer {
                    id: player.id,
                    stamina: player.stamina,
                    on_field: player.on_field,
                    injury: player.injury,
                });
            }
        }

        MatchCheckpoint {
            game_id: self.game_id,
            tick: self.sim.tick,
            seed: self.sim.seed,
            possession: self.sim.possession(),
            home_score,
            away_score,
            players,
            written_at,
        }
    }

    /// Rebuild a live match from its latest checkpoint by replaying the
    /// deterministic simulation to the checkpoint tick without broadcasting.
    pub fn restore(input: MatchInput, checkpoint: &MatchCheckpoint) -> CoreResult<Self> {
        if input.seed != checkpoint.seed {
            return Err(CoreError::Invariant(format!(
                "checkpoint seed {:#x} does not match input seed {:#x} for game {}",
                checkpoint.seed, input.seed, checkpoint.game_id
            )));
        }

        let mut state = LiveMatchState::new(input)?;

        while state.sim.tick < checkpoint.tick {
            if state.sim.tick().is_none() {
                break;
            }
        }

        let (home_score, away_score) = state.sim.score();
        if (home_score, away_score) != (checkpoint.home_score, checkpoint.away_score) {
            return Err(CoreError::Invariant(format!(
                "replayed score {}:{} diverges from checkpoint {}:{} for game {}",
                home_score,
                away_score,
                checkpoint.home_score,
                checkpoint.away_score,
                checkpoint.game_id
            )));
        }

        state.last_checkpoint_tick = checkpoint.tick;

        if state.sim.is_complete() {
            state.status = LiveStatus::Completed;
        }

        info!(
            "checkpoint restored: game {} at tick {}",
            checkpoint.game_id, checkpoint.tick
        );

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#match::engine::sim::tests::sample_input;
    use crate::r#match::game::MatchType;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    #[test]
    fn pause_freezes_the_clock() {
        let mut state = LiveMatchState::new(sample_input(MatchType::League, 4)).unwrap();

        state.tick();
        let tick_before = state.sim.tick;

        state.pause();
        for _ in 0..10 {
            state.tick();
        }
        assert_eq!(tick_before, state.sim.tick);

        state.resume();
        state.tick();
        assert_eq!(tick_before + 1, state.sim.tick);
    }

    #[test]
    fn checkpoint_restore_replays_to_identical_stream() {
        // Reference stream: run to completion in one go.
        let mut reference = LiveMatchState::new(sample_input(MatchType::League, 0x7f3a)).unwrap();
        let mut reference_events = Vec::new();
        while let Some(output) = reference.tick() {
            reference_events.extend(output.events);
        }

        // Crash run: tick to 600, checkpoint, drop the state.
        let mut crashed = LiveMatchState::new(sample_input(MatchType::League, 0x7f3a)).unwrap();
        let mut pre_crash = Vec::new();
        for _ in 0..600 {
            if let Some(output) = crashed.tick() {
                pre_crash.extend(output.events);
            }
        }
        let checkpoint = crashed.checkpoint(now());
        drop(crashed);

        // Resume from the checkpoint and finish.
        let mut resumed =
            LiveMatchState::restore(sample_input(MatchType::League, 0x7f3a), &checkpoint).unwrap();
        let mut post_crash = Vec::new();
        while let Some(output) = resumed.tick() {
            post_crash.extend(output.events);
        }

        let mut union = pre_crash;
        union.extend(post_crash);

        assert_eq!(reference_events, union);
        assert_eq!(reference.sim.score(), resumed.sim.score());
    }

    #[test]
    fn restore_rejects_mismatched_seed() {
        let mut state = LiveMatchState::new(sample_input(MatchType::League, 10)).unwrap();
        for _ in 0..30 {
            state.tick();
        }
        let checkpoint = state.checkpoint(now());

        let result = LiveMatchState::restore(sample_input(MatchType::League, 11), &checkpoint);
        assert!(matches!(result, Err(CoreError::Invariant(_))));
    }

    #[test]
    fn checkpoint_due_follows_interval() {
        let mut state = LiveMatchState::new(sample_input(MatchType::League, 10)).unwrap();

        for _ in 0..14 {
            state.tick();
        }
        assert!(!state.checkpoint_due(15));

        state.tick();
        assert!(state.checkpoint_due(15));

        state.checkpoint(now());
        assert!(!state.checkpoint_due(15));
    }
}
