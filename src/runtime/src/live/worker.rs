use crate::snapshot::{build_match_input, seed_for_game};
use chrono::NaiveDateTime;
use core::config::CoreConfig;
use core::error::{CoreError, CoreResult};
use core::events::EventBus;
use core::r#match::{GameStatus, LiveMatchState, TeamSide};
use log::{info, warn};
use std::sync::Arc;
use store::Store;

/// Advisory-lock key owning a live match.
pub fn game_lock_key(game_id: u32) -> String {
    format!("game:{}", game_id)
}

/// Wall-clock stall thresholds.
pub const STALL_LOG_SECONDS: u64 = 5;
pub const STALL_RELEASE_SECONDS: u64 = 60;

/// Owns exactly one running match: drives the simulation at the tick
/// cadence, fans events out on the bus, checkpoints every 15 simulated
/// seconds, and persists the final result. Ownership is an advisory lock;
/// losing it halts the worker without further writes.
pub struct LiveMatchWorker {
    store: Arc<Store>,
    bus: Arc<EventBus>,
    config: CoreConfig,
    pub game_id: u32,
    owner_token: u64,
    state: LiveMatchState,
    finished: bool,
}

impl LiveMatchWorker {
    /// Start a SCHEDULED match: acquire ownership, derive the deterministic
    /// seed, validate the lineups, then flip the row to IN_PROGRESS.
    pub fn start(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        config: CoreConfig,
        now: NaiveDateTime,
        game_id: u32,
        owner_token: u64,
    ) -> CoreResult<Self> {
        let key = game_lock_key(game_id);
        if !store.locks.acquire(&key, owner_token) {
            return Err(CoreError::InvalidOperation(format!(
                "game {} is owned by another worker",
                game_id
            )));
        }

        let built = store.with_tx(now, |tx| {
            let game = tx.game(game_id)?.clone();
            if game.status != GameStatus::Scheduled {
                return Err(CoreError::InvalidOperation(format!(
                    "game {} is not SCHEDULED",
                    game_id
                )));
            }

            let seed = seed_for_game(tx, &game)?;
            Ok((build_match_input(tx, &game, seed)?, seed))
        });

        let (input, seed) = match built {
            Ok(built) => built,
            Err(error) => {
                store.locks.release(&key, owner_token);
                return Err(error);
            }
        };

        // Lineup validation happens before any durable write.
        let state = match LiveMatchState::new(input) {
            Ok(state) => state,
            Err(error) => {
                store.locks.release(&key, owner_token);
                return Err(error);
            }
        };

        if let Err(error) = store.with_tx(now, |tx| tx.mark_in_progress(game_id, seed)) {
            store.locks.release(&key, owner_token);
            return Err(error);
        }

        info!("live match {} started, seed {:#x}", game_id, seed);

        Ok(LiveMatchWorker {
            store,
            bus,
            config,
            game_id,
            owner_token,
            state,
            finished: false,
        })
    }

    /// Reattach to an IN_PROGRESS match after a crash: replay to the latest
    /// checkpoint silently, then continue.
    pub fn resume(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        config: CoreConfig,
        now: NaiveDateTime,
        game_id: u32,
        owner_token: u64,
    ) -> CoreResult<Self> {
        let key = game_lock_key(game_id);
        if !store.locks.acquire(&key, owner_token) {
            return Err(CoreError::InvalidOperation(format!(
                "game {} is owned by another worker",
                game_id
            )));
        }

        let built = store.with_tx(now, |tx| {
            let game = tx.game(game_id)?.clone();
            if game.status != GameStatus::InProgress {
                return Err(CoreError::InvalidOperation(format!(
                    "game {} is not IN_PROGRESS",
                    game_id
                )));
            }

            let seed = seed_for_game(tx, &game)?;
            let input = build_match_input(tx, &game, seed)?;
            Ok((input, tx.checkpoint(game_id).cloned()))
        });

        let (input, checkpoint) = match built {
            Ok(built) => built,
            Err(error) => {
                store.locks.release(&key, owner_token);
                return Err(error);
            }
        };

        let state = match checkpoint {
            Some(checkpoint) => LiveMatchState::restore(input, &checkpoint),
            None => LiveMatchState::new(input),
        };

        match state {
            Ok(state) => Ok(LiveMatchWorker {
                store,
                bus,
                config,
                game_id,
                owner_token,
                state,
                finished: false,
            }),
            Err(error) => {
                store.locks.release(&key, owner_token);
                Err(error)
            }
        }
    }

    /// Replay missed wall-clock silently (no broadcast) until the match
    /// reaches the expected position or terminates. Used after a late start
    /// or recovery.
    pub fn catch_up_to(&mut self, now: NaiveDateTime, target_tick: u32) -> CoreResult<()> {
        while self.state.sim.tick < target_tick && !self.state.is_complete() {
            if self.state.tick().is_none() {
                break;
            }

            if self.state.checkpoint_due(self.config.checkpoint_interval_s) {
                self.write_checkpoint(now)?;
            }
        }

        if self.state.is_complete() {
            self.finish(now)?;
        }

        Ok(())
    }

    /// One cadence step: advance a simulated second, broadcast its events,
    /// checkpoint on the interval, and finish the match when it completes.
    /// Returns false once the worker is done (or has lost its lock).
    pub fn tick_once(&mut self, now: NaiveDateTime) -> CoreResult<bool> {
        if self.finished {
            return Ok(false);
        }

        // A worker that lost its lock halts without writing anything.
        if !self
            .store
            .locks
            .is_held_by(&game_lock_key(self.game_id), self.owner_token)
        {
            warn!("worker for game {} lost its lock, halting", self.game_id);
            self.finished = true;
            return Ok(false);
        }

        let Some(output) = self.state.tick() else {
            self.finish(now)?;
            return Ok(false);
        };

        for event in &output.events {
            self.bus.publish(self.game_id, event);
        }

        if self.state.is_complete() {
            self.finish(now)?;
            return Ok(false);
        }

        if self.state.checkpoint_due(self.config.checkpoint_interval_s) {
            self.write_checkpoint(now)?;
        }

        Ok(true)
    }

    /// Administrative pause/resume; the tick loop idles while paused.
    pub fn pause(&mut self) {
        self.state.pause();
    }

    pub fn resume_ticking(&mut self) {
        self.state.resume();
    }

    pub fn substitute(&mut self, side: TeamSide, player_out: u32, player_in: u32) -> CoreResult<()> {
        self.state.substitute(side, player_out, player_in)
    }

    /// Stall escalation: log at 5 seconds; at 60, checkpoint and release
    /// the match for another worker.
    pub fn handle_stall(&mut self, now: NaiveDateTime, stalled_for_s: u64) -> CoreResult<()> {
        if stalled_for_s >= STALL_RELEASE_SECONDS {
            warn!(
                "match {} stalled {}s, checkpointing and releasing",
                self.game_id, stalled_for_s
            );
            self.write_checkpoint(now)?;
            self.store
                .locks
                .release(&game_lock_key(self.game_id), self.owner_token);
            self.finished = true;
        } else if stalled_for_s >= STALL_LOG_SECONDS {
            warn!("match {} stalled for {}s", self.game_id, stalled_for_s);
        }

        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn write_checkpoint(&mut self, now: NaiveDateTime) -> CoreResult<()> {
        let checkpoint = self.state.checkpoint(now);
        self.store.with_tx(now, |tx| {
            tx.save_checkpoint(checkpoint.clone());
            Ok(())
        })
    }

    /// Persist final statistics, release the broadcast channel and the
    /// ownership lock.
    fn finish(&mut self, now: NaiveDateTime) -> CoreResult<()> {
        if self.finished {
            return Ok(());
        }

        let result = self.state.sim.result();
        self.store.with_tx(now, |tx| tx.persist_match_result(&result))?;

        self.bus.close(self.game_id);
        self.store
            .locks
            .release(&game_lock_key(self.game_id), self.owner_token);
        self.finished = true;

        info!(
            "match {} complete: {} - {}",
            self.game_id, result.home_score, result.away_score
        );

        Ok(())
    }
}
