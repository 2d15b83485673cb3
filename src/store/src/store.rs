use crate::locks::AdvisoryLocks;
use crate::tx::Tx;
use crate::world::World;
use chrono::NaiveDateTime;
use core::error::{CoreError, CoreResult};
use log::warn;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

const TX_MAX_RETRIES: u32 = 5;

/// The persistent store gateway: the only component that writes durable
/// state. Transactions run serialized against a staged copy of the world,
/// so a failed transaction rolls back by simply being dropped.
pub struct Store {
    world: Mutex<World>,
    pub locks: AdvisoryLocks,
}

impl Store {
    pub fn new(boot_nonce: u64) -> Self {
        Store {
            world: Mutex::new(World::new(boot_nonce)),
            locks: AdvisoryLocks::new(),
        }
    }

    /// Run `f` transactionally at `now`. Commit on Ok, roll back on Err;
    /// retryable conflicts are retried up to 5 times with bounded jitter.
    pub fn with_tx<T>(
        &self,
        now: NaiveDateTime,
        mut f: impl FnMut(&mut Tx) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut attempt = 0;

        loop {
            let outcome = {
                let mut world = self.world.lock().unwrap();
                let mut staged = world.clone();

                match f(&mut Tx::new(&mut staged, now)) {
                    Ok(value) => {
                        *world = staged;
                        Ok(value)
                    }
                    Err(error) => Err(error),
                }
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < TX_MAX_RETRIES => {
                    attempt += 1;
                    warn!("transaction conflict, retry {}: {}", attempt, error);

                    let jitter = rand::thread_rng().gen_range(2..20);
                    std::thread::sleep(Duration::from_millis(jitter));
                }
                Err(error) => {
                    if error.is_invariant_violation() {
                        log::error!("transaction aborted on invariant violation: {}", error);
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Read-only access to the committed world.
    pub fn read<T>(&self, f: impl FnOnce(&World) -> T) -> T {
        let world = self.world.lock().unwrap();
        f(&world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerKind;
    use chrono::NaiveDate;
    use core::club::{FieldSize, TacticalFocus, Team, TeamFinances, TeamRecord};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn test_team(name: &str) -> Team {
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

    #[test]
    fn failed_transactions_roll_back_completely() {
        let store = Store::new(1);

        let team_id = store
            .with_tx(now(), |tx| {
                Ok(tx.insert_team(test_team("Rollback FC"), TeamFinances::new(10_000, 0)))
            })
            .unwrap();

        // Credit then fail: neither the credit nor the ledger row may land.
        let result: CoreResult<()> = store.with_tx(now(), |tx| {
            tx.credit(team_id, 5_000, LedgerKind::Prize, "doomed")?;
            Err(CoreError::InvalidOperation(String::from("boom")))
        });
        assert!(result.is_err());

        store.read(|world| {
            assert_eq!(10_000, world.finances[&team_id].credits);
            assert_eq!(1, world.ledger.len());
        });
    }

    #[test]
    fn escrow_moves_are_atomic_and_audited() {
        let store = Store::new(1);

        let team_id = store
            .with_tx(now(), |tx| {
                Ok(tx.insert_team(test_team("Bidder"), TeamFinances::new(100_000, 0)))
            })
            .unwrap();

        store
            .with_tx(now(), |tx| {
                tx.reserve_bid(team_id, 60_000)?;
                tx.audit_team(team_id)
            })
            .unwrap();

        store.read(|world| {
            assert_eq!(40_000, world.finances[&team_id].credits);
            assert_eq!(60_000, world.finances[&team_id].escrow_credits);
        });

        store
            .with_tx(now(), |tx| {
                tx.release_bid(team_id, 60_000)?;
                tx.audit_team(team_id)
            })
            .unwrap();

        store.read(|world| {
            assert_eq!(100_000, world.finances[&team_id].credits);
            assert_eq!(0, world.finances[&team_id].escrow_credits);
        });
    }

    #[test]
    fn over_reserving_fails_without_state_change() {
        let store = Store::new(1);

        let team_id = store
            .with_tx(now(), |tx| {
                Ok(tx.insert_team(test_team("Poor"), TeamFinances::new(1_000, 0)))
            })
            .unwrap();

        let result = store.with_tx(now(), |tx| tx.reserve_bid(team_id, 5_000));
        assert!(matches!(
            result,
            Err(CoreError::InsufficientCredits { required: 5_000, available: 1_000 })
        ));

        store.read(|world| {
            assert_eq!(1_000, world.finances[&team_id].credits);
            assert_eq!(0, world.finances[&team_id].escrow_credits);
        });
    }

    #[test]
    fn stale_day_cas_is_rejected() {
        let store = Store::new(1);

        store
            .with_tx(now(), |tx| {
                tx.create_season(1, now());
                Ok(())
            })
            .unwrap();

        assert_eq!(2, store.with_tx(now(), |tx| tx.advance_season_day(1)).unwrap());

        let result = store.with_tx(now(), |tx| tx.advance_season_day(1));
        assert!(matches!(
            result,
            Err(CoreError::StaleDay { expected: 1, stored: 2 })
        ));
    }

    #[test]
    fn day_markers_are_idempotent_guards() {
        let store = Store::new(1);

        store
            .with_tx(now(), |tx| {
                assert!(!tx.step_done(1, 5, "daily_progression"));
                tx.mark_step_done(1, 5, "daily_progression");
                Ok(())
            })
            .unwrap();

        store
            .with_tx(now(), |tx| {
                assert!(tx.step_done(1, 5, "daily_progression"));
                assert!(!tx.step_done(1, 6, "daily_progression"));
                Ok(())
            })
            .unwrap();
    }
}
