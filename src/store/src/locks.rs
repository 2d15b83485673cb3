use std::collections::HashMap;
use std::sync::Mutex;

/// In-process advisory locks, keyed by string, owned by caller-chosen
/// tokens. The automation leader and every live match worker hold one;
/// an owner that loses its lock must stop writing immediately.
#[derive(Debug, Default)]
pub struct AdvisoryLocks {
    held: Mutex<HashMap<String, u64>>,
}

impl AdvisoryLocks {
    pub fn new() -> Self {
        AdvisoryLocks::default()
    }

    /// Acquire the lock or confirm re-entrant ownership. Returns false when
    /// another owner holds it.
    pub fn acquire(&self, key: &str, owner: u64) -> bool {
        let mut held = self.held.lock().unwrap();

        match held.get(key) {
            Some(current) => *current == owner,
            None => {
                held.insert(key.to_string(), owner);
                true
            }
        }
    }

    /// Release only succeeds for the current owner.
    pub fn release(&self, key: &str, owner: u64) -> bool {
        let mut held = self.held.lock().unwrap();

        if held.get(key) == Some(&owner) {
            held.remove(key);
            true
        } else {
            false
        }
    }

    pub fn holder(&self, key: &str) -> Option<u64> {
        self.held.lock().unwrap().get(key).copied()
    }

    pub fn is_held_by(&self, key: &str, owner: u64) -> bool {
        self.holder(key) == Some(owner)
    }

    /// Forcibly reassign a lock, used when a stalled worker is evicted.
    pub fn steal(&self, key: &str, new_owner: u64) {
        let mut held = self.held.lock().unwrap();
        held.insert(key.to_string(), new_owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_owner_is_refused() {
        let locks = AdvisoryLocks::new();

        assert!(locks.acquire("leader", 1));
        assert!(!locks.acquire("leader", 2));
        assert!(locks.acquire("leader", 1));
    }

    #[test]
    fn release_requires_ownership() {
        let locks = AdvisoryLocks::new();
        locks.acquire("game:5", 1);

        assert!(!locks.release("game:5", 2));
        assert!(locks.release("game:5", 1));
        assert!(locks.acquire("game:5", 2));
    }

    #[test]
    fn steal_reassigns() {
        let locks = AdvisoryLocks::new();
        locks.acquire("game:5", 1);

        locks.steal("game:5", 9);
        assert!(!locks.is_held_by("game:5", 1));
        assert!(locks.is_held_by("game:5", 9));
    }
}
