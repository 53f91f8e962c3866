//! Thread-safe sharing of a machine between one builder and many matchers.
//!
//! Construction is single-threaded by design, but a built machine is
//! immutable through the matching API. `SharedStateMachine` pairs a mutex-
//! guarded builder with an `ArcSwap` snapshot: writers mutate under the lock
//! and publish a fresh snapshot, readers load wait-free and match against a
//! consistent machine for as long as they hold the `Arc`.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::machine::{Payload, StateMachine, Symbol};

pub struct SharedStateMachine<V: Payload, S: Symbol = u8> {
    snapshot: ArcSwap<StateMachine<V, S>>,
    builder: Mutex<StateMachine<V, S>>,
}

impl<V: Payload, S: Symbol> SharedStateMachine<V, S> {
    pub fn new(machine: StateMachine<V, S>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(machine.clone()),
            builder: Mutex::new(machine),
        }
    }

    /// The current published machine. The returned `Arc` stays valid (and
    /// unchanged) across concurrent updates.
    pub fn load(&self) -> Arc<StateMachine<V, S>> {
        self.snapshot.load_full()
    }

    /// Mutate the builder under the lock and publish the result.
    ///
    /// Readers never observe a half-applied update; they keep matching
    /// against the previous snapshot until the new one is stored.
    pub fn update<F, R>(&self, build: F) -> R
    where
        F: FnOnce(&mut StateMachine<V, S>) -> R,
    {
        let mut guard = self.builder.lock();
        let out = build(&mut guard);
        self.snapshot.store(Arc::new(guard.clone()));
        out
    }
}

impl<V: Payload, S: Symbol> Default for SharedStateMachine<V, S> {
    fn default() -> Self {
        Self::new(StateMachine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_publishes_and_readers_keep_old_snapshots() {
        let shared: SharedStateMachine<u32> = SharedStateMachine::default();
        let before = shared.load();

        shared
            .update(|m| {
                m.match_sequence(b"hit").commit(1)?;
                m.optimize();
                Ok::<(), crate::TablewalkError>(())
            })
            .unwrap();

        let after = shared.load();
        assert_eq!(after.full_match(b"hit"), Some(&1));
        // The old snapshot is unchanged.
        assert_eq!(before.full_match(b"hit"), None);
    }

    #[test]
    fn test_concurrent_matching() {
        let shared: SharedStateMachine<u32> = SharedStateMachine::default();
        shared
            .update(|m| {
                m.match_sequence(b"alpha").commit(1)?;
                m.match_sequence(b"beta").commit(2)?;
                m.optimize();
                Ok::<(), crate::TablewalkError>(())
            })
            .unwrap();

        let shared = Arc::new(shared);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let shared = Arc::clone(&shared);
            handles.push(std::thread::spawn(move || {
                let m = shared.load();
                assert_eq!(m.full_match(b"alpha"), Some(&1));
                assert_eq!(m.full_match(b"beta"), Some(&2));
                assert_eq!(m.full_match(b"gamma"), None);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
