//! Keyed mutual exclusion for read-compute-write sequences.
//!
//! Monthly recalculation and quarterly settlement read a set of invoices,
//! compute, then write several documents back. `KeyedLocks` serializes those
//! sequences per key (a depot-month, or a depot) inside this process.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

/// Table of per-key mutexes, created on demand and dropped when unused.
#[derive(Debug)]
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    slots: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the locks of every key in `keys`.
    ///
    /// Keys are deduplicated and acquired in ascending order, so two callers
    /// locking overlapping key sets cannot deadlock each other.
    pub fn with_locked<I, F, R>(&self, keys: I, f: F) -> R
    where
        I: IntoIterator<Item = K>,
        F: FnOnce() -> R,
    {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let slots: Vec<Arc<Mutex<()>>> = keys
            .iter()
            .map(|key| self.slots.entry(key.clone()).or_default().value().clone())
            .collect();

        let result = {
            // The mutexes guard no data, so a panic in another holder leaves
            // nothing inconsistent behind.
            let _guards: Vec<MutexGuard<'_, ()>> = slots
                .iter()
                .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner))
                .collect();
            f()
        };

        drop(slots);
        for key in &keys {
            self.slots.remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
        }
        result
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_key_runs_one_at_a_time() {
        let locks: Arc<KeyedLocks<u32>> = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    locks.with_locked([7], || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_keys(), 0);
    }

    #[test]
    fn overlapping_key_sets_do_not_deadlock() {
        let locks: Arc<KeyedLocks<u32>> = Arc::new(KeyedLocks::new());
        let a = {
            let locks = locks.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    locks.with_locked([1, 2], || ());
                }
            })
        };
        let b = {
            let locks = locks.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    locks.with_locked([2, 1, 2], || ());
                }
            })
        };
        a.join().unwrap();
        b.join().unwrap();
        assert_eq!(locks.active_keys(), 0);
    }

    #[test]
    fn returns_the_closure_result() {
        let locks: KeyedLocks<&'static str> = KeyedLocks::new();
        assert_eq!(locks.with_locked(["depot"], || 42), 42);
    }
}
