//! Optimistic-concurrency updates of single keys.
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{FrequencyStore, StoreError};
use crate::types::{Delta, StoreValue};

/// Bounds the compare-and-swap loop: at most `max_attempts` tries, sleeping
/// between conflicts with a backoff that doubles from `initial_backoff` up
/// to `max_backoff`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "crate::util::millis")]
    pub initial_backoff: Duration,
    #[serde(with = "crate::util::millis")]
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub const fn default() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 64,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(250),
        }
    }

    /// Pause after the `attempt`-th conflict (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Adds `delta` to the value of `key`, treating an absent key as zero.
///
/// Watches the key, computes the new value and writes it only if nobody else
/// wrote in between, retrying on conflict as allowed by `policy`. Returns the
/// value written.
pub fn apply_delta(
    store: &dyn FrequencyStore,
    key: &str,
    delta: Delta,
    policy: &RetryPolicy,
) -> Result<StoreValue, StoreError> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let watch = store.watch(key)?;
        let next = watch.value.unwrap_or(0) + delta;

        if store.compare_and_set(&watch, next)? {
            return Ok(next);
        }

        log::trace!("conflict on {:?} (attempt {})", key, attempt);
        if attempt < max_attempts {
            thread::sleep(policy.backoff(attempt));
        }
    }

    log::error!("giving up on {:?} after {} attempts", key, max_attempts);
    Err(StoreError::RetriesExhausted {
        key: SmolStr::new(key),
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Watch};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Barrier};

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 10_000,
            initial_backoff: Duration::from_micros(10),
            max_backoff: Duration::from_micros(200),
        }
    }

    #[test]
    fn absent_key_starts_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(apply_delta(&store, "new", 4, &quick()).unwrap(), 4);
        assert_eq!(apply_delta(&store, "new", -1, &quick()).unwrap(), 3);
        assert_eq!(store.get("new").unwrap(), Some(3));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1));
        assert_eq!(policy.backoff(2), Duration::from_millis(2));
        assert_eq!(policy.backoff(4), Duration::from_millis(8));
        assert_eq!(policy.backoff(9), Duration::from_millis(250));
        assert_eq!(policy.backoff(40), Duration::from_millis(250));
    }

    #[test]
    fn concurrent_deltas_sum_up() {
        for _ in 0..20 {
            let store = Arc::new(MemoryStore::new());
            let barrier = Arc::new(Barrier::new(2));

            let handles = [7i64, -3i64]
                .iter()
                .map(|&delta| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        apply_delta(store.as_ref(), "shared", delta, &quick()).unwrap();
                    })
                })
                .collect::<Vec<_>>();

            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(store.get("shared").unwrap(), Some(4));
        }
    }

    #[test]
    fn many_writers_many_deltas() {
        let store = Arc::new(MemoryStore::new());
        let handles = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        apply_delta(store.as_ref(), "hot", 1, &quick()).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("hot").unwrap(), Some(1600));
    }

    /// Lets another writer sneak in between the first watch and its write.
    struct Interleaved {
        inner: MemoryStore,
        interfere: AtomicU32,
    }

    impl FrequencyStore for Interleaved {
        fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError> {
            self.inner.get_many(keys)
        }

        fn set_many(&self, entries: &[(&str, StoreValue)]) -> Result<(), StoreError> {
            self.inner.set_many(entries)
        }

        fn watch(&self, key: &str) -> Result<Watch, StoreError> {
            let watch = self.inner.watch(key)?;
            if self.interfere.load(Ordering::SeqCst) > 0 {
                self.interfere.fetch_sub(1, Ordering::SeqCst);
                // a concurrent updater applies +10 after our read
                apply_delta(&self.inner, key, 10, &quick())?;
            }
            Ok(watch)
        }

        fn compare_and_set(&self, watch: &Watch, value: StoreValue) -> Result<bool, StoreError> {
            self.inner.compare_and_set(watch, value)
        }

        fn keys(&self) -> Result<Vec<SmolStr>, StoreError> {
            self.inner.keys()
        }
    }

    #[test]
    fn conflicting_write_is_retried() {
        let store = Interleaved {
            inner: MemoryStore::new(),
            interfere: AtomicU32::new(1),
        };
        assert_eq!(apply_delta(&store, "k", 5, &quick()).unwrap(), 15);
        assert_eq!(store.get("k").unwrap(), Some(15));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let store = Interleaved {
            inner: MemoryStore::new(),
            interfere: AtomicU32::new(u32::MAX),
        };
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_micros(1),
            max_backoff: Duration::from_micros(1),
        };
        match apply_delta(&store, "k", 5, &policy) {
            Err(StoreError::RetriesExhausted { key, attempts }) => {
                assert_eq!(key.as_str(), "k");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        // only the interfering writes landed
        assert_eq!(store.get("k").unwrap(), Some(30));
    }
}
