//! Access to the shared, long-lived frequency store.
//!
//! The store itself is an external key-value service; this module defines the
//! operations the rest of the crate relies on, an in-memory implementation,
//! the optimistic-concurrency update loop and a bulk loader.
use smol_str::SmolStr;

use crate::types::StoreValue;

pub mod cas;
pub mod error;
pub mod loader;
pub mod memory;

pub use self::cas::{apply_delta, RetryPolicy};
pub use self::error::{LoadError, StoreError};
pub use self::loader::{load_frequency_file, LoadReport};
pub use self::memory::MemoryStore;
pub use crate::constants::LOAD_BATCH_SIZE;

/// A key observed by [`FrequencyStore::watch`].
///
/// Carries the value read at watch time and an opaque version used by
/// [`FrequencyStore::compare_and_set`] to detect concurrent writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub key: SmolStr,
    pub value: Option<StoreValue>,
    pub version: u64,
}

pub trait FrequencyStore: Send + Sync {
    /// Looks up many keys in a single round trip. The result is aligned
    /// with `keys`; absent keys yield `None`.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError>;

    /// Writes many keys in a single round trip.
    fn set_many(&self, entries: &[(&str, StoreValue)]) -> Result<(), StoreError>;

    /// Starts an optimistic update of `key`.
    fn watch(&self, key: &str) -> Result<Watch, StoreError>;

    /// Writes `value` if the watched key has not changed since `watch`.
    /// Returns `Ok(false)` on conflict, leaving the store untouched.
    fn compare_and_set(&self, watch: &Watch, value: StoreValue) -> Result<bool, StoreError>;

    /// Every key currently held.
    fn keys(&self) -> Result<Vec<SmolStr>, StoreError>;

    /// Asks the store to make previous writes durable.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        Ok(self.get_many(&[key])?.pop().flatten())
    }

    fn set(&self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }
}
