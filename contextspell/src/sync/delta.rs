//! Signed differences between two frequency tables.
use hashbrown::HashMap;
use smol_str::SmolStr;

use crate::frequency::FrequencyTable;
use crate::store::{apply_delta, FrequencyStore, RetryPolicy, StoreError};
use crate::types::Delta;
use crate::util::saturating_signed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    pub key: SmolStr,
    pub delta: Delta,
}

/// Per-key deltas with zeros already dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaSet {
    deltas: HashMap<SmolStr, Delta>,
}

impl DeltaSet {
    pub fn new() -> DeltaSet {
        DeltaSet::default()
    }

    /// `new - old` for every key of either table.
    pub fn between(old: &FrequencyTable, new: &FrequencyTable) -> DeltaSet {
        let mut set = DeltaSet::new();
        set.add_table(new, 1);
        set.add_table(old, -1);
        set
    }

    fn add_table(&mut self, table: &FrequencyTable, sign: Delta) {
        for (key, count) in table.iter() {
            self.add(key, sign * saturating_signed(count));
        }
    }

    pub fn add(&mut self, key: &str, delta: Delta) {
        if delta == 0 {
            return;
        }
        let entry = self.deltas.entry(SmolStr::new(key)).or_insert(0);
        *entry += delta;
        if *entry == 0 {
            self.deltas.remove(key);
        }
    }

    pub fn merge(&mut self, other: DeltaSet) {
        for (key, delta) in other.deltas {
            self.add(&key, delta);
        }
    }

    pub fn get(&self, key: &str) -> Delta {
        self.deltas.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Records sorted by key.
    pub fn records(&self) -> Vec<DeltaRecord> {
        let mut records = self
            .deltas
            .iter()
            .map(|(key, delta)| DeltaRecord {
                key: key.clone(),
                delta: *delta,
            })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// Adds every delta to `store` through the compare-and-swap loop.
    ///
    /// Stops at the first key that cannot be updated and takes back the
    /// deltas already added, so a failed apply leaves the store as it was and
    /// can be repeated as a whole.
    pub fn apply(&self, store: &dyn FrequencyStore, policy: &RetryPolicy) -> Result<usize, StoreError> {
        let records = self.records();
        for (done, record) in records.iter().enumerate() {
            if let Err(e) = apply_delta(store, &record.key, record.delta, policy) {
                log::warn!("Update of {:?} failed, reverting {} keys", record.key, done);
                // the original failure is the one worth reporting
                let _ = revert_records(store, &records[..done], policy);
                return Err(e);
            }
        }
        Ok(records.len())
    }

    /// Subtracts every delta from `store`, undoing a successful [`apply`](Self::apply).
    pub fn revert(&self, store: &dyn FrequencyStore, policy: &RetryPolicy) -> Result<(), StoreError> {
        revert_records(store, &self.records(), policy)
    }
}

/// Negates `records` newest first. Keeps going past failures and returns the
/// first one.
fn revert_records(
    store: &dyn FrequencyStore,
    records: &[DeltaRecord],
    policy: &RetryPolicy,
) -> Result<(), StoreError> {
    let mut first_error = None;
    for record in records.iter().rev() {
        if let Err(e) = apply_delta(store, &record.key, -record.delta, policy) {
            log::error!("Cannot revert {:+} on {:?}: {}", record.delta, record.key, e);
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
