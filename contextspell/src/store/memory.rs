use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use parking_lot::RwLock;
use smol_str::SmolStr;

use super::{FrequencyStore, StoreError, Watch};
use crate::frequency::{FrequencyError, FrequencyTable};
use crate::types::{Count, StoreValue};
use crate::util::saturating_signed;

#[derive(Debug, Clone, Copy)]
struct Slot {
    value: StoreValue,
    version: u64,
}

/// In-process frequency store.
///
/// Every write bumps the key's version; absent keys are at version 0, so a
/// watch on a missing key conflicts with anyone creating it first. When built
/// with [`MemoryStore::with_snapshot`], [`FrequencyStore::flush`] rewrites the
/// backing frequency file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<SmolStr, Slot>>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn from_table(table: &FrequencyTable) -> MemoryStore {
        let store = MemoryStore::new();
        {
            let mut slots = store.slots.write();
            slots.reserve(table.len());
            for (key, count) in table.iter() {
                slots.insert(
                    SmolStr::new(key),
                    Slot {
                        value: saturating_signed(count),
                        version: 1,
                    },
                );
            }
        }
        store
    }

    /// Opens a store backed by a frequency file, starting empty if the file
    /// does not exist yet.
    pub fn with_snapshot(path: &Path) -> Result<MemoryStore, FrequencyError> {
        let mut store = if path.exists() {
            MemoryStore::from_table(&FrequencyTable::load(path)?)
        } else {
            log::warn!("{} not found, starting from an empty store", path.display());
            MemoryStore::new()
        };
        store.snapshot = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Current contents as a frequency table. Keys whose value dropped to
    /// zero or below are left out.
    pub fn to_table(&self) -> FrequencyTable {
        self.slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.value > 0)
            .map(|(key, slot)| (key.as_str(), slot.value as Count))
            .collect()
    }

    fn write_slot(slots: &mut HashMap<SmolStr, Slot>, key: &str, value: StoreValue) {
        match slots.get_mut(key) {
            Some(slot) => {
                slot.value = value;
                slot.version += 1;
            }
            None => {
                slots.insert(SmolStr::new(key), Slot { value, version: 1 });
            }
        }
    }
}

impl FrequencyStore for MemoryStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError> {
        let slots = self.slots.read();
        Ok(keys
            .iter()
            .map(|key| slots.get(*key).map(|slot| slot.value))
            .collect())
    }

    fn set_many(&self, entries: &[(&str, StoreValue)]) -> Result<(), StoreError> {
        let mut slots = self.slots.write();
        for (key, value) in entries {
            MemoryStore::write_slot(&mut slots, key, *value);
        }
        Ok(())
    }

    fn watch(&self, key: &str) -> Result<Watch, StoreError> {
        let slots = self.slots.read();
        let slot = slots.get(key);
        Ok(Watch {
            key: SmolStr::new(key),
            value: slot.map(|s| s.value),
            version: slot.map(|s| s.version).unwrap_or(0),
        })
    }

    fn compare_and_set(&self, watch: &Watch, value: StoreValue) -> Result<bool, StoreError> {
        let mut slots = self.slots.write();
        let current = slots.get(watch.key.as_str()).map(|s| s.version).unwrap_or(0);
        if current != watch.version {
            return Ok(false);
        }
        MemoryStore::write_slot(&mut slots, &watch.key, value);
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<SmolStr>, StoreError> {
        Ok(self.slots.read().keys().cloned().collect())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let path = match &self.snapshot {
            Some(path) => path,
            None => return Ok(()),
        };

        self.to_table().save(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot write snapshot {}: {}", path.display(), e))
        })?;
        log::debug!("Saved {} keys to {}", self.len(), path.display());
        Ok(())
    }
}
