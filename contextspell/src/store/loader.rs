//! Bulk loading of frequency files into a store.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use smol_str::SmolStr;

use super::{FrequencyStore, LoadError};
use crate::frequency::file::Entries;
use crate::frequency::FrequencyError;
use crate::types::{Count, StoreValue};
use crate::util::saturating_signed;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Keys written to the store
    pub sent: usize,
    /// Keys skipped for being below the minimum count
    pub skipped: usize,
}

/// Streams a frequency file into `store`, `batch_size` keys per round trip.
///
/// Entries with a count below `min_count` are skipped. The store is flushed
/// once every batch has been written.
pub fn load_frequency_file(
    store: &dyn FrequencyStore,
    path: &Path,
    min_count: Count,
    batch_size: usize,
) -> Result<LoadReport, LoadError> {
    let file = File::open(path).map_err(FrequencyError::from)?;
    load_from_reader(store, BufReader::new(file), min_count, batch_size)
}

/// Like [`load_frequency_file`], reading from any buffered source.
pub fn load_from_reader<R: BufRead>(
    store: &dyn FrequencyStore,
    reader: R,
    min_count: Count,
    batch_size: usize,
) -> Result<LoadReport, LoadError> {
    let batch_size = batch_size.max(1);
    let (header, entries) = Entries::open(reader)?;
    log::debug!("Loading {} keys ({} total)", header.distinct, header.total);

    let mut report = LoadReport::default();
    let mut batch: Vec<(SmolStr, StoreValue)> = Vec::with_capacity(batch_size);

    for entry in entries {
        let (key, count) = entry?;
        if count < min_count {
            report.skipped += 1;
            continue;
        }

        batch.push((key, saturating_signed(count)));
        if batch.len() >= batch_size {
            send_batch(store, &batch)?;
            report.sent += batch_size;
            batch.clear();
            log::debug!("Saved {} keys", report.sent);
        }
    }

    report.sent += batch.len();
    send_batch(store, &batch)?;
    store.flush()?;

    log::debug!(
        "Successfully done ({} keys sent, {} skipped).",
        report.sent,
        report.skipped
    );
    Ok(report)
}

fn send_batch(
    store: &dyn FrequencyStore,
    batch: &[(SmolStr, StoreValue)],
) -> Result<(), LoadError> {
    if batch.is_empty() {
        return Ok(());
    }
    let entries = batch
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect::<Vec<_>>();
    store.set_many(&entries)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyTable;
    use crate::store::{MemoryStore, StoreError, Watch};
    use crate::types::NgramKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Batches {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    impl FrequencyStore for Batches {
        fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError> {
            self.inner.get_many(keys)
        }

        fn set_many(&self, entries: &[(&str, StoreValue)]) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.set_many(entries)
        }

        fn watch(&self, key: &str) -> Result<Watch, StoreError> {
            self.inner.watch(key)
        }

        fn compare_and_set(&self, watch: &Watch, value: StoreValue) -> Result<bool, StoreError> {
            self.inner.compare_and_set(watch, value)
        }

        fn keys(&self) -> Result<Vec<SmolStr>, StoreError> {
            self.inner.keys()
        }
    }

    #[test]
    fn round_trip_through_file() {
        let table = FrequencyTable::from_lines(
            NgramKind::Bigrams,
            ["over there over their over there", "the cat sat on the mat"],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("it.bigrams");
        table.save(&path).unwrap();

        let store = MemoryStore::new();
        let report = load_frequency_file(&store, &path, 0, 3).unwrap();
        assert_eq!(report.sent, table.len());
        assert_eq!(report.skipped, 0);

        for (key, count) in table.iter() {
            assert_eq!(store.get(key).unwrap(), Some(count as StoreValue), "{}", key);
        }
        assert_eq!(store.len(), table.len());
    }

    #[test]
    fn batches_and_minimum() {
        let data = b"5 15\na 5\nb 4\nc 3\nd 2\ne 1\n";
        let store = Batches {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
        };
        let report = load_from_reader(&store, &data[..], 2, 2).unwrap();
        assert_eq!(
            report,
            LoadReport {
                sent: 4,
                skipped: 1
            }
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.get("e").unwrap(), None);
        assert_eq!(store.get("d").unwrap(), Some(2));
    }

    #[test]
    fn oversized_counts_saturate() {
        let data = b"2 18446744073709551615\nhuge 18446744073709551614\nsmall 1\n";
        let store = MemoryStore::new();
        load_from_reader(&store, &data[..], 0, 10).unwrap();
        assert_eq!(store.get("huge").unwrap(), Some(StoreValue::MAX));
        assert_eq!(store.get("small").unwrap(), Some(1));
    }
}
