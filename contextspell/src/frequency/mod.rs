//! Unigram and bigram frequency tables.
//!
//! A [`FrequencyTable`] maps keys (a token, or two tokens joined by a single
//! space) to occurrence counts. Tables are built by the parallel
//! [`Aggregator`] and persisted in a plain text format, see [`file`].
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::tokenizer::Tokenize;
use crate::types::{Count, NgramKind};

pub mod aggregator;
pub mod error;
pub mod file;

pub use self::aggregator::{Aggregator, AggregatorConfig};
pub use self::error::FrequencyError;
pub use self::file::FrequencyHeader;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    counts: HashMap<SmolStr, Count>,
}

impl FrequencyTable {
    pub fn new() -> FrequencyTable {
        FrequencyTable::default()
    }

    /// Counts every line on the calling thread.
    ///
    /// This is the reference the parallel [`Aggregator`] must agree with.
    pub fn from_lines<I, S>(kind: NgramKind, lines: I) -> FrequencyTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = FrequencyTable::new();
        for line in lines {
            table.count_line(kind, line.as_ref());
        }
        table
    }

    /// Increments the count of every valid n-gram found in `line`.
    pub fn count_line(&mut self, kind: NgramKind, line: &str) {
        for key in line.ngrams(kind) {
            self.add(&key, 1);
        }
    }

    pub fn add(&mut self, key: &str, n: Count) {
        match self.counts.get_mut(key) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(SmolStr::new(key), n);
            }
        }
    }

    /// Count of `key`, zero when it was never seen.
    pub fn get(&self, key: &str) -> Count {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> Count {
        self.counts.values().sum()
    }

    pub fn header(&self) -> FrequencyHeader {
        FrequencyHeader {
            distinct: self.len() as u64,
            total: self.total(),
        }
    }

    /// Adds every count of `other` into `self`.
    ///
    /// Addition is associative and commutative, so the order in which worker
    /// tables are merged does not affect the result.
    pub fn merge(&mut self, other: FrequencyTable) {
        let mut other = other;
        if other.counts.len() > self.counts.len() {
            std::mem::swap(self, &mut other);
        }

        for (key, count) in other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Count)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(|k| k.as_str())
    }

    /// Entries by descending count, ties broken by ascending key.
    pub fn sorted(&self) -> Vec<(&str, Count)> {
        let mut entries = self.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

impl<K: AsRef<str>> FromIterator<(K, Count)> for FrequencyTable {
    fn from_iter<T: IntoIterator<Item = (K, Count)>>(iter: T) -> FrequencyTable {
        let mut table = FrequencyTable::new();
        for (key, count) in iter {
            table.add(key.as_ref(), count);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unigram_counting() {
        let table = FrequencyTable::from_lines(NgramKind::Unigrams, ["the the cat"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("the"), 2);
        assert_eq!(table.get("cat"), 1);
        assert_eq!(table.get("dog"), 0);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn bigram_counting() {
        let table = FrequencyTable::from_lines(NgramKind::Bigrams, ["the the cat"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("the the"), 1);
        assert_eq!(table.get("the cat"), 1);
    }

    #[test]
    fn bigrams_do_not_cross_lines() {
        let table = FrequencyTable::from_lines(NgramKind::Bigrams, ["a b", "c d"]);
        assert!(!table.contains("b c"));
        assert_eq!(table.total(), 2);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a: FrequencyTable = vec![("x", 1), ("y", 2)].into_iter().collect();
        let b: FrequencyTable = vec![("y", 3), ("z", 4), ("w", 1)].into_iter().collect();
        a.merge(b);
        assert_eq!(a.get("x"), 1);
        assert_eq!(a.get("y"), 5);
        assert_eq!(a.get("z"), 4);
        assert_eq!(a.get("w"), 1);
        assert_eq!(a.total(), 11);
    }

    #[test]
    fn merge_is_order_independent() {
        let a: FrequencyTable = vec![("x", 1), ("y", 2)].into_iter().collect();
        let b: FrequencyTable = vec![("y", 3), ("z", 4)].into_iter().collect();

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn sorted_is_deterministic() {
        let table: FrequencyTable = vec![("b", 2), ("a", 2), ("c", 5), ("d", 1)]
            .into_iter()
            .collect();
        assert_eq!(
            table.sorted(),
            vec![("c", 5), ("a", 2), ("b", 2), ("d", 1)]
        );
    }
}
