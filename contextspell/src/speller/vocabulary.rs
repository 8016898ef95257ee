//! The set of known words candidates are filtered against.
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use hashbrown::HashSet;
use smol_str::SmolStr;

use crate::frequency::file::Entries;
use crate::frequency::{FrequencyError, FrequencyTable};
use crate::store::{FrequencyStore, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: HashSet<SmolStr>,
}

impl Vocabulary {
    pub fn new() -> Vocabulary {
        Vocabulary::default()
    }

    /// Reads a word list, one word per line. Blank lines are ignored.
    pub fn from_words_file(path: &Path) -> Result<Vocabulary, FrequencyError> {
        let reader = BufReader::new(File::open(path)?);
        let mut words = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let word = line.trim();
            if !word.is_empty() {
                words.insert(SmolStr::new(word));
            }
        }
        Ok(Vocabulary { words })
    }

    /// Keys of a unigram frequency file, without keeping their counts around.
    pub fn from_frequency_file(path: &Path) -> Result<Vocabulary, FrequencyError> {
        let (header, entries) = Entries::open(BufReader::new(File::open(path)?))?;
        let mut words = HashSet::with_capacity(header.distinct as usize);
        for entry in entries {
            let (key, _) = entry?;
            words.insert(key);
        }
        Ok(Vocabulary { words })
    }

    pub fn from_table(table: &FrequencyTable) -> Vocabulary {
        table.keys().collect()
    }

    /// Every key currently held by a unigram store.
    pub fn from_store(store: &dyn FrequencyStore) -> Result<Vocabulary, StoreError> {
        Ok(Vocabulary {
            words: store.keys()?.into_iter().collect(),
        })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn insert(&mut self, word: &str) -> bool {
        self.words.insert(SmolStr::new(word))
    }

    /// Writes the words one per line, sorted.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let mut words = self.words.iter().map(|w| w.as_str()).collect::<Vec<_>>();
        words.sort_unstable();
        for word in words {
            writeln!(writer, "{}", word)?;
        }
        writer.flush()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Vocabulary {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Vocabulary {
        Vocabulary {
            words: iter.into_iter().map(|w| SmolStr::new(w.as_ref())).collect(),
        }
    }
}
