//! Context-aware correction of single words and whole sentences.
//!
//! Candidates come from [`candidates::generate`]; each is scored with
//! `P(prev candidate) · P(candidate) · P(candidate next) · prior`, composed as
//! a sum of natural logs. Context factors are left out when there is no
//! previous or next word. Keys the store does not know, or holds a value
//! `<= 0` for, get the floor probability `1 / total` of their table.
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::frequency::{FrequencyError, FrequencyHeader};
use crate::store::{FrequencyStore, StoreError};
use crate::tokenizer::normalize;
use crate::types::{Count, Score, StoreValue};

use self::candidates::Candidate;
pub use self::candidates::{CandidateClass, Priors};
pub use self::suggestion::Suggestion;
pub use self::vocabulary::Vocabulary;

pub mod candidates;
pub mod suggestion;
pub mod vocabulary;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CorrectorConfig {
    /// Sum of all unigram counts, the denominator of unigram probabilities.
    pub unigram_total: Count,
    /// Sum of all bigram counts.
    pub bigram_total: Count,
    #[serde(default = "Priors::default")]
    pub priors: Priors,
}

impl CorrectorConfig {
    pub const fn default() -> CorrectorConfig {
        CorrectorConfig {
            unigram_total: 1,
            bigram_total: 1,
            priors: Priors::default(),
        }
    }

    pub const fn with_totals(unigram_total: Count, bigram_total: Count) -> CorrectorConfig {
        CorrectorConfig {
            unigram_total,
            bigram_total,
            priors: Priors::default(),
        }
    }

    /// Takes the totals from the headers of the unigram and bigram files.
    pub fn from_headers(unigrams: &Path, bigrams: &Path) -> Result<CorrectorConfig, FrequencyError> {
        Ok(CorrectorConfig::with_totals(
            FrequencyHeader::from_path(unigrams)?.total,
            FrequencyHeader::from_path(bigrams)?.total,
        ))
    }
}

/// One word of a corrected sentence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Correction {
    pub input: SmolStr,
    pub output: SmolStr,
    /// `None` when the word was not a valid token and was passed through.
    pub score: Option<Score>,
}

/// Joins the outputs of a corrected sentence with single spaces.
pub fn corrected_sentence(corrections: &[Correction]) -> String {
    corrections
        .iter()
        .map(|c| c.output.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub trait Speller {
    /// Every candidate for `word`, best first.
    fn suggest(
        self: Arc<Self>,
        prev: Option<&str>,
        word: &str,
        next: Option<&str>,
    ) -> Result<Vec<Suggestion>, StoreError>;

    fn suggest_with_config(
        self: Arc<Self>,
        prev: Option<&str>,
        word: &str,
        next: Option<&str>,
        config: &CorrectorConfig,
    ) -> Result<Vec<Suggestion>, StoreError>;

    /// The best candidate for `word`.
    fn correct(
        self: Arc<Self>,
        prev: Option<&str>,
        word: &str,
        next: Option<&str>,
    ) -> Result<Suggestion, StoreError>;

    /// Corrects a sentence word by word, left to right. The context of each
    /// word is the corrected word before it and the original word after it.
    fn correct_sentence(self: Arc<Self>, sentence: &str) -> Result<Vec<Correction>, StoreError>;
}

/// A [`Speller`] backed by a known-word set and two frequency stores.
pub struct ContextSpeller {
    vocabulary: Arc<Vocabulary>,
    unigrams: Arc<dyn FrequencyStore>,
    bigrams: Arc<dyn FrequencyStore>,
    config: CorrectorConfig,
}

impl ContextSpeller {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        unigrams: Arc<dyn FrequencyStore>,
        bigrams: Arc<dyn FrequencyStore>,
        config: CorrectorConfig,
    ) -> Arc<ContextSpeller> {
        Arc::new(ContextSpeller {
            vocabulary,
            unigrams,
            bigrams,
            config,
        })
    }

    pub fn config(&self) -> &CorrectorConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Scores every candidate with one unigram and one bigram round trip.
    fn rank(
        &self,
        candidates: &[Candidate],
        config: &CorrectorConfig,
    ) -> Result<Vec<Suggestion>, StoreError> {
        let unigram_keys = candidates
            .iter()
            .map(|c| c.word.as_str())
            .collect::<Vec<_>>();
        let unigram_values = self.unigrams.get_many(&unigram_keys)?;
        check_len(&unigram_keys, &unigram_values)?;

        let mut bigram_keys = Vec::with_capacity(candidates.len() * 2);
        for candidate in candidates {
            if let Some(prev) = candidate.prev {
                bigram_keys.push(format!("{} {}", prev, candidate.word));
            }
            if let Some(next) = candidate.next {
                bigram_keys.push(format!("{} {}", candidate.word, next));
            }
        }
        let bigram_keys = bigram_keys.iter().map(|k| k.as_str()).collect::<Vec<_>>();
        let bigram_values = if bigram_keys.is_empty() {
            Vec::new()
        } else {
            self.bigrams.get_many(&bigram_keys)?
        };
        check_len(&bigram_keys, &bigram_values)?;

        let mut bigram_values = bigram_values.into_iter();
        let mut suggestions = candidates
            .iter()
            .zip(unigram_values)
            .map(|(candidate, unigram)| {
                let mut score = candidate.prior.ln() + log_probability(unigram, config.unigram_total);
                if candidate.prev.is_some() {
                    score += log_probability(bigram_values.next().flatten(), config.bigram_total);
                }
                if candidate.next.is_some() {
                    score += log_probability(bigram_values.next().flatten(), config.bigram_total);
                }
                Suggestion::new(candidate.word.clone(), score, candidate.class)
            })
            .collect::<Vec<_>>();

        suggestions.sort();
        Ok(suggestions)
    }
}

fn check_len<T>(keys: &[&str], values: &[T]) -> Result<(), StoreError> {
    if keys.len() != values.len() {
        return Err(StoreError::Unavailable(format!(
            "asked for {} keys, got {} values",
            keys.len(),
            values.len()
        )));
    }
    Ok(())
}

fn log_probability(value: Option<StoreValue>, total: Count) -> Score {
    let total = total.max(1) as f64;
    match value {
        Some(count) if count > 0 => (count as f64 / total).ln(),
        _ => (1.0 / total).ln(),
    }
}

impl Speller for ContextSpeller {
    #[inline]
    fn suggest(
        self: Arc<Self>,
        prev: Option<&str>,
        word: &str,
        next: Option<&str>,
    ) -> Result<Vec<Suggestion>, StoreError> {
        let config = self.config.clone();
        self.suggest_with_config(prev, word, next, &config)
    }

    fn suggest_with_config(
        self: Arc<Self>,
        prev: Option<&str>,
        word: &str,
        next: Option<&str>,
        config: &CorrectorConfig,
    ) -> Result<Vec<Suggestion>, StoreError> {
        let candidates = candidates::generate(prev, word, next, &self.vocabulary, &config.priors);
        log::trace!("{} candidates for {:?}", candidates.len(), word);
        self.rank(&candidates, config)
    }

    fn correct(
        self: Arc<Self>,
        prev: Option<&str>,
        word: &str,
        next: Option<&str>,
    ) -> Result<Suggestion, StoreError> {
        let suggestions = self.suggest(prev, word, next)?;
        // the word itself is always a candidate
        suggestions
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unavailable("no candidates were scored".into()))
    }

    fn correct_sentence(self: Arc<Self>, sentence: &str) -> Result<Vec<Correction>, StoreError> {
        let words = sentence.split_whitespace().collect::<Vec<_>>();
        let tokens = words.iter().map(|w| normalize(w)).collect::<Vec<_>>();
        let mut out: Vec<Correction> = Vec::with_capacity(words.len());

        for (i, input) in words.iter().enumerate() {
            let token = match &tokens[i] {
                Some(token) => token,
                None => {
                    out.push(Correction {
                        input: SmolStr::new(input),
                        output: SmolStr::new(input),
                        score: None,
                    });
                    continue;
                }
            };

            let prev = out.last().map(|c| c.output.clone());
            let next = words
                .get(i + 1)
                .map(|w| tokens[i + 1].as_deref().unwrap_or(w));

            let best = self.clone().correct(prev.as_deref(), token, next)?;
            out.push(Correction {
                input: SmolStr::new(input),
                output: best.value,
                score: Some(best.score),
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Watch};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts round trips to the wrapped store.
    struct Counting {
        inner: MemoryStore,
        gets: AtomicUsize,
    }

    impl Counting {
        fn new(entries: &[(&str, StoreValue)]) -> Arc<Counting> {
            let inner = MemoryStore::new();
            inner.set_many(entries).unwrap();
            Arc::new(Counting {
                inner,
                gets: AtomicUsize::new(0),
            })
        }

        fn gets(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    impl FrequencyStore for Counting {
        fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get_many(keys)
        }

        fn set_many(&self, entries: &[(&str, StoreValue)]) -> Result<(), StoreError> {
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

    struct Model {
        speller: Arc<ContextSpeller>,
        unigrams: Arc<Counting>,
        bigrams: Arc<Counting>,
    }

    fn model(
        unigrams: &[(&str, StoreValue)],
        bigrams: &[(&str, StoreValue)],
        config: CorrectorConfig,
    ) -> Model {
        let vocabulary = unigrams.iter().map(|(w, _)| *w).collect::<Vocabulary>();
        let unigrams = Counting::new(unigrams);
        let bigrams = Counting::new(bigrams);
        let speller = ContextSpeller::new(
            Arc::new(vocabulary),
            unigrams.clone(),
            bigrams.clone(),
            config,
        );
        Model {
            speller,
            unigrams,
            bigrams,
        }
    }

    fn over_there() -> Model {
        model(
            &[
                ("over", 100),
                ("there", 50),
                ("their", 60),
                ("the", 300),
                ("cat", 40),
            ],
            &[("over there", 200), ("over their", 1), ("there cat", 3)],
            CorrectorConfig::with_totals(1000, 500),
        )
    }

    #[test]
    fn corrects_single_deletion() {
        let m = model(
            &[("hello", 5000), ("world", 5000)],
            &[],
            CorrectorConfig::with_totals(10_000, 1),
        );
        let best = m.speller.clone().correct(None, "helo", None).unwrap();
        assert_eq!(best.value(), "hello");
        assert_eq!(best.class, CandidateClass::Edit1);
    }

    #[test]
    fn context_picks_there() {
        let m = over_there();
        let best = m.speller.clone().correct(Some("over"), "ther", None).unwrap();
        assert_eq!(best.value(), "there");

        // without context the more frequent unigram wins
        let suggestions = m.speller.clone().suggest(None, "ther", None).unwrap();
        let position = |w: &str| suggestions.iter().position(|s| s.value() == w).unwrap();
        assert!(position("the") < position("their"));
        assert!(position("their") < position("there"));
    }

    #[test]
    fn one_round_trip_per_table() {
        let m = over_there();
        m.speller
            .clone()
            .correct(Some("over"), "ther", Some("cat"))
            .unwrap();
        assert_eq!(m.unigrams.gets(), 1);
        assert_eq!(m.bigrams.gets(), 1);

        m.speller.clone().correct(None, "ther", None).unwrap();
        assert_eq!(m.unigrams.gets(), 2);
        // no context, no bigram keys
        assert_eq!(m.bigrams.gets(), 1);
    }

    #[test]
    fn scoring_is_deterministic() {
        let m = over_there();
        let first = m.speller.clone().suggest(Some("over"), "ther", Some("cat")).unwrap();
        let second = m.speller.clone().suggest(Some("over"), "ther", Some("cat")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ties_go_to_the_smallest_word() {
        let m = model(
            &[("hat", 4000), ("bat", 4000)],
            &[],
            CorrectorConfig::with_totals(10_000, 1),
        );
        let suggestions = m.speller.clone().suggest(None, "cat", None).unwrap();
        assert_eq!(suggestions[0].score, suggestions[1].score);
        assert_eq!(suggestions[0].value(), "bat");
        assert_eq!(suggestions[1].value(), "hat");
    }

    #[test]
    fn scores_are_log_probabilities() {
        let m = over_there();
        let suggestions = m.speller.clone().suggest(Some("over"), "ther", None).unwrap();
        let there = suggestions.iter().find(|s| s.value() == "there").unwrap();
        let expected = (1e-3f64).ln() + (50.0f64 / 1000.0).ln() + (200.0f64 / 500.0).ln();
        assert!((there.score - expected).abs() < 1e-9);

        // unknown word: both factors at the floor, identity prior
        let ther = suggestions.iter().find(|s| s.value() == "ther").unwrap();
        let expected = (1.0f64 / 1000.0).ln() + (1.0f64 / 500.0).ln();
        assert!((ther.score - expected).abs() < 1e-9);
    }

    #[test]
    fn non_positive_values_are_missing() {
        let m = model(
            &[("there", 0), ("their", -4)],
            &[],
            CorrectorConfig::with_totals(1000, 1),
        );
        let suggestions = m.speller.clone().suggest(None, "ther", None).unwrap();
        let floor = (1.0f64 / 1000.0).ln();
        for s in &suggestions {
            let prior = s.class.prior(&Priors::default()).ln();
            assert!((s.score - (prior + floor)).abs() < 1e-9, "{}", s.value());
        }
    }

    #[test]
    fn long_products_do_not_underflow() {
        let m = model(
            &[("there", 1)],
            &[],
            CorrectorConfig::with_totals(u64::MAX / 2, u64::MAX / 2),
        );
        let best = m.speller.clone().correct(Some("a"), "ther", Some("b")).unwrap();
        assert!(best.score.is_finite());
    }

    /// The floor applies per missing factor, so an unseen input word can
    /// outscore a known but rare correction.
    #[test]
    fn unseen_word_can_outscore_rare_correction() {
        let m = model(
            &[("hello", 10), ("other", 9990)],
            &[],
            CorrectorConfig::with_totals(10_000, 1),
        );
        let best = m.speller.clone().correct(None, "helo", None).unwrap();
        assert_eq!(best.value(), "helo");
        assert_eq!(best.class, CandidateClass::Identity);
    }

    #[test]
    fn sentence_uses_corrected_prev_and_original_next() {
        let m = over_there();
        let corrections = m.speller.clone().correct_sentence("Over ther cat").unwrap();
        assert_eq!(corrected_sentence(&corrections), "over there cat");
        assert_eq!(corrections[1].input.as_str(), "ther");
        assert!(corrections[1].score.is_some());
        // one round trip per table for each word
        assert_eq!(m.unigrams.gets(), 3);
    }

    #[test]
    fn sentence_passes_invalid_words_through() {
        let m = over_there();
        let corrections = m.speller.clone().correct_sentence("over 1984 ther").unwrap();
        assert_eq!(corrections.len(), 3);
        assert_eq!(corrections[1].output.as_str(), "1984");
        assert_eq!(corrections[1].score, None);
        assert!(m.speller.clone().correct_sentence("   ").unwrap().is_empty());
    }

    #[test]
    fn totals_from_headers() {
        let dir = tempfile::tempdir().unwrap();
        let unigrams = dir.path().join("it.unigrams");
        let bigrams = dir.path().join("it.bigrams");
        std::fs::write(&unigrams, "2 30\na 20\nb 10\n").unwrap();
        std::fs::write(&bigrams, "1 7\na b 7\n").unwrap();

        let config = CorrectorConfig::from_headers(&unigrams, &bigrams).unwrap();
        assert_eq!(config, CorrectorConfig::with_totals(30, 7));

        let json = serde_json::to_string(&config).unwrap();
        let back: CorrectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        let partial: CorrectorConfig =
            serde_json::from_str(r#"{"unigram_total": 5, "bigram_total": 6}"#).unwrap();
        assert_eq!(partial.priors, Priors::default());
    }
}
