//! Correction candidates within edit distance two.
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::vocabulary::Vocabulary;
use crate::constants::{ALPHABET, EDIT1_PRIOR, EDIT2_PRIOR, IDENTITY_PRIOR};

/// Prior weight of each candidate class.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Priors {
    pub identity: f64,
    pub edit1: f64,
    pub edit2: f64,
}

impl Priors {
    pub const fn default() -> Priors {
        Priors {
            identity: IDENTITY_PRIOR,
            edit1: EDIT1_PRIOR,
            edit2: EDIT2_PRIOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateClass {
    Identity,
    Edit1,
    Edit2,
}

impl CandidateClass {
    pub fn prior(&self, priors: &Priors) -> f64 {
        match self {
            CandidateClass::Identity => priors.identity,
            CandidateClass::Edit1 => priors.edit1,
            CandidateClass::Edit2 => priors.edit2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub prev: Option<&'a str>,
    pub word: SmolStr,
    pub next: Option<&'a str>,
    pub class: CandidateClass,
    pub prior: f64,
}

/// Every string one edit away from `word`, duplicates included.
///
/// Deletions, adjacent transpositions, replacements and insertions, the last
/// two over [`ALPHABET`].
pub fn edits1_raw(word: &str) -> Vec<String> {
    let chars = word.chars().collect::<Vec<_>>();
    let len = chars.len();
    let mut out = Vec::with_capacity(54 * len + 26);

    let join = |parts: &[&[char]]| parts.iter().flat_map(|p| p.iter()).collect::<String>();

    for i in 0..len {
        out.push(join(&[&chars[..i], &chars[i + 1..]]));
    }
    for i in 0..len.saturating_sub(1) {
        out.push(join(&[
            &chars[..i],
            &[chars[i + 1], chars[i]],
            &chars[i + 2..],
        ]));
    }
    for i in 0..len {
        for c in ALPHABET {
            out.push(join(&[&chars[..i], &[*c], &chars[i + 1..]]));
        }
    }
    for i in 0..=len {
        for c in ALPHABET {
            out.push(join(&[&chars[..i], &[*c], &chars[i..]]));
        }
    }

    out
}

pub fn edits1(word: &str) -> HashSet<String> {
    edits1_raw(word).into_iter().collect()
}

/// Known words exactly two edits away, reached through any intermediate string.
pub fn known_edits2(word: &str, vocabulary: &Vocabulary) -> HashSet<String> {
    edits1(word)
        .iter()
        .flat_map(|e1| edits1_raw(e1))
        .filter(|e2| vocabulary.contains(e2))
        .collect()
}

/// Candidates for `word`, each in the most likely class it belongs to.
///
/// The word itself is always a candidate, known or not. Known words one edit
/// away follow, then known words two edits away that are not already closer.
pub fn generate<'a>(
    prev: Option<&'a str>,
    word: &str,
    next: Option<&'a str>,
    vocabulary: &Vocabulary,
    priors: &Priors,
) -> Vec<Candidate<'a>> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(word.to_string());

    let mut edit1 = edits1(word)
        .into_iter()
        .filter(|w| vocabulary.contains(w))
        .collect::<Vec<_>>();
    edit1.retain(|w| seen.insert(w.clone()));
    edit1.sort_unstable();

    let mut edit2 = known_edits2(word, vocabulary)
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect::<Vec<_>>();
    edit2.sort_unstable();

    let classes = std::iter::once((word.to_string(), CandidateClass::Identity))
        .chain(edit1.into_iter().map(|w| (w, CandidateClass::Edit1)))
        .chain(edit2.into_iter().map(|w| (w, CandidateClass::Edit2)));

    classes
        .map(|(w, class)| Candidate {
            prev,
            word: SmolStr::new(w),
            next,
            class,
            prior: class.prior(priors),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_len(l: usize) -> usize {
        l + l.saturating_sub(1) + 26 * l + 26 * (l + 1)
    }

    #[test]
    fn edits1_cardinality() {
        for (word, unique) in [
            ("abc", 182),
            ("helo", 234),
            ("a", 78),
            ("", 26),
            ("ther", 234),
            ("aa", 128),
        ] {
            let l = word.chars().count();
            assert_eq!(edits1_raw(word).len(), raw_len(l), "{}", word);
            assert_eq!(edits1(word).len(), unique, "{}", word);
        }
    }

    #[test]
    fn edits1_operations() {
        let edits = edits1("helo");
        assert!(edits.contains("hello"));
        assert!(edits.contains("hel"));
        assert!(edits.contains("ehlo"));
        assert!(edits.contains("help"));
        assert!(!edits.contains("helo "));
    }

    #[test]
    fn edits1_counts_characters() {
        // one deletion of a two-byte char leaves a single char
        assert!(edits1("è").contains(""));
        assert_eq!(edits1_raw("èa").len(), raw_len(2));
    }

    #[test]
    fn known_edits2_filters_the_end_only() {
        let vocabulary: Vocabulary = ["hello", "yellow"].iter().collect();
        let found = known_edits2("helo", &vocabulary);
        assert!(found.contains("hello"));
        assert!(!found.contains("yellow"));

        let found = known_edits2("hel", &vocabulary);
        assert!(found.contains("hello"));
    }

    #[test]
    fn classes_are_disjoint() {
        let vocabulary: Vocabulary = ["helo", "hello", "hell", "help", "hellos"].iter().collect();
        let candidates = generate(None, "helo", None, &vocabulary, &Priors::default());

        assert_eq!(candidates[0].word.as_str(), "helo");
        assert_eq!(candidates[0].class, CandidateClass::Identity);
        assert_eq!(candidates[0].prior, 1.0);

        let words = candidates.iter().map(|c| c.word.as_str()).collect::<Vec<_>>();
        let unique = words.iter().collect::<HashSet<_>>();
        assert_eq!(words.len(), unique.len());

        let class_of = |w: &str| candidates.iter().find(|c| c.word.as_str() == w).map(|c| c.class);
        assert_eq!(class_of("hello"), Some(CandidateClass::Edit1));
        assert_eq!(class_of("help"), Some(CandidateClass::Edit1));
        assert_eq!(class_of("hell"), Some(CandidateClass::Edit1));
        assert_eq!(class_of("hellos"), Some(CandidateClass::Edit2));
    }

    #[test]
    fn unknown_word_is_its_own_last_resort() {
        let vocabulary = Vocabulary::new();
        let candidates = generate(Some("a"), "xyzzy", Some("b"), &vocabulary, &Priors::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].word.as_str(), "xyzzy");
        assert_eq!(candidates[0].prev, Some("a"));
        assert_eq!(candidates[0].next, Some("b"));
    }
}
