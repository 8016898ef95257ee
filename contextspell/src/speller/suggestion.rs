//! Suggestion for a spelling correction.
use crate::speller::candidates::CandidateClass;
use crate::types::Score;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::cmp::Ordering::Equal;

#[derive(Clone, Debug, Serialize, Deserialize)]
/// Suggestion for a spelling correction
pub struct Suggestion {
    /// the suggested word-form
    pub value: SmolStr,
    /// natural log of the context probability
    pub score: Score,
    /// how far the word-form is from the input
    pub class: CandidateClass,
}

impl Suggestion {
    /// creates a spelling correction suggestion
    pub fn new(value: SmolStr, score: Score, class: CandidateClass) -> Suggestion {
        Suggestion {
            value,
            score,
            class,
        }
    }

    /// gets the suggested word-form
    pub fn value(&self) -> &str {
        &self.value
    }

    /// gets the log-probability of the suggestion
    pub fn score(&self) -> Score {
        self.score
    }
}

impl PartialOrd for Suggestion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best first: higher score, then the lexicographically smaller word-form.
impl Ord for Suggestion {
    fn cmp(&self, other: &Self) -> Ordering {
        let x = other.score.partial_cmp(&self.score).unwrap_or(Equal);

        if let Equal = x {
            return self.value.cmp(&other.value);
        }

        x
    }
}

impl PartialEq for Suggestion {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.score == other.score
    }
}

impl Eq for Suggestion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_sorts_first() {
        let mut suggestions = vec![
            Suggestion::new("their".into(), -12.0, CandidateClass::Edit1),
            Suggestion::new("there".into(), -9.5, CandidateClass::Edit1),
            Suggestion::new("ther".into(), -30.0, CandidateClass::Identity),
            Suggestion::new("theirs".into(), -9.5, CandidateClass::Edit2),
        ];
        suggestions.sort();
        let order = suggestions.iter().map(|s| s.value()).collect::<Vec<_>>();
        assert_eq!(order, vec!["theirs", "there", "their", "ther"]);
    }
}
