use std::str::SplitWhitespace;

use crate::types::NgramKind;

mod normalize;

pub use self::normalize::{is_valid, normalize};

pub trait Tokenize {
    fn unigrams(&self) -> Unigrams;
    fn bigrams(&self) -> Bigrams;
    fn ngrams(&self, kind: NgramKind) -> Ngrams;
}

impl Tokenize for str {
    fn unigrams(&self) -> Unigrams {
        Unigrams {
            words: self.split_whitespace(),
        }
    }

    fn bigrams(&self) -> Bigrams {
        Bigrams {
            words: self.split_whitespace(),
            prev: None,
        }
    }

    fn ngrams(&self, kind: NgramKind) -> Ngrams {
        match kind {
            NgramKind::Unigrams => Ngrams::Unigrams(self.unigrams()),
            NgramKind::Bigrams => Ngrams::Bigrams(self.bigrams()),
        }
    }
}

/// Valid tokens of a line, in order.
pub struct Unigrams<'a> {
    words: SplitWhitespace<'a>,
}

impl<'a> Iterator for Unigrams<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.words.by_ref().find_map(normalize)
    }
}

/// Adjacent token pairs of a line joined by a single space.
///
/// A pair is produced only when both words normalize to valid tokens;
/// an invalid word drops both pairs it takes part in.
pub struct Bigrams<'a> {
    words: SplitWhitespace<'a>,
    prev: Option<Option<String>>,
}

impl<'a> Iterator for Bigrams<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.prev.is_none() {
            self.prev = Some(normalize(self.words.next()?));
        }

        loop {
            let current = normalize(self.words.next()?);
            let prev = std::mem::replace(&mut self.prev, Some(current.clone())).flatten();

            if let (Some(first), Some(second)) = (prev, current) {
                let mut pair = first;
                pair.push(' ');
                pair.push_str(&second);
                return Some(pair);
            }
        }
    }
}

pub enum Ngrams<'a> {
    Unigrams(Unigrams<'a>),
    Bigrams(Bigrams<'a>),
}

impl<'a> Iterator for Ngrams<'a> {
    type Item = String;

    #[inline]
    fn next(&mut self) -> Option<String> {
        match self {
            Ngrams::Unigrams(it) => it.next(),
            Ngrams::Bigrams(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unigrams() {
        assert_eq!(
            "the the cat".unigrams().collect::<Vec<_>>(),
            vec!["the", "the", "cat"]
        );
        assert_eq!(
            "  Hello,\tworld! 1984 (again)\n".unigrams().collect::<Vec<_>>(),
            vec!["hello", "world", "again"]
        );
        assert_eq!("".unigrams().count(), 0);
    }

    #[test]
    fn bigrams() {
        assert_eq!(
            "the the cat".bigrams().collect::<Vec<_>>(),
            vec!["the the", "the cat"]
        );
        assert_eq!("solitary".bigrams().count(), 0);
        assert_eq!("".bigrams().count(), 0);
    }

    #[test]
    fn bigrams_drop_pairs_with_invalid_member() {
        // "1984" is invalid: both "in 1984" and "1984 we" disappear
        assert_eq!(
            "born in 1984 we met".bigrams().collect::<Vec<_>>(),
            vec!["born in", "we met"]
        );
        assert_eq!("... ... ...".bigrams().count(), 0);
    }

    #[test]
    fn bigrams_normalize_members() {
        assert_eq!(
            "Over, “There”".bigrams().collect::<Vec<_>>(),
            vec!["over there"]
        );
    }

    #[test]
    fn ngrams_dispatch() {
        let line = "a b c";
        assert_eq!(line.ngrams(NgramKind::Unigrams).count(), 3);
        assert_eq!(line.ngrams(NgramKind::Bigrams).count(), 2);
    }
}
