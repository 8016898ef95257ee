use std::time::Duration;

/// Characters stripped from every token before validation.
pub const EXCLUDED_CHARS: &[char] = &[
    '"', '!', '(', ')', ',', '.', ':', ';', '?', '[', ']', '{', '}', '“', '”', '«', '»',
];

pub const TYPOGRAPHIC_APOSTROPHE: char = '’';
pub const APOSTROPHE: char = '\'';

/// Tokens longer than this (in characters) are discarded.
pub const MAX_TOKEN_LEN: usize = 50;

pub const ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub const IDENTITY_PRIOR: f64 = 1.0;
pub const EDIT1_PRIOR: f64 = 1e-3;
pub const EDIT2_PRIOR: f64 = 1e-4;

pub const LOAD_BATCH_SIZE: usize = 10_000;

pub const RECENT_CHANGES_LIMIT: u32 = 500;
pub const SYNC_INTERVAL: Duration = Duration::from_secs(60);

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn test_ALPHABET() {
        assert_eq!(ALPHABET.len(), 26);
        assert!(ALPHABET.windows(2).all(|w| w[0] < w[1]));
        assert!(ALPHABET.iter().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_EXCLUDED_CHARS() {
        assert_eq!(EXCLUDED_CHARS.len(), 17);
        assert!(!EXCLUDED_CHARS.contains(&APOSTROPHE));
        assert!(!EXCLUDED_CHARS.contains(&'-'));
        assert!(!EXCLUDED_CHARS.contains(&'/'));
    }

    #[test]
    fn test_priors() {
        assert!(IDENTITY_PRIOR > EDIT1_PRIOR);
        assert!(EDIT1_PRIOR > EDIT2_PRIOR);
    }
}
