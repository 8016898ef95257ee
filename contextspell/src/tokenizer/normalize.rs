use crate::constants::{APOSTROPHE, EXCLUDED_CHARS, MAX_TOKEN_LEN, TYPOGRAPHIC_APOSTROPHE};

/// Normalizes a single whitespace-delimited word into a token.
///
/// Excluded punctuation is stripped, the typographic apostrophe is unified
/// with the straight one and the result is lowercased. Returns `None` when
/// the normalized form is not a valid token.
pub fn normalize(raw: &str) -> Option<String> {
    let word: String = raw
        .chars()
        .filter(|c| !EXCLUDED_CHARS.contains(c))
        .map(|c| {
            if c == TYPOGRAPHIC_APOSTROPHE {
                APOSTROPHE
            } else {
                c
            }
        })
        .flat_map(char::to_lowercase)
        .collect();

    if is_valid(&word) {
        Some(word)
    } else {
        None
    }
}

/// Whether an already normalized string is acceptable as a token.
///
/// A token must be non-empty, at most [`MAX_TOKEN_LEN`] characters long and
/// contain at least one character that is neither an ASCII digit nor in the
/// ASCII range from space to `/`. Numbers and punctuation runs are rejected.
pub fn is_valid(token: &str) -> bool {
    !token.is_empty()
        && token.chars().count() <= MAX_TOKEN_LEN
        && token.chars().any(is_content_char)
}

#[inline(always)]
fn is_content_char(c: char) -> bool {
    !(c.is_ascii_digit() || (' '..='/').contains(&c))
}
