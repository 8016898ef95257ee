//! Error types for frequency store access.
use std::time::Duration;

use smol_str::SmolStr;

use crate::frequency::FrequencyError;

/// Errors returned by a [`FrequencyStore`](super::FrequencyStore).
///
/// An absent key is not an error: lookups return `None` for it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store cannot be reached or refused the operation
    #[error("Frequency store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer in time
    #[error("Frequency store timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value is not an integer count
    #[error("Malformed value for key {key:?}: {value:?}")]
    MalformedValue { key: SmolStr, value: String },

    /// A compare-and-swap update kept conflicting with concurrent writers
    #[error("Gave up updating {key:?} after {attempts} conflicting attempts")]
    RetriesExhausted { key: SmolStr, attempts: u32 },
}

/// Errors from streaming a frequency file into a store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error(transparent)]
    Frequency(#[from] FrequencyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
