//! Error types for the delta-sync updater.
use std::path::PathBuf;

use crate::frequency::FrequencyError;
use crate::store::StoreError;

/// Errors that abort a sync cycle.
///
/// None of them advance the checkpoint: the whole cycle is retried on the
/// next tick.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SyncError {
    /// The change feed or revision source failed or answered garbage
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The markup extractor could not produce plain text
    #[error("Extractor failed: {0}")]
    Extract(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Aggregate(#[from] FrequencyError),

    /// The checkpoint file is corrupt or cannot be written
    #[error("Checkpoint {}: {reason}", path.display())]
    Checkpoint { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
