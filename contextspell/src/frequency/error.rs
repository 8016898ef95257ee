//! Error types for frequency tables and aggregation.

/// Errors that can occur while building, reading or writing frequency tables.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FrequencyError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// First line is not `<distinct_key_count> <total_count_sum>`
    #[error("Malformed header {0:?}")]
    MalformedHeader(String),

    /// An entry line is not `<key> <count>`
    #[error("Malformed entry at line {line}: {content:?}")]
    MalformedEntry { line: usize, content: String },

    /// An aggregation worker died before returning its counts
    #[error("Aggregation worker {0} panicked")]
    WorkerPanicked(usize),
}
