use fdl_store::StoreError;

/// Errors from event log operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// I/O error reading, locking, or appending to the log.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure in the underlying store primitives.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An event could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the ledger crate.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
