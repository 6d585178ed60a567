use std::path::PathBuf;

use fdl_types::{Digest, ReceiptId};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The caller-supplied source file does not exist.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The source file changed between hashing and copying.
    #[error("source {} changed while being stored: expected {expected}, copied {actual}", .path.display())]
    SourceChanged {
        path: PathBuf,
        expected: Digest,
        actual: Digest,
    },

    /// A receipt id was paired with a digest it does not derive from.
    #[error("receipt id {receipt_id} does not derive from digest {digest}")]
    ReceiptMismatch { receipt_id: ReceiptId, digest: Digest },

    /// A persisted manifest could not be parsed.
    #[error("invalid manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
