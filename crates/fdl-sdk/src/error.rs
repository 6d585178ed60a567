use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("manifest not found: {0}")]
    ReceiptNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported media for {receipt_id}: {}", .media_type.as_deref().unwrap_or("unknown"))]
    UnsupportedMedia {
        receipt_id: String,
        media_type: Option<String>,
    },

    #[error("engine {engine} failed: {reason}")]
    Engine { engine: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] fdl_store::StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] fdl_ledger::LedgerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<fdl_crypto::HasherError> for SdkError {
    fn from(err: fdl_crypto::HasherError) -> Self {
        Self::Io(err.into())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
