use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::digest::Digest;
use crate::receipt::ReceiptId;
use crate::temporal::Timestamp;

/// Schema tag written into every manifest.
pub const MANIFEST_SCHEMA: &str = "financial-data-lab/manifest.v1";

/// Immutable descriptive record for one receipt.
///
/// A manifest is written once, at ingestion time, and never rewritten.
/// `observed` and `inferred` are open buckets reserved for derived data.
/// Derived-data writers put their results in sibling documents rather than
/// editing a manifest in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: String,
    pub receipt_id: ReceiptId,
    pub ingested_at: Timestamp,
    pub source: SourceInfo,
    pub content: ContentRef,
    #[serde(default)]
    pub observed: Map<String, Value>,
    #[serde(default)]
    pub inferred: Map<String, Value>,
}

impl Manifest {
    /// Build a fresh manifest with empty extension buckets.
    pub fn new(
        receipt_id: ReceiptId,
        ingested_at: Timestamp,
        source: SourceInfo,
        content: ContentRef,
    ) -> Self {
        Self {
            schema: MANIFEST_SCHEMA.to_string(),
            receipt_id,
            ingested_at,
            source,
            content,
            observed: Map::new(),
            inferred: Map::new(),
        }
    }
}

/// Where an ingested artifact came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// The path exactly as the caller supplied it.
    pub path_hint: String,
    pub original_filename: String,
    /// Best-effort guess from the filename extension; `null` when unknown.
    pub media_type: Option<String>,
    pub byte_size: u64,
}

/// Reference from a manifest to its stored object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub sha256: Digest,
    /// Store-relative path of the object (absolute only if the object lives
    /// outside the store root).
    pub object_path: String,
}
