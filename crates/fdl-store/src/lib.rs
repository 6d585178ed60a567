//! File-backed content-addressed storage for the Financial Data Lab.
//!
//! This crate owns the on-disk namespace of a store root and the two
//! write-once stores that live in it:
//!
//! ```text
//! objects/sha256/<aa>/<bb>/<full-64-char-hash>      # content blobs
//! receipts/<receipt_id>/manifest.v1.json            # one per receipt
//! receipts/<receipt_id>/observations/*.v1.json      # derived-data documents
//! events/events.v1.jsonl                            # append-only log
//! exports/receipts.v1.jsonl                         # rebuilt on demand
//! ```
//!
//! # Components
//!
//! - [`Layout`]: pure mapping from a store root to every path above
//! - [`canonical`]: deterministic JSON encoding and the document/line writers
//! - [`FsObjectStore`]: deduplicating blob store keyed by digest
//! - [`ManifestStore`]: one immutable manifest per receipt id
//! - [`FileLock`]: advisory exclusive lock for multi-writer files
//!
//! # Design Rules
//!
//! 1. Objects and manifests are immutable once written.
//! 2. Every write goes to a temp file first and becomes visible by rename, so
//!    a crash never leaves a path that passes an existence check half-written.
//! 3. Create-if-absent is a single atomic no-clobber rename: when two writers
//!    race, exactly one wins and the other observes "already exists".
//! 4. All paths recorded inside documents are relative to the store root.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod atomic;
pub mod canonical;
pub mod config;
pub mod error;
pub mod layout;
pub mod lock;
pub mod manifest;
pub mod object;

pub use atomic::{write_new, write_replace};
pub use config::{StoreConfig, SyncMode};
pub use error::{StoreError, StoreResult};
pub use layout::Layout;
pub use lock::FileLock;
pub use manifest::{describe_source, guess_media_type, ManifestStore, ManifestWrite};
pub use object::{FsObjectStore, ObjectStore, PutOutcome};
