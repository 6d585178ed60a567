//! High-level SDK for the Financial Data Lab receipt store.
//!
//! [`ReceiptVault`] ties the object store, manifest store and event log of
//! one store root together and is the entry point for applications and the
//! `fdl` command line.

pub mod engines;
pub mod error;
pub mod export;
pub mod observe;
pub mod vault;
pub mod verify;

pub use engines::{PdftoppmRenderer, TesseractEngine};
pub use error::{SdkError, SdkResult};
pub use export::{export_receipts, ExportSummary};
pub use observe::{
    ObservationWrite, ObserveOutcome, OcrEngine, OcrOptions, OcrSource, PageRenderer,
    DEFAULT_LANG, PAGE_SEPARATOR,
};
pub use vault::{IngestOutcome, ReceiptVault, ShowReport};
pub use verify::{verify, VerificationIssue, VerificationReport};

// Re-export key types
pub use fdl_store::{Layout, StoreConfig, SyncMode};
pub use fdl_types::{Digest, Event, EventType, Manifest, ReceiptId, Timestamp};
