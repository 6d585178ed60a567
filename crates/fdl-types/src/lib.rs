//! Foundation types for the Financial Data Lab (FDL) receipt store.
//!
//! This crate provides the identity, temporal, and record types shared by
//! every other FDL crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`Digest`]: SHA-256 content digest, the identity of a stored object
//! - [`ReceiptId`]: short, digest-derived name for one ingested artifact
//! - [`Timestamp`]: ISO-8601 UTC instant as recorded in manifests and events
//! - [`Manifest`]: immutable descriptive record for one receipt
//! - [`Event`]: one line of the append-only event log
//! - [`ExportRecord`]: flattened projection of a manifest for exports
//! - [`OcrDocument`] / [`PdfPagesDocument`]: once-only derived-data documents

pub mod digest;
pub mod error;
pub mod event;
pub mod export;
pub mod manifest;
pub mod observation;
pub mod receipt;
pub mod temporal;

pub use digest::Digest;
pub use error::TypeError;
pub use event::{Event, EventType, EVENT_SCHEMA};
pub use export::ExportRecord;
pub use manifest::{ContentRef, Manifest, SourceInfo, MANIFEST_SCHEMA};
pub use observation::{
    EngineInfo, ObservationInput, OcrDocument, OcrObserved, OcrPage, PageImage, PdfPage,
    PdfPagesDocument, PdfPagesObserved, OCR_SCHEMA, PDF_PAGES_SCHEMA,
};
pub use receipt::ReceiptId;
pub use temporal::Timestamp;
