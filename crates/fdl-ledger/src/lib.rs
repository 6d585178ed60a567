//! Append-only event log for the Financial Data Lab receipt store.
//!
//! The log is a single JSON-lines file, `events/events.v1.jsonl`, holding at
//! most one event per `(receipt_id, event_type)` pair. Each append scans the
//! whole log under an exclusive file lock and writes only if no matching
//! event is present, so concurrent ingestions of the same receipt record
//! exactly one event.

pub mod error;
pub mod log;

pub use error::{LedgerError, LedgerResult};
pub use log::EventLog;
