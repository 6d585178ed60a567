use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::receipt::ReceiptId;
use crate::temporal::Timestamp;

/// Schema tag written into every event line.
pub const EVENT_SCHEMA: &str = "financial-data-lab/event.v1";

/// Lifecycle event type. An open enumeration: any string is a valid type,
/// the constants below are the ones the store itself emits.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub const RECEIPT_INGESTED: &'static str = "receipt.ingested";
    pub const OCR_OBSERVED: &'static str = "receipt.ocr_observed";
    pub const PDF_PAGES_OBSERVED: &'static str = "receipt.pdf_pages_observed";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn ingested() -> Self {
        Self::new(Self::RECEIPT_INGESTED)
    }

    pub fn ocr_observed() -> Self {
        Self::new(Self::OCR_OBSERVED)
    }

    pub fn pdf_pages_observed() -> Self {
        Self::new(Self::PDF_PAGES_OBSERVED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record of the append-only event log.
///
/// `refs` maps a reference name (e.g. `"manifest_path"`) to a
/// store-relative path. At most one event exists per
/// `(receipt_id, event_type)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub schema: String,
    pub ts: Timestamp,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub receipt_id: ReceiptId,
    #[serde(default)]
    pub refs: BTreeMap<String, String>,
}

impl Event {
    pub fn new(
        ts: Timestamp,
        event_type: EventType,
        receipt_id: ReceiptId,
        refs: BTreeMap<String, String>,
    ) -> Self {
        Self {
            schema: EVENT_SCHEMA.to_string(),
            ts,
            event_type,
            receipt_id,
            refs,
        }
    }

    /// Returns `true` if this event records `event_type` for `receipt_id`.
    pub fn is_for(&self, receipt_id: &ReceiptId, event_type: &EventType) -> bool {
        self.receipt_id == *receipt_id && self.event_type == *event_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;

    fn sample() -> Event {
        let mut refs = BTreeMap::new();
        refs.insert("manifest_path".to_string(), "receipts/x/manifest.v1.json".to_string());
        Event::new(
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
            EventType::ingested(),
            ReceiptId::derive(&Digest::from_hash([3; 32])),
            refs,
        )
    }

    #[test]
    fn type_field_is_renamed() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["type"], "receipt.ingested");
        assert!(value.get("event_type").is_none());
        assert_eq!(value["schema"], EVENT_SCHEMA);
    }

    #[test]
    fn is_for_matches_id_and_type() {
        let event = sample();
        let id = event.receipt_id.clone();
        assert!(event.is_for(&id, &EventType::ingested()));
        assert!(!event.is_for(&id, &EventType::ocr_observed()));
        let other = ReceiptId::derive(&Digest::from_hash([4; 32]));
        assert!(!event.is_for(&other, &EventType::ingested()));
    }

    #[test]
    fn open_enumeration_accepts_any_type() {
        let custom = EventType::new("receipt.categorized");
        assert_eq!(custom.as_str(), "receipt.categorized");
        let json = serde_json::to_string(&custom).unwrap();
        assert_eq!(json, "\"receipt.categorized\"");
    }

    #[test]
    fn serde_roundtrip() {
        let event = sample();
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
