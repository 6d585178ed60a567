//! Derived-data documents written next to a receipt's manifest.
//!
//! Each document is written at most once per receipt; a second writer finds
//! the file present and leaves it untouched.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::receipt::ReceiptId;
use crate::temporal::Timestamp;

pub const OCR_SCHEMA: &str = "financial-data-lab/ocr.v1";
pub const PDF_PAGES_SCHEMA: &str = "financial-data-lab/pdf_pages.v1";

/// The stored object a derivation was computed from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationInput {
    pub object_path: String,
}

/// Identity of the external engine that produced a derivation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

/// Recognized text for one receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrDocument {
    pub schema: String,
    pub receipt_id: ReceiptId,
    pub created_at: Timestamp,
    pub input: ObservationInput,
    pub engine: EngineInfo,
    pub observed: OcrObserved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrObserved {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<OcrPage>>,
}

/// Text recognized on one rendered page of a multi-page source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrPage {
    /// 1-based page number.
    pub page: u32,
    pub object_path: String,
    pub text: String,
}

impl OcrDocument {
    pub fn new(
        receipt_id: ReceiptId,
        created_at: Timestamp,
        object_path: String,
        engine: EngineInfo,
        observed: OcrObserved,
    ) -> Self {
        Self {
            schema: OCR_SCHEMA.to_string(),
            receipt_id,
            created_at,
            input: ObservationInput { object_path },
            engine,
            observed,
        }
    }
}

// ---------------------------------------------------------------------------
// PDF pages
// ---------------------------------------------------------------------------

/// Page images rendered from a PDF receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfPagesDocument {
    pub schema: String,
    pub receipt_id: ReceiptId,
    pub created_at: Timestamp,
    pub input: ObservationInput,
    pub engine: EngineInfo,
    pub observed: PdfPagesObserved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfPagesObserved {
    pub page_count: usize,
    pub pages: Vec<PdfPage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfPage {
    /// 1-based page number.
    pub page: u32,
    pub image: PageImage,
}

/// A rendered page image, itself stored in the object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    pub sha256: Digest,
    pub object_path: String,
    pub media_type: String,
    pub byte_size: u64,
}

impl PdfPagesDocument {
    pub fn new(
        receipt_id: ReceiptId,
        created_at: Timestamp,
        object_path: String,
        engine: EngineInfo,
        pages: Vec<PdfPage>,
    ) -> Self {
        Self {
            schema: PDF_PAGES_SCHEMA.to_string(),
            receipt_id,
            created_at,
            input: ObservationInput { object_path },
            engine,
            observed: PdfPagesObserved {
                page_count: pages.len(),
                pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid() -> ReceiptId {
        ReceiptId::derive(&Digest::from_hash([9; 32]))
    }

    fn ts() -> Timestamp {
        Timestamp::parse("2024-01-01T00:00:00Z").unwrap()
    }

    #[test]
    fn ocr_document_omits_pages_when_absent() {
        let doc = OcrDocument::new(
            rid(),
            ts(),
            "objects/sha256/09/09/x".into(),
            EngineInfo {
                name: "tesseract".into(),
                version: "5.3.0".into(),
                lang: Some("por".into()),
            },
            OcrObserved {
                text: "total 12,00".into(),
                pages: None,
            },
        );
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["schema"], OCR_SCHEMA);
        assert_eq!(value["engine"]["lang"], "por");
        assert_eq!(value["observed"]["text"], "total 12,00");
        assert!(value["observed"].get("pages").is_none());
    }

    #[test]
    fn pdf_pages_document_counts_pages() {
        let page = |n: u32| PdfPage {
            page: n,
            image: PageImage {
                sha256: Digest::from_hash([n as u8; 32]),
                object_path: format!("objects/sha256/0{n}/0{n}/page"),
                media_type: "image/png".into(),
                byte_size: 10,
            },
        };
        let doc = PdfPagesDocument::new(
            rid(),
            ts(),
            "objects/sha256/09/09/x".into(),
            EngineInfo {
                name: "renderer".into(),
                version: "1.2.3".into(),
                lang: None,
            },
            vec![page(1), page(2)],
        );
        assert_eq!(doc.observed.page_count, 2);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["schema"], PDF_PAGES_SCHEMA);
        assert!(value["engine"].get("lang").is_none());
        assert_eq!(value["observed"]["pages"][1]["page"], 2);
    }
}
