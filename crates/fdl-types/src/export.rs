use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flattened projection of one manifest, as written to an export file.
///
/// Fields are copied verbatim from the manifest JSON; any field the manifest
/// lacks is exported as `null`. Export records are derived data and are
/// recomputed from the manifests on every export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub receipt_id: Value,
    pub sha256: Value,
    pub media_type: Value,
    pub byte_size: Value,
    pub ingested_at: Value,
    pub object_path: Value,
    pub manifest_path: String,
}

impl ExportRecord {
    /// Project a parsed manifest document into an export record.
    pub fn project(manifest: &Value, manifest_path: impl Into<String>) -> Self {
        let field = |section: Option<&str>, key: &str| -> Value {
            let scope = match section {
                Some(name) => manifest.get(name),
                None => Some(manifest),
            };
            scope
                .and_then(|s| s.get(key))
                .cloned()
                .unwrap_or(Value::Null)
        };
        Self {
            receipt_id: field(None, "receipt_id"),
            sha256: field(Some("content"), "sha256"),
            media_type: field(Some("source"), "media_type"),
            byte_size: field(Some("source"), "byte_size"),
            ingested_at: field(None, "ingested_at"),
            object_path: field(Some("content"), "object_path"),
            manifest_path: manifest_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_flattens_nested_sections() {
        let manifest = json!({
            "receipt_id": "rcpt_0011223344556677",
            "ingested_at": "2024-01-01T00:00:00Z",
            "source": {"media_type": "application/pdf", "byte_size": 1024},
            "content": {"sha256": "00112233", "object_path": "objects/sha256/00/11/00112233"},
        });
        let record = ExportRecord::project(&manifest, "receipts/rcpt_0011223344556677/manifest.v1.json");
        assert_eq!(record.receipt_id, "rcpt_0011223344556677");
        assert_eq!(record.sha256, "00112233");
        assert_eq!(record.media_type, "application/pdf");
        assert_eq!(record.byte_size, 1024);
        assert_eq!(record.object_path, "objects/sha256/00/11/00112233");
        assert_eq!(
            record.manifest_path,
            "receipts/rcpt_0011223344556677/manifest.v1.json"
        );
    }

    #[test]
    fn missing_fields_become_null() {
        let record = ExportRecord::project(&json!({"receipt_id": "rcpt_x"}), "m.json");
        assert_eq!(record.receipt_id, "rcpt_x");
        assert!(record.sha256.is_null());
        assert!(record.media_type.is_null());
        assert!(record.byte_size.is_null());
        assert!(record.ingested_at.is_null());
        assert!(record.object_path.is_null());
    }

    #[test]
    fn non_object_manifest_projects_to_nulls() {
        let record = ExportRecord::project(&json!([1, 2, 3]), "m.json");
        assert!(record.receipt_id.is_null());
        assert!(record.sha256.is_null());
    }
}
