use std::fs;
use std::path::{Path, PathBuf};

use fdl_crypto::ContentHasher;
use fdl_store::Layout;
use fdl_types::Digest;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::SdkResult;

/// One integrity problem found while verifying a store.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VerificationIssue {
    #[error("Invalid JSON in {}: {reason}", .manifest.display())]
    InvalidJson { manifest: PathBuf, reason: String },

    #[error("Missing object_path in {}", .manifest.display())]
    MissingObjectPath { manifest: PathBuf },

    #[error("Missing sha256 in {}", .manifest.display())]
    MissingDigest { manifest: PathBuf },

    #[error("Missing object: {}", .object.display())]
    MissingObject { manifest: PathBuf, object: PathBuf },

    #[error("Hash mismatch for {}: expected {expected}, got {actual}", .manifest.display())]
    DigestMismatch {
        manifest: PathBuf,
        expected: String,
        actual: Digest,
    },
}

impl VerificationIssue {
    /// The manifest the issue was found in.
    pub fn manifest(&self) -> &Path {
        match self {
            Self::InvalidJson { manifest, .. }
            | Self::MissingObjectPath { manifest }
            | Self::MissingDigest { manifest }
            | Self::MissingObject { manifest, .. }
            | Self::DigestMismatch { manifest, .. } => manifest,
        }
    }
}

/// Outcome of a full store verification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub manifests_checked: usize,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationReport {
    pub fn error_count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Every `receipts/<id>/manifest.v1.json` file, in receipt-id order.
///
/// A store without a receipts root has no manifests.
pub(crate) fn manifest_paths(layout: &Layout) -> SdkResult<Vec<PathBuf>> {
    let root = layout.receipts_root();
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name() == Layout::MANIFEST_FILE {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// A string field of the manifest's `content` section, if present and
/// non-empty.
pub(crate) fn content_field<'a>(manifest: &'a Value, key: &str) -> Option<&'a str> {
    manifest
        .get("content")
        .and_then(|c| c.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Re-hash every stored object and cross-check it against its manifest.
///
/// Every manifest is checked; a problem with one never stops the scan.
/// Only I/O failures reading manifests or objects abort the run.
pub fn verify(layout: &Layout) -> SdkResult<VerificationReport> {
    let mut report = VerificationReport::default();
    for manifest_path in manifest_paths(layout)? {
        report.manifests_checked += 1;
        if let Some(issue) = check_manifest(layout, &manifest_path)? {
            debug!(issue = %issue, "verification issue");
            report.issues.push(issue);
        }
    }
    info!(
        manifests = report.manifests_checked,
        errors = report.error_count(),
        "store verification finished"
    );
    Ok(report)
}

fn check_manifest(layout: &Layout, manifest_path: &Path) -> SdkResult<Option<VerificationIssue>> {
    let manifest = manifest_path.to_path_buf();
    let bytes = fs::read(manifest_path)?;
    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            return Ok(Some(VerificationIssue::InvalidJson {
                manifest,
                reason: e.to_string(),
            }))
        }
    };

    let Some(object_ref) = content_field(&value, "object_path") else {
        return Ok(Some(VerificationIssue::MissingObjectPath { manifest }));
    };
    let Some(expected) = content_field(&value, "sha256") else {
        return Ok(Some(VerificationIssue::MissingDigest { manifest }));
    };
    let object = layout.resolve(object_ref);
    if !object.is_file() {
        return Ok(Some(VerificationIssue::MissingObject { manifest, object }));
    }

    let actual = ContentHasher::hash_file(&object)?;
    if actual.to_hex() != expected {
        return Ok(Some(VerificationIssue::DigestMismatch {
            manifest,
            expected: expected.to_string(),
            actual,
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::ReceiptVault;
    use fdl_store::StoreConfig;

    fn vault(dir: &Path) -> ReceiptVault {
        ReceiptVault::open(StoreConfig::new(dir.join("store")))
    }

    fn ingest(vault: &ReceiptVault, dir: &Path, name: &str, body: &[u8]) -> crate::IngestOutcome {
        let src = dir.join(name);
        fs::write(&src, body).unwrap();
        vault.ingest(&src).unwrap()
    }

    #[test]
    fn nonexistent_store_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let report = verify(&Layout::new(dir.path().join("nowhere"))).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.manifests_checked, 0);
    }

    #[test]
    fn intact_store_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let v = vault(dir.path());
        ingest(&v, dir.path(), "a.pdf", b"one");
        ingest(&v, dir.path(), "b.png", b"two");
        let report = verify(v.layout()).unwrap();
        assert_eq!(report.manifests_checked, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn deleted_object_is_exactly_one_error() {
        let dir = tempfile::tempdir().unwrap();
        let v = vault(dir.path());
        let outcome = ingest(&v, dir.path(), "a.pdf", b"one");
        fs::remove_file(&outcome.object_path).unwrap();

        let report = verify(v.layout()).unwrap();
        assert_eq!(report.error_count(), 1);
        assert!(matches!(
            &report.issues[0],
            VerificationIssue::MissingObject { object, .. } if *object == outcome.object_path
        ));
    }

    #[test]
    fn tampered_object_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let v = vault(dir.path());
        let outcome = ingest(&v, dir.path(), "a.pdf", b"one");
        fs::write(&outcome.object_path, b"forged").unwrap();

        let report = verify(v.layout()).unwrap();
        assert_eq!(report.error_count(), 1);
        match &report.issues[0] {
            VerificationIssue::DigestMismatch { expected, actual, .. } => {
                assert_eq!(*expected, outcome.digest.to_hex());
                assert_eq!(*actual, ContentHasher::hash(b"forged"));
            }
            other => panic!("unexpected issue: {other:?}"),
        }
    }

    #[test]
    fn malformed_manifests_are_counted_and_scan_continues() {
        let dir = tempfile::tempdir().unwrap();
        let v = vault(dir.path());
        ingest(&v, dir.path(), "ok.pdf", b"fine");
        let receipts = v.layout().receipts_root();

        let write = |id: &str, text: &str| {
            let d = receipts.join(id);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join(Layout::MANIFEST_FILE), text).unwrap();
        };
        write("rcpt_0000000000000001", "{broken");
        write("rcpt_0000000000000002", r#"{"content":{"sha256":"ab"}}"#);
        write("rcpt_0000000000000003", r#"{"content":{"object_path":"objects/x"}}"#);

        let report = verify(v.layout()).unwrap();
        assert_eq!(report.manifests_checked, 4);
        assert_eq!(report.error_count(), 3);
        assert!(matches!(report.issues[0], VerificationIssue::InvalidJson { .. }));
        assert!(matches!(report.issues[1], VerificationIssue::MissingObjectPath { .. }));
        assert!(matches!(report.issues[2], VerificationIssue::MissingDigest { .. }));
        assert!(report.issues[0]
            .manifest()
            .ends_with("rcpt_0000000000000001/manifest.v1.json"));
    }

    #[test]
    fn manifest_that_is_not_utf8_is_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let v = vault(dir.path());
        ingest(&v, dir.path(), "ok.pdf", b"fine");
        let bad = v.layout().receipts_root().join("rcpt_0000000000000001");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join(Layout::MANIFEST_FILE), b"\xff\xfe{").unwrap();

        let report = verify(v.layout()).unwrap();
        assert_eq!(report.manifests_checked, 2);
        assert_eq!(report.error_count(), 1);
        assert!(matches!(report.issues[0], VerificationIssue::InvalidJson { .. }));
    }

    #[test]
    fn issue_messages() {
        let issue = VerificationIssue::MissingObject {
            manifest: PathBuf::from("m.json"),
            object: PathBuf::from("objects/sha256/aa/bb/x"),
        };
        assert_eq!(issue.to_string(), "Missing object: objects/sha256/aa/bb/x");
    }
}
