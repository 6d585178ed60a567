use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fdl_crypto::ContentHasher;
use fdl_ledger::EventLog;
use fdl_store::{
    describe_source, FsObjectStore, Layout, ManifestStore, ObjectStore, StoreConfig, StoreError,
};
use fdl_types::{Digest, EventType, ReceiptId, Timestamp};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{SdkError, SdkResult};
use crate::export::{self, ExportSummary};
use crate::verify::{self, content_field, VerificationReport};

/// What one ingestion did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestOutcome {
    pub receipt_id: ReceiptId,
    pub digest: Digest,
    pub object_path: PathBuf,
    pub manifest_path: PathBuf,
    /// The object was already stored before this call.
    pub object_existed: bool,
    /// This call wrote the manifest.
    pub manifest_created: bool,
    /// This call appended the `receipt.ingested` event.
    pub event_appended: bool,
}

/// A receipt's manifest together with a fresh integrity check of its object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShowReport {
    pub receipt_id: ReceiptId,
    pub manifest_path: PathBuf,
    /// The manifest as stored. Bytes that are not UTF-8 show as U+FFFD.
    pub manifest_text: String,
    /// Set when `manifest_text` is not valid JSON.
    pub invalid_json: Option<String>,
    pub object_path: Option<PathBuf>,
    pub object_exists: bool,
    pub hash_match: bool,
}

impl ShowReport {
    pub fn is_healthy(&self) -> bool {
        self.invalid_json.is_none() && self.object_exists && self.hash_match
    }
}

/// High-level handle on one store root.
///
/// Holds no open files; every operation touches the file system afresh, so
/// any number of vaults (in any number of processes) may share a root.
#[derive(Clone, Debug)]
pub struct ReceiptVault {
    config: StoreConfig,
    layout: Layout,
    objects: FsObjectStore,
    manifests: ManifestStore,
    events: EventLog,
}

impl ReceiptVault {
    pub fn open(config: StoreConfig) -> Self {
        let layout = config.layout();
        Self {
            objects: FsObjectStore::new(layout.clone(), config.sync_mode),
            manifests: ManifestStore::new(layout.clone(), config.sync_mode),
            events: EventLog::new(&layout, config.sync_mode),
            layout,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn objects(&self) -> &FsObjectStore {
        &self.objects
    }

    pub fn manifests(&self) -> &ManifestStore {
        &self.manifests
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // ---- Ingestion ----

    /// Store a file, write its manifest and record `receipt.ingested`.
    pub fn ingest(&self, source: &Path) -> SdkResult<IngestOutcome> {
        self.ingest_at(source, None)
    }

    /// [`ingest`](Self::ingest) with an explicit timestamp for the manifest
    /// and the event.
    pub fn ingest_at(&self, source: &Path, at: Option<Timestamp>) -> SdkResult<IngestOutcome> {
        let info = describe_source(source).map_err(not_found)?;
        let put = self.objects.put_file(source).map_err(not_found)?;
        let receipt_id = ReceiptId::derive(&put.digest);

        let manifest =
            self.manifests
                .write(&receipt_id, &put.digest, info, &put.path, at.clone())?;

        let refs = BTreeMap::from([
            (
                "manifest_path".to_string(),
                self.layout.to_ref(&manifest.path),
            ),
            ("object_path".to_string(), self.layout.to_ref(&put.path)),
        ]);
        let event_appended = self
            .events
            .append(&receipt_id, &EventType::ingested(), refs, at)?;

        info!(
            receipt_id = %receipt_id,
            object_existed = put.already_existed,
            manifest_created = manifest.created,
            "ingested receipt"
        );
        Ok(IngestOutcome {
            receipt_id,
            digest: put.digest,
            object_path: put.path,
            manifest_path: manifest.path,
            object_existed: put.already_existed,
            manifest_created: manifest.created,
            event_appended,
        })
    }

    // ---- Readers ----

    /// Rebuild the receipts export; `out` defaults to
    /// `exports/receipts.v1.jsonl`.
    pub fn export(&self, out: Option<&Path>) -> SdkResult<ExportSummary> {
        let path = out
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.layout.receipts_export_path());
        export::export_receipts(&self.layout, &path, self.config.sync_mode)
    }

    pub fn verify(&self) -> SdkResult<VerificationReport> {
        verify::verify(&self.layout)
    }

    /// Load a manifest by id and re-check its object.
    ///
    /// An id that is not well formed cannot name a manifest and is reported
    /// as [`SdkError::ReceiptNotFound`], the same as an unknown one.
    pub fn show(&self, receipt_id: &str) -> SdkResult<ShowReport> {
        let id = ReceiptId::parse(receipt_id)
            .map_err(|_| SdkError::ReceiptNotFound(receipt_id.to_string()))?;
        let manifest_path = self.manifests.path(&id);
        let Some(raw) = self.manifests.read_raw(&id)? else {
            return Err(SdkError::ReceiptNotFound(receipt_id.to_string()));
        };

        let mut report = ShowReport {
            receipt_id: id,
            manifest_path,
            manifest_text: String::from_utf8_lossy(&raw).into_owned(),
            invalid_json: None,
            object_path: None,
            object_exists: false,
            hash_match: false,
        };
        let value: Value = match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(e) => {
                report.invalid_json = Some(e.to_string());
                return Ok(report);
            }
        };
        let Some(object_ref) = content_field(&value, "object_path") else {
            return Ok(report);
        };
        let object = self.layout.resolve(object_ref);
        report.object_exists = object.is_file();
        if report.object_exists {
            if let Some(expected) = content_field(&value, "sha256") {
                report.hash_match = ContentHasher::hash_file(&object)?.to_hex() == expected;
            }
        }
        report.object_path = Some(object);
        debug!(
            receipt_id = %report.receipt_id,
            object_exists = report.object_exists,
            hash_match = report.hash_match,
            "checked receipt"
        );
        Ok(report)
    }
}

fn not_found(err: StoreError) -> SdkError {
    match err {
        StoreError::SourceNotFound(path) => SdkError::SourceNotFound(path),
        other => other.into(),
    }
}
