use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fdl_types::{ContentRef, Digest, Manifest, ReceiptId, SourceInfo, Timestamp};
use tracing::debug;

use crate::canonical;
use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};
use crate::layout::Layout;

/// Result of [`ManifestStore::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestWrite {
    pub path: PathBuf,
    /// `false` when a manifest already existed and was left untouched.
    pub created: bool,
}

/// One immutable manifest document per receipt id.
///
/// A manifest is created at most once. Later writes for the same receipt id
/// return the existing path and change nothing, even if they carry different
/// metadata or a different timestamp.
#[derive(Clone, Debug)]
pub struct ManifestStore {
    layout: Layout,
    sync_mode: SyncMode,
}

impl ManifestStore {
    pub fn new(layout: Layout, sync_mode: SyncMode) -> Self {
        Self { layout, sync_mode }
    }

    pub fn path(&self, receipt_id: &ReceiptId) -> PathBuf {
        self.layout.manifest_path(receipt_id)
    }

    pub fn exists(&self, receipt_id: &ReceiptId) -> bool {
        self.path(receipt_id).is_file()
    }

    /// Create the manifest for `receipt_id` unless one exists.
    ///
    /// `object_path` is recorded relative to the store root. `ingested_at`
    /// defaults to the current UTC time.
    pub fn write(
        &self,
        receipt_id: &ReceiptId,
        digest: &Digest,
        source: SourceInfo,
        object_path: &Path,
        ingested_at: Option<Timestamp>,
    ) -> StoreResult<ManifestWrite> {
        if !receipt_id.matches(digest) {
            return Err(StoreError::ReceiptMismatch {
                receipt_id: receipt_id.clone(),
                digest: *digest,
            });
        }
        let path = self.path(receipt_id);
        if path.exists() {
            debug!(receipt_id = %receipt_id, "manifest exists; leaving it untouched");
            return Ok(ManifestWrite {
                path,
                created: false,
            });
        }

        let manifest = Manifest::new(
            receipt_id.clone(),
            ingested_at.unwrap_or_else(Timestamp::now),
            source,
            ContentRef {
                sha256: *digest,
                object_path: self.layout.to_ref(object_path),
            },
        );
        let created = canonical::write_document_new(&path, &manifest, self.sync_mode)?;
        if created {
            debug!(receipt_id = %receipt_id, path = %path.display(), "wrote manifest");
        } else {
            debug!(receipt_id = %receipt_id, "manifest created concurrently; keeping existing");
        }
        Ok(ManifestWrite { path, created })
    }

    /// The manifest bytes exactly as stored, or `None` if there is none.
    ///
    /// Not decoded: a damaged manifest need not be valid UTF-8.
    pub fn read_raw(&self, receipt_id: &ReceiptId) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path(receipt_id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse the stored manifest.
    pub fn read(&self, receipt_id: &ReceiptId) -> StoreResult<Option<Manifest>> {
        let Some(bytes) = self.read_raw(receipt_id)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::InvalidManifest {
                path: self.path(receipt_id),
                reason: e.to_string(),
            })
    }

    /// Receipt ids that have a manifest file, sorted.
    ///
    /// Directories under `receipts/` whose names are not receipt ids are
    /// ignored. A missing receipts root yields an empty list.
    pub fn list(&self) -> StoreResult<Vec<ReceiptId>> {
        let root = self.layout.receipts_root();
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Ok(id) = ReceiptId::parse(&name.to_string_lossy()) else {
                debug!(name = ?name, "skipping non-receipt directory");
                continue;
            };
            if self.exists(&id) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Best-effort media type from a file name's extension.
pub fn guess_media_type(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name)
        .first_raw()
        .map(str::to_string)
}

/// Collect [`SourceInfo`] for a file about to be ingested.
///
/// `path_hint` records `path` as the caller wrote it.
pub fn describe_source(path: &Path) -> StoreResult<SourceInfo> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::SourceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(StoreError::SourceNotFound(path.to_path_buf()));
    }
    let original_filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceInfo {
        path_hint: path.to_string_lossy().into_owned(),
        media_type: guess_media_type(&original_filename),
        original_filename,
        byte_size: metadata.len(),
    })
}
