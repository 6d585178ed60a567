use std::path::{Component, Path, PathBuf};

use fdl_types::{Digest, ReceiptId};

/// Pure mapping from a store root to the on-disk namespace.
///
/// Every other component obtains its paths here; nothing else builds a path
/// shape on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Store root used when none is configured.
    pub const DEFAULT_ROOT: &'static str = "./data";
    /// File name of a manifest inside its receipt directory.
    pub const MANIFEST_FILE: &'static str = "manifest.v1.json";

    const OBJECTS_DIR: &'static str = "objects";
    const HASH_ALGORITHM: &'static str = "sha256";
    const STAGING_DIR: &'static str = "staging";
    const RECEIPTS_DIR: &'static str = "receipts";
    const OBSERVATIONS_DIR: &'static str = "observations";
    const OCR_FILE: &'static str = "ocr.v1.json";
    const PDF_PAGES_FILE: &'static str = "pdf_pages.v1.json";
    const EVENTS_DIR: &'static str = "events";
    const EVENTS_FILE: &'static str = "events.v1.jsonl";
    const EXPORTS_DIR: &'static str = "exports";
    const RECEIPTS_EXPORT_FILE: &'static str = "receipts.v1.jsonl";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ---- objects ----

    /// `objects/sha256`
    pub fn objects_root(&self) -> PathBuf {
        self.root.join(Self::OBJECTS_DIR).join(Self::HASH_ALGORITHM)
    }

    /// `objects/sha256/<hash[0:2]>/<hash[2:4]>/<hash>`
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        let (a, b) = digest.shards();
        self.objects_root().join(a).join(b).join(digest.to_hex())
    }

    /// Scratch directory for object writes that are not yet addressable.
    /// Lives under `objects/` so the final rename stays on one file system.
    pub fn objects_staging_dir(&self) -> PathBuf {
        self.root.join(Self::OBJECTS_DIR).join(Self::STAGING_DIR)
    }

    // ---- receipts ----

    /// `receipts`
    pub fn receipts_root(&self) -> PathBuf {
        self.root.join(Self::RECEIPTS_DIR)
    }

    /// `receipts/<receipt_id>`
    pub fn receipt_dir(&self, receipt_id: &ReceiptId) -> PathBuf {
        self.receipts_root().join(receipt_id.as_str())
    }

    /// `receipts/<receipt_id>/manifest.v1.json`
    pub fn manifest_path(&self, receipt_id: &ReceiptId) -> PathBuf {
        self.receipt_dir(receipt_id).join(Self::MANIFEST_FILE)
    }

    /// `receipts/<receipt_id>/observations/ocr.v1.json`
    pub fn ocr_path(&self, receipt_id: &ReceiptId) -> PathBuf {
        self.receipt_dir(receipt_id)
            .join(Self::OBSERVATIONS_DIR)
            .join(Self::OCR_FILE)
    }

    /// `receipts/<receipt_id>/observations/pdf_pages.v1.json`
    pub fn pdf_pages_path(&self, receipt_id: &ReceiptId) -> PathBuf {
        self.receipt_dir(receipt_id)
            .join(Self::OBSERVATIONS_DIR)
            .join(Self::PDF_PAGES_FILE)
    }

    // ---- events & exports ----

    /// `events/events.v1.jsonl`
    pub fn events_path(&self) -> PathBuf {
        self.root.join(Self::EVENTS_DIR).join(Self::EVENTS_FILE)
    }

    /// `exports`
    pub fn exports_root(&self) -> PathBuf {
        self.root.join(Self::EXPORTS_DIR)
    }

    /// `exports/receipts.v1.jsonl`
    pub fn receipts_export_path(&self) -> PathBuf {
        self.exports_root().join(Self::RECEIPTS_EXPORT_FILE)
    }

    // ---- references ----

    /// Strip the store root from `path` when it lies under it; otherwise
    /// return `path` unchanged.
    pub fn relative_to_root(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path.to_path_buf(),
        }
    }

    /// The string form of a path as recorded inside manifests and events:
    /// store-relative, `/`-separated.
    pub fn to_ref(&self, path: &Path) -> String {
        let rel = self.relative_to_root(path);
        if rel.is_absolute() {
            return rel.to_string_lossy().into_owned();
        }
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                Component::ParentDir => Some("..".into()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Resolve a recorded reference back to a path: relative references are
    /// joined onto the store root, absolute ones are used as-is.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROOT)
    }
}
