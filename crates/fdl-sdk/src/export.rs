use std::fs;
use std::path::{Path, PathBuf};

use fdl_store::{canonical, write_replace, Layout, SyncMode};
use fdl_types::ExportRecord;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SdkResult;
use crate::verify::manifest_paths;

/// Result of rebuilding an export file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    /// Lines written.
    pub records: usize,
    /// Manifests that could not be parsed and were left out.
    pub skipped: usize,
}

/// Rebuild `out` from every manifest in the store.
///
/// The output is recomputed in full: one canonical JSON line per manifest,
/// in receipt-id order. A store with no receipts yields an empty file. The
/// new content replaces the old file in a single rename, so readers see
/// either the previous export or the complete new one.
pub fn export_receipts(layout: &Layout, out: &Path, sync_mode: SyncMode) -> SdkResult<ExportSummary> {
    let mut buf = Vec::new();
    let mut records = 0;
    let mut skipped = 0;

    for manifest_path in manifest_paths(layout)? {
        let bytes = fs::read(&manifest_path)?;
        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    path = %manifest_path.display(),
                    error = %e,
                    "skipping unreadable manifest in export"
                );
                skipped += 1;
                continue;
            }
        };
        let record = ExportRecord::project(&value, layout.to_ref(&manifest_path));
        buf.extend_from_slice(&canonical::to_canonical_line(&record)?);
        records += 1;
    }

    write_replace(out, &buf, sync_mode)?;
    info!(path = %out.display(), records, skipped, "export finished");
    Ok(ExportSummary {
        path: out.to_path_buf(),
        records,
        skipped,
    })
}
