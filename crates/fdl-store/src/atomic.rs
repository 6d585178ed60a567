//! Temp-file-then-rename writes.
//!
//! A destination path only ever appears with its complete contents: bytes go
//! to a randomly named temp file in the destination directory and become
//! visible through a single rename.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::SyncMode;
use crate::error::StoreResult;

/// Write `bytes` to `path` unless it already exists.
///
/// Returns `Ok(true)` if this call created the file and `Ok(false)` if the
/// path was already present, in which case nothing is written. The check and
/// the create are one atomic no-clobber rename, so concurrent callers agree on
/// exactly one winner.
pub fn write_new(path: &Path, bytes: &[u8], sync_mode: SyncMode) -> StoreResult<bool> {
    if path.exists() {
        return Ok(false);
    }
    let temp = stage(path, bytes, sync_mode)?;
    match temp.persist_noclobber(path) {
        Ok(_) => {
            sync_parent(path, sync_mode)?;
            Ok(true)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "lost create race; keeping existing file");
            Ok(false)
        }
        Err(e) => Err(e.error.into()),
    }
}

/// Write `bytes` to `path`, replacing any existing file atomically.
pub fn write_replace(path: &Path, bytes: &[u8], sync_mode: SyncMode) -> StoreResult<()> {
    let temp = stage(path, bytes, sync_mode)?;
    temp.persist(path).map_err(|e| e.error)?;
    sync_parent(path, sync_mode)?;
    Ok(())
}

/// Create the parent directory and a filled temp file beside `path`.
fn stage(path: &Path, bytes: &[u8], sync_mode: SyncMode) -> StoreResult<NamedTempFile> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir)?;
    temp.as_file_mut().write_all(bytes)?;
    if sync_mode.syncs() {
        temp.as_file().sync_all()?;
    }
    Ok(temp)
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Make a completed rename durable by syncing the containing directory.
pub(crate) fn sync_parent(path: &Path, sync_mode: SyncMode) -> io::Result<()> {
    if !sync_mode.syncs() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        fs::File::open(parent_dir(path))?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
