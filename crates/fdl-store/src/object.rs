use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use fdl_crypto::ContentHasher;
use fdl_types::Digest;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::atomic::sync_parent;
use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};
use crate::layout::Layout;

/// Result of storing one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    pub digest: Digest,
    /// Absolute (root-joined) path of the stored object.
    pub path: PathBuf,
    /// `true` if the object was already present and nothing was written.
    pub already_existed: bool,
}

/// Deduplicating blob store keyed by content digest.
///
/// Invariants every implementation upholds:
/// - Objects are immutable once written; a second put of the same content
///   performs no write.
/// - An object path never becomes visible with partial content.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store an in-memory buffer. `suffix_hint` (e.g. `".png"`) only affects
    /// the name of the intermediate temp file.
    fn put_bytes(&self, data: &[u8], suffix_hint: Option<&str>) -> StoreResult<PutOutcome>;

    /// Store the contents of a file.
    ///
    /// Returns [`StoreError::SourceNotFound`] if `source` does not exist.
    fn put_file(&self, source: &Path) -> StoreResult<PutOutcome>;

    /// Where the object for `digest` lives (whether or not it exists).
    fn path(&self, digest: &Digest) -> PathBuf;

    fn exists(&self, digest: &Digest) -> bool {
        self.path(digest).is_file()
    }

    /// Open a stored object for reading. `Ok(None)` if it is absent.
    fn open(&self, digest: &Digest) -> StoreResult<Option<File>> {
        match File::open(self.path(digest)) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a whole object into memory. `Ok(None)` if it is absent.
    fn read(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let Some(mut file) = self.open(digest)? else {
            return Ok(None);
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }
}

/// File-system object store under `objects/sha256/`.
///
/// New content is staged in `objects/staging/` and moved into its sharded
/// location with a no-clobber rename, so concurrent puts of the same content
/// settle on one file and readers never see a partial object.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    layout: Layout,
    sync_mode: SyncMode,
}

impl FsObjectStore {
    pub fn new(layout: Layout, sync_mode: SyncMode) -> Self {
        Self { layout, sync_mode }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn staging_file(&self, suffix_hint: Option<&str>) -> StoreResult<NamedTempFile> {
        let dir = self.layout.objects_staging_dir();
        fs::create_dir_all(&dir)?;
        let mut builder = tempfile::Builder::new();
        builder.prefix(".tmp-");
        if let Some(suffix) = suffix_hint {
            builder.suffix(suffix);
        }
        Ok(builder.tempfile_in(&dir)?)
    }

    /// Move a fully written staging file to the object path for `digest`.
    fn commit(&self, temp: NamedTempFile, digest: Digest) -> StoreResult<PutOutcome> {
        if self.sync_mode.syncs() {
            temp.as_file().sync_all()?;
        }
        let path = self.layout.object_path(&digest);
        if let Some(shard) = path.parent() {
            fs::create_dir_all(shard)?;
        }
        let already_existed = match temp.persist_noclobber(&path) {
            Ok(_) => {
                sync_parent(&path, self.sync_mode)?;
                debug!(digest = %digest, path = %path.display(), "stored object");
                false
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(digest = %digest, "object appeared concurrently; keeping existing");
                true
            }
            Err(e) => return Err(e.error.into()),
        };
        Ok(PutOutcome {
            digest,
            path,
            already_existed,
        })
    }

    fn existing(&self, digest: Digest) -> PutOutcome {
        debug!(digest = %digest, "object already stored");
        PutOutcome {
            path: self.layout.object_path(&digest),
            digest,
            already_existed: true,
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn put_bytes(&self, data: &[u8], suffix_hint: Option<&str>) -> StoreResult<PutOutcome> {
        let digest = ContentHasher::hash(data);
        if self.exists(&digest) {
            return Ok(self.existing(digest));
        }
        let mut temp = self.staging_file(suffix_hint)?;
        temp.as_file_mut().write_all(data)?;
        self.commit(temp, digest)
    }

    fn put_file(&self, source: &Path) -> StoreResult<PutOutcome> {
        let digest = match ContentHasher::hash_file(source) {
            Ok(digest) => digest,
            Err(e) => {
                let err = io::Error::from(e);
                if err.kind() == io::ErrorKind::NotFound {
                    return Err(StoreError::SourceNotFound(source.to_path_buf()));
                }
                return Err(err.into());
            }
        };
        if self.exists(&digest) {
            return Ok(self.existing(digest));
        }

        let suffix = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()));
        let mut temp = self.staging_file(suffix.as_deref())?;
        let mut reader = File::open(source)?;
        io::copy(&mut reader, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;

        // The source may have changed since it was hashed; the staged copy
        // is what gets stored, so it must carry the digest we return.
        let copied = ContentHasher::hash_file(temp.path()).map_err(io::Error::from)?;
        if copied != digest {
            return Err(StoreError::SourceChanged {
                path: source.to_path_buf(),
                expected: digest,
                actual: copied,
            });
        }
        self.commit(temp, digest)
    }

    fn path(&self, digest: &Digest) -> PathBuf {
        self.layout.object_path(digest)
    }
}
