use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::trace;

use crate::atomic::parent_dir;

/// Advisory exclusive lock held on an open file.
///
/// The lock is taken through [`fs2::FileExt`] (`flock` on unix,
/// `LockFileEx` on windows) and released when the guard is dropped, on every
/// exit path. The lock belongs to the open file handle, so two handles opened
/// separately contend even inside one process.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Open (creating if needed) `path` for read and append, then block until
    /// the exclusive lock is held.
    pub fn acquire(path: &Path) -> io::Result<Self> {
        fs::create_dir_all(parent_dir(path))?;
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        lock_exclusive(&file)?;
        trace!(path = %path.display(), "acquired file lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// The locked file, positioned for appends.
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well; unlocking first
        // makes the release independent of when the handle is closed.
        let _ = FileExt::unlock(&self.file);
        trace!(path = %self.path.display(), "released file lock");
    }
}

fn lock_exclusive(file: &File) -> io::Result<()> {
    loop {
        match FileExt::lock_exclusive(file) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
