use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use fdl_types::Digest;
use sha2::{Digest as _, Sha256};

/// Read size used when streaming files and readers through the hasher.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// SHA-256 content hasher.
///
/// Unlike a domain-separated hasher, the digest is computed over the raw
/// bytes only: the on-disk object path is `sha256(bytes)` so that any
/// standard tool (`sha256sum`) can re-verify a stored object.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash an in-memory buffer.
    pub fn hash(data: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Digest::from_hash(hasher.finalize().into())
    }

    /// Hash everything a reader yields, in `CHUNK_SIZE` pieces.
    pub fn hash_reader<R: Read>(mut reader: R) -> Result<Digest, HasherError> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HasherError::Read(e)),
            };
            hasher.update(&buf[..n]);
        }
        Ok(Digest::from_hash(hasher.finalize().into()))
    }

    /// Hash the contents of a file.
    pub fn hash_file(path: &Path) -> Result<Digest, HasherError> {
        let file = File::open(path).map_err(HasherError::Read)?;
        Self::hash_reader(file)
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    #[error("read error: {0}")]
    Read(#[source] io::Error),
}

impl From<HasherError> for io::Error {
    fn from(err: HasherError) -> Self {
        match err {
            HasherError::Read(e) => e,
        }
    }
}
