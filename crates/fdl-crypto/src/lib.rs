//! Content hashing for the Financial Data Lab receipt store.
//!
//! Every stored object is identified by the full SHA-256 digest of its
//! bytes. The in-memory and file variants of the hasher produce identical
//! digests for identical content.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError, CHUNK_SIZE};
