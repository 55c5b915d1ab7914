//! Durable storage for persisted indexes.
//!
//! A storage location is a flat namespace of named blobs. Writes must be
//! atomic: a reader sees either the previous blob or the new one in full,
//! never a partially written file.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use std::fmt::Debug;
use std::io;

/// Blob store backing one index location.
pub trait IndexStorage: Send + Sync + Debug {
    /// Stable identifier for this location; also the ingest lock key.
    fn location(&self) -> &str;

    /// Atomically replace the blob `name` with `bytes`.
    fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Read the blob `name`. Missing blobs fail with `io::ErrorKind::NotFound`.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    fn exists(&self, name: &str) -> bool;

    /// Names of stored blobs, sorted.
    fn list(&self) -> io::Result<Vec<String>>;
}
