use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::IndexStorage;

/// In-process storage, used by tests and ephemeral engines.
///
/// Clones share the same blobs.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    location: String,
    blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            blobs: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl IndexStorage for MemoryStorage {
    fn location(&self) -> &str {
        &self.location
    }

    fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.blobs.lock().get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}/{name}", self.location))
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.lock().contains_key(name)
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.blobs.lock().keys().cloned().collect())
    }
}
