use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::IndexStorage;

/// Directory-backed storage.
///
/// Blobs are written to a temporary file in the same directory, synced and
/// renamed over the target, so a crash mid-write leaves the old blob intact.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
    location: String,
}

impl FsStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        let location = dir.display().to_string();
        Self { dir, location }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> io::Result<PathBuf> {
        // Blob names are flat; refuse anything that could escape the directory
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob name: {name:?}"),
            ));
        }
        Ok(self.dir.join(name))
    }
}

impl IndexStorage for FsStorage {
    fn location(&self) -> &str {
        &self.location
    }

    fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.path_of(name)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;

        tracing::trace!(target: "storage", "wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(name)?)
    }

    fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_ok_and(|p| p.is_file())
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    // Skip in-flight temporary files
                    if !name.starts_with(".tmp") {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
