//! Status storage backends.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::StatusCells;
use crate::errors::DigestError;

/// Overwrite-only storage for the two status cells.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replaces both cells.
    async fn write(&self, cells: &StatusCells) -> Result<(), DigestError>;

    /// Returns the current cells, or `None` if nothing was written yet.
    async fn read(&self) -> Result<Option<StatusCells>, DigestError>;
}

/// Stores the cells as a JSON document.
///
/// Writes go to a temporary sibling that is renamed over the target, so a
/// reader never observes a half-written file.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    path: PathBuf,
}

impl FileStatusStore {
    /// Creates a store at `path`. Parent directories are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_else(|| "status.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn write(&self, cells: &StatusCells) -> Result<(), DigestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(cells)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), "Status file written");
        Ok(())
    }

    async fn read(&self) -> Result<Option<StatusCells>, DigestError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Keeps the cells in memory.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    cells: RwLock<Option<StatusCells>>,
    writes: RwLock<usize>,
}

impl InMemoryStatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current cells without going through the async trait.
    #[must_use]
    pub fn current(&self) -> Option<StatusCells> {
        self.cells.read().clone()
    }

    /// Number of writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.read()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn write(&self, cells: &StatusCells) -> Result<(), DigestError> {
        *self.cells.write() = Some(cells.clone());
        *self.writes.write() += 1;
        Ok(())
    }

    async fn read(&self) -> Result<Option<StatusCells>, DigestError> {
        Ok(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(summary: &str, duration: &str) -> StatusCells {
        StatusCells {
            summary: summary.into(),
            duration: duration.into(),
        }
    }

    #[tokio::test]
    async fn test_file_store_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().join("nested").join("status.json"));

        assert_eq!(store.read().await.unwrap(), None);

        store.write(&cells("completed @ t | ok", "1.00s")).await.unwrap();
        store.write(&cells("error @ t | boom", "0.20s (failed)")).await.unwrap();

        assert_eq!(
            store.read().await.unwrap(),
            Some(cells("error @ t | boom", "0.20s (failed)"))
        );
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStatusStore::new(&path).read().await.unwrap_err();
        assert_eq!(err.kind(), "SerializationError");
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let store = FileStatusStore::new("/var/lib/docdigest/status.json");
        assert_eq!(store.temp_path(), PathBuf::from("/var/lib/docdigest/status.json.tmp"));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryStatusStore::new();
        assert!(store.current().is_none());

        store.write(&cells("a", "b")).await.unwrap();
        assert_eq!(store.read().await.unwrap(), Some(cells("a", "b")));
        assert_eq!(store.write_count(), 1);
    }
}
