//! File-backed snapshot store
//!
//! Writes go to a temp file in the same directory and are renamed over the
//! target, so a crash never leaves a half-written snapshot behind. An
//! exclusive advisory lock on a sidecar `.lock` file serializes writers from
//! different processes sharing the directory.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};
use crate::ports::SnapshotStore;

/// Snapshot store persisting the blob to a single file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<File> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        Ok(lock)
    }

    fn save_blocking(&self, blob: &[u8]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = (|| -> Result<()> {
            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(blob)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
            Ok(())
        })();

        let _ = FileExt::unlock(&lock);
        result
    }

    fn load_blocking(&self) -> Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let result = fs::read(&self.path);
        let _ = FileExt::unlock(&lock);
        Ok(Some(result?))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, blob: &[u8]) -> Result<()> {
        let store = self.clone();
        let blob = blob.to_vec();
        tokio::task::spawn_blocking(move || store.save_blocking(&blob))
            .await
            .map_err(|e| Error::persistence(format!("save task failed: {}", e)))?
    }

    async fn load(&self) -> Result<Option<Vec<u8>>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_blocking())
            .await
            .map_err(|e| Error::persistence(format!("load task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("ledger.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("ledger.json");
        let store = FileStore::new(&path);

        store.save(b"{\"version\":1,\"accounts\":[]}").await.unwrap();
        assert!(path.exists());
        assert_eq!(
            store.load().await.unwrap(),
            Some(b"{\"version\":1,\"accounts\":[]}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("ledger.json"));

        store.save(b"first, and longer").await.unwrap();
        store.save(b"second").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(b"second".to_vec()));

        // only the snapshot and its lock file remain
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["ledger.json", "ledger.json.lock"]);
    }
}
