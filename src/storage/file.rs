use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::StoreResult;
use crate::storage::BlobStore;

/// Blob store backed by one JSON file per key under a base directory
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        if !Path::new(&self.dir).exists() {
            fs::create_dir_all(&self.dir).await?;
        }
        fs::write(self.path(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path());

        assert!(store.load("collections-storage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("nested"));

        store.save("collections-storage", "[]").await.unwrap();
        let value = store.load("collections-storage").await.unwrap();
        assert_eq!(value.as_deref(), Some("[]"));

        store.save("collections-storage", "[1]").await.unwrap();
        let value = store.load("collections-storage").await.unwrap();
        assert_eq!(value.as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path());

        store.save("blob", "x").await.unwrap();
        store.remove("blob").await.unwrap();
        store.remove("blob").await.unwrap();

        assert!(store.load("blob").await.unwrap().is_none());
    }
}
