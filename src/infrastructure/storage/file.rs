//! File-backed key-value store
//!
//! One file per key under a base directory. Writes go to a temporary file
//! first and are renamed into place so a crash never leaves a torn value.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::domain::storage::KeyValueStore;
use crate::domain::DomainError;

/// Key-value store persisted as files in a directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `base_dir`; the directory is created on first write
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Maps a key onto a file name that is safe on every platform
    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.base_dir.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let path = self.path_for(key);

        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value).await.map_err(|e| {
            DomainError::storage(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;

        fs::rename(&tmp_path, &path).await.map_err(|e| {
            DomainError::storage(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        debug!(key = %key, bytes = value.len(), "Persisted value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, DomainError> {
        let path = self.path_for(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
