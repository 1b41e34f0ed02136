//! Storage factory for runtime storage selection

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::storage::KeyValueStore;

use super::file::FileKeyValueStore;
use super::in_memory::InMemoryKeyValueStore;

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    #[serde(alias = "inmemory", alias = "in-memory", alias = "in_memory")]
    Memory,
    /// Files in a local directory
    #[serde(alias = "files", alias = "fs")]
    File,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// File storage rooted at a directory
    File(PathBuf),
}

impl StorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Creates a file storage configuration
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        Self::File(dir.into())
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::Memory,
            Self::File(_) => StorageType::File,
        }
    }
}

/// Factory for creating storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates a key-value store based on the configuration
    pub fn create(config: &StorageConfig) -> Arc<dyn KeyValueStore> {
        match config {
            StorageConfig::InMemory => Arc::new(InMemoryKeyValueStore::new()),
            StorageConfig::File(dir) => Arc::new(FileKeyValueStore::new(dir.clone())),
        }
    }
}
