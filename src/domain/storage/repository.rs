//! Key-value persistence trait

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Device-local string key-value store.
///
/// Values are opaque strings; callers serialize their own JSON.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Reads a value, `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Writes a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Removes a value, returns true if it existed
    async fn remove(&self, key: &str) -> Result<bool, DomainError>;
}
