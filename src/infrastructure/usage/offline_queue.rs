//! Persisted queue of usage events awaiting sync

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::storage::KeyValueStore;
use crate::domain::usage::{UsageEvent, UsageEventId};
use crate::domain::DomainError;

/// Storage key holding the pending events as a JSON array
pub const PENDING_EVENTS_KEY: &str = "@rapidtriage/pending_usage_events";

/// Unsynced events, persisted through a [`KeyValueStore`].
///
/// Every mutation is a read-modify-write of the whole list and runs under
/// an internal lock, so concurrent enqueue and remove never lose events.
#[derive(Debug)]
pub struct OfflineEventQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl OfflineEventQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, PENDING_EVENTS_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the queue. An unparseable value is moved aside under a
    /// `.corrupt-<timestamp>` key and the queue restarts empty.
    async fn load(&self) -> Result<Vec<UsageEvent>, DomainError> {
        let raw = match self.store.get(&self.key).await? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };

        match serde_json::from_str(&raw) {
            Ok(events) => Ok(events),
            Err(e) => {
                let quarantine_key = format!(
                    "{}.corrupt-{}",
                    self.key,
                    Utc::now().format("%Y%m%dT%H%M%S%3fZ")
                );
                self.store.set(&quarantine_key, &raw).await?;
                self.store.remove(&self.key).await?;

                warn!(
                    key = %self.key,
                    quarantine_key = %quarantine_key,
                    error = %e,
                    "Corrupt pending event queue moved aside"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, events: &[UsageEvent]) -> Result<(), DomainError> {
        if events.is_empty() {
            self.store.remove(&self.key).await?;
            return Ok(());
        }

        let raw = serde_json::to_string(events)?;
        self.store.set(&self.key, &raw).await
    }

    /// Append an event; an event already queued under the same ID is kept once.
    /// Returns the queue length afterwards.
    pub async fn enqueue(&self, event: UsageEvent) -> Result<usize, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.load().await?;

        if !events.iter().any(|e| e.id() == event.id()) {
            debug!(event_id = %event.id(), user_id = %event.user_id, "Queued usage event");
            events.push(event);
            self.save(&events).await?;
        }

        Ok(events.len())
    }

    /// Snapshot of the queued events, oldest first
    pub async fn pending(&self) -> Result<Vec<UsageEvent>, DomainError> {
        let _guard = self.write_lock.lock().await;
        self.load().await
    }

    /// Drop the given events, returns how many were removed
    pub async fn remove(&self, ids: &[UsageEventId]) -> Result<usize, DomainError> {
        let _guard = self.write_lock.lock().await;
        let ids: HashSet<&UsageEventId> = ids.iter().collect();

        let mut events = self.load().await?;
        let before = events.len();
        events.retain(|e| !ids.contains(e.id()));
        let removed = before - events.len();

        if removed > 0 {
            self.save(&events).await?;
        }

        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock().await;
        self.save(&[]).await
    }

    pub async fn len(&self) -> Result<usize, DomainError> {
        Ok(self.pending().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }
}
