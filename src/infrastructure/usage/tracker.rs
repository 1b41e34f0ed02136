//! Usage tracker: quota gate, local accounting and event sync

use std::collections::HashMap;
use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::offline_queue::OfflineEventQueue;
use super::stats_cache::{StatsCacheConfig, UsageStatsCache};
use crate::domain::storage::KeyValueStore;
use crate::domain::usage::{
    alerts_for, check_usage_limit, EventMetadata, SubscriptionTier, UsageAlert, UsageAnalytics,
    UsageBackend, UsageCheckResult, UsageEvent, UsageEventType, UsageStats,
};
use crate::domain::DomainError;

/// Above this many idle per-user locks the map is pruned
const USER_LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Outcome of flushing the offline queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Tracker tuning
#[derive(Debug, Clone)]
pub struct UsageTrackerConfig {
    pub stats_ttl: Duration,
    pub cache_capacity: u64,
}

impl Default for UsageTrackerConfig {
    fn default() -> Self {
        let cache = StatsCacheConfig::default();
        Self {
            stats_ttl: cache.ttl,
            cache_capacity: cache.max_capacity,
        }
    }
}

/// Trait for the usage tracker
#[async_trait]
pub trait UsageTrackerTrait: Send + Sync + Debug {
    /// Gate and record an action. Never fails: any internal error allows it.
    async fn track_usage(
        &self,
        user_id: &str,
        event_type: UsageEventType,
        metadata: Option<EventMetadata>,
    ) -> UsageCheckResult;

    /// Evaluate an action against current stats without recording it
    async fn check_usage_limit(
        &self,
        user_id: &str,
        event_type: UsageEventType,
        metadata: Option<EventMetadata>,
    ) -> UsageCheckResult;

    /// Current stats, from cache unless stale or `force_refresh`
    async fn get_user_usage_stats(&self, user_id: &str, force_refresh: bool) -> UsageStats;

    /// Warning and critical alerts for the current stats
    async fn get_user_usage_alerts(&self, user_id: &str) -> Vec<UsageAlert>;

    /// Change a user's plan remotely and drop the cached stats
    async fn update_subscription_tier(
        &self,
        user_id: &str,
        tier: SubscriptionTier,
    ) -> Result<(), DomainError>;

    /// Start a new billing period remotely and drop the cached stats
    async fn reset_usage_for_new_period(&self, user_id: &str) -> Result<(), DomainError>;

    /// Push every queued event in one batch
    async fn sync_pending_usage(&self) -> Result<SyncReport, DomainError>;

    /// Usage report for a date range
    async fn get_usage_analytics(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UsageAnalytics, DomainError>;

    /// Number of events waiting for sync
    async fn pending_event_count(&self) -> Result<usize, DomainError>;
}

/// Usage tracker implementation
#[derive(Debug)]
pub struct UsageTracker {
    backend: Arc<dyn UsageBackend>,
    cache: UsageStatsCache,
    queue: OfflineEventQueue,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    sync_lock: Mutex<()>,
    online: AtomicBool,
}

impl UsageTracker {
    pub fn new(backend: Arc<dyn UsageBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(backend, store, UsageTrackerConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn UsageBackend>,
        store: Arc<dyn KeyValueStore>,
        config: UsageTrackerConfig,
    ) -> Self {
        let cache_config = StatsCacheConfig::default()
            .with_ttl(config.stats_ttl)
            .with_max_capacity(config.cache_capacity);

        Self {
            cache: UsageStatsCache::with_config(backend.clone(), cache_config),
            backend,
            queue: OfflineEventQueue::new(store),
            user_locks: Mutex::new(HashMap::new()),
            sync_lock: Mutex::new(()),
            online: AtomicBool::new(true),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record connectivity. Coming back online flushes the queue right away
    /// and returns the flush report.
    pub async fn set_online(&self, online: bool) -> Result<Option<SyncReport>, DomainError> {
        let was_online = self.online.swap(online, Ordering::SeqCst);

        match (was_online, online) {
            (false, true) => {
                info!("Connectivity restored, flushing pending usage events");
                self.sync_pending_usage().await.map(Some)
            }
            (true, false) => {
                info!("Connectivity lost, usage events will be queued");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;

        if locks.len() > USER_LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn try_track_usage(
        &self,
        user_id: &str,
        event_type: UsageEventType,
        metadata: Option<EventMetadata>,
    ) -> Result<UsageCheckResult, DomainError> {
        let event = UsageEvent::new(user_id, event_type).with_metadata(metadata.unwrap_or_default());

        let result = {
            let lock = self.user_lock(user_id).await;
            let _guard = lock.lock().await;

            let mut stats = self.cache.get(user_id, false).await;
            let result = check_usage_limit(&stats, event_type, Some(&event.metadata));

            if !result.allowed {
                debug!(user_id = %user_id, event_type = %event_type, "Usage limit reached");
                return Ok(result);
            }

            stats.record(&event);
            self.cache.put(user_id, stats).await;
            result
        };

        self.sync_or_enqueue(event).await?;
        Ok(result)
    }

    async fn sync_or_enqueue(&self, mut event: UsageEvent) -> Result<(), DomainError> {
        if !self.is_online() {
            self.queue.enqueue(event).await?;
            return Ok(());
        }

        match self.backend.sync_events(std::slice::from_ref(&event)).await {
            Ok(response) if response.success => {
                event.mark_synced();
                debug!(event_id = %event.id(), "Usage event synced");
                Ok(())
            }
            Ok(_) => {
                warn!(event_id = %event.id(), "Backend rejected usage event, queued for retry");
                self.queue.enqueue(event).await.map(|_| ())
            }
            Err(e) => {
                warn!(event_id = %event.id(), error = %e, "Usage event sync failed, queued for retry");
                self.queue.enqueue(event).await.map(|_| ())
            }
        }
    }
}

#[async_trait]
impl UsageTrackerTrait for UsageTracker {
    async fn track_usage(
        &self,
        user_id: &str,
        event_type: UsageEventType,
        metadata: Option<EventMetadata>,
    ) -> UsageCheckResult {
        let outcome = AssertUnwindSafe(self.try_track_usage(user_id, event_type, metadata))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(user_id = %user_id, event_type = %event_type, error = %e, "Usage tracking failed, allowing action");
                UsageCheckResult::allow()
            }
            Err(_) => {
                warn!(user_id = %user_id, event_type = %event_type, "Usage tracking panicked, allowing action");
                UsageCheckResult::allow()
            }
        }
    }

    async fn check_usage_limit(
        &self,
        user_id: &str,
        event_type: UsageEventType,
        metadata: Option<EventMetadata>,
    ) -> UsageCheckResult {
        let stats = self.cache.get(user_id, false).await;
        check_usage_limit(&stats, event_type, metadata.as_ref())
    }

    async fn get_user_usage_stats(&self, user_id: &str, force_refresh: bool) -> UsageStats {
        self.cache.get(user_id, force_refresh).await
    }

    async fn get_user_usage_alerts(&self, user_id: &str) -> Vec<UsageAlert> {
        let stats = self.cache.get(user_id, false).await;
        alerts_for(&stats)
    }

    async fn update_subscription_tier(
        &self,
        user_id: &str,
        tier: SubscriptionTier,
    ) -> Result<(), DomainError> {
        self.backend.update_tier(user_id, tier).await?;
        self.cache.invalidate(user_id).await;

        info!(user_id = %user_id, tier = %tier, "Subscription tier updated");
        Ok(())
    }

    async fn reset_usage_for_new_period(&self, user_id: &str) -> Result<(), DomainError> {
        self.backend.reset_period(user_id).await?;
        self.cache.invalidate(user_id).await;

        info!(user_id = %user_id, "Usage period reset");
        Ok(())
    }

    async fn sync_pending_usage(&self) -> Result<SyncReport, DomainError> {
        let _guard = self.sync_lock.lock().await;

        let pending = self.queue.pending().await?;
        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        let count = pending.len();
        if !self.is_online() {
            debug!(pending = count, "Offline, skipping usage sync");
            return Ok(SyncReport {
                synced: 0,
                failed: count,
            });
        }

        match self.backend.sync_events(&pending).await {
            Ok(response) if response.success => {
                let ids: Vec<_> = pending.iter().map(|e| e.id().clone()).collect();
                self.queue.remove(&ids).await?;

                info!(synced = count, "Pending usage events synced");
                Ok(SyncReport {
                    synced: count,
                    failed: 0,
                })
            }
            Ok(response) => {
                warn!(
                    pending = count,
                    failed_count = response.failed_count,
                    "Backend rejected usage batch"
                );
                Ok(SyncReport {
                    synced: 0,
                    failed: count,
                })
            }
            Err(e) => {
                warn!(pending = count, error = %e, "Usage batch sync failed");
                Ok(SyncReport {
                    synced: 0,
                    failed: count,
                })
            }
        }
    }

    async fn get_usage_analytics(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UsageAnalytics, DomainError> {
        if start > end {
            return Err(DomainError::validation(
                "Analytics start date must not be after end date",
            ));
        }

        self.backend.fetch_analytics(user_id, start, end).await
    }

    async fn pending_event_count(&self) -> Result<usize, DomainError> {
        self.queue.len().await
    }
}
