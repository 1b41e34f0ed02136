//! Per-user usage stats cache backed by moka
//!
//! Entries are not evicted on age. Freshness is checked on read so a stale
//! entry can still be served when the backend is unreachable.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::usage::{UsageBackend, UsageStats};

/// Configuration for the stats cache
#[derive(Debug, Clone)]
pub struct StatsCacheConfig {
    /// Age after which an entry is refetched
    pub ttl: Duration,
    /// Maximum number of users kept
    pub max_capacity: u64,
}

impl Default for StatsCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            max_capacity: 10_000,
        }
    }
}

impl StatsCacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

#[derive(Debug, Clone)]
struct CachedStats {
    stats: UsageStats,
    stored_at: Instant,
}

/// Cache of [`UsageStats`] keyed by user ID
#[derive(Debug)]
pub struct UsageStatsCache {
    backend: Arc<dyn UsageBackend>,
    entries: MokaCache<String, CachedStats>,
    ttl: Duration,
}

impl UsageStatsCache {
    pub fn new(backend: Arc<dyn UsageBackend>) -> Self {
        Self::with_config(backend, StatsCacheConfig::default())
    }

    pub fn with_config(backend: Arc<dyn UsageBackend>, config: StatsCacheConfig) -> Self {
        Self {
            backend,
            entries: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .build(),
            ttl: config.ttl,
        }
    }

    /// Stats for a user. Never fails.
    ///
    /// A fresh entry is returned as is unless `force_refresh` is set.
    /// Otherwise the backend is asked; a missing record yields (and caches)
    /// the free-tier default, and a failed request falls back to the stale
    /// entry or, without one, to the default.
    pub async fn get(&self, user_id: &str, force_refresh: bool) -> UsageStats {
        let cached = self.entries.get(user_id).await;

        if !force_refresh {
            if let Some(entry) = &cached {
                if entry.stored_at.elapsed() < self.ttl {
                    debug!(user_id = %user_id, "Usage stats cache hit");
                    return entry.stats.clone();
                }
            }
        }

        debug!(user_id = %user_id, force_refresh, "Fetching usage stats");

        match self.backend.fetch_stats(user_id).await {
            Ok(Some(stats)) => {
                self.put(user_id, stats.clone()).await;
                stats
            }
            Ok(None) => {
                let stats = UsageStats::default_for(user_id);
                self.put(user_id, stats.clone()).await;
                stats
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!(user_id = %user_id, error = %e, "Stats fetch failed, serving stale entry");
                    entry.stats
                }
                None => {
                    warn!(user_id = %user_id, error = %e, "Stats fetch failed, using free-tier defaults");
                    UsageStats::default_for(user_id)
                }
            },
        }
    }

    /// Overwrite the entry for a user; it counts as fresh from now
    pub async fn put(&self, user_id: &str, stats: UsageStats) {
        self.entries
            .insert(
                user_id.to_string(),
                CachedStats {
                    stats,
                    stored_at: Instant::now(),
                },
            )
            .await;
    }

    /// Drop the entry so the next read goes to the backend
    pub async fn invalidate(&self, user_id: &str) {
        self.entries.invalidate(user_id).await;
    }

    /// Entry regardless of age, without touching the backend
    pub async fn peek(&self, user_id: &str) -> Option<UsageStats> {
        self.entries.get(user_id).await.map(|entry| entry.stats)
    }
}
