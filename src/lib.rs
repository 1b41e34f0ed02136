//! RapidTriage usage quotas
//!
//! Client-side enforcement of per-tier usage limits:
//! - Tier limit table and quota checks per event type
//! - Cached per-user usage stats with a fixed TTL
//! - Threshold alerts and upgrade recommendations
//! - Offline queue and batch sync of usage events
//!
//! Tracking fails open: infrastructure errors never block a user action.

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use infrastructure::http::HttpUsageBackend;
use infrastructure::storage::StorageFactory;
use infrastructure::usage::UsageTracker;
use tracing::info;

/// Create a tracker wired to the HTTP backend with default configuration
pub fn create_usage_tracker() -> anyhow::Result<Arc<UsageTracker>> {
    create_usage_tracker_with_config(&AppConfig::default())
}

/// Create a tracker from configuration
pub fn create_usage_tracker_with_config(config: &AppConfig) -> anyhow::Result<Arc<UsageTracker>> {
    let backend = Arc::new(HttpUsageBackend::new(config.backend.to_http_config())?);
    let storage_config = config.usage.storage_config();
    let store = StorageFactory::create(&storage_config);

    info!(
        backend = %config.backend.base_url,
        storage = ?storage_config.storage_type(),
        "Usage tracker initialized"
    );

    Ok(Arc::new(UsageTracker::with_config(
        backend,
        store,
        config.usage.tracker_config(),
    )))
}
