//! Remote usage backend trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::{SubscriptionTier, UsageAnalytics, UsageEvent, UsageStats};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Backend acknowledgement for a batch of events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSyncResponse {
    pub success: bool,
    #[serde(default)]
    pub synced_count: usize,
    #[serde(default)]
    pub failed_count: usize,
}

/// The usage endpoints of the RapidTriage REST API
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageBackend: Send + Sync + Debug {
    /// Current-period stats for a user; `None` when the backend has no record
    async fn fetch_stats(&self, user_id: &str) -> Result<Option<UsageStats>, DomainError>;

    /// Submit events in one batch
    async fn sync_events(&self, events: &[UsageEvent]) -> Result<BatchSyncResponse, DomainError>;

    /// Tell the backend a user's plan changed
    async fn update_tier(&self, user_id: &str, tier: SubscriptionTier) -> Result<(), DomainError>;

    /// Start a new billing period for a user
    async fn reset_period(&self, user_id: &str) -> Result<(), DomainError>;

    /// Usage report for a date range
    async fn fetch_analytics(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UsageAnalytics, DomainError>;
}
