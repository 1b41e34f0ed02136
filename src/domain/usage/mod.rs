//! Usage quota domain
//!
//! Tier limits, per-user counters, the quota gate and the alerts derived
//! from them. Everything here is pure; I/O lives behind [`UsageBackend`].

mod alert;
mod analytics;
mod evaluator;
mod event;
mod repository;
mod stats;
mod tier;

pub use alert::{
    alerts_for, recommended_upgrade, AlertType, UsageAlert, UsageCheckResult, CRITICAL_THRESHOLD,
    WARNING_THRESHOLD,
};
pub use analytics::{DailyUsage, FeatureUsage, PeakUsageHour, UsageAnalytics};
pub use evaluator::{check_usage_limit, is_allowed};
pub use event::{
    EventMetadata, UsageEvent, UsageEventId, UsageEventType, UsageFeature, DATA_SIZE_KEY,
};
pub use repository::{BatchSyncResponse, UsageBackend};
pub use stats::{PercentagesUsed, UsageCounters, UsagePeriod, UsageStats};
pub use tier::{
    limits_for, Limit, LimitValue, SubscriptionTier, UsageLimits, UNLIMITED_PERCENTAGE,
};

#[cfg(test)]
pub use repository::MockUsageBackend;

/// Validate a user ID before it is placed in a request path.
///
/// IDs are opaque and get percent-encoded as one path segment, so only
/// values that cannot name a segment at all are rejected.
pub fn validate_user_id(id: &str) -> Result<(), UserIdValidationError> {
    if id.is_empty() {
        return Err(UserIdValidationError::Empty);
    }

    if id.chars().all(|c| c == '.') {
        return Err(UserIdValidationError::DotSegment);
    }

    Ok(())
}

/// User ID validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum UserIdValidationError {
    Empty,
    DotSegment,
}

impl std::fmt::Display for UserIdValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "User ID cannot be empty"),
            Self::DotSegment => write!(f, "User ID cannot consist only of dots"),
        }
    }
}

impl std::error::Error for UserIdValidationError {}
