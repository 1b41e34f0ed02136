//! Domain layer - usage quota rules and entities

pub mod error;
pub mod storage;
pub mod usage;

pub use error::DomainError;
pub use storage::KeyValueStore;
pub use usage::{
    SubscriptionTier, UsageAlert, UsageBackend, UsageCheckResult, UsageEvent, UsageEventType,
    UsageStats,
};
