//! Usage tracking infrastructure

mod offline_queue;
mod stats_cache;
mod sync;
mod tracker;

pub use offline_queue::{OfflineEventQueue, PENDING_EVENTS_KEY};
pub use stats_cache::{StatsCacheConfig, UsageStatsCache};
pub use sync::PeriodicSync;
pub use tracker::{SyncReport, UsageTracker, UsageTrackerConfig, UsageTrackerTrait};
