//! Background flush of the offline event queue

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::tracker::UsageTrackerTrait;
use crate::domain::DomainError;

/// Handle to a task calling `sync_pending_usage` on a fixed interval.
///
/// The first sync runs one interval after spawning. Dropping the handle
/// aborts the task.
#[derive(Debug)]
pub struct PeriodicSync {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicSync {
    pub fn spawn(
        tracker: Arc<dyn UsageTrackerTrait>,
        period: Duration,
    ) -> Result<Self, DomainError> {
        if period.is_zero() {
            return Err(DomainError::validation("Sync interval must be positive"));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match tracker.sync_pending_usage().await {
                        Ok(report) if report.synced > 0 || report.failed > 0 => {
                            debug!(synced = report.synced, failed = report.failed, "Periodic usage sync");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Periodic usage sync failed"),
                    },
                }
            }

            debug!("Periodic usage sync stopped");
        });

        info!(interval_secs = period.as_secs(), "Periodic usage sync started");

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the task and wait for an in-flight sync to finish
    pub async fn stop(mut self) -> Result<(), DomainError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| DomainError::internal(format!("Periodic sync task failed: {}", e))),
            None => Ok(()),
        }
    }
}

impl Drop for PeriodicSync {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::{
        BatchSyncResponse, MockUsageBackend, UsageEvent, UsageEventType,
    };
    use crate::infrastructure::storage::InMemoryKeyValueStore;
    use crate::infrastructure::usage::{OfflineEventQueue, UsageTracker};

    const PERIOD: Duration = Duration::from_secs(300);

    async fn tracker_with_pending(backend: MockUsageBackend, pending: usize) -> Arc<UsageTracker> {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let queue = OfflineEventQueue::new(store.clone());
        for _ in 0..pending {
            queue
                .enqueue(UsageEvent::new("user-1", UsageEventType::ApiCall))
                .await
                .unwrap();
        }

        Arc::new(UsageTracker::new(Arc::new(backend), store))
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let tracker = tracker_with_pending(MockUsageBackend::new(), 0).await;
        let result = PeriodicSync::spawn(tracker, Duration::ZERO);
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let mut backend = MockUsageBackend::new();
        backend.expect_sync_events().never();

        let tracker = tracker_with_pending(backend, 1).await;
        let sync = PeriodicSync::spawn(tracker.clone(), PERIOD).unwrap();

        tokio::time::sleep(PERIOD - Duration::from_secs(1)).await;
        assert_eq!(tracker.pending_event_count().await.unwrap(), 1);

        sync.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_flushes_queue() {
        let mut backend = MockUsageBackend::new();
        backend.expect_sync_events().times(1).returning(|events| {
            Ok(BatchSyncResponse {
                success: true,
                synced_count: events.len(),
                failed_count: 0,
            })
        });

        let tracker = tracker_with_pending(backend, 3).await;
        let sync = PeriodicSync::spawn(tracker.clone(), PERIOD).unwrap();

        // later ticks see an empty queue and make no request
        tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;
        assert_eq!(tracker.pending_event_count().await.unwrap(), 0);

        sync.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_syncs_retry_every_tick() {
        let mut backend = MockUsageBackend::new();
        backend
            .expect_sync_events()
            .times(2)
            .returning(|_| Err(DomainError::transport("offline")));

        let tracker = tracker_with_pending(backend, 1).await;
        let sync = PeriodicSync::spawn(tracker.clone(), PERIOD).unwrap();

        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        assert_eq!(tracker.pending_event_count().await.unwrap(), 1);

        sync.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_task() {
        let mut backend = MockUsageBackend::new();
        backend.expect_sync_events().never();

        let tracker = tracker_with_pending(backend, 1).await;
        let sync = PeriodicSync::spawn(tracker, PERIOD).unwrap();
        assert!(sync.is_running());

        sync.stop().await.unwrap();

        // no tick after stop
        tokio::time::sleep(PERIOD * 2).await;
    }
}
