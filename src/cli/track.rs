//! Check and track commands

use clap::Args;

use crate::domain::usage::{EventMetadata, UsageEventType, DATA_SIZE_KEY};
use crate::infrastructure::usage::UsageTrackerTrait;

#[derive(Args, Clone)]
pub struct CheckArgs {
    /// User ID
    pub user_id: String,

    /// Event type, e.g. triage-session or DATA_EXPORT
    pub event_type: UsageEventType,
}

#[derive(Args, Clone)]
pub struct TrackArgs {
    /// User ID
    pub user_id: String,

    /// Event type, e.g. triage-session or DATA_EXPORT
    pub event_type: UsageEventType,

    /// Exported bytes, counted toward storage for data exports
    #[arg(long)]
    pub data_size: Option<u64>,
}

impl TrackArgs {
    fn metadata(&self) -> Option<EventMetadata> {
        self.data_size
            .map(|bytes| EventMetadata::from([(DATA_SIZE_KEY.to_string(), bytes.into())]))
    }
}

pub async fn run_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let result = tracker
        .check_usage_limit(&args.user_id, args.event_type, None)
        .await;
    super::print_json(&result)
}

pub async fn run_track(args: TrackArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let result = tracker
        .track_usage(&args.user_id, args.event_type, args.metadata())
        .await;
    super::print_json(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_size_becomes_metadata() {
        let args = TrackArgs {
            user_id: "user-1".to_string(),
            event_type: UsageEventType::DataExport,
            data_size: Some(2048),
        };

        let metadata = args.metadata().unwrap();
        assert_eq!(metadata[DATA_SIZE_KEY], serde_json::json!(2048));

        let bare = TrackArgs {
            data_size: None,
            ..args
        };
        assert!(bare.metadata().is_none());
    }
}
