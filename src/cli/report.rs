//! Read-only commands: stats, alerts, pending count, analytics

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde_json::json;

use super::UserArgs;
use crate::infrastructure::usage::UsageTrackerTrait;

#[derive(Args, Clone)]
pub struct StatsArgs {
    /// User ID
    pub user_id: String,

    /// Bypass the cache
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Args, Clone)]
pub struct AnalyticsArgs {
    /// User ID
    pub user_id: String,

    /// Range start, RFC 3339 or YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub start: DateTime<Utc>,

    /// Range end, RFC 3339 or YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub end: DateTime<Utc>,
}

/// A bare date means midnight UTC
pub(crate) fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date '{}', expected RFC 3339 or YYYY-MM-DD", s))
}

pub async fn run_stats(args: StatsArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let stats = tracker.get_user_usage_stats(&args.user_id, args.refresh).await;
    super::print_json(&stats)
}

pub async fn run_alerts(args: UserArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let alerts = tracker.get_user_usage_alerts(&args.user_id).await;
    super::print_json(&alerts)
}

pub async fn run_pending() -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let pending = tracker.pending_event_count().await?;
    super::print_json(&json!({ "pending": pending }))
}

pub async fn run_analytics(args: AnalyticsArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let analytics = tracker
        .get_usage_analytics(&args.user_id, args.start, args.end)
        .await?;
    super::print_json(&analytics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_bare_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        assert_eq!(
            parse_date("2024-03-01T02:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("yesterday").is_err());
    }
}
