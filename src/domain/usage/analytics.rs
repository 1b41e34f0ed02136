//! Read-only usage reporting returned by the backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Counters for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    #[serde(default)]
    pub triage_sessions: u64,
    #[serde(default)]
    pub reports_generated: u64,
    #[serde(default)]
    pub data_exports: u64,
    #[serde(default)]
    pub api_calls: u64,
}

/// Share of activity attributed to one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUsage {
    pub feature: String,
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

/// Activity count for one hour of the day (0-23)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakUsageHour {
    pub hour: u8,
    pub count: u64,
}

/// Usage report over a date range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageAnalytics {
    pub daily_usage: Vec<DailyUsage>,
    pub feature_usage: Vec<FeatureUsage>,
    pub peak_usage_hours: Vec<PeakUsageHour>,
}

impl UsageAnalytics {
    /// Sum of triage sessions across the reported days
    pub fn total_sessions(&self) -> u64 {
        self.daily_usage.iter().map(|d| d.triage_sessions).sum()
    }

    /// Busiest hour, ties resolved toward the earlier hour
    pub fn busiest_hour(&self) -> Option<u8> {
        self.peak_usage_hours
            .iter()
            .filter(|h| h.hour < 24)
            .max_by(|a, b| a.count.cmp(&b.count).then(b.hour.cmp(&a.hour)))
            .map(|h| h.hour)
    }
}
