//! CLI module for the RapidTriage usage tools
//!
//! Subcommands inspect and drive a [`UsageTracker`] against the configured
//! backend. Results are printed to stdout as pretty JSON.

pub mod account;
pub mod limits;
pub mod report;
pub mod sync;
pub mod track;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::usage::UsageTracker;

/// RapidTriage usage quotas - inspect limits, track events, sync the offline queue
#[derive(Parser)]
#[command(name = "rapidtriage-usage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the tier limit table
    Limits(limits::LimitsArgs),

    /// Print a user's usage stats
    Stats(report::StatsArgs),

    /// Print a user's warning and critical alerts
    Alerts(UserArgs),

    /// Evaluate an event against a user's limits without recording it
    Check(track::CheckArgs),

    /// Gate and record an event for a user
    Track(track::TrackArgs),

    /// Change a user's subscription tier
    SetTier(account::SetTierArgs),

    /// Start a new billing period for a user
    ResetPeriod(UserArgs),

    /// Print the number of events waiting for sync
    Pending,

    /// Push queued events to the backend
    Sync(sync::SyncArgs),

    /// Print a user's usage analytics for a date range
    Analytics(report::AnalyticsArgs),
}

/// A command that targets one user
#[derive(Args, Clone)]
pub struct UserArgs {
    /// User ID
    pub user_id: String,
}

/// Load `.env` and configuration, then install logging
pub(crate) fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    logging::init_logging(&config.logging);

    if let Some(e) = load_error {
        warn!(error = %e, "Invalid configuration, using defaults");
    }

    config
}

pub(crate) fn tracker(config: &AppConfig) -> anyhow::Result<Arc<UsageTracker>> {
    crate::create_usage_tracker_with_config(config)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
