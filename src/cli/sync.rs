//! Sync command - flushes the offline queue once or on an interval

use clap::Args;
use tracing::info;

use crate::infrastructure::usage::{PeriodicSync, UsageTrackerTrait};

#[derive(Args, Clone)]
pub struct SyncArgs {
    /// Keep running and sync every configured interval until Ctrl-C
    #[arg(long)]
    pub watch: bool,
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    let report = tracker.sync_pending_usage().await?;
    super::print_json(&report)?;

    if !args.watch {
        return Ok(());
    }

    let sync = PeriodicSync::spawn(tracker, config.usage.sync_interval())?;
    tokio::signal::ctrl_c().await?;

    info!("Shutting down periodic sync");
    sync.stop().await?;

    Ok(())
}
