use clap::Parser;
use rapidtriage_usage::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Limits(args) => cli::limits::run(args).await,
        Command::Stats(args) => cli::report::run_stats(args).await,
        Command::Alerts(args) => cli::report::run_alerts(args).await,
        Command::Check(args) => cli::track::run_check(args).await,
        Command::Track(args) => cli::track::run_track(args).await,
        Command::SetTier(args) => cli::account::run_set_tier(args).await,
        Command::ResetPeriod(args) => cli::account::run_reset_period(args).await,
        Command::Pending => cli::report::run_pending().await,
        Command::Sync(args) => cli::sync::run(args).await,
        Command::Analytics(args) => cli::report::run_analytics(args).await,
    }
}
