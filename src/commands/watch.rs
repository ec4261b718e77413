use crate::libs::daemon;
use anyhow::Result;

/// Runs the break scheduler in the foreground until interrupted.
pub async fn cmd() -> Result<()> {
    daemon::run_with_signal_handling().await
}
