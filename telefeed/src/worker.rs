use common::SchedulerConfig;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info};

use crate::pipeline::Pipeline;

/// Runs the pipeline forever on a fixed interval. Anything escaping a cycle
/// is caught here, logged, and followed by a shorter cooldown sleep; the
/// loop itself only exits when `shutdown` is notified, observed between
/// cycles (a running cycle always completes).
pub async fn run_worker(
    pipeline: Arc<Pipeline>,
    scheduler: SchedulerConfig,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    info!(
        "worker: starting, one cycle every {}s (cooldown {}s)",
        scheduler.interval_seconds, scheduler.cooldown_seconds
    );

    loop {
        let wait = match pipeline.run_cycle().await {
            Ok(report) => {
                info!(
                    feeds = report.feeds_checked,
                    delivered = report.delivered,
                    saved = report.save_attempted,
                    "worker: cycle complete"
                );
                Duration::from_secs(scheduler.interval_seconds)
            }
            Err(e) => {
                error!(
                    "worker: cycle failed: {:#}; retrying after {}s cooldown",
                    e, scheduler.cooldown_seconds
                );
                Duration::from_secs(scheduler.cooldown_seconds)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.notified() => {
                info!("worker: shutdown requested, exiting loop");
                break;
            }
        }
    }

    info!("worker: cleanup complete");
    Ok(())
}
