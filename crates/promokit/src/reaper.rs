//! TTL reaper: periodically evicts terminal jobs past their retention age.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::JobStore;

/// Spawns the background eviction task. Runs until `shutdown` fires; only
/// terminal jobs older than `ttl` are ever touched.
pub fn spawn_reaper(
    store: Arc<JobStore>,
    period: Duration,
    ttl: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("reaper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = store.evict_terminal_older_than(ttl);
                    if evicted > 0 {
                        tracing::info!(evicted, "evicted expired jobs");
                    }
                }
            }
        }
    })
}
