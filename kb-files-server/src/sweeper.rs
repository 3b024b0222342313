//! Periodic cleanup of uploads that never completed

use kb_files::storage::FileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Sweeps every `every`, purging pending uploads older than `max_age`
///
/// Runs until the task is aborted. A failed sweep is logged and retried on
/// the next tick.
pub async fn run(store: Arc<FileStore>, every: Duration, max_age: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&store, max_age).await;
    }
}

/// Runs a single sweep, returning how many uploads were purged
pub async fn sweep_once(store: &FileStore, max_age: Duration) -> usize {
    match store.purge_pending(max_age).await {
        Ok(purged) => {
            if !purged.is_empty() {
                tracing::info!(count = purged.len(), "Swept abandoned uploads");
            }
            purged.len()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Pending upload sweep failed");
            0
        }
    }
}
