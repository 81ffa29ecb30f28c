//! Expired Entry Sweeper
//!
//! Background task that periodically purges expired keys from a
//! [`MemoryStore`]. Redis expires keys on its own; this only matters for the
//! in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that purges expired entries every `interval`.
///
/// Reads already ignore expired keys; the sweep only reclaims memory for
/// keys nobody reads again.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let sweeper = spawn_sweeper(store.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper(store: Arc<MemoryStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expired entry sweeper");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = store.purge_expired();
            if removed > 0 {
                info!(removed, "sweeper removed expired entries");
            } else {
                debug!("sweeper found no expired entries");
            }
        }
    })
}
