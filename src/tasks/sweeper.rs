//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired cache entries, independent of
//! capacity pressure.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheBackend;

/// Spawns a background task that purges expired entries every `interval`.
///
/// The task holds the backend lock only for the duration of one purge. Tokio does
/// not wait for spawned tasks at runtime shutdown, so the sweeper never keeps the
/// process alive; abort the returned handle to stop it earlier.
///
/// # Example
/// ```ignore
/// let backend: Arc<dyn CacheBackend> = Arc::new(MemoryBackend::new(&config));
/// let sweeper = spawn_expiry_sweeper(backend.clone(), config.check_interval);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_expiry_sweeper(backend: Arc<dyn CacheBackend>, interval: Duration) -> JoinHandle<()> {
    // A zero period would spin
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expiry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            match backend.purge_expired().await {
                Ok(0) => debug!("expiry sweep: no expired entries found"),
                Ok(removed) => info!("expiry sweep: removed {} expired entries", removed),
                Err(e) => warn!(error = %e, "expiry sweep failed"),
            }
        }
    })
}
