//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries, so
//! entries that are never read again do not pile up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheSnapshot, SharedCache};

/// Owns a running sweep task. The task is aborted on [`shutdown`] or when
/// the handle is dropped.
///
/// [`shutdown`]: CleanupTask::shutdown
#[derive(Debug)]
pub struct CleanupTask {
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    /// Stops the sweep and waits for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Cancellation is the expected outcome.
            let _ = handle.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task sleeps for `interval` between runs and holds the write lock only
/// for the duration of one scan.
///
/// # Example
/// ```ignore
/// let cache = TtlCache::<String>::new(Duration::from_secs(300)).into_shared();
/// let cleanup = spawn_cleanup_task(cache.clone(), Duration::from_secs(600));
/// // Later, during shutdown:
/// cleanup.shutdown().await;
/// ```
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, interval: Duration) -> CleanupTask
where
    V: Clone + Send + Sync + 'static,
{
    spawn_cleanup_task_with(cache, interval, |_| {})
}

/// Like [`spawn_cleanup_task`], calling `on_sweep` with a fresh snapshot
/// after every run.
pub fn spawn_cleanup_task_with<V, F>(
    cache: SharedCache<V>,
    interval: Duration,
    on_sweep: F,
) -> CleanupTask
where
    V: Clone + Send + Sync + 'static,
    F: Fn(&CacheSnapshot) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "starting TTL cleanup task");

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let (removed, snapshot) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup();
                (removed, cache_guard.stats())
            };

            if removed > 0 {
                info!(removed, remaining = snapshot.size, "TTL cleanup removed expired entries");
            } else {
                debug!("TTL cleanup: no expired entries found");
            }

            on_sweep(&snapshot);
        }
    });

    CleanupTask {
        handle: Some(handle),
    }
}
