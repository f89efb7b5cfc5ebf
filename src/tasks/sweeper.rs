//! TTL Sweeper Task
//!
//! Background thread that periodically removes expired cache entries, so
//! entries nobody reads again still release their bytes.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::ByteCache;
use crate::config::CacheConfig;

/// Handle to a running sweeper. Dropping it stops the thread.
pub struct SweeperHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread immediately
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("TTL sweeper thread panicked");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns a thread that calls `purge_expired` on `cache` every `interval`.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(MemCache::new(&config));
/// let sweeper = spawn_expiry_sweeper(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.stop();
/// ```
pub fn spawn_expiry_sweeper<C>(cache: Arc<C>, interval: Duration) -> SweeperHandle
where
    C: ByteCache + ?Sized + 'static,
{
    let (stop, wakeup) = mpsc::channel::<()>();

    let thread = thread::spawn(move || {
        info!("Starting TTL sweeper with interval of {:?}", interval);

        loop {
            match wakeup.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            match cache.purge_expired() {
                Ok(0) => debug!("TTL sweep: no expired entries found"),
                Ok(removed) => info!("TTL sweep: removed {} expired entries", removed),
                Err(err) => warn!(error = %err, "TTL sweep failed"),
            }
        }

        info!("TTL sweeper stopped");
    });

    SweeperHandle {
        stop: Some(stop),
        thread: Some(thread),
    }
}

/// Starts a sweeper when `config.sweep_interval` is non-zero.
pub fn spawn_configured_sweeper<C>(cache: Arc<C>, config: &CacheConfig) -> Option<SweeperHandle>
where
    C: ByteCache + ?Sized + 'static,
{
    (config.sweep_interval > 0)
        .then(|| spawn_expiry_sweeper(cache, Duration::from_secs(config.sweep_interval)))
}
