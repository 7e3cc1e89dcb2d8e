//! Bounded polling for sources that appear asynchronously.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::DeployError;
use crate::shutdown::ShutdownCoordinator;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_WAIT_MS: u64 = 15_000;

#[derive(Debug, Clone, Copy)]
pub struct PollingOptions {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_wait: Duration::from_millis(DEFAULT_MAX_WAIT_MS),
        }
    }
}

/// Call `check` every interval until it yields a value.
///
/// Fails with `Timeout(what)` once `max_wait` has elapsed, or `Cancelled(what)`
/// as soon as shutdown is signalled.
pub async fn poll_until<T, F>(
    options: PollingOptions,
    what: &str,
    mut check: F,
    shutdown: &ShutdownCoordinator,
) -> Result<T, DeployError>
where
    F: FnMut() -> Option<T>,
{
    let mut shutdown_rx = shutdown.subscribe();
    let deadline = Instant::now() + options.max_wait;

    loop {
        if shutdown.is_shutdown() {
            return Err(DeployError::Cancelled(what.to_string()));
        }

        if let Some(value) = check() {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(what, "Polling gave up");
            return Err(DeployError::Timeout(what.to_string()));
        }

        let wait = options.interval.min(deadline - now);
        tokio::select! {
            _ = sleep(wait) => {}
            _ = shutdown_rx.recv() => {
                return Err(DeployError::Cancelled(what.to_string()));
            }
        }
    }
}
