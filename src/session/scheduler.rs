//! Proactive credential renewal timer.
//!
//! One cancellable tokio task per manager. Each firing runs the supplied
//! refresh operation; a successful refresh yields the next TTL and the
//! task re-arms itself, a failed one ends the task. `start` always replaces
//! any prior task, never stacks a second one.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Fraction of the credential TTL to wait before renewing. The 20% margin
/// leaves room for clock drift and network latency so renewal completes
/// before the credential actually expires.
const REFRESH_MARGIN: f64 = 0.8;

/// Delay used when the server did not report a TTL
const FALLBACK_REFRESH_SECS: u64 = 60;

/// Delay before the next renewal attempt for a credential with the given
/// TTL in seconds.
pub(crate) fn refresh_delay(ttl_secs: u64) -> Duration {
    if ttl_secs == 0 {
        Duration::from_secs(FALLBACK_REFRESH_SECS)
    } else {
        Duration::from_secs_f64(ttl_secs as f64 * REFRESH_MARGIN)
    }
}

pub(crate) struct RefreshScheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Arm the renewal task for a credential with the given TTL.
    ///
    /// `refresh` resolves to `Some(next_ttl)` after a successful renewal
    /// or `None` when the session is gone and the task should end.
    pub fn start<F, Fut>(&self, ttl_secs: u64, refresh: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<u64>> + Send + 'static,
    {
        self.stop();
        debug!(ttl_secs, "arming refresh timer");

        let handle = tokio::spawn(async move {
            let mut delay = refresh_delay(ttl_secs);
            loop {
                tokio::time::sleep(delay).await;
                match refresh().await {
                    Some(next_ttl) => delay = refresh_delay(next_ttl),
                    None => break,
                }
            }
        });

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Cancel any armed task. Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
