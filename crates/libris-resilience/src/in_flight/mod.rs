//! In-flight request tracking for graceful shutdown.

use libris_core::{LibrisError, LibrisResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

/// Counts requests in progress and lets shutdown wait for zero.
#[derive(Clone, Default)]
pub struct InFlightTracker {
    inner: Arc<Inner>,
}

/// Registration of one in-flight request. Dropping it deregisters.
#[must_use = "the request is only tracked while the guard is alive"]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl InFlightTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request for as long as the guard lives.
    pub fn track(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Requests currently registered.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Waits until no request is in flight, at most `deadline`.
    pub async fn drain(&self, deadline: Duration) -> LibrisResult<()> {
        debug!(in_flight = self.count(), "Draining in-flight requests");

        let wait = async {
            loop {
                let idle = self.inner.idle.notified();
                tokio::pin!(idle);
                idle.as_mut().enable();
                if self.count() == 0 {
                    return;
                }
                idle.await;
            }
        };

        tokio::time::timeout(deadline, wait).await.map_err(|_| {
            let remaining = self.count();
            warn!(in_flight = remaining, "Drain deadline exceeded");
            LibrisError::timeout(format!("{remaining} requests still in flight"))
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
