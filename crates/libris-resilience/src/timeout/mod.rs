//! Deadline helpers for async operations.

use libris_core::{LibrisError, LibrisResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Runs `future` on its own task and waits for it at most `limit`.
///
/// When the limit passes the caller gets `LibrisError::Timeout(message)`
/// and the task keeps running to completion in the background; its result
/// is discarded.
pub async fn spawn_with_deadline<Fut, T>(
    limit: Duration,
    message: &'static str,
    future: Fut,
) -> LibrisResult<T>
where
    Fut: Future<Output = LibrisResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(future);

    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            warn!(error = %join_error, "Deadline-bound task failed");
            Err(LibrisError::internal(format!("task failed: {join_error}")))
        }
        Err(_) => Err(LibrisError::timeout(message)),
    }
}

/// A fixed point in time shared by several steps of one request.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    /// Time left, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_spawn_with_deadline_returns_result() {
        let result = spawn_with_deadline(Duration::from_secs(1), "too slow", async {
            Ok::<_, LibrisError>("done")
        })
        .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_spawn_with_deadline_passes_errors_through() {
        let result: LibrisResult<()> = spawn_with_deadline(Duration::from_secs(1), "too slow", async {
            Err(LibrisError::not_found("Book", "x"))
        })
        .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_spawn_with_deadline_abandons_but_does_not_cancel() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result = spawn_with_deadline(Duration::from_millis(10), "Book creation timed out", async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<_, LibrisError>(())
        })
        .await;

        match result {
            Err(LibrisError::Timeout(msg)) => assert_eq!(msg, "Book creation timed out"),
            other => panic!("Expected timeout, got {other:?}"),
        }
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_remaining() {
        let deadline = Deadline::after(Duration::from_secs(30));
        assert_eq!(deadline.remaining(), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(deadline.remaining(), Duration::from_secs(20));

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
