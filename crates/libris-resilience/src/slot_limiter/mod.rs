//! Fixed-capacity concurrency slots.

use libris_core::{LibrisError, LibrisResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore that never queues.
///
/// [`try_acquire`](Self::try_acquire) either hands out a slot at once or
/// fails with [`LibrisError::RateLimitExceeded`].
#[derive(Clone)]
pub struct SlotLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}

impl SlotLimiter {
    /// Creates a limiter with `capacity` slots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Takes a slot without waiting.
    pub fn try_acquire(&self) -> LibrisResult<SlotPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map(|permit| SlotPermit { _permit: permit })
            .map_err(|_| LibrisError::RateLimitExceeded)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl std::fmt::Debug for SlotLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotLimiter")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}
