//! Job error types.

use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// The pool no longer accepts jobs.
    #[error("processor is shutting down")]
    ShuttingDown,

    /// The bounded queue has no free slot.
    #[error("job queue is full (capacity {0})")]
    QueueFull(usize),

    /// Job execution failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Job type tag not recognised.
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    /// Workers did not finish before the deadline.
    #[error("worker pool did not stop within {0} ms")]
    Timeout(u64),

    /// Invalid pool state for the requested operation.
    #[error("Invalid pool state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl JobError {
    /// True for rejections at submission time.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::QueueFull(_))
    }
}
