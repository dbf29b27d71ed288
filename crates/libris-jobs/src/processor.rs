//! Job dispatch by type tag.

use crate::error::JobError;
use crate::job::{BookJob, JobOutcome, JobType};
use async_trait::async_trait;
use libris_core::{validation::rules, Book};
use std::time::Duration;

/// Executes one job.
///
/// An `Err` is turned into a failed [`JobOutcome`] by the worker; it never
/// stops the worker.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    /// Runs the job and describes what happened.
    async fn process(&self, job: &BookJob) -> Result<JobOutcome, JobError>;
}

/// Default processor for book jobs.
///
/// Each job simulates work for `base_delay + 10ms * type index`.
#[derive(Debug, Clone)]
pub struct BookJobProcessor {
    base_delay: Duration,
}

impl BookJobProcessor {
    #[must_use]
    pub const fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    fn work_time(&self, job_type: JobType) -> Duration {
        self.base_delay + Duration::from_millis(10 * u64::from(job_type.index()))
    }
}

impl Default for BookJobProcessor {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl JobProcessor for BookJobProcessor {
    async fn process(&self, job: &BookJob) -> Result<JobOutcome, JobError> {
        tokio::time::sleep(self.work_time(job.job_type)).await;

        match job.job_type {
            JobType::Validate => {
                let data = job
                    .book_data
                    .as_ref()
                    .ok_or_else(|| JobError::ExecutionFailed("title is required".to_string()))?;
                if !rules::not_blank(&data.title) {
                    return Err(JobError::ExecutionFailed("title is required".to_string()));
                }
                Ok(JobOutcome::succeeded(job, "Book validation completed"))
            }
            JobType::Process => {
                let data = job
                    .book_data
                    .as_ref()
                    .ok_or_else(|| JobError::ExecutionFailed("missing book data".to_string()))?;
                let book = Book::from_request(&data.normalized());
                Ok(JobOutcome::succeeded(job, "Book processing completed").with_book(book))
            }
            JobType::Notify => Ok(JobOutcome::succeeded(job, "Notification sent")),
        }
    }
}
