//! Metrics for worker pool monitoring.
//!
//! No exporter is installed by this crate; the macros are no-ops until a
//! recorder is set by the binary.

use crate::job::JobType;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for the worker pool.
pub mod names {
    /// Total jobs accepted into the queue.
    pub const JOBS_SUBMITTED_TOTAL: &str = "libris_jobs_submitted_total";
    /// Total jobs completed successfully.
    pub const JOBS_COMPLETED_TOTAL: &str = "libris_jobs_completed_total";
    /// Total jobs failed.
    pub const JOBS_FAILED_TOTAL: &str = "libris_jobs_failed_total";
    /// Total jobs rejected at submission.
    pub const JOBS_REJECTED_TOTAL: &str = "libris_jobs_rejected_total";
    /// Job execution duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "libris_job_duration_seconds";
    /// Jobs waiting in the queue.
    pub const JOBS_QUEUE_DEPTH: &str = "libris_jobs_queue_depth";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::JOBS_SUBMITTED_TOTAL,
        "Total number of jobs accepted into the queue"
    );
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(names::JOBS_FAILED_TOTAL, "Total number of jobs that failed");
    describe_counter!(
        names::JOBS_REJECTED_TOTAL,
        "Total number of jobs rejected because the queue was full or closed"
    );
    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job execution duration in seconds"
    );
    describe_gauge!(names::JOBS_QUEUE_DEPTH, "Current number of queued jobs");
}

/// Records an accepted job.
pub fn record_job_submitted(job_type: JobType, queue_depth: usize) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "job_type" => job_type.as_str()).increment(1);
    #[allow(clippy::cast_precision_loss)]
    gauge!(names::JOBS_QUEUE_DEPTH).set(queue_depth as f64);
}

/// Records a rejected job.
pub fn record_job_rejected(job_type: JobType, reason: &'static str) {
    counter!(
        names::JOBS_REJECTED_TOTAL,
        "job_type" => job_type.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Records a finished job.
pub fn record_job_finished(job_type: JobType, success: bool, duration: Duration) {
    let name = if success {
        names::JOBS_COMPLETED_TOTAL
    } else {
        names::JOBS_FAILED_TOTAL
    };
    counter!(name, "job_type" => job_type.as_str()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "job_type" => job_type.as_str())
        .record(duration.as_secs_f64());
}
