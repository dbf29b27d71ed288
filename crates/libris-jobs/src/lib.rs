//! # Libris Jobs
//!
//! Fire-and-forget post-processing off the request path.
//!
//! A [`WorkerPool`] owns a bounded queue, a fixed number of worker tasks and
//! one result collector. Submission never blocks: a full queue or a pool
//! that is shutting down rejects the job immediately. Jobs are at-most-once
//! with no persistence and no redelivery.
//!
//! ```text
//! submit_job ──try_send──▶ [ bounded queue ] ──▶ worker × N ──▶ [ results ] ──▶ collector
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod processor;
pub mod worker;

pub use config::WorkerPoolConfig;
pub use error::{JobError, JobResult};
pub use job::{BookJob, JobId, JobOutcome, JobType};
pub use processor::{BookJobProcessor, JobProcessor};
pub use worker::{PoolState, WorkerPool, WorkerPoolStats};
