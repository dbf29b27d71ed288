//! Bounded worker pool for processing jobs.

use crate::config::WorkerPoolConfig;
use crate::error::{JobError, JobResult};
use crate::job::{BookJob, JobOutcome};
use crate::metrics::{record_job_finished, record_job_rejected, record_job_submitted};
use crate::processor::{BookJobProcessor, JobProcessor};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Lifecycle of a worker pool. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<BookJob>>>;

struct Lifecycle {
    state: PoolState,
    sender: Option<mpsc::Sender<BookJob>>,
    receiver: Option<mpsc::Receiver<BookJob>>,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// Worker pool with a bounded queue and a fixed number of workers.
pub struct WorkerPool {
    /// Unique pool ID.
    id: String,

    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Dispatches jobs by type.
    processor: Arc<dyn JobProcessor>,

    /// State, queue ends and task handles, changed together.
    lifecycle: Mutex<Lifecycle>,

    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Creates a pool in the `Created` state. Jobs submitted before
    /// [`start`](Self::start) wait in the queue.
    #[must_use]
    pub fn new(config: WorkerPoolConfig, processor: Arc<dyn JobProcessor>) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));

        Self {
            id: format!("worker-pool-{}", Uuid::new_v4()),
            config,
            processor,
            lifecycle: Mutex::new(Lifecycle {
                state: PoolState::Created,
                sender: Some(sender),
                receiver: Some(receiver),
                handles: Vec::new(),
            }),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// Creates a pool running the default [`BookJobProcessor`].
    #[must_use]
    pub fn with_book_processor(config: WorkerPoolConfig) -> Self {
        let processor = Arc::new(BookJobProcessor::new(config.base_delay));
        Self::new(config, processor)
    }

    /// Launches the workers and the result collector.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> JobResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != PoolState::Created {
            return Err(JobError::InvalidState {
                expected: PoolState::Created.to_string(),
                actual: lifecycle.state.to_string(),
            });
        }
        let receiver = lifecycle.receiver.take().ok_or_else(|| JobError::InvalidState {
            expected: "queue receiver present".to_string(),
            actual: "missing".to_string(),
        })?;

        info!(
            pool_id = %self.id,
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            "Starting worker pool"
        );

        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(receiver));
        let (results_tx, results_rx) = mpsc::channel(self.config.result_buffer.max(1));

        for worker_id in 0..self.config.workers {
            let handle = tokio::spawn(
                run_worker(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&self.processor),
                    results_tx.clone(),
                )
                .instrument(tracing::info_span!("worker", pool_id = %self.id, worker_id)),
            );
            lifecycle.handles.push(handle);
        }
        drop(results_tx);

        let collector = tokio::spawn(
            collect_results(results_rx, Arc::clone(&self.counters))
                .instrument(tracing::info_span!("result_collector", pool_id = %self.id)),
        );
        lifecycle.handles.push(collector);
        lifecycle.state = PoolState::Running;

        Ok(())
    }

    /// Enqueues a job without waiting for space.
    ///
    /// Fails with [`JobError::QueueFull`] when the queue is at capacity and
    /// with [`JobError::ShuttingDown`] once shutdown has begun.
    pub fn submit_job(&self, job: BookJob) -> JobResult<()> {
        let job_type = job.job_type;
        let lifecycle = self.lifecycle.lock();

        let sender = match (lifecycle.state, lifecycle.sender.as_ref()) {
            (PoolState::Created | PoolState::Running, Some(sender)) => sender,
            _ => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                record_job_rejected(job_type, "shutting_down");
                return Err(JobError::ShuttingDown);
            }
        };

        match sender.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                record_job_submitted(job_type, sender.max_capacity() - sender.capacity());
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                record_job_rejected(job_type, "queue_full");
                warn!(pool_id = %self.id, job_id = %job.id, "Job queue is full, rejecting job");
                Err(JobError::QueueFull(self.config.queue_capacity))
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                record_job_rejected(job_type, "shutting_down");
                Err(JobError::ShuttingDown)
            }
        }
    }

    /// Closes the queue and waits for every buffered job to finish.
    pub async fn stop(&self) {
        info!(pool_id = %self.id, "Stopping worker pool...");
        let handles = self.close_queue();
        futures::future::join_all(handles).await;
        self.finish();
    }

    /// Closes the queue and waits for the workers, bounded by `deadline`.
    ///
    /// Workers drain jobs already queued. Tasks still running when the
    /// deadline passes are aborted and [`JobError::Timeout`] is returned.
    pub async fn shutdown(&self, deadline: Duration) -> JobResult<()> {
        info!(pool_id = %self.id, deadline_ms = deadline.as_millis(), "Shutting down worker pool");
        let handles = self.close_queue();
        let aborts: Vec<AbortHandle> = handles.iter().map(JoinHandle::abort_handle).collect();

        let result = tokio::time::timeout(deadline, futures::future::join_all(handles)).await;
        if result.is_err() {
            for abort in aborts {
                abort.abort();
            }
            warn!(pool_id = %self.id, "Workers did not finish before the deadline");
            self.finish();
            return Err(JobError::Timeout(
                u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            ));
        }

        self.finish();
        Ok(())
    }

    /// Moves to `ShuttingDown`, drops the sender and hands back the task
    /// handles to wait on.
    fn close_queue(&self) -> Vec<JoinHandle<()>> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == PoolState::Created || lifecycle.state == PoolState::Running {
            lifecycle.state = PoolState::ShuttingDown;
        }
        lifecycle.sender = None;
        lifecycle.receiver = None;
        std::mem::take(&mut lifecycle.handles)
    }

    fn finish(&self) {
        self.lifecycle.lock().state = PoolState::Stopped;
        info!(
            pool_id = %self.id,
            completed = self.counters.completed.load(Ordering::Relaxed),
            failed = self.counters.failed.load(Ordering::Relaxed),
            rejected = self.counters.rejected.load(Ordering::Relaxed),
            "Worker pool stopped"
        );
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.lifecycle.lock().state
    }

    /// True while workers are accepting jobs.
    pub fn is_running(&self) -> bool {
        self.state() == PoolState::Running
    }

    /// Get the pool ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get pool statistics.
    pub fn stats(&self) -> WorkerPoolStats {
        let lifecycle = self.lifecycle.lock();
        let queue_depth = lifecycle
            .sender
            .as_ref()
            .map_or(0, |sender| sender.max_capacity() - sender.capacity());

        WorkerPoolStats {
            id: self.id.clone(),
            state: lifecycle.state,
            workers: self.config.workers,
            queue_capacity: self.config.queue_capacity,
            queue_depth,
            jobs_submitted: self.counters.submitted.load(Ordering::Relaxed),
            jobs_completed: self.counters.completed.load(Ordering::Relaxed),
            jobs_failed: self.counters.failed.load(Ordering::Relaxed),
            jobs_rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    worker_id: usize,
    queue: SharedQueue,
    processor: Arc<dyn JobProcessor>,
    results: mpsc::Sender<JobOutcome>,
) {
    debug!(worker_id, "Worker started");

    loop {
        // One worker waits on the queue at a time; the guard drops before processing.
        let next = { queue.lock().await.recv().await };
        let Some(job) = next else {
            debug!(worker_id, "Job queue closed, exiting");
            break;
        };

        debug!(worker_id, job_id = %job.id, job_type = %job.job_type, "Processing job");
        let started = Instant::now();
        let mut outcome = match AssertUnwindSafe(processor.process(&job)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => JobOutcome::failed(&job, &e),
            Err(_) => JobOutcome::failed(
                &job,
                &JobError::ExecutionFailed("job handler panicked".to_string()),
            ),
        };
        outcome.duration = started.elapsed();

        if results.send(outcome).await.is_err() {
            break;
        }
    }
}

async fn collect_results(mut results: mpsc::Receiver<JobOutcome>, counters: Arc<PoolCounters>) {
    debug!("Result collector started");

    while let Some(outcome) = results.recv().await {
        record_job_finished(outcome.job_type, outcome.success, outcome.duration);
        if outcome.success {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(
                job_id = %outcome.job_id,
                message = outcome.message.as_deref().unwrap_or_default(),
                "Job completed successfully"
            );
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                job_id = %outcome.job_id,
                error = outcome.error.as_deref().unwrap_or_default(),
                "Job failed"
            );
        }
    }

    debug!("Result channel closed, collector exiting");
}

/// Worker pool statistics.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerPoolStats {
    /// Pool ID.
    pub id: String,
    pub state: PoolState,
    /// Configured worker count.
    pub workers: usize,
    pub queue_capacity: usize,
    /// Jobs waiting in the queue.
    pub queue_depth: usize,
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_rejected: u64,
}
