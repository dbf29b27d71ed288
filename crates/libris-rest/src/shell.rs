//! Concurrency shell shared by the book handlers.
//!
//! Every handler opens a [`RequestScope`] so that shutdown can wait for it
//! and the metrics endpoint can report it. Create and bulk-create also take
//! a slot from the [`SlotLimiter`] before doing any work.

use libris_config::HandlerConfig;
use libris_core::LibrisResult;
use libris_resilience::{InFlightGuard, InFlightTracker, SlotLimiter, SlotPermit};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Handler operations that report a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateBook,
    GetBook,
    GetBooks,
    UpdateBook,
    DeleteBook,
    BulkCreateBooks,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateBook => "CreateBook",
            Self::GetBook => "GetBook",
            Self::GetBooks => "GetBooks",
            Self::UpdateBook => "UpdateBook",
            Self::DeleteBook => "DeleteBook",
            Self::BulkCreateBooks => "BulkCreateBooks",
        }
    }
}

/// Per-operation deadlines.
#[derive(Debug, Clone, Copy)]
pub struct HandlerDeadlines {
    pub create: Duration,
    pub get: Duration,
    pub list: Duration,
    pub bulk: Duration,
}

impl From<&HandlerConfig> for HandlerDeadlines {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            create: config.create_timeout(),
            get: config.get_timeout(),
            list: config.list_timeout(),
            bulk: config.bulk_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    total_requests: u64,
    last_duration: HashMap<&'static str, Duration>,
}

/// Request counters kept by the handler layer.
#[derive(Debug, Default, Clone)]
pub struct HandlerMetrics {
    inner: Arc<RwLock<MetricsInner>>,
}

impl HandlerMetrics {
    fn record_start(&self) {
        self.inner.write().total_requests += 1;
    }

    fn record_duration(&self, operation: Operation, elapsed: Duration) {
        self.inner
            .write()
            .last_duration
            .insert(operation.as_str(), elapsed);
    }

    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.inner.read().total_requests
    }

    /// Most recent duration of each operation, in milliseconds.
    #[must_use]
    pub fn request_duration_ms(&self) -> BTreeMap<String, u64> {
        self.inner
            .read()
            .last_duration
            .iter()
            .map(|(op, d)| ((*op).to_string(), u64::try_from(d.as_millis()).unwrap_or(u64::MAX)))
            .collect()
    }
}

/// Point-in-time view of the handler counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HandlerMetricsSnapshot {
    pub total_requests: u64,
    pub active_requests: usize,
    /// Last observed duration per operation, in milliseconds.
    pub request_duration: BTreeMap<String, u64>,
}

/// One request in progress.
///
/// Holds the in-flight registration and records the elapsed time under its
/// operation when dropped.
#[must_use = "the request is only tracked while the scope is alive"]
pub struct RequestScope {
    operation: Operation,
    started: Instant,
    metrics: HandlerMetrics,
    _guard: InFlightGuard,
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.metrics.record_duration(self.operation, elapsed);
        debug!(
            operation = self.operation.as_str(),
            duration_ms = elapsed.as_millis() as u64,
            "Request finished"
        );
    }
}

/// Slot limiter, in-flight tracker, counters and deadlines for the handlers.
#[derive(Clone)]
pub struct HandlerShell {
    limiter: SlotLimiter,
    tracker: InFlightTracker,
    metrics: HandlerMetrics,
    deadlines: HandlerDeadlines,
    bulk_max_items: usize,
    max_body_size: usize,
}

impl std::fmt::Debug for HandlerShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerShell")
            .field("limiter", &self.limiter)
            .field("in_flight", &self.tracker.count())
            .field("deadlines", &self.deadlines)
            .finish_non_exhaustive()
    }
}

impl HandlerShell {
    #[must_use]
    pub fn new(config: &HandlerConfig) -> Self {
        Self {
            limiter: SlotLimiter::new(config.slot_capacity),
            tracker: InFlightTracker::new(),
            metrics: HandlerMetrics::default(),
            deadlines: HandlerDeadlines::from(config),
            bulk_max_items: config.bulk_max_items.max(1),
            max_body_size: config.max_body_size,
        }
    }

    /// Takes a concurrency slot or fails with a rate-limit error.
    pub fn try_acquire(&self) -> LibrisResult<SlotPermit> {
        self.limiter.try_acquire().map_err(|e| {
            warn!(capacity = self.limiter.capacity(), "All request slots in use");
            e
        })
    }

    /// Registers a request under `operation`.
    pub fn begin(&self, operation: Operation) -> RequestScope {
        self.metrics.record_start();
        RequestScope {
            operation,
            started: Instant::now(),
            metrics: self.metrics.clone(),
            _guard: self.tracker.track(),
        }
    }

    #[must_use]
    pub const fn deadlines(&self) -> &HandlerDeadlines {
        &self.deadlines
    }

    #[must_use]
    pub const fn bulk_max_items(&self) -> usize {
        self.bulk_max_items
    }

    /// Largest request body the handlers will read, in bytes.
    #[must_use]
    pub const fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.tracker.count()
    }

    #[must_use]
    pub fn metrics_snapshot(&self) -> HandlerMetricsSnapshot {
        HandlerMetricsSnapshot {
            total_requests: self.metrics.total_requests(),
            active_requests: self.active_requests(),
            request_duration: self.metrics.request_duration_ms(),
        }
    }

    /// Waits for every open request scope to close, at most `deadline`.
    pub async fn drain(&self, deadline: Duration) -> LibrisResult<()> {
        self.tracker.drain(deadline).await
    }
}
