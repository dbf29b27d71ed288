//! Request counters and latency of the book service.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use utoipa::ToSchema;

#[derive(Debug, Default)]
struct Counters {
    request_count: u64,
    cache_hits: u64,
    cache_misses: u64,
    avg_latency: Duration,
}

/// Service-level metrics recorder.
///
/// Callers only ever see [`ServiceMetricsSnapshot`] copies.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    counters: RwLock<Counters>,
}

/// Point-in-time copy of [`ServiceMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceMetricsSnapshot {
    pub request_count: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Moving average of request latency in fractional milliseconds.
    pub avg_latency_ms: f64,
}

impl ServiceMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one finished request that started at `start`.
    pub fn record_request(&self, start: Instant) {
        self.record_latency(start.elapsed());
    }

    /// Counts one request of the given latency.
    ///
    /// The average is halved towards each new sample: `(avg + sample) / 2`.
    pub fn record_latency(&self, sample: Duration) {
        let mut counters = self.counters.write();
        counters.request_count += 1;
        counters.avg_latency = (counters.avg_latency + sample) / 2;
    }

    pub fn record_cache_hit(&self) {
        self.counters.write().cache_hits += 1;
    }

    pub fn record_cache_miss(&self) {
        self.counters.write().cache_misses += 1;
    }

    #[must_use]
    pub fn snapshot(&self) -> ServiceMetricsSnapshot {
        let counters = self.counters.read();
        ServiceMetricsSnapshot {
            request_count: counters.request_count,
            cache_hits: counters.cache_hits,
            cache_misses: counters.cache_misses,
            avg_latency_ms: counters.avg_latency.as_secs_f64() * 1000.0,
        }
    }
}

/// Records one request on drop.
pub(crate) struct RequestTimer<'a> {
    metrics: &'a ServiceMetrics,
    start: Instant,
}

impl<'a> RequestTimer<'a> {
    pub(crate) fn start(metrics: &'a ServiceMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_request(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_halves_towards_sample() {
        let metrics = ServiceMetrics::new();
        metrics.record_latency(Duration::from_millis(100));
        assert!((metrics.snapshot().avg_latency_ms - 50.0).abs() < 1e-9);

        metrics.record_latency(Duration::from_millis(150));
        let snapshot = metrics.snapshot();
        assert!((snapshot.avg_latency_ms - 100.0).abs() < 1e-9);
        assert_eq!(snapshot.request_count, 2);
    }

    #[test]
    fn test_sub_millisecond_latency_is_not_truncated() {
        let metrics = ServiceMetrics::new();
        metrics.record_latency(Duration::from_micros(300));
        assert!((metrics.snapshot().avg_latency_ms - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_cache_counters() {
        let metrics = ServiceMetrics::new();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 2);
        assert_eq!(snapshot.request_count, 0);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = ServiceMetrics::new();
        {
            let _timer = RequestTimer::start(&metrics);
        }
        assert_eq!(metrics.snapshot().request_count, 1);
    }
}
