//! Worker pool configuration.

use libris_config::WorkerConfig;
use std::time::Duration;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers.
    pub workers: usize,

    /// Bounded job queue capacity.
    pub queue_capacity: usize,

    /// Result channel buffer.
    pub result_buffer: usize,

    /// Base simulated processing time per job.
    pub base_delay: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 100,
            result_buffer: 100,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl From<&WorkerConfig> for WorkerPoolConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            queue_capacity: config.queue_capacity.max(1),
            result_buffer: config.result_buffer.max(1),
            base_delay: config.base_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config() {
        let app = WorkerConfig {
            workers: 3,
            queue_capacity: 0,
            result_buffer: 8,
            base_delay_ms: 5,
        };
        let config = WorkerPoolConfig::from(&app);
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.base_delay, Duration::from_millis(5));
    }
}
