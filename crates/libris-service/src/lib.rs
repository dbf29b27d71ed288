//! # Libris Service
//!
//! Business logic for the book catalogue: the two-tier book cache, the
//! book service that coordinates cache, repository and worker pool, and
//! the DTOs those operations return.

pub mod book_service;
pub mod cache;
pub mod dto;
pub mod r#impl;
pub mod metrics;

pub use book_service::*;
pub use cache::*;
pub use dto::*;
pub use metrics::{ServiceMetrics, ServiceMetricsSnapshot};
pub use r#impl::{BookServiceImpl, ServiceSettings};
