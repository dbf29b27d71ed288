//! # Libris Resilience
//!
//! Load protection for request handlers: request deadlines that stop
//! waiting without cancelling the work, a non-blocking concurrency slot
//! limiter, and an in-flight counter that shutdown can drain.

pub mod in_flight;
pub mod slot_limiter;
pub mod timeout;

pub use in_flight::*;
pub use slot_limiter::*;
pub use timeout::*;
