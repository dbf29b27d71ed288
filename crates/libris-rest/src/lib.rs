//! # Libris REST
//!
//! REST API layer using Axum for the Libris book service.
//! Provides the book endpoints, the concurrency shell that bounds them,
//! and the health checks.

pub mod controllers;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod shell;
pub mod state;

pub use router::*;
pub use shell::*;
pub use state::*;
