//! Book service implementations.
//!
//! Trait definitions live in the parent module (`book_service.rs`).

pub mod book_service_impl;

pub use book_service_impl::{BookServiceImpl, ServiceSettings};
