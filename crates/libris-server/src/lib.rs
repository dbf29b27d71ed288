//! # Libris Server Library
//!
//! Wiring and startup utilities for the Libris server binary.

pub mod app;
pub mod startup;
