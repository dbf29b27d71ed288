//! # Libris Config
//!
//! Configuration management for the Libris book service.
//! Supports layered configuration from TOML files, a `.env` file and
//! `LIBRIS__*` environment variables, with runtime refresh.

mod app_config;
mod loader;

pub use app_config::*;
pub use loader::*;
