//! # Libris Core
//!
//! Core types, models, and error definitions for the Libris book service.
//! Every other crate in the workspace builds on the error taxonomy and the
//! book model defined here.

pub mod book;
pub mod error;
pub mod id;
pub mod result;
pub mod validation;

pub use book::*;
pub use error::*;
pub use id::*;
pub use result::*;
pub use validation::*;
