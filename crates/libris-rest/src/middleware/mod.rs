//! HTTP middleware.

pub mod logging;
pub mod recovery;

pub use logging::*;
pub use recovery::*;
