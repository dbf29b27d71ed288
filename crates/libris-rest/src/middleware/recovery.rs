//! Panic recovery.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use libris_core::ErrorResponse;
use std::any::Any;
use tracing::error;

/// Turns a handler panic into a 500 JSON body.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            "Internal server error",
            "An unexpected error occurred. Please try again later.",
            500,
        )),
    )
        .into_response()
}
