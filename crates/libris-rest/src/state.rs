//! Application state for Axum handlers.

use crate::shell::HandlerShell;
use libris_config::AppMetadata;
use libris_service::BookService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub book_service: Arc<dyn BookService>,
    pub shell: Arc<HandlerShell>,
    pub app: Arc<AppMetadata>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(book_service: Arc<dyn BookService>, shell: Arc<HandlerShell>, app: AppMetadata) -> Self {
        Self {
            book_service,
            shell,
            app: Arc::new(app),
        }
    }
}
