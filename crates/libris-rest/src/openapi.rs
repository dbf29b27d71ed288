//! OpenAPI documentation configuration.

use crate::controllers::book_controller::MetricsResponse;
use crate::controllers::health_controller::HealthResponse;
use crate::shell::HandlerMetricsSnapshot;
use libris_core::{Book, BookFilter, BookId, CreateBookRequest, ErrorResponse, UpdateBookRequest};
use libris_service::{
    BooksListResponse, BulkCreateResponse, BulkItemError, CacheInfo, CacheMode, CacheStats,
    ServiceMetricsSnapshot,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the Libris API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Book catalogue REST API with a two-tier cache and bounded request handling",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        // Book endpoints
        crate::controllers::book_controller::list_books,
        crate::controllers::book_controller::create_book,
        crate::controllers::book_controller::get_book,
        crate::controllers::book_controller::update_book,
        crate::controllers::book_controller::delete_book,
        crate::controllers::book_controller::bulk_create_books,
        crate::controllers::book_controller::get_metrics,
        // Health endpoints
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::readiness_check,
        crate::controllers::health_controller::liveness_check,
    ),
    components(
        schemas(
            BookId,
            Book,
            BookFilter,
            CreateBookRequest,
            UpdateBookRequest,
            ErrorResponse,
            BooksListResponse,
            BulkCreateResponse,
            BulkItemError,
            CacheInfo,
            CacheMode,
            CacheStats,
            ServiceMetricsSnapshot,
            HandlerMetricsSnapshot,
            MetricsResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "books", description = "Book catalogue endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_book_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/books"));
        assert!(doc.paths.paths.contains_key("/api/books/{id}"));
        assert!(doc.paths.paths.contains_key("/api/books/bulk"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
