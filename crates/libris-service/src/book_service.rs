//! Book service trait definition.

use crate::cache::CacheInfo;
use crate::dto::{BooksListResponse, BulkItemResult};
use crate::metrics::ServiceMetricsSnapshot;
use async_trait::async_trait;
use libris_core::{Book, BookFilter, BookId, CreateBookRequest, LibrisResult, UpdateBookRequest};
use libris_jobs::WorkerPoolStats;
use std::time::Duration;

/// Book service trait.
#[async_trait]
pub trait BookService: Send + Sync {
    /// Validates, stores and caches a new book.
    async fn create_book(&self, request: CreateBookRequest) -> LibrisResult<Book>;

    /// Gets a book by ID, cache first.
    async fn get_book_by_id(&self, id: BookId) -> LibrisResult<Book>;

    /// Lists one page of books, cache first.
    async fn get_all_books(&self, filter: BookFilter) -> LibrisResult<BooksListResponse>;

    /// Updates the present fields of a book.
    async fn update_book(&self, id: BookId, request: UpdateBookRequest) -> LibrisResult<Book>;

    /// Deletes a book.
    async fn delete_book(&self, id: BookId) -> LibrisResult<()>;

    /// Creates many books concurrently.
    ///
    /// The result at index `i` belongs to `requests[i]`.
    async fn bulk_create_books(&self, requests: Vec<CreateBookRequest>) -> Vec<BulkItemResult>;

    fn get_metrics(&self) -> ServiceMetricsSnapshot;

    fn cache_info(&self) -> CacheInfo;

    fn worker_stats(&self) -> WorkerPoolStats;

    /// Stops the worker pool, then the cache.
    async fn shutdown(&self, deadline: Duration) -> LibrisResult<()>;
}
