//! Repository trait definitions.

use async_trait::async_trait;
use libris_core::{Book, BookFilter, BookId, CreateBookRequest, LibrisResult, UpdateBookRequest};

/// Book repository trait.
///
/// Implementations must be safe to share across tasks. Missing rows surface
/// as [`libris_core::LibrisError::NotFound`].
#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    /// Stores a new book built from the request and returns it.
    async fn create(&self, request: &CreateBookRequest) -> LibrisResult<Book>;

    /// Finds a book by ID.
    async fn get_by_id(&self, id: BookId) -> LibrisResult<Book>;

    /// Lists books matching the filter, newest first, with the filtered total.
    async fn get_all(&self, filter: &BookFilter) -> LibrisResult<(Vec<Book>, i64)>;

    /// Applies the present fields of the request to an existing book.
    async fn update(&self, id: BookId, request: &UpdateBookRequest) -> LibrisResult<Book>;

    /// Deletes a book by ID.
    async fn delete(&self, id: BookId) -> LibrisResult<()>;

    /// Checks whether another book already uses the ISBN.
    async fn exists_by_isbn(&self, isbn: &str, exclude: Option<BookId>) -> LibrisResult<bool>;
}
