//! Book list and bulk-create DTOs.

use libris_core::{Book, CreateBookRequest, LibrisResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One page of books plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BooksListResponse {
    pub books: Vec<Book>,
    /// Books matching the filter, across all pages.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Outcome of one item of a bulk create, in request order.
pub type BulkItemResult = LibrisResult<Book>;

/// A failed bulk-create item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkItemError {
    /// Position of the item in the request.
    pub index: usize,
    pub error: String,
    /// The request as submitted.
    pub book: CreateBookRequest,
}

/// Summary of a bulk create.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkCreateResponse {
    pub total_requested: usize,
    pub successful: usize,
    pub failed: usize,
    /// Created books, in request order.
    pub books: Vec<Book>,
    pub errors: Vec<BulkItemError>,
}

impl BulkCreateResponse {
    /// Pairs each request with its result.
    ///
    /// `results` must be index-aligned with `requests`.
    #[must_use]
    pub fn from_results(requests: Vec<CreateBookRequest>, results: Vec<BulkItemResult>) -> Self {
        let total_requested = requests.len();
        let mut books = Vec::new();
        let mut errors = Vec::new();

        for (index, (request, result)) in requests.into_iter().zip(results).enumerate() {
            match result {
                Ok(book) => books.push(book),
                Err(err) => errors.push(BulkItemError {
                    index,
                    error: err.detail(),
                    book: request,
                }),
            }
        }

        Self {
            total_requested,
            successful: books.len(),
            failed: errors.len(),
            books,
            errors,
        }
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    #[must_use]
    pub fn none_succeeded(&self) -> bool {
        self.successful == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::LibrisError;

    fn request(title: &str) -> CreateBookRequest {
        CreateBookRequest {
            title: title.to_string(),
            author: "Author".to_string(),
            isbn: "9780547928210".to_string(),
            publisher: String::new(),
            genre: String::new(),
            published_at: None,
            pages: 100,
            language: String::new(),
        }
    }

    #[test]
    fn test_from_results_keeps_indices() {
        let requests = vec![request("a"), request(""), request("c")];
        let results = vec![
            Ok(Book::from_request(&requests[0])),
            Err(LibrisError::validation("title is required")),
            Ok(Book::from_request(&requests[2])),
        ];

        let response = BulkCreateResponse::from_results(requests, results);
        assert_eq!(response.total_requested, 3);
        assert_eq!(response.successful, 2);
        assert_eq!(response.failed, 1);
        assert_eq!(response.books[0].title, "a");
        assert_eq!(response.books[1].title, "c");
        assert_eq!(response.errors[0].index, 1);
        assert_eq!(response.errors[0].error, "title is required");
        assert!(!response.all_succeeded());
        assert!(!response.none_succeeded());
    }

    #[test]
    fn test_serialized_shape() {
        let response = BulkCreateResponse::from_results(
            vec![request("")],
            vec![Err(LibrisError::validation("title is required"))],
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_requested"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["errors"][0]["index"], 0);
        assert_eq!(json["errors"][0]["book"]["isbn"], "9780547928210");
        assert!(response.none_succeeded());
    }
}
