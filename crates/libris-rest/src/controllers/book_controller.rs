//! Book catalogue controller.
//!
//! Create and bulk-create take a concurrency slot first. Create, get, list
//! and bulk-create run their service call on a spawned task raced against
//! a per-operation deadline; when the deadline passes the client gets a 408
//! while the task finishes in the background.

use crate::{
    responses::{created, ok, ApiResponse, ApiResult, AppError},
    shell::{HandlerMetricsSnapshot, Operation},
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use libris_core::{Book, BookFilter, BookId, CreateBookRequest, UpdateBookRequest};
use libris_jobs::WorkerPoolStats;
use libris_resilience::{spawn_with_deadline, Deadline};
use libris_service::{BooksListResponse, BulkCreateResponse, CacheInfo, ServiceMetricsSnapshot};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

/// Creates the book router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/bulk", post(bulk_create_books))
        .route("/metrics", get(get_metrics))
        .route("/:id", get(get_book).put(update_book).delete(delete_book))
}

/// Query parameters for listing books.
///
/// Values that do not parse are ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListBooksQuery {
    /// Case-insensitive author substring.
    pub author: Option<String>,
    /// Case-insensitive genre substring.
    pub genre: Option<String>,
    /// Exact language, case-insensitive.
    pub language: Option<String>,
    /// `true`/`false` (also `1`/`0`, `t`/`f`).
    pub available: Option<String>,
    /// Page size, 1 to 100.
    pub limit: Option<String>,
    /// Rows to skip.
    pub offset: Option<String>,
}

impl From<ListBooksQuery> for BookFilter {
    fn from(query: ListBooksQuery) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Self {
            author: non_empty(query.author),
            genre: non_empty(query.genre),
            language: non_empty(query.language),
            available: query.available.as_deref().and_then(parse_bool),
            limit: query
                .limit
                .as_deref()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(0),
            offset: query
                .offset
                .as_deref()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v >= 0)
                .unwrap_or(0),
        }
    }
}

/// Handler counters plus the service, cache and worker views.
#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub handler: HandlerMetricsSnapshot,
    pub service_metrics: ServiceMetricsSnapshot,
    pub cache: CacheInfo,
    #[schema(value_type = Object)]
    pub workers: WorkerPoolStats,
}

/// List books.
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    params(ListBooksQuery),
    responses(
        (status = 200, description = "Books retrieved successfully", body = BooksListResponse),
        (status = 408, description = "Books retrieval timed out", body = libris_core::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> ApiResult<BooksListResponse> {
    let _scope = state.shell.begin(Operation::GetBooks);
    let filter = BookFilter::from(query);
    debug!(?filter, "List books request");

    let service = Arc::clone(&state.book_service);
    let response = spawn_with_deadline(
        state.shell.deadlines().list,
        "Books retrieval timed out",
        async move { service.get_all_books(filter).await },
    )
    .await?;

    ok("Books retrieved successfully", response)
}

/// Create a book.
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created successfully", body = Book),
        (status = 400, description = "Invalid JSON or validation error", body = libris_core::ErrorResponse),
        (status = 408, description = "Request parsing or book creation timed out", body = libris_core::ErrorResponse),
        (status = 409, description = "ISBN already exists", body = libris_core::ErrorResponse),
        (status = 429, description = "Too many concurrent requests", body = libris_core::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    body: Body,
) -> Result<(StatusCode, Json<ApiResponse<Book>>), AppError> {
    let _permit = state.shell.try_acquire()?;
    let _scope = state.shell.begin(Operation::CreateBook);
    let deadline = Deadline::after(state.shell.deadlines().create);

    let limit = state.shell.max_body_size();
    let decoded = spawn_with_deadline(deadline.remaining(), "Request parsing timed out", async move {
        Ok(read_json::<CreateBookRequest>(body, limit).await)
    })
    .await?;
    let request = decoded?;
    debug!(title = %request.title, "Create book request");

    let service = Arc::clone(&state.book_service);
    let book = spawn_with_deadline(deadline.remaining(), "Book creation timed out", async move {
        service.create_book(request).await
    })
    .await?;

    Ok(created("Book created successfully", book))
}

/// Get a book by ID.
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book UUID")),
    responses(
        (status = 200, description = "Book retrieved successfully", body = Book),
        (status = 400, description = "Invalid book ID", body = libris_core::ErrorResponse),
        (status = 404, description = "Book not found", body = libris_core::ErrorResponse),
        (status = 408, description = "Book retrieval timed out", body = libris_core::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Book> {
    let _scope = state.shell.begin(Operation::GetBook);
    let id = parse_book_id(&id)?;
    debug!(book_id = %id, "Get book request");

    let service = Arc::clone(&state.book_service);
    let book = spawn_with_deadline(state.shell.deadlines().get, "Book retrieval timed out", async move {
        service.get_book_by_id(id).await
    })
    .await?;

    ok("Book retrieved successfully", book)
}

/// Update a book.
#[utoipa::path(
    put,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book UUID")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated successfully", body = Book),
        (status = 400, description = "Invalid ID, JSON or field", body = libris_core::ErrorResponse),
        (status = 404, description = "Book not found", body = libris_core::ErrorResponse),
        (status = 409, description = "ISBN already exists", body = libris_core::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Body,
) -> ApiResult<Book> {
    let _scope = state.shell.begin(Operation::UpdateBook);
    let id = parse_book_id(&id)?;
    let request = read_json::<UpdateBookRequest>(body, state.shell.max_body_size()).await?;
    debug!(book_id = %id, "Update book request");

    let book = state.book_service.update_book(id, request).await?;
    ok("Book updated successfully", book)
}

/// Delete a book.
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book UUID")),
    responses(
        (status = 200, description = "Book deleted successfully"),
        (status = 400, description = "Invalid book ID", body = libris_core::ErrorResponse),
        (status = 404, description = "Book not found", body = libris_core::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let _scope = state.shell.begin(Operation::DeleteBook);
    let id = parse_book_id(&id)?;
    debug!(book_id = %id, "Delete book request");

    state.book_service.delete_book(id).await?;
    Ok(Json(ApiResponse::message("Book deleted successfully")))
}

/// Create many books in one request.
#[utoipa::path(
    post,
    path = "/api/books/bulk",
    tag = "books",
    request_body = Vec<CreateBookRequest>,
    responses(
        (status = 201, description = "All books created successfully", body = BulkCreateResponse),
        (status = 206, description = "Some books created successfully", body = BulkCreateResponse),
        (status = 400, description = "Empty, oversized or entirely failed request", body = BulkCreateResponse),
        (status = 408, description = "Bulk creation timed out", body = libris_core::ErrorResponse),
        (status = 429, description = "Too many concurrent requests", body = libris_core::ErrorResponse)
    )
)]
pub async fn bulk_create_books(
    State(state): State<AppState>,
    body: Body,
) -> Result<Response, AppError> {
    let _permit = state.shell.try_acquire()?;
    let _scope = state.shell.begin(Operation::BulkCreateBooks);
    let deadline = Deadline::after(state.shell.deadlines().bulk);

    let requests = read_json::<Vec<CreateBookRequest>>(body, state.shell.max_body_size()).await?;
    if requests.is_empty() {
        return Err(AppError::bad_request("Empty request", "No books provided"));
    }
    let max_items = state.shell.bulk_max_items();
    if requests.len() > max_items {
        return Err(AppError::bad_request(
            "Too many books",
            format!("Maximum {max_items} books per request"),
        ));
    }
    debug!(count = requests.len(), "Bulk create request");

    let service = Arc::clone(&state.book_service);
    let submitted = requests.clone();
    let results = spawn_with_deadline(deadline.remaining(), "Bulk creation timed out", async move {
        Ok(service.bulk_create_books(submitted).await)
    })
    .await?;

    Ok(bulk_response(BulkCreateResponse::from_results(requests, results)))
}

/// Get handler, service, cache and worker metrics.
#[utoipa::path(
    get,
    path = "/api/books/metrics",
    tag = "books",
    responses(
        (status = 200, description = "Metrics retrieved successfully", body = MetricsResponse)
    )
)]
pub async fn get_metrics(State(state): State<AppState>) -> ApiResult<MetricsResponse> {
    let metrics = MetricsResponse {
        handler: state.shell.metrics_snapshot(),
        service_metrics: state.book_service.get_metrics(),
        cache: state.book_service.cache_info(),
        workers: state.book_service.worker_stats(),
    };
    ok("Metrics retrieved successfully", metrics)
}

fn bulk_response(response: BulkCreateResponse) -> Response {
    if response.all_succeeded() {
        (
            StatusCode::CREATED,
            Json(ApiResponse::new("All books created successfully", response)),
        )
            .into_response()
    } else if response.none_succeeded() {
        (StatusCode::BAD_REQUEST, Json(response)).into_response()
    } else {
        (
            StatusCode::PARTIAL_CONTENT,
            Json(ApiResponse::new("Some books created successfully", response)),
        )
            .into_response()
    }
}

/// Collects the body and decodes it as JSON.
async fn read_json<T: DeserializeOwned>(body: Body, limit: usize) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::invalid_json(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AppError::invalid_json(e.to_string()))
}

fn parse_book_id(id: &str) -> Result<BookId, AppError> {
    BookId::parse(id).map_err(|_| AppError::invalid_id())
}

/// Accepts the spellings `1 t T TRUE true True` and their false forms.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListBooksQuery {
        let mut query = ListBooksQuery::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "author" => query.author = value,
                "genre" => query.genre = value,
                "language" => query.language = value,
                "available" => query.available = value,
                "limit" => query.limit = value,
                "offset" => query.offset = value,
                _ => unreachable!(),
            }
        }
        query
    }

    #[test]
    fn test_query_to_filter() {
        let filter = BookFilter::from(query(&[
            ("author", "Tolkien"),
            ("available", "true"),
            ("limit", "20"),
            ("offset", "40"),
        ]));
        assert_eq!(filter.author.as_deref(), Some("Tolkien"));
        assert_eq!(filter.available, Some(true));
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.offset, 40);
        assert!(filter.genre.is_none());
    }

    #[test]
    fn test_query_ignores_unparseable_values() {
        let filter = BookFilter::from(query(&[
            ("available", "maybe"),
            ("limit", "-5"),
            ("offset", "abc"),
            ("genre", ""),
        ]));
        assert_eq!(filter.available, None);
        assert_eq!(filter.limit, 0);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.genre, None);
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert_eq!(parse_bool("T"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_parse_book_id() {
        assert!(parse_book_id("not-a-uuid").is_err());
        assert!(parse_book_id(&BookId::new().to_string()).is_ok());
    }
}
