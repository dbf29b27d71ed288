//! End-to-end tests of the book API over the in-memory repository.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use libris_config::{AppMetadata, HandlerConfig, ServerConfig};
use libris_core::{Book, BookFilter, BookId, CreateBookRequest, LibrisResult, UpdateBookRequest};
use libris_jobs::{WorkerPool, WorkerPoolConfig, WorkerPoolStats};
use libris_repository::InMemoryBookRepository;
use libris_rest::{create_router, AppState, HandlerShell};
use libris_service::{
    BookService, BookServiceImpl, BooksListResponse, BulkItemResult, CacheInfo, CacheSettings,
    HybridBookCache, ServiceMetricsSnapshot, ServiceSettings,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

type RealService = BookServiceImpl<InMemoryBookRepository>;

async fn real_service(handler: &HandlerConfig) -> RealService {
    let cache = Arc::new(HybridBookCache::local_only(CacheSettings::default()).await);
    let workers = Arc::new(WorkerPool::with_book_processor(WorkerPoolConfig {
        workers: 2,
        base_delay: Duration::ZERO,
        ..WorkerPoolConfig::default()
    }));
    workers.start().unwrap();
    BookServiceImpl::new(
        Arc::new(InMemoryBookRepository::new()),
        cache,
        workers,
        ServiceSettings::from(handler),
    )
}

fn router_for(service: Arc<dyn BookService>, handler: &HandlerConfig) -> (Router, Arc<HandlerShell>) {
    let shell = Arc::new(HandlerShell::new(handler));
    let state = AppState::new(service, Arc::clone(&shell), AppMetadata::default());
    (create_router(state, &ServerConfig::default()), shell)
}

async fn app() -> Router {
    app_with(HandlerConfig::default()).await
}

async fn app_with(handler: HandlerConfig) -> Router {
    let service = real_service(&handler).await;
    router_for(Arc::new(service), &handler).0
}

/// Delegates to a real service, delaying create and get.
struct DelayedService {
    inner: RealService,
    create_delay: Duration,
    get_delay: Duration,
}

#[async_trait]
impl BookService for DelayedService {
    async fn create_book(&self, request: CreateBookRequest) -> LibrisResult<Book> {
        tokio::time::sleep(self.create_delay).await;
        self.inner.create_book(request).await
    }

    async fn get_book_by_id(&self, id: BookId) -> LibrisResult<Book> {
        tokio::time::sleep(self.get_delay).await;
        self.inner.get_book_by_id(id).await
    }

    async fn get_all_books(&self, filter: BookFilter) -> LibrisResult<BooksListResponse> {
        self.inner.get_all_books(filter).await
    }

    async fn update_book(&self, id: BookId, request: UpdateBookRequest) -> LibrisResult<Book> {
        self.inner.update_book(id, request).await
    }

    async fn delete_book(&self, id: BookId) -> LibrisResult<()> {
        self.inner.delete_book(id).await
    }

    async fn bulk_create_books(&self, requests: Vec<CreateBookRequest>) -> Vec<BulkItemResult> {
        self.inner.bulk_create_books(requests).await
    }

    fn get_metrics(&self) -> ServiceMetricsSnapshot {
        self.inner.get_metrics()
    }

    fn cache_info(&self) -> CacheInfo {
        self.inner.cache_info()
    }

    fn worker_stats(&self) -> WorkerPoolStats {
        self.inner.worker_stats()
    }

    async fn shutdown(&self, deadline: Duration) -> LibrisResult<()> {
        self.inner.shutdown(deadline).await
    }
}

async fn delayed_app(
    handler: HandlerConfig,
    create_delay: Duration,
    get_delay: Duration,
) -> (Router, Arc<HandlerShell>) {
    let service = DelayedService {
        inner: real_service(&handler).await,
        create_delay,
        get_delay,
    };
    router_for(Arc::new(service), &handler)
}

fn book_json(title: &str, isbn: &str) -> Value {
    json!({
        "title": title,
        "author": "J.R.R. Tolkien",
        "isbn": isbn,
        "publisher": "Allen & Unwin",
        "genre": "Fantasy",
        "pages": 310
    })
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn create(app: &Router, title: &str, isbn: &str) -> Value {
    let (status, body) = send(app, json_request(Method::POST, "/api/books", &book_json(title, isbn))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_create_and_get_book() {
    let app = app().await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/books", &book_json("  The Hobbit  ", "978-0-547-92821-0")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Book created successfully");
    assert_eq!(body["data"]["title"], "The Hobbit");
    assert_eq!(body["data"]["isbn"], "9780547928210");
    assert_eq!(body["data"]["language"], "English");
    assert_eq!(body["data"]["available"], true);

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = send(&app, empty_request(Method::GET, &format!("/api/books/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book retrieved successfully");
    assert_eq!(body["data"]["id"], id.as_str());
}

#[tokio::test]
async fn test_create_rejects_malformed_json() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/books")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON");
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_create_validation_error() {
    let app = app().await;
    let (status, body) = send(&app, json_request(Method::POST, "/api/books", &book_json("   ", "9780547928210"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
    assert_eq!(body["message"], "title is required");

    let (status, body) = send(&app, json_request(Method::POST, "/api/books", &book_json("Dune", "12345abcde"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid ISBN format");
}

#[tokio::test]
async fn test_duplicate_isbn_conflicts() {
    let app = app().await;
    create(&app, "The Hobbit", "9780547928210").await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/books", &book_json("Another Hobbit", "978 0547 928210")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate resource");
    assert_eq!(body["message"], "book with ISBN 9780547928210 already exists");
}

#[tokio::test]
async fn test_get_with_bad_or_unknown_id() {
    let app = app().await;

    let (status, body) = send(&app, empty_request(Method::GET, "/api/books/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid book ID");
    assert_eq!(body["message"], "ID must be a valid UUID");

    let (status, body) = send(&app, empty_request(Method::GET, &format!("/api/books/{}", BookId::new()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Book not found");
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let app = app().await;
    create(&app, "The Hobbit", "9780547928210").await;
    create(&app, "The Silmarillion", "9780261102736").await;
    create(&app, "Unfinished Tales", "9780261103627").await;

    let (status, body) = send(&app, empty_request(Method::GET, "/api/books?author=tolkien&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Books retrieved successfully");
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, empty_request(Method::GET, "/api/books?limit=500&offset=-3&available=maybe")).await;
    assert_eq!(body["data"]["limit"], 50);
    assert_eq!(body["data"]["offset"], 0);
    assert_eq!(body["data"]["books"].as_array().unwrap().len(), 3);

    let (_, body) = send(&app, empty_request(Method::GET, "/api/books?available=false")).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_update_then_delete() {
    let app = app().await;
    let book = create(&app, "The Hobbit", "9780547928210").await;
    let uri = format!("/api/books/{}", book["id"].as_str().unwrap());

    let (status, body) = send(&app, json_request(Method::PUT, &uri, &json!({"pages": 320, "available": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully");
    assert_eq!(body["data"]["pages"], 320);
    assert_eq!(body["data"]["available"], false);
    assert_eq!(body["data"]["title"], "The Hobbit");

    let (status, body) = send(&app, json_request(Method::PUT, &uri, &json!({"title": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "title cannot be empty");

    let (status, body) = send(&app, empty_request(Method::DELETE, &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Book deleted successfully"}));

    let (status, _) = send(&app, empty_request(Method::GET, &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, empty_request(Method::DELETE, &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_create_statuses() {
    let app = app().await;

    let all = json!([book_json("The Hobbit", "9780547928210"), book_json("The Silmarillion", "9780261102736")]);
    let (status, body) = send(&app, json_request(Method::POST, "/api/books/bulk", &all)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "All books created successfully");
    assert_eq!(body["data"]["successful"], 2);
    assert_eq!(body["data"]["books"][0]["title"], "The Hobbit");
    assert_eq!(body["data"]["books"][1]["title"], "The Silmarillion");

    let some = json!([book_json("Unfinished Tales", "9780261103627"), book_json("", "9780261103573")]);
    let (status, body) = send(&app, json_request(Method::POST, "/api/books/bulk", &some)).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body["message"], "Some books created successfully");
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["errors"][0]["index"], 1);
    assert_eq!(body["data"]["errors"][0]["error"], "title is required");

    let none = json!([book_json("Duplicate", "9780547928210")]);
    let (status, body) = send(&app, json_request(Method::POST, "/api/books/bulk", &none)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["total_requested"], 1);
    assert_eq!(body["failed"], 1);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_bulk_create_size_limits() {
    let app = app_with(HandlerConfig {
        bulk_max_items: 2,
        ..HandlerConfig::default()
    })
    .await;

    let (status, body) = send(&app, json_request(Method::POST, "/api/books/bulk", &json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty request");
    assert_eq!(body["message"], "No books provided");

    let three = json!([
        book_json("A", "9780547928210"),
        book_json("B", "9780261102736"),
        book_json("C", "9780261103627")
    ]);
    let (status, body) = send(&app, json_request(Method::POST, "/api/books/bulk", &three)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Too many books");
    assert_eq!(body["message"], "Maximum 2 books per request");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app().await;
    let book = create(&app, "The Hobbit", "9780547928210").await;
    let uri = format!("/api/books/{}", book["id"].as_str().unwrap());
    send(&app, empty_request(Method::GET, &uri)).await;

    let (status, body) = send(&app, empty_request(Method::GET, "/api/books/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Metrics retrieved successfully");
    assert_eq!(body["data"]["total_requests"], 2);
    assert!(body["data"]["request_duration"].get("CreateBook").is_some());
    assert!(body["data"]["request_duration"].get("GetBook").is_some());
    assert_eq!(body["data"]["service_metrics"]["cache_hits"], 1);
    assert_eq!(body["data"]["cache"]["mode"], "local_only");
    assert_eq!(body["data"]["workers"]["workers"], 2);
}

#[tokio::test]
async fn test_health_and_root() {
    let app = app().await;

    let (status, body) = send(&app, empty_request(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Service is healthy");
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "libris");

    let (status, _) = send(&app, empty_request(Method::GET, "/live")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, empty_request(Method::GET, "/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Libris Book API v1".to_string()));
}

#[tokio::test]
async fn test_request_id_is_set_and_propagated() {
    let app = app().await;

    let response = app.clone().oneshot(empty_request(Method::GET, "/live")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/live")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_create_rate_limited_when_slots_exhausted() {
    let handler = HandlerConfig {
        slot_capacity: 1,
        ..HandlerConfig::default()
    };
    let (app, _shell) = delayed_app(handler, Duration::from_millis(300), Duration::ZERO).await;

    let first = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&app, json_request(Method::POST, "/api/books", &book_json("The Hobbit", "9780547928210"))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/books", &book_json("Dune", "9780441013593")),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["message"], "Too many concurrent requests");
    assert_eq!(body["code"], 429);

    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_deadline_returns_408() {
    let handler = HandlerConfig {
        create_timeout_secs: 1,
        ..HandlerConfig::default()
    };
    let (app, _shell) = delayed_app(handler, Duration::from_secs(3), Duration::ZERO).await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/books", &book_json("The Hobbit", "9780547928210")),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "Request timeout");
    assert_eq!(body["message"], "Book creation timed out");
}

#[tokio::test]
async fn test_get_deadline_returns_408() {
    let handler = HandlerConfig {
        get_timeout_secs: 1,
        ..HandlerConfig::default()
    };
    let (app, _shell) = delayed_app(handler, Duration::ZERO, Duration::from_secs(3)).await;

    let (status, body) = send(&app, empty_request(Method::GET, &format!("/api/books/{}", BookId::new()))).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["message"], "Book retrieval timed out");
}

#[tokio::test]
async fn test_drain_waits_for_in_flight_request() {
    let (app, shell) = delayed_app(HandlerConfig::default(), Duration::from_millis(200), Duration::ZERO).await;

    let request = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&app, json_request(Method::POST, "/api/books", &book_json("The Hobbit", "9780547928210"))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(shell.active_requests(), 1);

    shell.drain(Duration::from_secs(2)).await.unwrap();
    assert_eq!(shell.active_requests(), 0);
    assert_eq!(request.await.unwrap().0, StatusCode::CREATED);
}
