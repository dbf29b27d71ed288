//! Book service implementation.

use crate::book_service::BookService;
use crate::cache::{CacheInfo, HybridBookCache};
use crate::dto::{BooksListResponse, BulkItemResult};
use crate::metrics::{RequestTimer, ServiceMetrics, ServiceMetricsSnapshot};
use async_trait::async_trait;
use libris_config::HandlerConfig;
use libris_core::rules::{not_blank, positive_pages, valid_isbn};
use libris_core::{
    Book, BookFilter, BookId, CreateBookRequest, LibrisError, LibrisResult, UpdateBookRequest,
    ValidateExt,
};
use libris_jobs::{BookJob, JobError, WorkerPool, WorkerPoolStats};
use libris_repository::BookRepository;
use libris_resilience::spawn_with_deadline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Tunables of the book service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Longest wait for the ISBN uniqueness check.
    pub uniqueness_timeout: Duration,
    /// Creates in flight at once during a bulk create.
    pub bulk_concurrency: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&HandlerConfig::default())
    }
}

impl From<&HandlerConfig> for ServiceSettings {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            uniqueness_timeout: config.uniqueness_timeout(),
            bulk_concurrency: config.bulk_concurrency.max(1),
        }
    }
}

/// Generic book service implementation.
///
/// Cloning is cheap; clones share repository, cache, pool and metrics.
pub struct BookServiceImpl<R: BookRepository> {
    repository: Arc<R>,
    cache: Arc<HybridBookCache>,
    workers: Arc<WorkerPool>,
    metrics: Arc<ServiceMetrics>,
    settings: ServiceSettings,
}

impl<R: BookRepository> Clone for BookServiceImpl<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            workers: Arc::clone(&self.workers),
            metrics: Arc::clone(&self.metrics),
            settings: self.settings.clone(),
        }
    }
}

impl<R: BookRepository> BookServiceImpl<R> {
    /// Creates a new book service.
    ///
    /// The worker pool is expected to be started by the caller.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<HybridBookCache>,
        workers: Arc<WorkerPool>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            workers,
            metrics: Arc::new(ServiceMetrics::new()),
            settings,
        }
    }

    /// Runs the title, author and ISBN checks on separate tasks.
    ///
    /// The first failure to arrive is returned; checks still running are
    /// left to finish and their results are dropped.
    async fn validate_fields(request: &CreateBookRequest) -> LibrisResult<()> {
        let checks: [(String, fn(&str) -> LibrisResult<()>); 3] = [
            (request.title.clone(), check_title),
            (request.author.clone(), check_author),
            (request.isbn.clone(), check_isbn),
        ];
        let expected = checks.len();
        let (tx, mut rx) = mpsc::channel(expected);

        for (value, check) in checks {
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(check(&value)).await;
            });
        }
        drop(tx);

        let mut received = 0;
        while let Some(result) = rx.recv().await {
            result?;
            received += 1;
        }

        if received == expected {
            Ok(())
        } else {
            Err(LibrisError::internal("field validation did not complete"))
        }
    }

    /// Fails with `Conflict` when another book holds `isbn`.
    ///
    /// The repository call runs on its own task; after
    /// `uniqueness_timeout` the caller stops waiting for it.
    async fn ensure_isbn_unique(&self, isbn: &str, exclude: Option<BookId>) -> LibrisResult<()> {
        let repository = Arc::clone(&self.repository);
        let lookup = isbn.to_string();

        let exists = spawn_with_deadline(
            self.settings.uniqueness_timeout,
            "validation timeout",
            async move {
                repository
                    .exists_by_isbn(&lookup, exclude)
                    .await
                    .map_err(|e| {
                        error!(isbn = %lookup, error = %e, "ISBN uniqueness check failed");
                        LibrisError::internal("failed to check ISBN uniqueness")
                    })
            },
        )
        .await
        .map_err(|e| {
            if matches!(e, LibrisError::Timeout(_)) {
                warn!(isbn, "ISBN uniqueness check timed out");
            }
            e
        })?;

        if exists {
            return Err(LibrisError::conflict(format!("book with ISBN {isbn} already exists")));
        }
        Ok(())
    }

    fn submit_notification(&self, request: CreateBookRequest) {
        let job = BookJob::notify(request);
        let job_id = job.id.clone();
        match self.workers.submit_job(job) {
            Ok(()) => debug!(job_id = %job_id, "Notification job submitted"),
            Err(e) => warn!(job_id = %job_id, error = %e, "Notification job not submitted"),
        }
    }
}

fn check_title(title: &str) -> LibrisResult<()> {
    if not_blank(title) {
        Ok(())
    } else {
        Err(LibrisError::validation("title is required"))
    }
}

fn check_author(author: &str) -> LibrisResult<()> {
    if not_blank(author) {
        Ok(())
    } else {
        Err(LibrisError::validation("author is required"))
    }
}

fn check_isbn(isbn: &str) -> LibrisResult<()> {
    if !not_blank(isbn) {
        return Err(LibrisError::validation("ISBN is required"));
    }
    if !valid_isbn(isbn) {
        return Err(LibrisError::validation("invalid ISBN format"));
    }
    Ok(())
}

/// Checks the present fields of an update in a fixed order: title,
/// author, ISBN, pages.
fn validate_update(request: &UpdateBookRequest) -> LibrisResult<()> {
    if request.title.as_deref().is_some_and(|title| !not_blank(title)) {
        return Err(LibrisError::validation("title cannot be empty"));
    }
    if request.author.as_deref().is_some_and(|author| !not_blank(author)) {
        return Err(LibrisError::validation("author cannot be empty"));
    }
    if let Some(isbn) = request.isbn.as_deref() {
        if !not_blank(isbn) {
            return Err(LibrisError::validation("ISBN cannot be empty"));
        }
        if !valid_isbn(isbn) {
            return Err(LibrisError::validation("invalid ISBN format"));
        }
    }
    if request.pages.is_some_and(|pages| !positive_pages(pages)) {
        return Err(LibrisError::validation("pages must be greater than 0"));
    }
    Ok(())
}

#[async_trait]
impl<R: BookRepository> BookService for BookServiceImpl<R> {
    async fn create_book(&self, request: CreateBookRequest) -> LibrisResult<Book> {
        let _timer = RequestTimer::start(&self.metrics);
        debug!(title = %request.title, "Creating book");

        Self::validate_fields(&request).await?;

        let request = request.normalized();
        request.validate_request()?;

        self.ensure_isbn_unique(&request.isbn, None).await?;

        let book = self.repository.create(&request).await?;

        self.cache.set_book(&book).await;
        self.cache.invalidate_book_lists().await;
        self.submit_notification(request);

        info!(book_id = %book.id, isbn = %book.isbn, "Book created");
        Ok(book)
    }

    async fn get_book_by_id(&self, id: BookId) -> LibrisResult<Book> {
        let _timer = RequestTimer::start(&self.metrics);
        debug!(book_id = %id, "Getting book");

        if let Some(book) = self.cache.get_book(id).await {
            self.metrics.record_cache_hit();
            return Ok(book);
        }
        self.metrics.record_cache_miss();

        let book = self.repository.get_by_id(id).await?;
        self.cache.set_book(&book).await;

        Ok(book)
    }

    async fn get_all_books(&self, filter: BookFilter) -> LibrisResult<BooksListResponse> {
        let _timer = RequestTimer::start(&self.metrics);
        let filter = filter.clamped();
        debug!(limit = filter.limit, offset = filter.offset, "Listing books");

        if let Some(response) = self.cache.get_book_list(&filter).await {
            self.metrics.record_cache_hit();
            return Ok(response);
        }
        self.metrics.record_cache_miss();

        let (books, total) = self.repository.get_all(&filter).await?;
        let response = BooksListResponse {
            books,
            total,
            limit: filter.limit,
            offset: filter.offset,
        };
        self.cache.set_book_list(&filter, &response).await;

        Ok(response)
    }

    async fn update_book(&self, id: BookId, request: UpdateBookRequest) -> LibrisResult<Book> {
        let _timer = RequestTimer::start(&self.metrics);
        debug!(book_id = %id, "Updating book");

        self.repository.get_by_id(id).await?;

        validate_update(&request)?;
        let request = request.normalized();
        request.validate_request()?;

        if let Some(isbn) = request.isbn.as_deref() {
            self.ensure_isbn_unique(isbn, Some(id)).await?;
        }

        let book = self.repository.update(id, &request).await?;

        // Lists still hold the old version, so invalidate after the set.
        self.cache.set_book(&book).await;
        self.cache.invalidate_book(book.id).await;

        info!(book_id = %book.id, "Book updated");
        Ok(book)
    }

    async fn delete_book(&self, id: BookId) -> LibrisResult<()> {
        let _timer = RequestTimer::start(&self.metrics);
        debug!(book_id = %id, "Deleting book");

        self.repository.get_by_id(id).await?;
        self.repository.delete(id).await?;
        self.cache.invalidate_book(id).await;

        info!(book_id = %id, "Book deleted");
        Ok(())
    }

    async fn bulk_create_books(&self, requests: Vec<CreateBookRequest>) -> Vec<BulkItemResult> {
        if requests.is_empty() {
            return Vec::new();
        }

        let _timer = RequestTimer::start(&self.metrics);
        let total = requests.len();
        debug!(total, concurrency = self.settings.bulk_concurrency, "Bulk creating books");

        let limiter = Arc::new(Semaphore::new(self.settings.bulk_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let service = self.clone();
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let result = match limiter.acquire_owned().await {
                    Ok(_permit) => service.create_book(request).await,
                    Err(_) => Err(LibrisError::internal("bulk limiter closed")),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<BulkItemResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "Bulk create task failed"),
            }
        }

        let results: Vec<BulkItemResult> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(LibrisError::internal("bulk create task failed"))))
            .collect();

        let created = results.iter().filter(|r| r.is_ok()).count();
        info!(total, created, failed = total - created, "Bulk create finished");
        results
    }

    fn get_metrics(&self) -> ServiceMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn cache_info(&self) -> CacheInfo {
        self.cache.info()
    }

    fn worker_stats(&self) -> WorkerPoolStats {
        self.workers.stats()
    }

    async fn shutdown(&self, deadline: Duration) -> LibrisResult<()> {
        info!("Shutting down book service");

        let workers = self.workers.shutdown(deadline).await;
        self.cache.shutdown().await;

        workers.map_err(|e| match e {
            JobError::Timeout(_) => LibrisError::timeout(e.to_string()),
            other => LibrisError::internal(other.to_string()),
        })
    }
}
