//! Application builder.
//!
//! Wires repository, cache, worker pool, book service and router from an
//! [`AppConfig`], and owns the shutdown sequence.

use axum::Router;
use libris_config::{validate_config, AppConfig};
use libris_core::{LibrisError, LibrisResult};
use libris_jobs::{WorkerPool, WorkerPoolConfig};
use libris_repository::{BookRepository, DatabasePool, InMemoryBookRepository, PostgresBookRepository};
use libris_resilience::Deadline;
use libris_rest::{create_router, AppState, HandlerShell};
use libris_service::{
    BookService, BookServiceImpl, CacheInterface, CacheSettings, HybridBookCache, RedisCacheService,
    ServiceSettings,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Application builder for constructing the server.
pub struct AppBuilder {
    config: Option<AppConfig>,
}

impl AppBuilder {
    /// Creates a new application builder.
    #[must_use]
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds every component and the router.
    ///
    /// The external cache is optional: a Redis setup error leaves the
    /// cache in local-only mode. A database error is fatal.
    pub async fn build(self) -> LibrisResult<Application> {
        let config = self.config.unwrap_or_default();
        validate_config(&config)?;

        let external: Arc<dyn CacheInterface> = match RedisCacheService::from_config(&config.redis) {
            Ok(service) => Arc::new(service),
            Err(e) => {
                warn!(error = %e, "Redis setup failed, continuing with the local cache only");
                Arc::new(RedisCacheService::disabled())
            }
        };
        let cache = Arc::new(HybridBookCache::new(external, CacheSettings::from(&config.cache)).await);

        let workers = Arc::new(WorkerPool::with_book_processor(WorkerPoolConfig::from(&config.workers)));
        workers
            .start()
            .map_err(|e| LibrisError::internal(format!("failed to start worker pool: {e}")))?;

        let settings = ServiceSettings::from(&config.handler);
        let (book_service, database) = if config.database.is_memory() {
            info!("Using in-memory book repository");
            let repository = Arc::new(InMemoryBookRepository::new());
            (assemble(repository, cache, workers, settings), None)
        } else {
            let pool = Arc::new(DatabasePool::new(&config.database).await?);
            pool.ensure_schema().await?;
            let repository = Arc::new(PostgresBookRepository::new(Arc::clone(&pool)));
            (assemble(repository, cache, workers, settings), Some(pool))
        };

        let shell = Arc::new(HandlerShell::new(&config.handler));
        let state = AppState::new(Arc::clone(&book_service), Arc::clone(&shell), config.app.clone());
        let router = create_router(state, &config.server);

        Ok(Application {
            config,
            router,
            shell,
            book_service,
            database,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn assemble<R: BookRepository>(
    repository: Arc<R>,
    cache: Arc<HybridBookCache>,
    workers: Arc<WorkerPool>,
    settings: ServiceSettings,
) -> Arc<dyn BookService> {
    Arc::new(BookServiceImpl::new(repository, cache, workers, settings))
}

/// A fully wired server.
pub struct Application {
    config: AppConfig,
    router: Router,
    shell: Arc<HandlerShell>,
    book_service: Arc<dyn BookService>,
    database: Option<Arc<DatabasePool>>,
}

impl Application {
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The HTTP router, for serving or for driving in tests.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves until `signal` resolves, then shuts down.
    ///
    /// Everything after the signal, including waiting for open connections,
    /// shares one `server.shutdown_timeout` budget.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> LibrisResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let stopping = Arc::new(Notify::new());
        let trigger = Arc::clone(&stopping);
        let router = self.router();

        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    signal.await;
                    trigger.notify_one();
                })
                .await
        });

        tokio::select! {
            result = &mut server => {
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(LibrisError::internal(format!("REST server error: {e}"))),
                    Err(e) => Err(LibrisError::internal(format!("REST server task failed: {e}"))),
                };
            }
            () = stopping.notified() => {}
        }

        info!("Shutdown signal received, stopping listener");
        let deadline = Deadline::after(self.config.server.shutdown_timeout());

        match tokio::time::timeout(deadline.remaining(), &mut server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "REST server error during shutdown"),
            Ok(Err(e)) => warn!(error = %e, "REST server task failed during shutdown"),
            Err(_) => {
                warn!("Connections still open at shutdown deadline");
                server.abort();
            }
        }

        self.shutdown(deadline).await;
        Ok(())
    }

    /// Drains handlers, stops the book service, then closes the database.
    ///
    /// Each step gets what is left of `deadline`; failures are logged and
    /// the sequence continues.
    pub async fn shutdown(&self, deadline: Deadline) {
        if let Err(e) = self.shell.drain(deadline.remaining()).await {
            warn!(error = %e, "Handlers did not drain in time");
        }

        if let Err(e) = self.book_service.shutdown(deadline.remaining()).await {
            warn!(error = %e, "Book service shutdown incomplete");
        }

        if let Some(database) = &self.database {
            database.close().await;
        }

        info!("Shutdown complete");
    }
}
