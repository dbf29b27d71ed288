//! PostgreSQL book repository implementation.

use crate::{traits::BookRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libris_core::{
    Book, BookFilter, BookId, CreateBookRequest, LibrisError, LibrisResult, UpdateBookRequest,
    DEFAULT_LANGUAGE,
};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const BOOK_COLUMNS: &str = "id, title, author, isbn, publisher, genre, published_at, pages, \
                            language, available, created_at, updated_at";

/// PostgreSQL book repository implementation.
#[derive(Clone)]
pub struct PostgresBookRepository {
    pool: Arc<DatabasePool>,
}

impl PostgresBookRepository {
    /// Creates a new PostgreSQL book repository.
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a book.
#[derive(Debug, FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    author: String,
    isbn: String,
    publisher: Option<String>,
    genre: Option<String>,
    published_at: Option<DateTime<Utc>>,
    pages: Option<i32>,
    language: Option<String>,
    available: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        let created_at = row.created_at.unwrap_or_else(Utc::now);
        Book {
            id: BookId::from_uuid(row.id),
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            publisher: row.publisher.unwrap_or_default(),
            genre: row.genre.unwrap_or_default(),
            published_at: row.published_at,
            pages: row.pages.unwrap_or_default(),
            language: row.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            available: row.available.unwrap_or(true),
            created_at,
            updated_at: row.updated_at.unwrap_or(created_at),
        }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    if let Some(author) = filter.author.as_deref().filter(|a| !a.is_empty()) {
        builder.push(" AND author ILIKE ").push_bind(format!("%{author}%"));
    }
    if let Some(genre) = filter.genre.as_deref().filter(|g| !g.is_empty()) {
        builder.push(" AND genre ILIKE ").push_bind(format!("%{genre}%"));
    }
    if let Some(language) = filter.language.as_deref().filter(|l| !l.is_empty()) {
        builder
            .push(" AND LOWER(language) = LOWER(")
            .push_bind(language.to_string())
            .push(")");
    }
    if let Some(available) = filter.available {
        builder.push(" AND available = ").push_bind(available);
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn create(&self, request: &CreateBookRequest) -> LibrisResult<Book> {
        let book = Book::from_request(request);
        debug!(book_id = %book.id, isbn = %book.isbn, "Inserting book");

        let row = sqlx::query_as::<_, BookRow>(&format!(
            r"
            INSERT INTO books (id, title, author, isbn, publisher, genre, published_at,
                               pages, language, available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BOOK_COLUMNS}
            "
        ))
        .bind(book.id.into_inner())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(&book.genre)
        .bind(book.published_at)
        .bind(book.pages)
        .bind(&book.language)
        .bind(book.available)
        .bind(book.created_at)
        .bind(book.updated_at)
        .fetch_one(self.pool.inner())
        .await?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: BookId) -> LibrisResult<Book> {
        debug!(book_id = %id, "Finding book by id");

        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(Book::from)
            .ok_or_else(|| LibrisError::not_found("Book", id))
    }

    async fn get_all(&self, filter: &BookFilter) -> LibrisResult<(Vec<Book>, i64)> {
        let filter = filter.clamped();
        debug!(filter = %filter.canonical_string(), "Listing books");

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books WHERE 1=1");
        push_filters(&mut count, &filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool.inner())
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE 1=1"));
        push_filters(&mut select, &filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<BookRow> = select
            .build_query_as()
            .fetch_all(self.pool.inner())
            .await?;

        Ok((rows.into_iter().map(Book::from).collect(), total))
    }

    async fn update(&self, id: BookId, request: &UpdateBookRequest) -> LibrisResult<Book> {
        debug!(book_id = %id, "Updating book");

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE books SET updated_at = NOW()");
        if let Some(title) = &request.title {
            builder.push(", title = ").push_bind(title.clone());
        }
        if let Some(author) = &request.author {
            builder.push(", author = ").push_bind(author.clone());
        }
        if let Some(isbn) = &request.isbn {
            builder.push(", isbn = ").push_bind(isbn.clone());
        }
        if let Some(publisher) = &request.publisher {
            builder.push(", publisher = ").push_bind(publisher.clone());
        }
        if let Some(genre) = &request.genre {
            builder.push(", genre = ").push_bind(genre.clone());
        }
        if let Some(published_at) = request.published_at {
            builder.push(", published_at = ").push_bind(published_at);
        }
        if let Some(pages) = request.pages {
            builder.push(", pages = ").push_bind(pages);
        }
        if let Some(language) = &request.language {
            builder.push(", language = ").push_bind(language.clone());
        }
        if let Some(available) = request.available {
            builder.push(", available = ").push_bind(available);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id.into_inner())
            .push(format!(" RETURNING {BOOK_COLUMNS}"));

        let row: Option<BookRow> = builder
            .build_query_as()
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(Book::from)
            .ok_or_else(|| LibrisError::not_found("Book", id))
    }

    async fn delete(&self, id: BookId) -> LibrisResult<()> {
        debug!(book_id = %id, "Deleting book");

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool.inner())
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibrisError::not_found("Book", id));
        }
        Ok(())
    }

    async fn exists_by_isbn(&self, isbn: &str, exclude: Option<BookId>) -> LibrisResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(isbn)
        .bind(exclude.map(BookId::into_inner))
        .fetch_one(self.pool.inner())
        .await?;

        Ok(exists)
    }
}
