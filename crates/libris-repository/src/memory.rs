//! In-process book repository.

use crate::traits::BookRepository;
use async_trait::async_trait;
use libris_core::{
    Book, BookFilter, BookId, CreateBookRequest, LibrisError, LibrisResult, UpdateBookRequest,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
struct Store {
    books: HashMap<BookId, (u64, Book)>,
    next_seq: u64,
}

impl Store {
    fn isbn_taken(&self, isbn: &str, exclude: Option<BookId>) -> bool {
        self.books
            .values()
            .any(|(_, book)| book.isbn == isbn && Some(book.id) != exclude)
    }
}

/// Book repository backed by a `HashMap`.
///
/// Enforces ISBN uniqueness like the database constraint does. Used by tests
/// and by the server when the database URL is `memory://`.
#[derive(Default)]
pub struct InMemoryBookRepository {
    store: RwLock<Store>,
}

impl InMemoryBookRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding the given books.
    #[must_use]
    pub fn with_books(books: Vec<Book>) -> Self {
        let repo = Self::new();
        {
            let mut store = repo.store.write();
            for book in books {
                let seq = store.next_seq;
                store.next_seq += 1;
                store.books.insert(book.id, (seq, book));
            }
        }
        repo
    }

    /// Number of stored books.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().books.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn create(&self, request: &CreateBookRequest) -> LibrisResult<Book> {
        let book = Book::from_request(request);
        let mut store = self.store.write();
        if store.isbn_taken(&book.isbn, None) {
            return Err(LibrisError::conflict(format!(
                "book with ISBN {} already exists",
                book.isbn
            )));
        }
        let seq = store.next_seq;
        store.next_seq += 1;
        store.books.insert(book.id, (seq, book.clone()));
        debug!(book_id = %book.id, "Stored book in memory");
        Ok(book)
    }

    async fn get_by_id(&self, id: BookId) -> LibrisResult<Book> {
        self.store
            .read()
            .books
            .get(&id)
            .map(|(_, book)| book.clone())
            .ok_or_else(|| LibrisError::not_found("Book", id))
    }

    async fn get_all(&self, filter: &BookFilter) -> LibrisResult<(Vec<Book>, i64)> {
        let filter = filter.clamped();
        let store = self.store.read();

        let mut matching: Vec<&(u64, Book)> = store
            .books
            .values()
            .filter(|(_, book)| filter.matches(book))
            .collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, book)| book.clone())
            .collect();

        Ok((page, total))
    }

    async fn update(&self, id: BookId, request: &UpdateBookRequest) -> LibrisResult<Book> {
        let mut store = self.store.write();
        if let Some(isbn) = &request.isbn {
            if store.isbn_taken(isbn, Some(id)) {
                return Err(LibrisError::conflict(format!(
                    "book with ISBN {isbn} already exists"
                )));
            }
        }
        let (_, book) = store
            .books
            .get_mut(&id)
            .ok_or_else(|| LibrisError::not_found("Book", id))?;
        book.apply_update(request);
        Ok(book.clone())
    }

    async fn delete(&self, id: BookId) -> LibrisResult<()> {
        self.store
            .write()
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LibrisError::not_found("Book", id))
    }

    async fn exists_by_isbn(&self, isbn: &str, exclude: Option<BookId>) -> LibrisResult<bool> {
        Ok(self.store.read().isbn_taken(isbn, exclude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(title: &str, author: &str, isbn: &str) -> CreateBookRequest {
        CreateBookRequest {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            genre: "Fantasy".to_string(),
            pages: 310,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let repo = InMemoryBookRepository::new();
        let book = repo
            .create(&create_request("The Hobbit", "Tolkien", "9780547928210"))
            .await
            .unwrap();

        assert_eq!(book.language, "English");
        assert!(book.available);
        assert_eq!(book.created_at, book.updated_at);
        assert_eq!(repo.get_by_id(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_create_duplicate_isbn_conflicts() {
        let repo = InMemoryBookRepository::new();
        repo.create(&create_request("A", "B", "9780547928210")).await.unwrap();

        let err = repo
            .create(&create_request("C", "D", "9780547928210"))
            .await
            .unwrap_err();
        assert!(matches!(err, LibrisError::Conflict(_)));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = InMemoryBookRepository::new();
        let err = repo.get_by_id(BookId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_all_filters_and_orders_newest_first() {
        let repo = InMemoryBookRepository::new();
        repo.create(&create_request("First", "Ursula Le Guin", "0000000001")).await.unwrap();
        repo.create(&create_request("Second", "Tolkien", "0000000002")).await.unwrap();
        repo.create(&create_request("Third", "ursula k.", "0000000003")).await.unwrap();

        let filter = BookFilter {
            author: Some("URSULA".to_string()),
            ..Default::default()
        };
        let (books, total) = repo.get_all(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(books[0].title, "Third");
        assert_eq!(books[1].title, "First");
    }

    #[tokio::test]
    async fn test_get_all_paginates_with_full_total() {
        let repo = InMemoryBookRepository::new();
        for i in 0..5 {
            repo.create(&create_request(&format!("Book {i}"), "A", &format!("000000000{i}")))
                .await
                .unwrap();
        }

        let filter = BookFilter {
            limit: 2,
            offset: 4,
            ..Default::default()
        };
        let (books, total) = repo.get_all(&filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Book 0");
    }

    #[tokio::test]
    async fn test_update_applies_present_fields() {
        let repo = InMemoryBookRepository::new();
        let book = repo.create(&create_request("Old", "A", "9780547928210")).await.unwrap();

        let update = UpdateBookRequest {
            title: Some("New".to_string()),
            available: Some(false),
            ..Default::default()
        };
        let updated = repo.update(book.id, &update).await.unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.author, "A");
        assert!(!updated.available);
        assert!(updated.updated_at >= book.updated_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_not_found() {
        let repo = InMemoryBookRepository::new();
        let id = BookId::new();
        assert!(repo
            .update(id, &UpdateBookRequest::default())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(repo.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_exists_by_isbn_excludes_self() {
        let repo = InMemoryBookRepository::new();
        let book = repo.create(&create_request("A", "B", "9780547928210")).await.unwrap();

        assert!(repo.exists_by_isbn("9780547928210", None).await.unwrap());
        assert!(!repo.exists_by_isbn("9780547928210", Some(book.id)).await.unwrap());
        assert!(!repo.exists_by_isbn("0000000000", None).await.unwrap());
    }
}
