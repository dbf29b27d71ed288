//! Cache key generators for consistent key naming.
//!
//! Single books and list pages live in separate namespaces (`book:` and
//! `books:`) so list entries can be dropped by prefix without touching
//! single-book entries.

use libris_core::{BookFilter, BookId};

/// Namespace of single-book entries.
pub const BOOK_PREFIX: &str = "book:";

/// Namespace of list-page entries.
pub const BOOK_LIST_PREFIX: &str = "books:";

/// Pattern matching every single-book entry.
pub const BOOK_PATTERN: &str = "book:*";

/// Pattern matching every list-page entry.
pub const BOOK_LIST_PATTERN: &str = "books:*";

/// Generate a cache key for a book by ID.
#[must_use]
pub fn book_key(id: BookId) -> String {
    format!("{BOOK_PREFIX}{id}")
}

/// Generate a cache key for one filtered list page.
///
/// The key is the md5 of [`BookFilter::canonical_string`], so equal filters
/// always map to the same key.
#[must_use]
pub fn book_list_key(filter: &BookFilter) -> String {
    let digest = md5::compute(filter.canonical_string().as_bytes());
    format!("{BOOK_LIST_PREFIX}{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(offset: i64) -> BookFilter {
        BookFilter {
            author: Some("Tolkien".to_string()),
            genre: None,
            language: Some("English".to_string()),
            available: Some(true),
            limit: 20,
            offset,
        }
    }

    #[test]
    fn test_book_key() {
        let id = BookId::new();
        let key = book_key(id);
        assert_eq!(key, format!("book:{id}"));
        assert!(!key.starts_with(BOOK_LIST_PREFIX));
    }

    #[test]
    fn test_list_key_is_deterministic() {
        assert_eq!(book_list_key(&filter(0)), book_list_key(&filter(0)));
    }

    #[test]
    fn test_list_key_changes_with_offset() {
        assert_ne!(book_list_key(&filter(0)), book_list_key(&filter(20)));
    }

    #[test]
    fn test_list_key_format() {
        let key = book_list_key(&BookFilter::default());
                let hex = key.strip_prefix(BOOK_LIST_PREFIX).unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));

        let expected = format!(
            "{:x}",
            md5::compute("author:|genre:|language:|available:|limit:0|offset:0")
        );
        assert_eq!(hex, expected);
    }

    #[test]
    fn test_unset_and_false_availability_differ() {
        let unset = BookFilter::default();
        let unavailable = BookFilter {
            available: Some(false),
            ..BookFilter::default()
        };
        assert_ne!(book_list_key(&unset), book_list_key(&unavailable));
    }
}
