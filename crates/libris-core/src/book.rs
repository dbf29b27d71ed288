//! Book entity, write requests, and list filter.

use crate::validation::rules::normalize_isbn;
use crate::BookId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Language stored when a create request leaves it blank.
pub const DEFAULT_LANGUAGE: &str = "English";

/// A book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Normalized ISBN (digits only, 10 or 13 characters).
    pub isbn: String,
    pub publisher: String,
    pub genre: String,
    pub published_at: Option<DateTime<Utc>>,
    pub pages: i32,
    pub language: String,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Builds a new, available book from a create request.
    ///
    /// The request is expected to be normalized already.
    #[must_use]
    pub fn from_request(request: &CreateBookRequest) -> Self {
        let now = Utc::now();
        let language = if request.language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            request.language.clone()
        };

        Self {
            id: BookId::new(),
            title: request.title.clone(),
            author: request.author.clone(),
            isbn: request.isbn.clone(),
            publisher: request.publisher.clone(),
            genre: request.genre.clone(),
            published_at: request.published_at,
            pages: request.pages,
            language,
            available: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the present fields of an update request and bumps `updated_at`.
    pub fn apply_update(&mut self, update: &UpdateBookRequest) {
        if let Some(title) = &update.title {
            self.title.clone_from(title);
        }
        if let Some(author) = &update.author {
            self.author.clone_from(author);
        }
        if let Some(isbn) = &update.isbn {
            self.isbn.clone_from(isbn);
        }
        if let Some(publisher) = &update.publisher {
            self.publisher.clone_from(publisher);
        }
        if let Some(genre) = &update.genre {
            self.genre.clone_from(genre);
        }
        if let Some(published_at) = update.published_at {
            self.published_at = Some(published_at);
        }
        if let Some(pages) = update.pages {
            self.pages = pages;
        }
        if let Some(language) = &update.language {
            self.language.clone_from(language);
        }
        if let Some(available) = update.available {
            self.available = available;
        }
        self.updated_at = Utc::now();
    }
}

/// Request to create a new book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBookRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 255, message = "author must be 1-255 characters"))]
    pub author: String,

    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: String,

    #[serde(default)]
    #[validate(length(max = 255))]
    pub publisher: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub genre: String,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[validate(range(min = 1, message = "pages must be greater than 0"))]
    pub pages: i32,

    #[serde(default)]
    #[validate(length(max = 50))]
    pub language: String,
}

impl CreateBookRequest {
    /// Returns a copy with every string trimmed and the ISBN normalized.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            isbn: normalize_isbn(&self.isbn),
            publisher: self.publisher.trim().to_string(),
            genre: self.genre.trim().to_string(),
            published_at: self.published_at,
            pages: self.pages,
            language: self.language.trim().to_string(),
        }
    }
}

/// Request to update an existing book. Absent fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 255))]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 255))]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 17))]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 255))]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub genre: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl UpdateBookRequest {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy with present strings trimmed and the ISBN normalized.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let trim = |value: &Option<String>| value.as_deref().map(|v| v.trim().to_string());
        Self {
            title: trim(&self.title),
            author: trim(&self.author),
            isbn: self.isbn.as_deref().map(normalize_isbn),
            publisher: trim(&self.publisher),
            genre: trim(&self.genre),
            published_at: self.published_at,
            pages: self.pages,
            language: trim(&self.language),
            available: self.available,
        }
    }
}

/// Filter and pagination for listing books.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookFilter {
    /// Case-insensitive author substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Case-insensitive genre substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Case-insensitive language match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl BookFilter {
    /// Page size used when the caller gives none or an out-of-range one.
    pub const DEFAULT_LIMIT: i64 = 50;
    /// Largest accepted page size.
    pub const MAX_LIMIT: i64 = 100;

    /// Returns a copy with limit in `1..=100` (default 50) and offset `>= 0`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let mut filter = self.clone();
        if filter.limit <= 0 || filter.limit > Self::MAX_LIMIT {
            filter.limit = Self::DEFAULT_LIMIT;
        }
        if filter.offset < 0 {
            filter.offset = 0;
        }
        filter
    }

    /// Canonical text form used for cache key hashing.
    ///
    /// Absent fields render as empty strings so that two filters with equal
    /// field values always produce the same text.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let available = match self.available {
            Some(true) => "true",
            Some(false) => "false",
            None => "",
        };
        format!(
            "author:{}|genre:{}|language:{}|available:{}|limit:{}|offset:{}",
            self.author.as_deref().unwrap_or_default(),
            self.genre.as_deref().unwrap_or_default(),
            self.language.as_deref().unwrap_or_default(),
            available,
            self.limit,
            self.offset,
        )
    }

    /// True when the book satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, book: &Book) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_deref()
                .filter(|n| !n.is_empty())
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };

        contains(&book.author, &self.author)
            && contains(&book.genre, &self.genre)
            && self
                .language
                .as_deref()
                .filter(|l| !l.is_empty())
                .map_or(true, |l| book.language.eq_ignore_ascii_case(l))
            && self.available.map_or(true, |a| book.available == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateBookRequest {
        CreateBookRequest {
            title: "  The Hobbit ".to_string(),
            author: " J.R.R. Tolkien".to_string(),
            isbn: "978-0-547-92821-0".to_string(),
            publisher: "Houghton Mifflin ".to_string(),
            genre: "Fantasy".to_string(),
            published_at: None,
            pages: 366,
            language: String::new(),
        }
    }

    #[test]
    fn test_create_request_normalized() {
        let normalized = create_request().normalized();
        assert_eq!(normalized.title, "The Hobbit");
        assert_eq!(normalized.author, "J.R.R. Tolkien");
        assert_eq!(normalized.isbn, "9780547928210");
        assert_eq!(normalized.publisher, "Houghton Mifflin");
    }

    #[test]
    fn test_book_from_request_defaults() {
        let book = Book::from_request(&create_request().normalized());
        assert!(book.available);
        assert_eq!(book.language, DEFAULT_LANGUAGE);
        assert_eq!(book.pages, 366);
        assert_eq!(book.created_at, book.updated_at);
    }

    #[test]
    fn test_apply_update_only_touches_present_fields() {
        let mut book = Book::from_request(&create_request().normalized());
        let before = book.clone();
        book.apply_update(&UpdateBookRequest {
            available: Some(false),
            ..Default::default()
        });
        assert!(!book.available);
        assert_eq!(book.isbn, before.isbn);
        assert_eq!(book.title, before.title);
        assert!(book.updated_at >= before.updated_at);
    }

    #[test]
    fn test_update_request_is_empty() {
        assert!(UpdateBookRequest::default().is_empty());
        let update = UpdateBookRequest {
            pages: Some(10),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_filter_clamped() {
        let filter = BookFilter { limit: 0, offset: -5, ..Default::default() }.clamped();
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);

        let filter = BookFilter { limit: 101, ..Default::default() }.clamped();
        assert_eq!(filter.limit, 50);

        let filter = BookFilter { limit: 100, offset: 20, ..Default::default() }.clamped();
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 20);
    }

    #[test]
    fn test_filter_canonical_string() {
        let filter = BookFilter {
            author: Some("tolkien".to_string()),
            available: Some(true),
            limit: 10,
            offset: 0,
            ..Default::default()
        };
        assert_eq!(
            filter.canonical_string(),
            "author:tolkien|genre:|language:|available:true|limit:10|offset:0"
        );
        assert_eq!(
            BookFilter::default().canonical_string(),
            "author:|genre:|language:|available:|limit:0|offset:0"
        );
    }

    #[test]
    fn test_filter_matches() {
        let book = Book::from_request(&create_request().normalized());
        assert!(BookFilter::default().matches(&book));
        assert!(BookFilter { author: Some("TOLK".into()), ..Default::default() }.matches(&book));
        assert!(BookFilter { language: Some("english".into()), ..Default::default() }.matches(&book));
        assert!(!BookFilter { language: Some("Eng".into()), ..Default::default() }.matches(&book));
        assert!(!BookFilter { available: Some(false), ..Default::default() }.matches(&book));
        assert!(!BookFilter { genre: Some("horror".into()), ..Default::default() }.matches(&book));
    }

    #[test]
    fn test_create_request_deserialize_defaults() {
        let request: CreateBookRequest =
            serde_json::from_str(r#"{"title":"T","author":"A","isbn":"1234567890"}"#).unwrap();
        assert_eq!(request.pages, 0);
        assert!(request.publisher.is_empty());
        assert!(request.published_at.is_none());
    }
}
