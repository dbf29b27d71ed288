//! Validation utilities.

use crate::LibrisError;
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `LibrisError` on failure.
    fn validate_request(&self) -> Result<(), LibrisError> {
        self.validate().map_err(validation_errors_to_libris_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Converts `validator::ValidationErrors` to `LibrisError`.
#[must_use]
pub fn validation_errors_to_libris_error(errors: ValidationErrors) -> LibrisError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map_or_else(|| format!("{}: {}", field, error.code), ToString::to_string)
            })
        })
        .collect();
    // HashMap iteration order is unstable
    messages.sort();

    LibrisError::Validation(messages.join("; "))
}

/// Book field rules shared by the create and update paths.
pub mod rules {
    /// Removes hyphens and spaces from an ISBN.
    #[must_use]
    pub fn normalize_isbn(isbn: &str) -> String {
        isbn.chars().filter(|c| *c != '-' && *c != ' ').collect()
    }

    /// Validates that a string is not blank (not empty after trimming).
    #[must_use]
    pub fn not_blank(value: &str) -> bool {
        !value.trim().is_empty()
    }

    /// Checks the structure of an ISBN after normalization.
    ///
    /// ISBN-13 is 13 digits. ISBN-10 is 10 characters, digits except an
    /// optional trailing `X` check character.
    #[must_use]
    pub fn valid_isbn(isbn: &str) -> bool {
        let normalized = normalize_isbn(isbn);
        let bytes = normalized.as_bytes();
        match bytes.len() {
            13 => bytes.iter().all(u8::is_ascii_digit),
            10 => {
                bytes[..9].iter().all(u8::is_ascii_digit)
                    && (bytes[9].is_ascii_digit() || bytes[9] == b'X' || bytes[9] == b'x')
            }
            _ => false,
        }
    }

    /// Page counts must be positive.
    #[must_use]
    pub const fn positive_pages(pages: i32) -> bool {
        pages > 0
    }
}
