//! Error types for Shelfmark operations.
//!
//! This module defines the main error type [`ShelfmarkError`], shared by the
//! readability engine, the archiver, the bookmark store and the processing
//! pipeline.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::{Result, ShelfmarkError};
//!
//! fn require_title(title: &str) -> Result<&str> {
//!     if title.trim().is_empty() {
//!         return Err(ShelfmarkError::EmptyTitle);
//!     }
//!     Ok(title)
//! }
//! ```

use thiserror::Error;

/// Main error type for Shelfmark operations.
#[derive(Error, Debug)]
pub enum ShelfmarkError {
    /// Empty, malformed, wrong scheme, or missing host.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Bookmark index list could not be parsed or has a bad bound.
    #[error("Index is not valid: {0}")]
    InvalidIndex(String),

    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("Title must not be empty")]
    EmptyTitle,

    /// Bookmark ids must be positive.
    #[error("Bookmark ID must be greater than zero, got {0}")]
    InvalidBookmarkId(i64),

    /// Archive resource or bookmark not present.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The readability engine produced nothing above its threshold.
    #[error("No readable content found")]
    NoReadableContent,

    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, TLS problems
    /// and other HTTP-related failures.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success HTTP status or an unusable response.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Content of a type the operation cannot handle, e.g. a GIF thumbnail.
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Database statement or transaction failure. The transaction is rolled back.
    #[error("Storage failed: {0}")]
    StorageFailed(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Session token is not valid")]
    InvalidToken,
}

impl ShelfmarkError {
    /// Whether the error must abort the whole operation.
    ///
    /// Invalid URLs, invalid indices, id 0 and database failures are fatal.
    /// Everything else raised inside readability or archival is recorded and
    /// the bookmark is still saved.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShelfmarkError::InvalidUrl(_)
                | ShelfmarkError::InvalidIndex(_)
                | ShelfmarkError::InvalidBookmarkId(_)
                | ShelfmarkError::StorageFailed(_)
        )
    }
}

/// Result type alias for ShelfmarkError.
pub type Result<T> = std::result::Result<T, ShelfmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShelfmarkError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
        assert_eq!(ShelfmarkError::EmptyUrl.to_string(), "URL must not be empty");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ShelfmarkError::InvalidUrl(String::new()).is_fatal());
        assert!(ShelfmarkError::InvalidIndex("0".into()).is_fatal());
        assert!(ShelfmarkError::InvalidBookmarkId(0).is_fatal());
        assert!(!ShelfmarkError::NoReadableContent.is_fatal());
        assert!(!ShelfmarkError::UnsupportedContent("image/gif".into()).is_fatal());
    }

    #[test]
    fn test_timeout_error() {
        let err = ShelfmarkError::Timeout { timeout: 60 };
        assert!(err.to_string().contains("60"));
    }
}
