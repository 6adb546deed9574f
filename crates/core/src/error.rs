//! Error types for qiitadl operations.
//!
//! This module defines the main error type [`QiitadlError`] which represents
//! every terminal failure of the download pipeline: URL validation, page
//! fetching, content extraction, Markdown conversion and packaging.
//!
//! Per-image fetch failures use the same type but never escape the
//! extractor; they are logged and the image keeps its remote URL.
//!
//! # Example
//!
//! ```rust
//! use qiitadl_core::{ErrorKind, QiitadlError};
//!
//! let err = QiitadlError::ContentNotFound;
//! assert_eq!(err.kind(), ErrorKind::Extraction);
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the download pipeline.
#[derive(Error, Debug)]
pub enum QiitadlError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and other HTTP-related problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The server answered with a non-success status code.
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// Invalid URL provided.
    ///
    /// Returned when a URL cannot be parsed, is empty, or uses a scheme
    /// other than http/https.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL does not point at the supported platform.
    #[error("URL is not on {domain}: {url}")]
    UnsupportedDomain { url: String, domain: String },

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The article body container was not found in the page.
    #[error("Could not find article content")]
    ContentNotFound,

    /// An image body exceeded the configured size limit.
    #[error("Asset {url} exceeds {limit} bytes")]
    AssetTooLarge { url: String, limit: usize },

    /// HTML to Markdown conversion failed.
    #[error("Failed to convert to Markdown: {0}")]
    MarkdownError(String),

    /// File not found.
    ///
    /// Returned when attempting to read a local page that doesn't exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File write errors.
    ///
    /// Wraps standard I/O errors for directory and file operations.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// Archive creation errors.
    #[error("Failed to create archive: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// A blocking packaging task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Coarse classification of a [`QiitadlError`].
///
/// Front-ends map each kind to one user-facing outcome: validation errors
/// are the caller's fault, everything else is a failed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, missing or out-of-domain URL.
    Validation,
    /// The article page could not be retrieved.
    Fetch,
    /// The page was retrieved but holds no article.
    Extraction,
    /// Writing files or the archive failed.
    Packaging,
}

impl QiitadlError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QiitadlError::InvalidUrl(_) | QiitadlError::UnsupportedDomain { .. } => ErrorKind::Validation,
            #[cfg(feature = "fetch")]
            QiitadlError::HttpError(_) => ErrorKind::Fetch,
            QiitadlError::Timeout { .. }
            | QiitadlError::HttpStatus { .. }
            | QiitadlError::AssetTooLarge { .. }
            | QiitadlError::FileNotFound(_) => ErrorKind::Fetch,
            QiitadlError::HtmlParseError(_) | QiitadlError::ContentNotFound | QiitadlError::MarkdownError(_) => {
                ErrorKind::Extraction
            }
            QiitadlError::WriteError(_) | QiitadlError::ArchiveError(_) | QiitadlError::TaskFailed(_) => {
                ErrorKind::Packaging
            }
        }
    }
}

/// Result type alias for QiitadlError.
pub type Result<T> = std::result::Result<T, QiitadlError>;
