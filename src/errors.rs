// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error surface of the search pipeline.

use thiserror::Error;

/// Errors surfaced to callers of the search pipeline.
///
/// Parse and validation failures are detected before any collaborator is
/// contacted. Index or record-store failures collapse into
/// [`SearchError::IndexUnavailable`]; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query string could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The full-text index or record store failed or exceeded its I/O budget.
    #[error("search index unavailable")]
    IndexUnavailable,

    /// A book id did not resolve in the record store.
    #[error("book not found: {0}")]
    BookNotFound(i64),

    /// A quote id did not resolve in the record store.
    #[error("quote not found: {0}")]
    QuoteNotFound(i64),

    /// A candidate weights snapshot failed validation.
    #[error("invalid weights: {0}")]
    Validation(String),
}

impl SearchError {
    pub fn parse(reason: impl Into<String>) -> Self {
        SearchError::Parse(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        SearchError::Validation(reason.into())
    }
}
