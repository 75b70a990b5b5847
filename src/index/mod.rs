// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-text index boundary.
//!
//! The scoring pipeline consumes candidate retrieval through
//! [`SearchIndex`]; the bundled implementation lives in
//! [`tantivy::QuoteIndex`].

pub mod tantivy;

pub use self::tantivy::QuoteIndex;

use anyhow::Result;

/// One candidate from the index: a quote id plus the engine's native
/// relevance for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    pub quote_id: i64,
    /// Normalized so that higher always means a stronger match. Engines
    /// that report a cost where lower is better (e.g. SQLite FTS5 rank)
    /// must negate before returning; that conversion happens here at the
    /// adapter boundary, exactly once.
    pub raw_relevance: f64,
}

/// Executes a parsed query against the external full-text index.
///
/// `index_query` is the dialect emitted by the query parser: fully
/// parenthesized, uppercase `AND`/`OR`/`NOT`, double-quoted phrases, and
/// trailing-`*` prefix terms. Results are ordered by descending
/// `raw_relevance`.
///
/// Implementations own their I/O budget: a call that cannot complete in
/// time must return an error rather than a partial result. The pipeline
/// maps every failure to `IndexUnavailable` and never retries.
pub trait SearchIndex: Send + Sync {
    fn search(&self, index_query: &str, limit: usize) -> Result<Vec<IndexHit>>;
}
