// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record and result types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::weights::WeightField;

/// A bibliography entry. Immutable within a single scoring operation;
/// edits land between requests through the record store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub publisher: Option<String>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub themes: Option<String>,
    pub keywords: Option<String>,
    pub summary: Option<String>,
    /// Preformatted ISO 690 citation, when the bibliography carries one.
    pub citation: Option<String>,
}

impl Book {
    /// Publication kind derived from which container field is populated.
    pub fn kind(&self) -> &'static str {
        if self.journal.as_deref().is_some_and(|j| !j.is_empty()) {
            "journal"
        } else if self.publisher.as_deref().is_some_and(|p| !p.is_empty()) {
            "book"
        } else {
            "unknown"
        }
    }
}

/// A single excerpt. `book_id` must reference an existing [`Book`]; the
/// index may briefly lag record-store edits, in which case the pipeline
/// drops the orphan rather than failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub book_id: i64,
    pub quote_text: String,
    pub page: Option<i32>,
    pub section: Option<String>,
    pub keywords: Option<String>,
}

/// Per-quote score breakdown, kept for tuning workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub quote_id: i64,
    /// The index's native relevance, normalized so higher is better.
    pub raw_relevance: f64,
    /// `bm25_weight * raw_relevance`.
    pub weighted_relevance: f64,
    pub field_bonus: f64,
    /// Per-field contributions; at most one entry per field.
    pub field_matches: BTreeMap<WeightField, f64>,
    pub phrase_bonus: f64,
    pub final_score: f64,
}

/// A quote scored against one query under one weights snapshot.
/// Ephemeral; recomputed per query and never persisted.
#[derive(Debug, Clone)]
pub struct ScoredQuote {
    pub quote: Quote,
    pub breakdown: ScoreBreakdown,
}

impl ScoredQuote {
    pub fn final_score(&self) -> f64 {
        self.breakdown.final_score
    }
}

/// A quote as it appears inside a book's result group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedQuote {
    pub id: i64,
    pub quote_text: String,
    pub page: Option<i32>,
    pub keywords: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

/// One book's slice of a search result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResult {
    pub book: Book,
    /// Quotes from this book matched by the current query.
    pub hits_count: usize,
    /// Highest-scoring quotes, capped at K, score desc then quote id asc.
    pub top_quotes: Vec<RankedQuote>,
    /// All quotes belonging to the book, matched or not.
    pub total_book_quotes: usize,
}

/// A paginated page of book-grouped results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<BookResult>,
    /// Total matching books, independent of pagination.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}
