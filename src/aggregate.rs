// SPDX-License-Identifier: MIT OR Apache-2.0

//! Book-level aggregation of scored quotes.
//!
//! The full book ranking is computed before the offset/limit slice is
//! taken; global rank requires the complete candidate set, so slicing a
//! partial ranking would reorder results across pages.

use std::collections::HashMap;
use tracing::warn;

use crate::errors::SearchError;
use crate::model::{Book, BookResult, RankedQuote, ScoredQuote, SearchPage};
use crate::store::RecordStore;

/// Default cap on quotes returned per book.
pub const DEFAULT_TOP_K: usize = 10;

/// Pagination and shaping parameters for one search call.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    /// Cap on quotes per book (`top_quotes`).
    pub top_k: usize,
    /// Include per-quote score breakdowns in the page.
    pub explain: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            offset: 0,
            limit: 20,
            top_k: DEFAULT_TOP_K,
            explain: false,
        }
    }
}

/// Group scored quotes by book, rank books, and slice the requested page.
///
/// `books` holds the parent book for every scored quote (resolved during
/// scoring). Books are ranked by their single best quote score descending,
/// tie-broken by ascending book id; quotes within a book by score
/// descending, tie-broken by ascending quote id.
pub fn aggregate(
    scored: Vec<ScoredQuote>,
    books: &HashMap<i64, Book>,
    store: &dyn RecordStore,
    page: &PageRequest,
) -> Result<SearchPage, SearchError> {
    let mut groups: HashMap<i64, Vec<ScoredQuote>> = HashMap::new();
    for quote in scored {
        groups.entry(quote.quote.book_id).or_default().push(quote);
    }

    let mut ranked: Vec<(i64, Vec<ScoredQuote>)> = groups
        .into_iter()
        .filter(|(book_id, _)| books.contains_key(book_id))
        .collect();

    for (_, quotes) in ranked.iter_mut() {
        quotes.sort_by(|a, b| {
            b.final_score()
                .total_cmp(&a.final_score())
                .then(a.quote.id.cmp(&b.quote.id))
        });
    }
    ranked.sort_by(|(a_id, a_quotes), (b_id, b_quotes)| {
        let a_best = a_quotes[0].final_score();
        let b_best = b_quotes[0].final_score();
        b_best.total_cmp(&a_best).then(a_id.cmp(b_id))
    });

    let total = ranked.len();
    let slice = ranked
        .into_iter()
        .skip(page.offset)
        .take(page.limit);

    let mut results = Vec::new();
    for (book_id, quotes) in slice {
        let book = books[&book_id].clone();
        let total_book_quotes = store.count_quotes_for_book(book_id).map_err(|e| {
            warn!(book_id, error = %e, "record store failed counting quotes");
            SearchError::IndexUnavailable
        })?;

        let hits_count = quotes.len();
        let top_quotes = quotes
            .into_iter()
            .take(page.top_k)
            .map(|sq| RankedQuote {
                id: sq.quote.id,
                quote_text: sq.quote.quote_text,
                page: sq.quote.page,
                keywords: sq.quote.keywords,
                score: sq.breakdown.final_score,
                breakdown: page.explain.then_some(sq.breakdown),
            })
            .collect();

        results.push(BookResult {
            book,
            hits_count,
            top_quotes,
            total_book_quotes,
        });
    }

    Ok(SearchPage {
        results,
        total,
        offset: page.offset,
        limit: page.limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Quote, ScoreBreakdown};
    use anyhow::Result;
    use std::collections::BTreeMap;

    struct FixedCounts(HashMap<i64, usize>);

    impl RecordStore for FixedCounts {
        fn get_book(&self, _id: i64) -> Result<Option<Book>> {
            Ok(None)
        }
        fn get_quote(&self, _id: i64) -> Result<Option<Quote>> {
            Ok(None)
        }
        fn count_quotes_for_book(&self, book_id: i64) -> Result<usize> {
            Ok(self.0.get(&book_id).copied().unwrap_or(0))
        }
    }

    fn scored(quote_id: i64, book_id: i64, score: f64) -> ScoredQuote {
        ScoredQuote {
            quote: Quote {
                id: quote_id,
                book_id,
                quote_text: format!("quote {quote_id}"),
                ..Quote::default()
            },
            breakdown: ScoreBreakdown {
                quote_id,
                raw_relevance: score,
                weighted_relevance: score,
                field_bonus: 0.0,
                field_matches: BTreeMap::new(),
                phrase_bonus: 0.0,
                final_score: score,
            },
        }
    }

    fn books(ids: &[i64]) -> HashMap<i64, Book> {
        ids.iter()
            .map(|&id| {
                (
                    id,
                    Book {
                        id,
                        title: format!("book {id}"),
                        ..Book::default()
                    },
                )
            })
            .collect()
    }

    fn counts(pairs: &[(i64, usize)]) -> FixedCounts {
        FixedCounts(pairs.iter().copied().collect())
    }

    #[test]
    fn books_rank_by_best_quote_score() {
        let scored = vec![
            scored(1, 100, 1.0),
            scored(2, 100, 5.0),
            scored(3, 200, 4.0),
        ];
        let page = aggregate(
            scored,
            &books(&[100, 200]),
            &counts(&[(100, 10), (200, 3)]),
            &PageRequest::default(),
        )
        .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.results[0].book.id, 100);
        assert_eq!(page.results[0].hits_count, 2);
        assert_eq!(page.results[1].book.id, 200);
    }

    #[test]
    fn book_ties_break_by_ascending_id() {
        let scored = vec![scored(1, 200, 3.0), scored(2, 100, 3.0)];
        let page = aggregate(
            scored,
            &books(&[100, 200]),
            &counts(&[(100, 1), (200, 1)]),
            &PageRequest::default(),
        )
        .unwrap();
        assert_eq!(page.results[0].book.id, 100);
        assert_eq!(page.results[1].book.id, 200);
    }

    #[test]
    fn quote_ties_break_by_ascending_id() {
        let scored = vec![scored(9, 100, 2.0), scored(3, 100, 2.0), scored(5, 100, 2.0)];
        let page = aggregate(
            scored,
            &books(&[100]),
            &counts(&[(100, 3)]),
            &PageRequest::default(),
        )
        .unwrap();
        let ids: Vec<i64> = page.results[0].top_quotes.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn top_quotes_are_capped_at_k() {
        let scored: Vec<ScoredQuote> = (1..=15)
            .map(|i| scored(i, 100, i as f64))
            .collect();
        let page = aggregate(
            scored,
            &books(&[100]),
            &counts(&[(100, 40)]),
            &PageRequest {
                top_k: 4,
                ..PageRequest::default()
            },
        )
        .unwrap();

        let result = &page.results[0];
        assert_eq!(result.top_quotes.len(), 4);
        // Highest scores survive the cap.
        assert_eq!(result.top_quotes[0].id, 15);
        // hits_count still reflects every match, and never exceeds the
        // book's total quote count.
        assert_eq!(result.hits_count, 15);
        assert!(result.hits_count <= result.total_book_quotes);
    }

    #[test]
    fn pagination_slices_the_full_ranking() {
        let scored: Vec<ScoredQuote> = (1..=5)
            .map(|i| scored(i, i * 10, (6 - i) as f64))
            .collect();
        let all_books = books(&[10, 20, 30, 40, 50]);
        let store = counts(&[(10, 1), (20, 1), (30, 1), (40, 1), (50, 1)]);

        let first = aggregate(
            scored.clone(),
            &all_books,
            &store,
            &PageRequest {
                offset: 0,
                limit: 2,
                ..PageRequest::default()
            },
        )
        .unwrap();
        let second = aggregate(
            scored,
            &all_books,
            &store,
            &PageRequest {
                offset: 2,
                limit: 2,
                ..PageRequest::default()
            },
        )
        .unwrap();

        assert_eq!(first.total, 5);
        assert_eq!(second.total, 5);
        let first_ids: Vec<i64> = first.results.iter().map(|r| r.book.id).collect();
        let second_ids: Vec<i64> = second.results.iter().map(|r| r.book.id).collect();
        assert_eq!(first_ids, vec![10, 20]);
        assert_eq!(second_ids, vec![30, 40]);
    }

    #[test]
    fn offset_past_end_yields_empty_page() {
        let page = aggregate(
            vec![scored(1, 100, 1.0)],
            &books(&[100]),
            &counts(&[(100, 1)]),
            &PageRequest {
                offset: 10,
                limit: 5,
                ..PageRequest::default()
            },
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.results.is_empty());
    }

    #[test]
    fn quotes_from_unknown_books_are_dropped() {
        let scored = vec![scored(1, 100, 5.0), scored(2, 999, 9.0)];
        let page = aggregate(
            scored,
            &books(&[100]),
            &counts(&[(100, 1)]),
            &PageRequest::default(),
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].book.id, 100);
    }

    #[test]
    fn breakdowns_appear_only_when_requested() {
        let scored_quotes = vec![scored(1, 100, 2.0)];
        let all_books = books(&[100]);
        let store = counts(&[(100, 1)]);

        let plain = aggregate(
            scored_quotes.clone(),
            &all_books,
            &store,
            &PageRequest::default(),
        )
        .unwrap();
        assert!(plain.results[0].top_quotes[0].breakdown.is_none());

        let explained = aggregate(
            scored_quotes,
            &all_books,
            &store,
            &PageRequest {
                explain: true,
                ..PageRequest::default()
            },
        )
        .unwrap();
        assert!(explained.results[0].top_quotes[0].breakdown.is_some());
    }
}
