// SPDX-License-Identifier: MIT OR Apache-2.0

//! The search pipeline: parse, retrieve, score, aggregate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::aggregate::{aggregate, PageRequest};
use crate::config::Config;
use crate::errors::SearchError;
use crate::index::{QuoteIndex, SearchIndex};
use crate::model::{Book, SearchPage};
use crate::output::{self, OutputFormat};
use crate::query::parser;
use crate::scoring::Scorer;
use crate::store::{RecordStore, SqliteStore};
use crate::weights::{Weights, WeightsStore};

/// Cap on candidates pulled from the index for one query. Book-level
/// ranking happens over this whole set before pagination.
pub const CANDIDATE_LIMIT: usize = 1000;

/// Executes searches against an index and record store, scoring under the
/// active weights snapshot.
///
/// One `SearchService` serves many concurrent queries; each query reads a
/// single weights snapshot for its whole lifetime, so a concurrent
/// `set_weights` never produces a half-updated scoring run.
pub struct SearchService {
    index: Arc<dyn SearchIndex>,
    store: Arc<dyn RecordStore>,
    weights: WeightsStore,
}

impl SearchService {
    pub fn new(index: Arc<dyn SearchIndex>, store: Arc<dyn RecordStore>) -> Self {
        SearchService {
            index,
            store,
            weights: WeightsStore::default(),
        }
    }

    pub fn with_weights(
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn RecordStore>,
        weights: Weights,
    ) -> Result<Self, SearchError> {
        Ok(SearchService {
            index,
            store,
            weights: WeightsStore::new(weights)?,
        })
    }

    /// Current weights snapshot.
    pub fn get_weights(&self) -> Arc<Weights> {
        self.weights.get()
    }

    /// Validate and atomically activate a new weights snapshot.
    pub fn set_weights(&self, candidate: Weights) -> Result<(), SearchError> {
        self.weights.set(candidate)
    }

    /// Run one query and return the requested page of book-grouped results.
    ///
    /// Parse failures are detected before the index is contacted. Index or
    /// record-store failures surface as [`SearchError::IndexUnavailable`];
    /// quotes or books the record store no longer knows are dropped.
    pub fn search(&self, raw_query: &str, page: &PageRequest) -> Result<SearchPage, SearchError> {
        let parsed = parser::parse(raw_query)?;
        debug!(
            index_query = %parsed.index_query,
            phrase = ?parsed.phrase,
            "query parsed"
        );

        let hits = self
            .index
            .search(&parsed.index_query, CANDIDATE_LIMIT)
            .map_err(|e| {
                warn!(error = %e, "index search failed");
                SearchError::IndexUnavailable
            })?;

        // One snapshot for the whole scoring run.
        let weights = self.weights.get();
        let scorer = Scorer::new(&weights, &parsed.terms, parsed.phrase.as_deref());

        let mut books: HashMap<i64, Book> = HashMap::new();
        let mut missing_books: Vec<i64> = Vec::new();
        let mut scored = Vec::with_capacity(hits.len());

        for hit in hits {
            let quote = self
                .store
                .get_quote(hit.quote_id)
                .map_err(|e| {
                    warn!(quote_id = hit.quote_id, error = %e, "record store failed");
                    SearchError::IndexUnavailable
                })?;
            let Some(quote) = quote else {
                // Index lagging behind a deletion; skip the orphan.
                debug!(quote_id = hit.quote_id, "stale quote dropped");
                continue;
            };

            if !books.contains_key(&quote.book_id) {
                if missing_books.contains(&quote.book_id) {
                    continue;
                }
                let book = self
                    .store
                    .get_book(quote.book_id)
                    .map_err(|e| {
                        warn!(book_id = quote.book_id, error = %e, "record store failed");
                        SearchError::IndexUnavailable
                    })?;
                match book {
                    Some(book) => {
                        books.insert(quote.book_id, book);
                    }
                    None => {
                        debug!(book_id = quote.book_id, "stale book dropped");
                        missing_books.push(quote.book_id);
                        continue;
                    }
                }
            }

            let book = &books[&quote.book_id];
            scored.push(scorer.score(&quote, book, hit.raw_relevance));
        }

        aggregate(scored, &books, self.store.as_ref(), page)
    }
}

/// CLI entry: open the configured store and index, run the query, print.
#[allow(clippy::too_many_arguments)]
pub fn run(
    query: &str,
    config: &Config,
    offset: usize,
    limit: Option<usize>,
    top_k: Option<usize>,
    explain: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let db_path = config.db_path();
    let index_dir = config.index_dir();
    let store = SqliteStore::open_read_only(&db_path)
        .with_context(|| suggest_index(&db_path, &index_dir))?;
    let index = QuoteIndex::open(&index_dir)
        .with_context(|| suggest_index(&db_path, &index_dir))?;

    let service = SearchService::new(Arc::new(index), Arc::new(store));
    if let Some(weights_file) = config.weights_file() {
        if weights_file.exists() {
            service.set_weights(Weights::load(&weights_file)?)?;
        }
    }

    let page = PageRequest {
        offset,
        limit: config.merge_limit(limit),
        top_k: config.merge_top_k(top_k),
        explain,
    };
    let result = service.search(query, &page)?;

    match format {
        OutputFormat::Json => output::print_json(&result)?,
        OutputFormat::Text => output::print_page(query, &result),
    }
    Ok(())
}

fn suggest_index(db_path: &Path, index_dir: &Path) -> String {
    format!(
        "Search data not found (db: {}, index: {})\n\n\
         Run 'quotegrep index' to build the search index from the quote database.",
        db_path.display(),
        index_dir.display()
    )
}
