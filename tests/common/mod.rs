// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborator fakes for pipeline tests.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use quotegrep::index::{IndexHit, SearchIndex};
use quotegrep::model::{Book, Quote};
use quotegrep::store::RecordStore;

/// Serves a fixed candidate list and counts how often it is consulted.
#[derive(Default)]
pub struct MemoryIndex {
    pub hits: Vec<IndexHit>,
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MemoryIndex {
    pub fn with_hits(hits: Vec<IndexHit>) -> Self {
        MemoryIndex {
            hits,
            ..MemoryIndex::default()
        }
    }

    pub fn failing() -> Self {
        MemoryIndex {
            fail: true,
            ..MemoryIndex::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchIndex for MemoryIndex {
    fn search(&self, _index_query: &str, limit: usize) -> Result<Vec<IndexHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("index offline");
        }
        Ok(self.hits.iter().take(limit).copied().collect())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    books: HashMap<i64, Book>,
    quotes: HashMap<i64, Quote>,
}

impl MemoryStore {
    pub fn add_book(&mut self, book: Book) {
        self.books.insert(book.id, book);
    }

    pub fn add_quote(&mut self, quote: Quote) {
        self.quotes.insert(quote.id, quote);
    }
}

impl RecordStore for MemoryStore {
    fn get_book(&self, id: i64) -> Result<Option<Book>> {
        Ok(self.books.get(&id).cloned())
    }

    fn get_quote(&self, id: i64) -> Result<Option<Quote>> {
        Ok(self.quotes.get(&id).cloned())
    }

    fn count_quotes_for_book(&self, book_id: i64) -> Result<usize> {
        Ok(self
            .quotes
            .values()
            .filter(|q| q.book_id == book_id)
            .count())
    }
}

pub fn hit(quote_id: i64, raw_relevance: f64) -> IndexHit {
    IndexHit {
        quote_id,
        raw_relevance,
    }
}

pub fn book(id: i64, title: &str) -> Book {
    Book {
        id,
        title: title.to_string(),
        ..Book::default()
    }
}

pub fn quote(id: i64, book_id: i64, text: &str) -> Quote {
    Quote {
        id,
        book_id,
        quote_text: text.to_string(),
        ..Quote::default()
    }
}
