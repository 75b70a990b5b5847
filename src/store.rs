// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store boundary: books and quotes.
//!
//! The scoring pipeline only reads. Implementations must be safe for
//! concurrent read-only access and enforce their own I/O budget; any
//! failure surfaces to callers as `IndexUnavailable`, never as a partial
//! ranking.

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::model::{Book, Quote};

/// Budget for a single record-store call before it is treated as failed.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Read access to the books/quotes records backing the index.
pub trait RecordStore: Send + Sync {
    /// `Ok(None)` when the id does not resolve; the pipeline drops the
    /// entity instead of failing, since the index may lag record edits.
    fn get_book(&self, id: i64) -> Result<Option<Book>>;

    fn get_quote(&self, id: i64) -> Result<Option<Quote>>;

    /// Count of all quotes belonging to a book, matched or not.
    fn count_quotes_for_book(&self, book_id: i64) -> Result<usize>;
}

/// SQLite-backed record store over the `books` and `quotes` tables.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open an existing database read-write.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("cannot open database at {}", path.display()))?;
        Self::configure(conn)
    }

    /// Open an existing database read-only, the mode the search pipeline
    /// uses.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("cannot open database at {}", path.display()))?;
        Self::configure(conn)
    }

    /// Create a fresh database with the books/quotes schema.
    pub fn create(path: &Path) -> Result<Self> {
        let store = Self::open(path)?;
        {
            let conn = store.lock();
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS books (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    authors TEXT,
                    year INTEGER,
                    publisher TEXT,
                    journal TEXT,
                    doi TEXT,
                    isbn TEXT,
                    themes TEXT,
                    keywords TEXT,
                    summary TEXT,
                    citation TEXT
                );
                CREATE TABLE IF NOT EXISTS quotes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    book_id INTEGER NOT NULL,
                    quote_text TEXT NOT NULL,
                    page INTEGER,
                    section TEXT,
                    keywords TEXT,
                    FOREIGN KEY (book_id) REFERENCES books (id)
                );
                CREATE INDEX IF NOT EXISTS idx_quotes_book_id ON quotes (book_id);",
            )
            .context("cannot create schema")?;
        }
        Ok(store)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("cannot set busy timeout")?;
        // WAL keeps concurrent readers off the writer's lock.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert a book, returning its id. Used by the index builder and tests;
    /// bulk ingestion lives outside this crate.
    pub fn insert_book(&self, book: &Book) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO books (title, authors, year, publisher, journal, doi, isbn,
                                themes, keywords, summary, citation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                book.title,
                book.authors,
                book.year,
                book.publisher,
                book.journal,
                book.doi,
                book.isbn,
                book.themes,
                book.keywords,
                book.summary,
                book.citation,
            ],
        )
        .context("cannot insert book")?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a quote, returning its id.
    pub fn insert_quote(&self, quote: &Quote) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO quotes (book_id, quote_text, page, section, keywords)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                quote.book_id,
                quote.quote_text,
                quote.page,
                quote.section,
                quote.keywords,
            ],
        )
        .context("cannot insert quote")?;
        Ok(conn.last_insert_rowid())
    }

    /// All quotes in id order, for index builds.
    pub fn all_quotes(&self) -> Result<Vec<Quote>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, book_id, quote_text, page, section, keywords
             FROM quotes ORDER BY id",
        )?;
        let rows = stmt.query_map([], quote_from_row)?;
        let mut quotes = Vec::new();
        for quote in rows {
            quotes.push(quote?);
        }
        Ok(quotes)
    }

    pub fn quote_count(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM quotes", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

impl RecordStore for SqliteStore {
    fn get_book(&self, id: i64) -> Result<Option<Book>> {
        let conn = self.lock();
        let book = conn
            .query_row(
                "SELECT id, title, authors, year, publisher, journal, doi, isbn,
                        themes, keywords, summary, citation
                 FROM books WHERE id = ?1",
                [id],
                book_from_row,
            )
            .optional()
            .with_context(|| format!("cannot read book {id}"))?;
        Ok(book)
    }

    fn get_quote(&self, id: i64) -> Result<Option<Quote>> {
        let conn = self.lock();
        let quote = conn
            .query_row(
                "SELECT id, book_id, quote_text, page, section, keywords
                 FROM quotes WHERE id = ?1",
                [id],
                quote_from_row,
            )
            .optional()
            .with_context(|| format!("cannot read quote {id}"))?;
        Ok(quote)
    }

    fn count_quotes_for_book(&self, book_id: i64) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM quotes WHERE book_id = ?1",
                [book_id],
                |r| r.get(0),
            )
            .with_context(|| format!("cannot count quotes for book {book_id}"))?;
        Ok(count as usize)
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        authors: row.get(2)?,
        year: row.get(3)?,
        publisher: row.get(4)?,
        journal: row.get(5)?,
        doi: row.get(6)?,
        isbn: row.get(7)?,
        themes: row.get(8)?,
        keywords: row.get(9)?,
        summary: row.get(10)?,
        citation: row.get(11)?,
    })
}

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        id: row.get(0)?,
        book_id: row.get(1)?,
        quote_text: row.get(2)?,
        page: row.get(3)?,
        section: row.get(4)?,
        keywords: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_fixtures() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::create(&dir.path().join("library.db")).unwrap();

        let book_id = store
            .insert_book(&Book {
                title: "Experimental Colleges".to_string(),
                authors: Some("A. Author".to_string()),
                year: Some(1962),
                ..Book::default()
            })
            .unwrap();
        for text in ["first quote", "second quote"] {
            store
                .insert_quote(&Quote {
                    book_id,
                    quote_text: text.to_string(),
                    ..Quote::default()
                })
                .unwrap();
        }

        (dir, store)
    }

    #[test]
    fn round_trips_books_and_quotes() {
        let (_dir, store) = store_with_fixtures();
        let book = store.get_book(1).unwrap().unwrap();
        assert_eq!(book.title, "Experimental Colleges");
        assert_eq!(book.year, Some(1962));

        let quote = store.get_quote(2).unwrap().unwrap();
        assert_eq!(quote.quote_text, "second quote");
        assert_eq!(quote.book_id, book.id);
    }

    #[test]
    fn missing_ids_resolve_to_none() {
        let (_dir, store) = store_with_fixtures();
        assert!(store.get_book(999).unwrap().is_none());
        assert!(store.get_quote(999).unwrap().is_none());
    }

    #[test]
    fn counts_quotes_per_book() {
        let (_dir, store) = store_with_fixtures();
        assert_eq!(store.count_quotes_for_book(1).unwrap(), 2);
        assert_eq!(store.count_quotes_for_book(999).unwrap(), 0);
    }

    #[test]
    fn all_quotes_is_id_ordered() {
        let (_dir, store) = store_with_fixtures();
        let quotes = store.all_quotes().unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes[0].id < quotes[1].id);
        assert_eq!(store.quote_count().unwrap(), 2);
    }
}
