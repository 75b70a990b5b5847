// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tantivy-backed quote index.
//!
//! Indexes quote text and quote keywords with BM25 scoring. The adapter
//! compiles the pipeline's query dialect into tantivy queries directly
//! instead of going through tantivy's own query parser, so phrase, prefix,
//! and negation semantics stay under our control.

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tantivy::{
    collector::TopDocs,
    doc,
    query::{AllQuery, BooleanQuery, EmptyQuery, Occur, PhraseQuery, Query, RegexQuery, TermQuery},
    schema::{Field, IndexRecordOption, Schema, Term, Value, INDEXED, STORED, TEXT},
    Index, ReloadPolicy, TantivyDocument,
};
use tracing::{debug, info};

use crate::index::{IndexHit, SearchIndex};
use crate::store::SqliteStore;

/// Heap budget for the index writer.
const WRITER_HEAP_BYTES: usize = 50_000_000;

struct QuoteFields {
    quote_id: Field,
    quote_text: Field,
    keywords: Field,
}

fn quote_schema() -> (Schema, QuoteFields) {
    let mut builder = Schema::builder();
    let quote_id = builder.add_i64_field("quote_id", INDEXED | STORED);
    // TEXT records positions, which phrase queries need.
    let quote_text = builder.add_text_field("quote_text", TEXT);
    let keywords = builder.add_text_field("keywords", TEXT);
    (
        builder.build(),
        QuoteFields {
            quote_id,
            quote_text,
            keywords,
        },
    )
}

/// A tantivy index over the quote corpus.
pub struct QuoteIndex {
    index: Index,
    fields: QuoteFields,
}

impl QuoteIndex {
    /// Open an existing index directory.
    pub fn open(dir: &Path) -> Result<Self> {
        let index = Index::open_in_dir(dir)
            .with_context(|| format!("cannot open index at {}", dir.display()))?;
        let schema = index.schema();
        let fields = QuoteFields {
            quote_id: schema.get_field("quote_id")?,
            quote_text: schema.get_field("quote_text")?,
            keywords: schema.get_field("keywords")?,
        };
        Ok(QuoteIndex { index, fields })
    }

    /// Build a fresh index at `dir` from every quote in the record store.
    pub fn build(dir: &Path, store: &SqliteStore, show_progress: bool) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create index directory {}", dir.display()))?;

        let (schema, fields) = quote_schema();
        let index = Index::create_in_dir(dir, schema)
            .with_context(|| format!("cannot create index at {}", dir.display()))?;

        let total = store.quote_count()?;
        let progress = if show_progress {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} quotes indexed")
                    .expect("valid progress template"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut writer = index
            .writer(WRITER_HEAP_BYTES)
            .context("cannot create index writer")?;
        for quote in store.all_quotes()? {
            writer.add_document(doc!(
                fields.quote_id => quote.id,
                fields.quote_text => quote.quote_text,
                fields.keywords => quote.keywords.unwrap_or_default(),
            ))?;
            progress.inc(1);
        }
        writer.commit().context("cannot commit index")?;
        progress.finish_and_clear();
        info!(total, dir = %dir.display(), "quote index built");

        Ok(QuoteIndex { index, fields })
    }

    fn compile(&self, index_query: &str) -> Result<Box<dyn Query>> {
        let tokens = DialectLexer::new(index_query).collect::<Result<Vec<_>>>()?;
        let mut reader = DialectReader {
            tokens,
            pos: 0,
            index: self,
        };
        let query = reader.read_or()?;
        if reader.pos != reader.tokens.len() {
            return Err(anyhow!("trailing tokens in index query: {index_query}"));
        }
        Ok(query)
    }

    /// Tokenize `text` the way the indexed fields were tokenized, so query
    /// terms line up with postings.
    fn analyze(&self, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self.index.tokenizer_for_field(self.fields.quote_text)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        stream.process(&mut |token| tokens.push(token.text.to_string()));
        Ok(tokens)
    }

    /// A term (or multi-token phrase) matched against both text fields.
    /// Any input the analyzer splits into several tokens must match them
    /// adjacently, so a bare term like "don't" behaves like a short phrase.
    fn text_query(&self, text: &str) -> Result<Box<dyn Query>> {
        let tokens = self.analyze(text)?;
        if tokens.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }

        let per_field = |field: Field| -> Box<dyn Query> {
            if tokens.len() == 1 {
                Box::new(TermQuery::new(
                    Term::from_field_text(field, &tokens[0]),
                    IndexRecordOption::WithFreqs,
                ))
            } else {
                let terms = tokens
                    .iter()
                    .map(|t| Term::from_field_text(field, t))
                    .collect::<Vec<_>>();
                Box::new(PhraseQuery::new(terms))
            }
        };

        Ok(Box::new(BooleanQuery::union(vec![
            per_field(self.fields.quote_text),
            per_field(self.fields.keywords),
        ])))
    }

    fn prefix_query(&self, text: &str) -> Result<Box<dyn Query>> {
        let tokens = self.analyze(text)?;
        let Some(prefix) = tokens.last() else {
            return Ok(Box::new(EmptyQuery));
        };
        let pattern = format!("{}.*", escape_regex(prefix));
        let per_field = |field: Field| -> Result<Box<dyn Query>> {
            Ok(Box::new(RegexQuery::from_pattern(&pattern, field)?))
        };
        Ok(Box::new(BooleanQuery::union(vec![
            per_field(self.fields.quote_text)?,
            per_field(self.fields.keywords)?,
        ])))
    }
}

impl SearchIndex for QuoteIndex {
    fn search(&self, index_query: &str, limit: usize) -> Result<Vec<IndexHit>> {
        let query = self.compile(index_query)?;
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("cannot create index reader")?;
        let searcher = reader.searcher();

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .context("index search failed")?;
        debug!(query = index_query, hits = top_docs.len(), "index search");

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher.doc(address)?;
            let quote_id = document
                .get_first(self.fields.quote_id)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| anyhow!("indexed document missing quote_id"))?;
            // Tantivy BM25 is already higher-is-better; no conversion.
            hits.push(IndexHit {
                quote_id,
                raw_relevance: f64::from(score),
            });
        }
        Ok(hits)
    }
}

fn escape_regex(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len());
    for c in token.chars() {
        if ".+*?()[]{}|^$\\".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DialectToken {
    Term { text: String, prefix: bool },
    Phrase(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// Lexer for the query dialect this adapter accepts. The pipeline emits
/// fully parenthesized queries, but the reader below handles precedence
/// anyway so hand-written dialect strings behave.
struct DialectLexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> DialectLexer<'a> {
    fn new(input: &'a str) -> Self {
        DialectLexer {
            chars: input.chars().peekable(),
        }
    }
}

impl Iterator for DialectLexer<'_> {
    type Item = Result<DialectToken>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&c) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.chars.next();
        }
        let c = *self.chars.peek()?;

        match c {
            '(' => {
                self.chars.next();
                Some(Ok(DialectToken::LParen))
            }
            ')' => {
                self.chars.next();
                Some(Ok(DialectToken::RParen))
            }
            '"' => {
                self.chars.next();
                let mut phrase = String::new();
                for c in self.chars.by_ref() {
                    if c == '"' {
                        return Some(Ok(DialectToken::Phrase(phrase)));
                    }
                    phrase.push(c);
                }
                Some(Err(anyhow!("unterminated phrase in index query")))
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    word.push(c);
                    self.chars.next();
                }
                let token = if word.eq_ignore_ascii_case("and") {
                    DialectToken::And
                } else if word.eq_ignore_ascii_case("or") {
                    DialectToken::Or
                } else if word.eq_ignore_ascii_case("not") {
                    DialectToken::Not
                } else if let Some(stripped) = word.strip_suffix('*') {
                    DialectToken::Term {
                        text: stripped.to_string(),
                        prefix: true,
                    }
                } else {
                    DialectToken::Term {
                        text: word,
                        prefix: false,
                    }
                };
                Some(Ok(token))
            }
        }
    }
}

struct DialectReader<'a> {
    tokens: Vec<DialectToken>,
    pos: usize,
    index: &'a QuoteIndex,
}

impl DialectReader<'_> {
    fn peek(&self) -> Option<&DialectToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<DialectToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn read_or(&mut self) -> Result<Box<dyn Query>> {
        let mut clauses = vec![self.read_and()?];
        while matches!(self.peek(), Some(DialectToken::Or)) {
            self.next();
            clauses.push(self.read_and()?);
        }
        if clauses.len() == 1 {
            Ok(clauses.pop().expect("one clause"))
        } else {
            Ok(Box::new(BooleanQuery::union(clauses)))
        }
    }

    fn read_and(&mut self) -> Result<Box<dyn Query>> {
        let mut clauses = vec![self.read_not()?];
        while matches!(self.peek(), Some(DialectToken::And)) {
            self.next();
            clauses.push(self.read_not()?);
        }
        if clauses.len() == 1 {
            Ok(clauses.pop().expect("one clause"))
        } else {
            Ok(Box::new(BooleanQuery::intersection(clauses)))
        }
    }

    fn read_not(&mut self) -> Result<Box<dyn Query>> {
        if matches!(self.peek(), Some(DialectToken::Not)) {
            self.next();
            let inner = self.read_not()?;
            return Ok(Box::new(BooleanQuery::new(vec![
                (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                (Occur::MustNot, inner),
            ])));
        }
        self.read_primary()
    }

    fn read_primary(&mut self) -> Result<Box<dyn Query>> {
        match self.next() {
            Some(DialectToken::Term { text, prefix }) => {
                if prefix {
                    self.index.prefix_query(&text)
                } else {
                    self.index.text_query(&text)
                }
            }
            Some(DialectToken::Phrase(p)) => self.index.text_query(&p),
            Some(DialectToken::LParen) => {
                let inner = self.read_or()?;
                match self.next() {
                    Some(DialectToken::RParen) => Ok(inner),
                    _ => Err(anyhow!("unbalanced parentheses in index query")),
                }
            }
            other => Err(anyhow!("unexpected token in index query: {other:?}")),
        }
    }
}
