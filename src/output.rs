// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result rendering for the CLI: colorized text and JSON.

use colored::Colorize;
use regex::RegexBuilder;
use serde::Serialize;

use crate::model::{BookResult, SearchPage};
use crate::query::parser;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a result page as text, highlighting the query's terms inside
/// quote excerpts.
pub fn print_page(query: &str, page: &SearchPage) {
    if page.results.is_empty() {
        println!("No results for '{query}'");
        return;
    }

    let highlighter = term_highlighter(query);
    let shown_from = page.offset + 1;
    let shown_to = page.offset + page.results.len();
    println!(
        "{} matching book(s), showing {}-{}",
        page.total.to_string().bold(),
        shown_from,
        shown_to
    );

    for result in &page.results {
        println!();
        print_book(result, highlighter.as_ref());
    }
}

fn print_book(result: &BookResult, highlighter: Option<&regex::Regex>) {
    let book = &result.book;
    let mut heading = book.title.bold().to_string();
    if let Some(year) = book.year {
        heading.push_str(&format!(" ({year})"));
    }
    println!("{heading}");

    if let Some(authors) = &book.authors {
        println!("  {}", authors.cyan());
    }
    if let Some(citation) = &book.citation {
        println!("  {}", citation.dimmed());
    }
    println!(
        "  {} of {} quote(s) matched",
        result.hits_count,
        result.total_book_quotes
    );

    for quote in &result.top_quotes {
        let text = match highlighter {
            Some(re) => re
                .replace_all(&quote.quote_text, |caps: &regex::Captures<'_>| {
                    caps[0].red().bold().to_string()
                })
                .into_owned(),
            None => quote.quote_text.clone(),
        };
        let page_ref = quote
            .page
            .map(|p| format!("p. {p}"))
            .unwrap_or_else(|| "n.p.".to_string());
        println!(
            "    [{:.2}] {} {}",
            quote.score,
            text,
            format!("({page_ref})").dimmed()
        );
    }
}

/// Case-insensitive alternation over the query's terms. `None` when the
/// query has no highlightable terms.
fn term_highlighter(query: &str) -> Option<regex::Regex> {
    let parsed = parser::parse(query).ok()?;
    if parsed.terms.is_empty() {
        return None;
    }
    let alternation = parsed
        .terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
}
