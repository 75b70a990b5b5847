// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quote scoring: per-field weighted matches, phrase bonus, and the
//! combined final score.
//!
//! `final_score = bm25_weight * raw_relevance + field_bonus + phrase_bonus`.
//! The combination is referentially transparent: identical inputs and
//! weights snapshot always produce the identical score, so tuning runs can
//! be compared across invocations.

use std::collections::BTreeMap;

use crate::model::{Book, Quote, ScoreBreakdown, ScoredQuote};
use crate::weights::{WeightField, Weights};

/// Scores candidates for one query under one weights snapshot.
///
/// Query terms and the designated phrase are lowercased once at
/// construction; scoring a candidate is then O(terms × fields) with the
/// field set fixed and small.
pub struct Scorer<'a> {
    weights: &'a Weights,
    terms: Vec<String>,
    phrase: Option<String>,
}

impl<'a> Scorer<'a> {
    /// `terms` are the query's bare terms (each phrase text counts as one
    /// multi-word term); `phrase` is the designated phrase, if any.
    pub fn new(weights: &'a Weights, terms: &[String], phrase: Option<&str>) -> Self {
        Scorer {
            weights,
            terms: terms.iter().map(|t| t.to_lowercase()).collect(),
            phrase: phrase.map(|p| p.to_lowercase()),
        }
    }

    pub fn score(&self, quote: &Quote, book: &Book, raw_relevance: f64) -> ScoredQuote {
        let (field_bonus, field_matches) = self.field_bonus(quote, book);
        let phrase_bonus = self.phrase_bonus(&quote.quote_text);
        let weighted_relevance = self.weights.bm25_weight * raw_relevance;
        let final_score = weighted_relevance + field_bonus + phrase_bonus;

        ScoredQuote {
            quote: quote.clone(),
            breakdown: ScoreBreakdown {
                quote_id: quote.id,
                raw_relevance,
                weighted_relevance,
                field_bonus,
                field_matches,
                phrase_bonus,
                final_score,
            },
        }
    }

    /// Binary presence per field: if any term occurs case-insensitively as
    /// a substring of the field's value, the field's weight is added once.
    /// Multiple matching terms never multiply a field's contribution.
    fn field_bonus(&self, quote: &Quote, book: &Book) -> (f64, BTreeMap<WeightField, f64>) {
        let mut bonus = 0.0;
        let mut matches = BTreeMap::new();

        for field in WeightField::ALL {
            let Some(value) = field_value(field, quote, book) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let value = value.to_lowercase();
            if self.terms.iter().any(|term| value.contains(term.as_str())) {
                let weight = self.weights.field_weights.get(field);
                bonus += weight;
                matches.insert(field, weight);
            }
        }

        (bonus, matches)
    }

    /// `phrase_bonus_weight` when the designated phrase occurs verbatim,
    /// case-insensitively, inside the quote text; `0` otherwise.
    fn phrase_bonus(&self, quote_text: &str) -> f64 {
        match &self.phrase {
            Some(phrase) if quote_text.to_lowercase().contains(phrase.as_str()) => {
                self.weights.phrase_bonus_weight
            }
            _ => 0.0,
        }
    }
}

fn field_value<'q>(field: WeightField, quote: &'q Quote, book: &'q Book) -> Option<&'q str> {
    match field {
        WeightField::QuoteText => Some(quote.quote_text.as_str()),
        WeightField::QuoteKeywords => quote.keywords.as_deref(),
        WeightField::BookTitle => Some(book.title.as_str()),
        WeightField::BookAuthors => book.authors.as_deref(),
        WeightField::BookKeywords => book.keywords.as_deref(),
        WeightField::Themes => book.themes.as_deref(),
        WeightField::Summary => book.summary.as_deref(),
        WeightField::Type => Some(book.kind()),
        WeightField::Publisher => book.publisher.as_deref(),
        WeightField::Journal => book.journal.as_deref(),
    }
}
