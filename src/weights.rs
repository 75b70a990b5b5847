// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tunable scoring configuration.
//!
//! Weights are treated as a versioned, immutable snapshot: readers grab the
//! current `Arc` and score an entire query against it, writers validate and
//! swap the whole snapshot. A torn read is impossible by construction.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::errors::SearchError;

/// The fixed set of metadata fields eligible for match bonuses.
///
/// Keys outside this set are rejected at load time instead of being
/// silently ignored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WeightField {
    QuoteText,
    QuoteKeywords,
    BookTitle,
    BookAuthors,
    BookKeywords,
    Themes,
    Summary,
    Type,
    Publisher,
    Journal,
}

impl WeightField {
    pub const ALL: [WeightField; 10] = [
        WeightField::QuoteText,
        WeightField::QuoteKeywords,
        WeightField::BookTitle,
        WeightField::BookAuthors,
        WeightField::BookKeywords,
        WeightField::Themes,
        WeightField::Summary,
        WeightField::Type,
        WeightField::Publisher,
        WeightField::Journal,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WeightField::QuoteText => "quote_text",
            WeightField::QuoteKeywords => "quote_keywords",
            WeightField::BookTitle => "book_title",
            WeightField::BookAuthors => "book_authors",
            WeightField::BookKeywords => "book_keywords",
            WeightField::Themes => "themes",
            WeightField::Summary => "summary",
            WeightField::Type => "type",
            WeightField::Publisher => "publisher",
            WeightField::Journal => "journal",
        }
    }
}

/// Per-field match multipliers. Exhaustive over [`WeightField`]: profiles
/// with unknown or missing keys fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldWeights {
    pub quote_text: f64,
    pub quote_keywords: f64,
    pub book_title: f64,
    pub book_authors: f64,
    pub book_keywords: f64,
    pub themes: f64,
    pub summary: f64,
    #[serde(rename = "type")]
    pub kind: f64,
    pub publisher: f64,
    pub journal: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        FieldWeights {
            quote_text: 1.0,
            quote_keywords: 0.8,
            book_title: 3.0,
            book_authors: 2.5,
            book_keywords: 0.7,
            themes: 0.6,
            summary: 0.5,
            kind: 0.4,
            publisher: 0.3,
            journal: 0.3,
        }
    }
}

impl FieldWeights {
    pub fn get(&self, field: WeightField) -> f64 {
        match field {
            WeightField::QuoteText => self.quote_text,
            WeightField::QuoteKeywords => self.quote_keywords,
            WeightField::BookTitle => self.book_title,
            WeightField::BookAuthors => self.book_authors,
            WeightField::BookKeywords => self.book_keywords,
            WeightField::Themes => self.themes,
            WeightField::Summary => self.summary,
            WeightField::Type => self.kind,
            WeightField::Publisher => self.publisher,
            WeightField::Journal => self.journal,
        }
    }
}

/// One immutable scoring configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    pub bm25_weight: f64,
    pub phrase_bonus_weight: f64,
    pub field_weights: FieldWeights,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            bm25_weight: 1.0,
            phrase_bonus_weight: 2.0,
            field_weights: FieldWeights::default(),
        }
    }
}

static DEFAULT_WEIGHTS: Lazy<Arc<Weights>> = Lazy::new(|| Arc::new(Weights::default()));

impl Weights {
    /// Check every value is finite and non-negative.
    pub fn validate(&self) -> Result<(), SearchError> {
        let mut entries = vec![
            ("bm25_weight", self.bm25_weight),
            ("phrase_bonus_weight", self.phrase_bonus_weight),
        ];
        for field in WeightField::ALL {
            entries.push((field.label(), self.field_weights.get(field)));
        }
        for (name, value) in entries {
            if !value.is_finite() {
                return Err(SearchError::validation(format!(
                    "{name} must be finite, got {value}"
                )));
            }
            if value < 0.0 {
                return Err(SearchError::validation(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Load and validate a JSON weights profile.
    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::validation(format!("cannot read {}: {e}", path.display()))
        })?;
        let weights: Weights = serde_json::from_str(&content).map_err(|e| {
            SearchError::validation(format!("cannot parse {}: {e}", path.display()))
        })?;
        weights.validate()?;
        Ok(weights)
    }

    /// Persist the snapshot as a JSON profile.
    pub fn save(&self, path: &Path) -> Result<(), SearchError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SearchError::validation(format!("cannot serialize weights: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            SearchError::validation(format!("cannot write {}: {e}", path.display()))
        })
    }
}

/// Holds the active [`Weights`] snapshot.
///
/// `get` clones an `Arc` and never blocks on writers for the duration of a
/// scoring operation; `set` validates and replaces the snapshot as a whole.
#[derive(Debug)]
pub struct WeightsStore {
    active: RwLock<Arc<Weights>>,
}

impl Default for WeightsStore {
    fn default() -> Self {
        WeightsStore {
            active: RwLock::new(Arc::clone(&DEFAULT_WEIGHTS)),
        }
    }
}

impl WeightsStore {
    pub fn new(weights: Weights) -> Result<Self, SearchError> {
        weights.validate()?;
        Ok(WeightsStore {
            active: RwLock::new(Arc::new(weights)),
        })
    }

    /// Current snapshot. Cheap; callers keep the `Arc` for a whole query.
    pub fn get(&self) -> Arc<Weights> {
        match self.active.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds a fully-written snapshot.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Validate and atomically activate a new snapshot. On error the
    /// previous snapshot stays active.
    pub fn set(&self, candidate: Weights) -> Result<(), SearchError> {
        candidate.validate()?;
        let next = Arc::new(candidate);
        match self.active.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        Ok(())
    }
}
