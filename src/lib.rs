// SPDX-License-Identifier: MIT OR Apache-2.0

//! quotegrep - book-quote search library
//!
//! Parses a small boolean query language, retrieves candidate quotes from a
//! full-text index, scores them with tunable weights (BM25 base relevance,
//! per-field match bonuses, exact-phrase bonus), and aggregates the scored
//! quotes into deterministic book-level rankings.

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod index;
pub mod model;
pub mod output;
pub mod query;
pub mod scoring;
pub mod store;
pub mod weights;
