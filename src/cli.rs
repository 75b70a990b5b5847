// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use quotegrep::output::OutputFormat;

/// quotegrep - search a library of book quotes
///
/// Searches quote excerpts with BM25 ranking plus tunable field-weight and
/// exact-phrase bonuses, returning results grouped by source book with
/// citations.
#[derive(Parser, Debug)]
#[command(name = "quotegrep")]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Query language:\n  quotegrep search '\"Black Mountain College\" AND education*'\n  quotegrep search 'bauhaus OR (craft AND NOT pottery)'\n\nQuoted phrases earn a scoring bonus; a trailing * matches by prefix."
)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search quotes, grouped by book
    #[command(visible_alias = "s")]
    Search {
        /// Search query (phrases, AND/OR/NOT, prefix*)
        query: String,

        /// Pagination offset, in books
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Books per page
        #[arg(short = 'm', long = "limit")]
        limit: Option<usize>,

        /// Maximum quotes shown per book
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        /// Include per-quote score breakdowns
        #[arg(long)]
        explain: bool,
    },

    /// Build the search index from the quote database
    Index {
        /// Rebuild even if an index already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect or replace the scoring weights
    Weights {
        #[command(subcommand)]
        command: WeightsCommands,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeightsCommands {
    /// Print the active weights snapshot
    Show,

    /// Validate a JSON weights profile and make it the active snapshot
    Set {
        /// Path to the JSON profile
        file: PathBuf,
    },
}
