// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for quotegrep
//!
//! Loads configuration from .quotegreprc.toml in the current directory or
//! ~/.config/quotegrep/config.toml

use serde::Deserialize;
use std::path::PathBuf;

use crate::aggregate::DEFAULT_TOP_K;

/// Configuration loaded from .quotegreprc.toml or
/// ~/.config/quotegrep/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite quote database
    pub db_path: Option<PathBuf>,
    /// Directory holding the tantivy index
    pub index_dir: Option<PathBuf>,
    /// Maximum number of books per result page
    pub max_results: Option<usize>,
    /// Quotes returned per book
    pub top_k_per_book: Option<usize>,
    /// JSON weights profile activated at startup
    pub weights_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .quotegreprc.toml in current directory
    /// 2. ~/.config/quotegrep/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(&PathBuf::from(".quotegreprc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("quotegrep").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from_path(path: &PathBuf) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("library.db"))
    }

    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".quotegrep-index"))
    }

    /// The active weights profile path, configured or default.
    pub fn weights_file(&self) -> Option<PathBuf> {
        Some(
            self.weights_file
                .clone()
                .unwrap_or_else(|| PathBuf::from("quotegrep-weights.json")),
        )
    }

    /// Merge CLI options with config (CLI wins)
    pub fn merge_limit(&self, cli_value: Option<usize>) -> usize {
        cli_value.or(self.max_results).unwrap_or(20)
    }

    pub fn merge_top_k(&self, cli_value: Option<usize>) -> usize {
        cli_value.or(self.top_k_per_book).unwrap_or(DEFAULT_TOP_K)
    }
}
