// SPDX-License-Identifier: MIT OR Apache-2.0

//! quotegrep - search a library of book quotes
//!
//! Quote-level BM25 retrieval via tantivy, combined with tunable
//! field-weight and phrase bonuses, aggregated into book-level rankings.

mod cli;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, WeightsCommands};
use quotegrep::config::Config;
use quotegrep::index::QuoteIndex;
use quotegrep::output::{self, OutputFormat};
use quotegrep::query::search;
use quotegrep::store::SqliteStore;
use quotegrep::weights::Weights;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    let format = cli.format.unwrap_or_default();

    match cli.command {
        Commands::Search {
            query,
            offset,
            limit,
            top_k,
            explain,
        } => {
            search::run(&query, &config, offset, limit, top_k, explain, format)?;
        }
        Commands::Index { force } => {
            run_index(&config, force)?;
        }
        Commands::Weights { command } => match command {
            WeightsCommands::Show => show_weights(&config, format)?,
            WeightsCommands::Set { file } => set_weights(&config, &file)?,
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "quotegrep", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn run_index(config: &Config, force: bool) -> Result<()> {
    let index_dir = config.index_dir();
    if index_dir.join("meta.json").exists() {
        if !force {
            anyhow::bail!(
                "Index already exists at {}\n\nUse 'quotegrep index --force' to rebuild it.",
                index_dir.display()
            );
        }
        std::fs::remove_dir_all(&index_dir)
            .with_context(|| format!("cannot remove {}", index_dir.display()))?;
    }

    let store = SqliteStore::open_read_only(&config.db_path()).with_context(|| {
        format!(
            "Quote database not found at {}",
            config.db_path().display()
        )
    })?;
    QuoteIndex::build(&index_dir, &store, true)?;
    println!("Indexed quotes into {}", index_dir.display());
    Ok(())
}

fn active_weights(config: &Config) -> Result<Weights> {
    match config.weights_file() {
        Some(path) if path.exists() => Ok(Weights::load(&path)?),
        _ => Ok(Weights::default()),
    }
}

fn show_weights(config: &Config, format: OutputFormat) -> Result<()> {
    let weights = active_weights(config)?;
    match format {
        OutputFormat::Json => output::print_json(&weights)?,
        OutputFormat::Text => {
            println!("bm25_weight: {}", weights.bm25_weight);
            println!("phrase_bonus_weight: {}", weights.phrase_bonus_weight);
            println!("field_weights:");
            for field in quotegrep::weights::WeightField::ALL {
                println!(
                    "  {}: {}",
                    field.label(),
                    weights.field_weights.get(field)
                );
            }
        }
    }
    Ok(())
}

fn set_weights(config: &Config, file: &std::path::Path) -> Result<()> {
    let weights = Weights::load(file)?;
    let target = config
        .weights_file()
        .context("no weights profile path configured")?;
    weights.save(&target)?;
    println!("Weights profile activated at {}", target.display());
    Ok(())
}
