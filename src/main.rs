//! Cost-Atlas main entry point
//!
//! This is the command-line interface for the Cost-Atlas harvester.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use cost_atlas::catalog::{DiscoveryRequest, LetterRange};
use cost_atlas::config::load_or_default;
use cost_atlas::crawler::scrape;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLES: &str = "\
Examples:
  cost-atlas --all                               # All countries
  cost-atlas --all --range A-G                   # Countries A-G -> batch_AG.csv
  cost-atlas --include United-States New-York    # Only US + NYC
  cost-atlas --all --include Japan Tokyo         # All countries + Tokyo";

/// Cost-Atlas: download cost-of-living tables for countries and cities
#[derive(Parser, Debug)]
#[command(name = "cost-atlas")]
#[command(version)]
#[command(about = "Download cost-of-living data for countries and cities", long_about = None)]
#[command(after_help = EXAMPLES)]
#[command(group(ArgGroup::new("selection").args(["all", "include"]).required(true).multiple(true)))]
struct Cli {
    /// Download data for every available country
    #[arg(long)]
    all: bool,

    /// Countries, each followed by its cities (hyphens for spaces)
    #[arg(long, num_args = 1.., value_name = "NAME")]
    include: Vec<String>,

    /// Alphabetical range of countries, e.g. 'A-G', 'M' or 'N-Z'
    #[arg(long, value_name = "RANGE")]
    range: Option<LetterRange>,

    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Invalid default configuration".to_string(),
    })?;

    let request = DiscoveryRequest {
        all: cli.all,
        include: cli.include,
        range: cli.range,
    };

    let outcome = scrape(&config, &request).await.context("Scrape failed")?;

    if !outcome.missing.is_empty() {
        tracing::warn!(
            "Locations with missing data: {}",
            outcome.missing.join(", ")
        );
    }

    let path = outcome.saved.context("Error saving data")?;
    tracing::info!(
        "Data collection completed: {} records written to {}",
        outcome.stats.records(),
        path.display()
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cost_atlas=info,warn"),
            1 => EnvFilter::new("cost_atlas=debug,info"),
            2 => EnvFilter::new("cost_atlas=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
