//! Crawler module for page fetching and dataset assembly
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retries, backoff and pacing
//! - Cost table and location index parsing
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{
    build_http_client, FetchError, FetchPolicy, Fetcher, Sleeper, TokioSleeper, WaitKind,
};
pub use parser::{parse_cost_page, parse_location_index, CostPage};

use crate::catalog::DiscoveryRequest;
use crate::config::Config;
use crate::output::{output_stem, CrawlStats, CsvSink, DatasetSink, OutputError};
use crate::AtlasError;
use std::path::PathBuf;

/// Result of a complete scrape
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// Where the dataset was written, or why it could not be
    pub saved: Result<PathBuf, OutputError>,

    /// Sub-locations that produced no data
    pub missing: Vec<String>,

    pub stats: CrawlStats,
}

/// Runs a complete scrape and writes the dataset to the configured directory
///
/// This is the main entry point. It will:
/// 1. Build the HTTP client and fetcher
/// 2. Crawl every location the request resolves to
/// 3. Write the dataset as CSV, named after the letter range
///
/// A failed write does not discard the crawl: it is reported in
/// [`ScrapeOutcome::saved`] alongside the missing-data list.
///
/// # Example
///
/// ```no_run
/// use cost_atlas::{scrape, Config, DiscoveryRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let request = DiscoveryRequest {
///     all: true,
///     include: vec![],
///     range: Some("A-G".parse()?),
/// };
/// let outcome = scrape(&Config::default(), &request).await?;
/// println!("{:?}", outcome.saved);
/// # Ok(())
/// # }
/// ```
pub async fn scrape(config: &Config, request: &DiscoveryRequest) -> Result<ScrapeOutcome, AtlasError> {
    let fetcher = Fetcher::from_config(&config.fetch)?;
    let sink = CsvSink::new(&config.output.data_dir);
    scrape_with(config, request, fetcher, &sink).await
}

/// [`scrape`] with an explicit fetcher and sink
pub async fn scrape_with<S: Sleeper>(
    config: &Config,
    request: &DiscoveryRequest,
    fetcher: Fetcher<S>,
    sink: &dyn DatasetSink,
) -> Result<ScrapeOutcome, AtlasError> {
    let name = output_stem(request.range.as_ref(), &config.output.default_name);

    let coordinator = Coordinator::new(config, fetcher)?;
    let report = coordinator.run(request).await;

    let saved = sink.write(&report.dataset, &name);
    if let Err(e) = &saved {
        tracing::error!("Error saving data: {}", e);
    }

    Ok(ScrapeOutcome {
        saved,
        missing: report.missing,
        stats: report.stats,
    })
}
