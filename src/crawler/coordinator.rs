//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the other pieces together:
//! - Fetching the location index and resolving the discovery plan
//! - Fetching each location's aggregate page
//! - Trying each requested sub-location's candidate targets in order
//! - Feeding every parsed page into the schema unifier
//! - Recording sub-locations that produced no data
//!
//! No single target failure ends the run.

use crate::catalog::{DiscoveryPlan, DiscoveryRequest, LocationCatalog};
use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, Sleeper, TokioSleeper};
use crate::crawler::parser::{parse_cost_page, parse_location_index};
use crate::output::CrawlStats;
use crate::unify::{Dataset, SchemaUnifier, AGGREGATE_SUB_LOCATION};
use crate::url::TargetResolver;
use crate::AtlasError;
use url::Url;

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub dataset: Dataset,

    /// `"<sub-location>, <location>"` for every sub-location without data,
    /// in visiting order
    pub missing: Vec<String>,

    pub stats: CrawlStats,
}

/// Main crawler coordinator structure
///
/// Owns the unifier for exactly one run; requests are issued strictly
/// one at a time.
pub struct Coordinator<S = TokioSleeper> {
    fetcher: Fetcher<S>,
    resolver: TargetResolver,
    unifier: SchemaUnifier,
    missing: Vec<String>,
    stats: CrawlStats,
}

impl<S: Sleeper> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration; only `[source]` is read here
    /// * `fetcher` - The fetcher used for every request
    pub fn new(config: &Config, fetcher: Fetcher<S>) -> Result<Self, AtlasError> {
        let resolver = TargetResolver::from_config(&config.source)?;

        Ok(Self {
            fetcher,
            resolver,
            unifier: SchemaUnifier::new(),
            missing: Vec::new(),
            stats: CrawlStats::new(),
        })
    }

    /// Fetches the index page and builds the catalog of known locations
    ///
    /// An unreachable index yields an empty catalog.
    pub async fn load_catalog(&self) -> LocationCatalog {
        let index = self.resolver.index();

        match self.fetcher.fetch(index).await {
            Ok(body) => {
                let catalog = LocationCatalog::new(parse_location_index(&body, index));
                tracing::info!("Fetched {} locations", catalog.len());
                catalog
            }
            Err(e) => {
                tracing::error!("Failed to fetch location index {}: {}", index, e);
                LocationCatalog::default()
            }
        }
    }

    /// Runs the main crawl loop for a request
    ///
    /// 1. Fetch the location index
    /// 2. Resolve the discovery plan (union, then letter range)
    /// 3. Visit every planned location
    /// 4. Finalize the dataset
    pub async fn run(mut self, request: &DiscoveryRequest) -> CrawlReport {
        let catalog = self.load_catalog().await;
        let plan = catalog.resolve(request);
        self.run_plan(&plan).await;
        self.finish()
    }

    /// Visits every location in an already resolved plan
    pub async fn run_plan(&mut self, plan: &DiscoveryPlan) {
        self.stats.locations_planned += plan.len();

        if plan.is_empty() {
            tracing::warn!("No locations match the criteria");
            return;
        }

        tracing::info!("Processing {} locations", plan.len());

        for (i, (location, sub_locations)) in plan.locations.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, plan.len(), location);
            self.process_location(location, sub_locations.iter().map(String::as_str))
                .await;
        }
    }

    /// Fetches a location's aggregate record, then each sub-location
    async fn process_location<'a>(
        &mut self,
        location: &str,
        sub_locations: impl Iterator<Item = &'a str>,
    ) {
        let fetched = match self.resolver.location_target(location) {
            Ok(url) => {
                self.fetch_record(&url, location, AGGREGATE_SUB_LOCATION)
                    .await
            }
            Err(e) => {
                tracing::warn!("Cannot build target for {}: {}", location, e);
                false
            }
        };

        if fetched {
            self.stats.aggregates_fetched += 1;
            tracing::info!("    ✓ Average");
        } else {
            self.stats.aggregates_failed += 1;
            tracing::info!("    ✗ Average");
        }

        for sub_location in sub_locations {
            if self.process_sub_location(sub_location, location).await {
                self.stats.sub_locations_fetched += 1;
                tracing::info!("    ✓ {}", sub_location);
            } else {
                self.stats.sub_locations_failed += 1;
                self.missing.push(format!("{}, {}", sub_location, location));
                tracing::info!("    ✗ {}", sub_location);
            }
        }
    }

    /// Tries each candidate target until one yields data
    async fn process_sub_location(&mut self, sub_location: &str, location: &str) -> bool {
        let targets = match self.resolver.sub_location_targets(sub_location, location) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!("Cannot build targets for {}, {}: {}", sub_location, location, e);
                return false;
            }
        };

        for (i, url) in targets.iter().enumerate() {
            if self.fetch_record(url, location, sub_location).await {
                if i > 0 {
                    self.stats.fallbacks_used += 1;
                }
                return true;
            }
            tracing::debug!("No usable data for {} at {}", sub_location, url);
        }

        false
    }

    /// Fetches and parses one page, accumulating it if it has data
    ///
    /// Network failures and unusable pages both count as "no data".
    async fn fetch_record(&mut self, url: &Url, location: &str, sub_location: &str) -> bool {
        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("No content from {}: {}", url, e);
                return false;
            }
        };

        match parse_cost_page(&body) {
            Some(page) if page.has_data() => {
                self.unifier.accumulate(
                    location,
                    sub_location,
                    &page.fields,
                    page.entries.map(|n| n as f64),
                );
                true
            }
            _ => false,
        }
    }

    /// Sub-locations recorded as missing so far
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Finalizes the unifier and closes the statistics
    pub fn finish(mut self) -> CrawlReport {
        self.stats.finish();
        self.stats.log_summary();

        CrawlReport {
            dataset: self.unifier.finalize(),
            missing: self.missing,
            stats: self.stats,
        }
    }
}
