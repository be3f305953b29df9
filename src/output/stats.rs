//! Crawl statistics

use chrono::{DateTime, Utc};

/// Counters collected over one run
#[derive(Debug, Clone)]
pub struct CrawlStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Locations in the resolved discovery plan
    pub locations_planned: usize,
    pub aggregates_fetched: usize,
    pub aggregates_failed: usize,
    pub sub_locations_fetched: usize,
    pub sub_locations_failed: usize,

    /// Sub-locations whose data came from the secondary target
    pub fallbacks_used: usize,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            locations_planned: 0,
            aggregates_fetched: 0,
            aggregates_failed: 0,
            sub_locations_fetched: 0,
            sub_locations_failed: 0,
            fallbacks_used: 0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Records accepted into the dataset
    pub fn records(&self) -> usize {
        self.aggregates_fetched + self.sub_locations_fetched
    }

    /// Targets that produced no data
    pub fn failures(&self) -> usize {
        self.aggregates_failed + self.sub_locations_failed
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Logs a one-line summary of the run
    pub fn log_summary(&self) {
        tracing::info!(
            "Crawl finished: {} locations, {} records ({} aggregates, {} sub-locations, {} via fallback), {} without data{}",
            self.locations_planned,
            self.records(),
            self.aggregates_fetched,
            self.sub_locations_fetched,
            self.fallbacks_used,
            self.failures(),
            self.duration_seconds()
                .map(|s| format!(", {}s", s))
                .unwrap_or_default()
        );
    }
}
