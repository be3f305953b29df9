//! Output module for persisting datasets and reporting runs
//!
//! This module handles:
//! - Naming the output file after the requested letter range
//! - Writing the unified dataset through a [`DatasetSink`]
//! - Recording crawl statistics

mod csv_output;
pub mod stats;

pub use csv_output::CsvSink;
pub use stats::CrawlStats;

use crate::catalog::LetterRange;
use crate::unify::Dataset;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for a finished dataset
pub trait DatasetSink {
    /// Writes `dataset` under the file stem `name`
    ///
    /// # Returns
    ///
    /// The path that was written
    fn write(&self, dataset: &Dataset, name: &str) -> OutputResult<PathBuf>;
}

/// File stem for a run: `batch_<START><END>`, `batch_<LETTER>` or the
/// configured default
///
/// # Examples
///
/// ```
/// use cost_atlas::output::output_stem;
///
/// let range = "a-g".parse().unwrap();
/// assert_eq!(output_stem(Some(&range), "all_countries"), "batch_AG");
/// assert_eq!(output_stem(None, "all_countries"), "all_countries");
/// ```
pub fn output_stem(range: Option<&LetterRange>, default_name: &str) -> String {
    match range {
        Some(range) => range.batch_name(),
        None => default_name.to_string(),
    }
}
