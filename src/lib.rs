//! Cost-Atlas: a polite cost-of-living harvester
//!
//! This crate crawls per-country and per-city cost tables, merges their
//! differently-shaped rows into one rectangular dataset with a stable
//! column order, and writes the result to disk.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod unify;
pub mod url;

use thiserror::Error;

/// Main error type for Cost-Atlas operations
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Cost-Atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{DiscoveryRequest, LetterRange, LocationCatalog};
pub use config::Config;
pub use crawler::{scrape, Coordinator, Fetcher, ScrapeOutcome};
pub use unify::{Cell, Dataset, SchemaUnifier};
