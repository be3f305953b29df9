//! Configuration module for Cost-Atlas
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A missing file is not an error: every key has a default.
//!
//! # Example
//!
//! ```no_run
//! use cost_atlas::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("atlas.toml")).unwrap();
//! println!("Pages are fetched from: {}", config.source.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, OutputConfig, SourceConfig};

// Re-export parser functions
pub use parser::{load_config, load_or_default, parse_config};
