use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Cost-Atlas
///
/// Every section is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Network behavior: timeouts, retries, backoff and politeness pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Attempts made for a single target before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base backoff in seconds
    #[serde(rename = "backoff-secs")]
    pub backoff_secs: f64,

    /// Inclusive `[min, max]` jitter added to rate-limit backoff, in seconds
    #[serde(rename = "rate-limit-jitter-secs")]
    pub rate_limit_jitter_secs: [f64; 2],

    /// Fixed part of the delay observed after every attempt
    #[serde(rename = "pacing-secs")]
    pub pacing_secs: f64,

    /// Upper bound of the uniform jitter added to the pacing delay
    #[serde(rename = "pacing-jitter-secs")]
    pub pacing_jitter_secs: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("cost-atlas/{}", env!("CARGO_PKG_VERSION")),
            max_attempts: 3,
            backoff_secs: 5.0,
            rate_limit_jitter_secs: [1.0, 3.0],
            pacing_secs: 3.0,
            pacing_jitter_secs: 2.0,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where the pages live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Site root; doubles as the location index page
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Value of the `displayCurrency` query parameter
    pub currency: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.numbeo.com/cost-of-living/".to_string(),
            currency: "USD".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the dataset file is written into
    #[serde(rename = "data-dir")]
    pub data_dir: String,

    /// File stem used when no letter range is given
    #[serde(rename = "default-name")]
    pub default_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            default_name: "all_countries".to_string(),
        }
    }
}
