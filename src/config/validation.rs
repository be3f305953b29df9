use crate::config::types::{Config, FetchConfig, OutputConfig, SourceConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    validate_seconds("backoff-secs", config.backoff_secs)?;
    validate_seconds("pacing-secs", config.pacing_secs)?;
    validate_seconds("pacing-jitter-secs", config.pacing_jitter_secs)?;

    let [min, max] = config.rate_limit_jitter_secs;
    validate_seconds("rate-limit-jitter-secs", min)?;
    validate_seconds("rate-limit-jitter-secs", max)?;
    if min > max {
        return Err(ConfigError::Validation(format!(
            "rate-limit-jitter-secs must be [min, max] with min <= max, got [{}, {}]",
            min, max
        )));
    }

    Ok(())
}

fn validate_seconds(key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number of seconds, got {}",
            key, value
        )));
    }
    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.currency.trim().is_empty() {
        return Err(ConfigError::Validation(
            "currency cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    if config.default_name.is_empty() {
        return Err(ConfigError::Validation(
            "default-name cannot be empty".to_string(),
        ));
    }

    if config.default_name.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "default-name must be a bare file stem, got '{}'",
            config.default_name
        )));
    }

    Ok(())
}
