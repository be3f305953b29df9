//! Request target construction for Cost-Atlas
//!
//! Location (country) and sub-location (city) names are escaped with
//! different rules before they are placed into a request URL. A
//! sub-location has two candidate targets; the orchestrator tries them in
//! the order returned here.

use crate::config::SourceConfig;
use url::Url;

/// Escapes a location name for the `country` query parameter
///
/// Spaces and hyphens become `+`, parentheses are percent-encoded.
///
/// # Examples
///
/// ```
/// use cost_atlas::url::format_location;
///
/// assert_eq!(format_location("Bosnia And Herzegovina"), "Bosnia+And+Herzegovina");
/// assert_eq!(format_location("Congo (Kinshasa)"), "Congo+%28Kinshasa%29");
/// ```
pub fn format_location(name: &str) -> String {
    name.replace([' ', '-'], "+")
        .replace('(', "%28")
        .replace(')', "%29")
}

/// Escapes a sub-location name for use as a path segment
///
/// Spaces become `-`, parentheses are dropped and runs of `-` collapse
/// into one.
///
/// # Examples
///
/// ```
/// use cost_atlas::url::format_sub_location;
///
/// assert_eq!(format_sub_location("New York"), "New-York");
/// assert_eq!(format_sub_location("Washington (DC)"), "Washington-DC");
/// ```
pub fn format_sub_location(name: &str) -> String {
    let dashed = name.replace(' ', "-").replace(['(', ')'], "");

    let mut out = String::with_capacity(dashed.len());
    for c in dashed.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Builds request targets relative to the configured site root
#[derive(Debug, Clone)]
pub struct TargetResolver {
    base: Url,
    currency: String,
}

impl TargetResolver {
    /// Creates a resolver for the given site root
    ///
    /// A missing trailing slash is added so relative joins stay below the
    /// root instead of replacing its last segment.
    pub fn new(base_url: &str, currency: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            currency: currency.to_string(),
        })
    }

    /// Creates a resolver from the `[source]` configuration section
    pub fn from_config(config: &SourceConfig) -> Result<Self, url::ParseError> {
        Self::new(&config.base_url, &config.currency)
    }

    /// The page listing every available location
    pub fn index(&self) -> &Url {
        &self.base
    }

    /// The aggregate page for a location
    pub fn location_target(&self, location: &str) -> Result<Url, url::ParseError> {
        self.base.join(&format!(
            "country_result.jsp?country={}&displayCurrency={}",
            format_location(location),
            self.currency
        ))
    }

    /// Candidate pages for a sub-location, most specific first
    ///
    /// The primary candidate names both the sub-location and its location;
    /// the secondary one names the sub-location alone.
    pub fn sub_location_targets(
        &self,
        sub_location: &str,
        location: &str,
    ) -> Result<Vec<Url>, url::ParseError> {
        let sub = format_sub_location(sub_location);

        let primary = self.base.join(&format!(
            "in/{}-{}?displayCurrency={}",
            sub,
            format_location(location),
            self.currency
        ))?;
        let secondary = self
            .base
            .join(&format!("in/{}?displayCurrency={}", sub, self.currency))?;

        Ok(vec![primary, secondary])
    }
}
