//! Location catalog: turns what the user asked for into a discovery plan
//!
//! The catalog knows every top-level location advertised by the site's
//! index page. From that list and the user's request it resolves which
//! locations to visit and which sub-locations belong to each of them.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while interpreting a discovery request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Invalid letter range '{0}': expected a letter (e.g. 'M') or two letters joined by '-' (e.g. 'A-G')")]
    InvalidRange(String),

    #[error("Letter range '{0}' is reversed: start must not come after end")]
    ReversedRange(String),
}

/// Inclusive alphabetic bound on a location's first character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterRange {
    start: char,
    end: char,
}

impl LetterRange {
    /// Creates a range; both bounds are upper-cased
    pub fn new(start: char, end: char) -> Result<Self, CatalogError> {
        let range = Self {
            start: start.to_ascii_uppercase(),
            end: end.to_ascii_uppercase(),
        };

        if !range.start.is_ascii_alphabetic() || !range.end.is_ascii_alphabetic() {
            return Err(CatalogError::InvalidRange(format!("{}-{}", start, end)));
        }
        if range.start > range.end {
            return Err(CatalogError::ReversedRange(format!("{}-{}", start, end)));
        }

        Ok(range)
    }

    /// A range covering a single letter
    pub fn single(letter: char) -> Result<Self, CatalogError> {
        Self::new(letter, letter)
    }

    pub fn start(&self) -> char {
        self.start
    }

    pub fn end(&self) -> char {
        self.end
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Whether a name's first character (case-insensitive) falls in range
    pub fn contains(&self, name: &str) -> bool {
        name.chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .is_some_and(|c| self.start <= c && c <= self.end)
    }

    /// Output file stem for this range: `batch_AG` or `batch_M`
    pub fn batch_name(&self) -> String {
        if self.is_single() {
            format!("batch_{}", self.start)
        } else {
            format!("batch_{}{}", self.start, self.end)
        }
    }
}

impl FromStr for LetterRange {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidRange(s.to_string());

        let single_char = |part: &str| {
            let mut chars = part.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(invalid()),
            }
        };

        match s.split_once('-') {
            Some((start, end)) => Self::new(single_char(start)?, single_char(end)?)
                .map_err(|e| match e {
                    CatalogError::InvalidRange(_) => invalid(),
                    CatalogError::ReversedRange(_) => CatalogError::ReversedRange(s.to_string()),
                }),
            None => Self::single(single_char(s)?).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for LetterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// What the user asked to be crawled
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    /// Visit every location the index advertises
    pub all: bool,

    /// Location and sub-location tokens, hyphens standing in for spaces
    pub include: Vec<String>,

    /// Optional first-letter filter
    pub range: Option<LetterRange>,
}

/// Resolved work list: locations in ascending order, each with its
/// sub-locations in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryPlan {
    pub locations: BTreeMap<String, BTreeSet<String>>,

    /// Number of locations before the letter range was applied
    pub before_filter: usize,
}

impl DiscoveryPlan {
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// The set of known top-level locations
#[derive(Debug, Clone, Default)]
pub struct LocationCatalog {
    locations: Vec<String>,
    known: HashSet<String>,
}

impl LocationCatalog {
    /// Builds a catalog, keeping the first occurrence of each name
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for name in locations {
            let name = name.into();
            if catalog.known.insert(name.clone()) {
                catalog.locations.push(name);
            }
        }
        catalog
    }

    /// Every known location, in index order
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn contains(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Groups include tokens under the location they follow
    ///
    /// A token naming a known location starts a new group; later tokens
    /// are its sub-locations until the next known location. Tokens before
    /// the first known location are dropped. Hyphens in tokens stand for
    /// spaces. Repeating a location adds to its existing group.
    pub fn partition(&self, tokens: &[String]) -> BTreeMap<String, BTreeSet<String>> {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for token in tokens {
            let name = token.replace('-', " ");
            if self.contains(&name) {
                groups.entry(name.clone()).or_default();
                current = Some(name);
            } else if let Some(location) = &current {
                groups.entry(location.clone()).or_default().insert(name);
            } else {
                tracing::debug!("Dropping include token '{}' with no preceding location", token);
            }
        }

        groups
    }

    /// Resolves a request into the locations and sub-locations to visit
    ///
    /// "All" and explicit includes are unioned, so explicitly requested
    /// sub-locations stay attached to their location either way. The
    /// letter range is applied after the union.
    pub fn resolve(&self, request: &DiscoveryRequest) -> DiscoveryPlan {
        let mut locations = self.partition(&request.include);

        if request.all {
            for name in &self.locations {
                locations.entry(name.clone()).or_default();
            }
        }

        let before_filter = locations.len();

        if let Some(range) = &request.range {
            locations.retain(|name, _| range.contains(name));
            tracing::info!(
                "Range {}: {}/{} locations",
                range,
                locations.len(),
                before_filter
            );
        }

        DiscoveryPlan {
            locations,
            before_filter,
        }
    }
}
