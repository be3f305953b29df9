//! HTML parsers for cost tables and the location index
//!
//! Both parsers are total: malformed or missing markup yields `None` or an
//! empty list, never an error.

use crate::unify::Field;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static ENTRIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)This\s+(?:country|city)\s+had\s+(\d+)\s+entries")
        .expect("entries pattern is valid")
});

/// Fields extracted from one cost page
#[derive(Debug, Clone, PartialEq)]
pub struct CostPage {
    pub fields: Vec<Field>,

    /// Number of contributor entries the page reports, if stated
    pub entries: Option<u64>,
}

impl CostPage {
    /// Whether the page carries any usable data
    pub fn has_data(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Parses a cost page into its fields
///
/// # Returns
///
/// * `Some(CostPage)` - The page has a `table.data_wide_table`
/// * `None` - No cost table was found
///
/// # Example
///
/// ```
/// use cost_atlas::crawler::parse_cost_page;
///
/// let html = r#"<table class="data_wide_table">
///     <tr><th>Item</th></tr>
///     <tr><td>Meal</td><td>12.50&nbsp;$</td><td>8.00-20.00</td></tr>
/// </table>"#;
/// let page = parse_cost_page(html).unwrap();
/// assert_eq!(page.fields[0].price, Some(12.5));
/// assert_eq!(page.fields[0].range, Some((8.0, 20.0)));
/// ```
pub fn parse_cost_page(html: &str) -> Option<CostPage> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.data_wide_table").ok()?;
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("td").ok()?;

    let table = document.select(&table_selector).next()?;

    let mut fields = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        let Some(name) = cells.first() else {
            continue;
        };

        let price = cells.get(1).and_then(|raw| parse_number(raw));
        let range = cells.get(2).and_then(|raw| parse_range(raw));

        fields.push(Field::new(name.clone(), price, range));
    }

    let text: String = document.root_element().text().collect();
    let entries = ENTRIES_RE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());

    Some(CostPage { fields, entries })
}

/// Strips the currency suffix and thousands separators
fn clean_amount(raw: &str) -> String {
    raw.replace("\u{a0}$", "").replace(',', "").trim().to_string()
}

fn parse_number(raw: &str) -> Option<f64> {
    clean_amount(raw).parse().ok()
}

/// Parses `low-high`; both sides must be numbers
fn parse_range(raw: &str) -> Option<(f64, f64)> {
    let cleaned = clean_amount(raw);
    let mut parts = cleaned.split('-');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(low), Some(high), None) => {
            Some((low.trim().parse().ok()?, high.trim().parse().ok()?))
        }
        _ => None,
    }
}

/// Extracts location names from the site's index page
///
/// Every link whose href mentions `country_result` contributes the decoded
/// value of its `country` query parameter. Duplicates are dropped and
/// first-seen order is kept.
pub fn parse_location_index(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut locations = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !href.contains("country_result") {
            continue;
        }

        let Ok(url) = base_url.join(href.trim()) else {
            tracing::debug!("Skipping unparseable index link {}", href);
            continue;
        };

        let name = url
            .query_pairs()
            .find(|(key, _)| key == "country")
            .map(|(_, value)| value.trim().to_string());

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            if seen.insert(name.clone()) {
                locations.push(name);
            }
        }
    }

    locations
}
