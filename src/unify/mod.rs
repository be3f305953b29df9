//! Schema unification for variable-shaped records
//!
//! Every page exposes its own subset and ordering of attributes, and an
//! attribute name may repeat within one page. [`SchemaUnifier`] assigns
//! each occurrence a globally stable column label, merges each record's
//! column order into one master list without moving columns that are
//! already placed, and finally projects every record onto that list.

mod dataset;

pub use dataset::{Cell, Dataset};

use std::collections::{HashMap, HashSet};

/// Identity column holding the location name
pub const LOCATION_COLUMN: &str = "Country";
/// Identity column holding the sub-location name
pub const SUB_LOCATION_COLUMN: &str = "City";
/// Column holding the page's entry count
pub const ENTRIES_COLUMN: &str = "Entries";

/// Sub-location value used for a location's aggregate record
pub const AGGREGATE_SUB_LOCATION: &str = "average";

const LOW_SUFFIX: &str = " Low Range";
const HIGH_SUFFIX: &str = " High Range";

/// One attribute observed on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Page-local name; may repeat within a page
    pub name: String,
    pub price: Option<f64>,
    /// `(low, high)` bounds; both present or both absent
    pub range: Option<(f64, f64)>,
}

impl Field {
    pub fn new(name: impl Into<String>, price: Option<f64>, range: Option<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            price,
            range,
        }
    }
}

/// A record accepted by the unifier, keyed by assigned column label
#[derive(Debug, Clone)]
struct StoredRecord {
    location: String,
    sub_location: String,
    values: HashMap<String, Option<f64>>,
}

/// Online column merger
///
/// Owns the master column list, the `(name, occurrence)` → label table
/// and every accepted record for one crawl. Calls to [`accumulate`]
/// must be serialized: the merge is order-sensitive.
///
/// [`accumulate`]: SchemaUnifier::accumulate
#[derive(Debug, Clone)]
pub struct SchemaUnifier {
    master: Vec<String>,
    /// Position of every label in `master`
    positions: HashMap<String, usize>,
    labels: HashMap<(String, usize), String>,
    records: Vec<StoredRecord>,
}

impl Default for SchemaUnifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaUnifier {
    pub fn new() -> Self {
        let master: Vec<String> = [LOCATION_COLUMN, SUB_LOCATION_COLUMN, ENTRIES_COLUMN]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let positions = master
            .iter()
            .enumerate()
            .map(|(i, col)| (col.clone(), i))
            .collect();

        Self {
            master,
            positions,
            labels: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// The master column list as it stands now
    pub fn columns(&self) -> &[String] {
        &self.master
    }

    /// Number of records accepted so far
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Label assigned to the `occurrence`-th (1-based) field called `name`
    pub fn label_for(&self, name: &str, occurrence: usize) -> Option<&str> {
        self.labels
            .get(&(name.to_string(), occurrence))
            .map(String::as_str)
    }

    /// Adds one page's fields to the dataset
    pub fn accumulate(
        &mut self,
        location: &str,
        sub_location: &str,
        fields: &[Field],
        entries_count: Option<f64>,
    ) {
        let mut values: HashMap<String, Option<f64>> = HashMap::new();
        values.insert(ENTRIES_COLUMN.to_string(), entries_count);

        let mut order: Vec<String> = vec![
            LOCATION_COLUMN.to_string(),
            SUB_LOCATION_COLUMN.to_string(),
            ENTRIES_COLUMN.to_string(),
        ];
        let mut seen: HashSet<String> = order.iter().cloned().collect();
        let mut occurrences: HashMap<&str, usize> = HashMap::new();

        for field in fields {
            let occurrence = occurrences.entry(field.name.as_str()).or_insert(0);
            *occurrence += 1;
            let label = self.assign_label(&field.name, *occurrence);

            let (low, high) = match field.range {
                Some((low, high)) => (Some(low), Some(high)),
                None => (None, None),
            };
            let low_label = format!("{}{}", label, LOW_SUFFIX);
            let high_label = format!("{}{}", label, HIGH_SUFFIX);

            values.insert(label.clone(), field.price);
            values.insert(low_label.clone(), low);
            values.insert(high_label.clone(), high);

            for col in [label, low_label, high_label] {
                if seen.insert(col.clone()) {
                    order.push(col);
                }
            }
        }

        self.merge_columns(&order);
        self.records.push(StoredRecord {
            location: location.to_string(),
            sub_location: sub_location.to_string(),
            values,
        });
    }

    /// Looks up or creates the label for a `(name, occurrence)` key
    fn assign_label(&mut self, name: &str, occurrence: usize) -> String {
        self.labels
            .entry((name.to_string(), occurrence))
            .or_insert_with(|| {
                if occurrence == 1 {
                    name.to_string()
                } else {
                    format!("{}_{}", name, occurrence)
                }
            })
            .clone()
    }

    /// Merges one record's column order into the master list
    ///
    /// Two cursors walk the record's columns and the master list. A
    /// column matching the master cursor advances both; a column placed
    /// elsewhere moves the master cursor just past it; an unknown column
    /// is inserted at the master cursor. Placed columns never move
    /// relative to each other.
    fn merge_columns(&mut self, incoming: &[String]) {
        let mut cursor = 0;

        for col in incoming {
            if self.master.get(cursor) == Some(col) {
                cursor += 1;
            } else if let Some(&pos) = self.positions.get(col) {
                cursor = pos + 1;
            } else {
                self.insert_column(cursor, col.clone());
                cursor += 1;
            }
        }
    }

    fn insert_column(&mut self, at: usize, col: String) {
        for shifted in &self.master[at..] {
            if let Some(pos) = self.positions.get_mut(shifted) {
                *pos += 1;
            }
        }
        self.positions.insert(col.clone(), at);
        self.master.insert(at, col);
    }

    /// Projects every accepted record onto the final master column list
    ///
    /// Missing cells and values that do not coerce to a finite number
    /// become [`Cell::Empty`].
    pub fn finalize(self) -> Dataset {
        let rows = self
            .records
            .into_iter()
            .map(|record| {
                self.master
                    .iter()
                    .map(|col| match col.as_str() {
                        LOCATION_COLUMN => Cell::Text(record.location.clone()),
                        SUB_LOCATION_COLUMN => Cell::Text(record.sub_location.clone()),
                        _ => record
                            .values
                            .get(col)
                            .copied()
                            .flatten()
                            .map_or(Cell::Empty, Cell::number),
                    })
                    .collect()
            })
            .collect();

        Dataset::new(self.master, rows)
    }
}
