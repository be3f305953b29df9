//! CSV dataset writer

use crate::output::{DatasetSink, OutputError, OutputResult};
use crate::unify::Dataset;
use std::path::{Path, PathBuf};

/// Writes datasets as `<dir>/<name>.csv`
///
/// The header row is the master column list; empty cells are written as
/// empty fields.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DatasetSink for CsvSink {
    fn write(&self, dataset: &Dataset, name: &str) -> OutputResult<PathBuf> {
        if dataset.columns().is_empty() {
            return Err(OutputError::Write("dataset has no columns".to_string()));
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.csv", name));

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(dataset.columns())?;
        for row in dataset.rows() {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;

        tracing::info!("Data saved to {}", path.display());
        Ok(path)
    }
}
