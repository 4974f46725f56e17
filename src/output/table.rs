//! Helpers for writing result tables to CSV files.
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Write one CSV record per row, with a header taken from the row type's field names
pub fn write_rows<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// A wide table with one row per index key and one column per category.
///
/// Values added more than once for the same cell are summed. Cells with no value are left blank.
#[derive(Debug, Default)]
pub struct PivotTable {
    index_names: Vec<&'static str>,
    columns: IndexSet<String>,
    rows: IndexMap<Vec<String>, HashMap<String, f64>>,
}

impl PivotTable {
    /// Create an empty table with the given index column names
    pub fn new(index_names: &[&'static str]) -> Self {
        Self {
            index_names: index_names.to_vec(),
            ..Default::default()
        }
    }

    /// Add a value to a cell
    pub fn add(&mut self, index: Vec<String>, column: &str, value: f64) {
        self.columns.insert(column.to_string());
        *self
            .rows
            .entry(index)
            .or_default()
            .entry(column.to_string())
            .or_default() += value;
    }

    /// The value of a cell, if any
    pub fn get(&self, index: &[String], column: &str) -> Option<f64> {
        self.rows.get(index)?.get(column).copied()
    }

    /// Write the table to a CSV file
    pub fn write(&self, file_path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;
        let header = self
            .index_names
            .iter()
            .copied()
            .chain(self.columns.iter().map(String::as_str));
        writer.write_record(header)?;

        for (index, values) in &self.rows {
            let cells = self.columns.iter().map(|column| {
                values
                    .get(column)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            });
            writer.write_record(index.iter().cloned().chain(cells))?;
        }
        writer.flush()?;

        Ok(())
    }
}
