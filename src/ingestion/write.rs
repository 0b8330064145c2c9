//! Write functions - persist the flat company table with growing columns

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Columns every enrichment output table starts with
pub const OUTPUT_HEADERS: [&str; 4] = ["Company Name", "LinkedIn URL", "Status", "Error Details"];

/// A flat table of optional text cells whose columns grow as new keys appear
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl SheetTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Empty table with the enrichment output headers
    pub fn for_enrichment() -> Self {
        Self::new(OUTPUT_HEADERS.iter().map(|h| h.to_string()).collect())
    }

    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Index of `column`, appending it to the headers the first time it is seen
    pub fn ensure_column(&mut self, column: &str) -> usize {
        match self.column_index(column) {
            Some(idx) => idx,
            None => {
                debug!("Adding column {}", column);
                self.headers.push(column.to_string());
                self.headers.len() - 1
            }
        }
    }

    /// Append an empty row and return its index
    pub fn push_row(&mut self) -> usize {
        self.rows.push(Vec::new());
        self.rows.len() - 1
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Set a cell, growing the headers and padding the row as needed
    pub fn set(&mut self, row: usize, column: &str, value: Option<String>) {
        let idx = self.ensure_column(column);
        while self.rows.len() <= row {
            self.rows.push(Vec::new());
        }
        let cells = &mut self.rows[row];
        if cells.len() <= idx {
            cells.resize(idx + 1, None);
        }
        cells[idx] = value;
    }

    /// Write the whole table as CSV to a `.csv` path.
    /// Goes through a temp file + rename so an interrupted run keeps the previous snapshot.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        if !is_csv_path(path) {
            return Err(anyhow::anyhow!(
                "Refusing to write CSV to {:?}: output tables must use the .csv extension",
                path
            ));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(false)
                .from_path(&tmp_path)
                .with_context(|| format!("Failed to create {:?}", tmp_path))?;

            writer.write_record(&self.headers)?;
            for row in &self.rows {
                let record = (0..self.headers.len())
                    .map(|idx| row.get(idx).cloned().flatten().unwrap_or_default());
                writer.write_record(record)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move {:?} to {:?}", tmp_path, path))?;

        debug!("Saved {} rows to {:?}", self.rows.len(), path);
        Ok(())
    }
}

/// True for paths ending in `.csv`, any case
pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_grows_columns() {
        let mut table = SheetTable::for_enrichment();
        let row = table.push_row();
        table.set(row, "Company Name", Some("Canva".to_string()));
        table.set(row, "follower_count", Some("1000".to_string()));

        assert_eq!(table.headers().len(), 5);
        assert_eq!(table.headers()[4], "follower_count");
        assert_eq!(table.get(row, "follower_count"), Some("1000"));
        assert_eq!(table.get(row, "LinkedIn URL"), None);
    }

    #[test]
    fn test_existing_column_reused() {
        let mut table = SheetTable::for_enrichment();
        table.set(0, "industry", Some("Software".to_string()));
        table.set(1, "industry", Some("Retail".to_string()));

        assert_eq!(table.headers().len(), 5);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "industry"), Some("Retail"));
    }

    #[test]
    fn test_save_csv_pads_short_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("companies.csv");

        let mut table = SheetTable::for_enrichment();
        table.set(0, "Company Name", Some("Canva".to_string()));
        table.set(1, "Company Name", Some("Atlassian".to_string()));
        table.set(1, "industry", Some("Software, Cloud".to_string()));
        table.save_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Company Name,LinkedIn URL,Status,Error Details,industry");
        assert_eq!(lines[1], "Canva,,,,");
        assert_eq!(lines[2], "Atlassian,,,,\"Software, Cloud\"");
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_save_csv_rejects_other_extensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("company_information_full.xlsx");

        let mut table = SheetTable::for_enrichment();
        table.set(0, "Company Name", Some("Canva".to_string()));

        let err = table.save_csv(&path).unwrap_err();
        assert!(err.to_string().contains(".csv extension"));
        assert!(!path.exists());
        assert!(!path.with_extension("csv.tmp").exists());

        assert!(table.save_csv(&dir.path().join("COMPANIES.CSV")).is_ok());
    }
}
