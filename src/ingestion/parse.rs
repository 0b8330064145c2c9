//! Parse functions - read input workbooks and flat company tables

use crate::ingestion::write::{is_csv_path, SheetTable};
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{info, warn};

/// Render a spreadsheet cell as text; empty cells and errors become `None`
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Company names from column A of `sheet` (xlsx) or the first column of a CSV file.
/// The first non-empty row is a header; empty cells are skipped.
pub fn read_company_names(path: &Path, sheet: &str) -> Result<Vec<String>> {
    info!("Reading company names from {:?}", path);

    let names: Vec<String> = if is_csv_path(path) {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {:?}", path))?;

        let mut names = Vec::new();
        for result in reader.records() {
            let record = result?;
            if let Some(name) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) {
                names.push(name.to_string());
            }
        }
        names
    } else {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook {:?}", path))?;
        let range = workbook
            .worksheet_range(sheet)
            .with_context(|| format!("Sheet {} not found in {:?}", sheet, path))?;

        // The range starts at the first used cell: the header is the first used row,
        // but names must come from column A itself.
        match range.start() {
            Some((_, 0)) => range
                .rows()
                .skip(1)
                .filter_map(|row| row.first().and_then(cell_text))
                .collect(),
            _ => Vec::new(),
        }
    };

    info!("Found {} company names", names.len());
    Ok(names)
}

/// Load a flat table from CSV or from the first sheet of a workbook
pub fn load_table(path: &Path) -> Result<SheetTable> {
    info!("Loading table from {:?}", path);

    let table = if is_csv_path(path) {
        load_csv_table(path)?
    } else {
        load_workbook_table(path)?
    };

    info!(
        "Loaded {} rows with {} columns",
        table.len(),
        table.headers().len()
    );
    Ok(table)
}

fn load_csv_table(path: &Path) -> Result<SheetTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    let mut parse_errors = 0;

    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(
                record
                    .iter()
                    .map(|cell| Some(cell.to_string()).filter(|s| !s.trim().is_empty()))
                    .collect(),
            ),
            Err(e) => {
                parse_errors += 1;
                if parse_errors <= 10 {
                    // Only log first 10 errors
                    warn!("Failed to read row {}: {}", idx, e);
                }
            }
        }
    }

    Ok(SheetTable::from_rows(headers, rows))
}

fn load_workbook_table(path: &Path) -> Result<SheetTable> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook {:?}", path))?;

    let sheet_names = workbook.sheet_names();
    let Some(sheet_name) = sheet_names.first().cloned() else {
        return Err(anyhow::anyhow!("No sheets found in workbook"));
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| cell_text(cell).unwrap_or_default())
            .collect(),
        None => return Ok(SheetTable::default()),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(SheetTable::from_rows(headers, rows))
}
