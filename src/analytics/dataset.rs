//! Typed view of the flat company table with best-effort coercion

use crate::ingestion::parse::load_table;
use crate::ingestion::write::SheetTable;
use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// One company row. Numeric columns that fail to parse are treated as missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Company {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub company_type: Option<String>,
    pub follower_count: Option<f64>,
    pub company_size_on_linkedin: Option<f64>,
    pub founded_year: Option<f64>,
    pub locations: Option<String>,
    pub specialities: Option<String>,
    pub company_size: Option<Value>,
    pub extra_number_of_funding_rounds: Option<Value>,
    pub extra_total_funding_amount: Option<Value>,
    pub image_path: Option<String>,
}

/// Parse a numeric cell; anything non-numeric or non-finite is missing
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numbers stay numbers, JSON text is parsed, everything else stays text
pub fn cell_value(text: &str) -> Value {
    let trimmed = text.trim();
    if let Some(n) = parse_number(trimmed).and_then(number_value) {
        return n;
    }
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    Value::String(text.to_string())
}

/// JSON number, integral values without a fractional part
pub fn number_value(v: f64) -> Option<Value> {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(Value::from(v as i64))
    } else {
        serde_json::Number::from_f64(v).map(Value::Number)
    }
}

impl Company {
    fn from_row(table: &SheetTable, row: usize) -> Self {
        let text = |column: &str| table.get(row, column).map(str::to_string);
        let number = |column: &str| table.get(row, column).and_then(parse_number);
        let value = |column: &str| table.get(row, column).map(cell_value);

        Company {
            name: text("name"),
            industry: text("industry"),
            description: text("description"),
            website: text("website"),
            company_type: text("company_type"),
            follower_count: number("follower_count"),
            company_size_on_linkedin: number("company_size_on_linkedin"),
            founded_year: number("founded_year"),
            locations: text("locations"),
            specialities: text("specialities"),
            company_size: value("company_size"),
            extra_number_of_funding_rounds: value("extra_number_of_funding_rounds"),
            extra_total_funding_amount: value("extra_total_funding_amount"),
            image_path: text("Image Path").or_else(|| text("Image_Path")),
        }
    }
}

/// All companies, loaded once and shared read-only
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub companies: Vec<Company>,
}

impl Dataset {
    pub fn new(companies: Vec<Company>) -> Self {
        Self { companies }
    }

    pub fn from_table(table: &SheetTable) -> Self {
        let companies = (0..table.len())
            .map(|row| Company::from_row(table, row))
            .collect();
        Self { companies }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let table = load_table(path)?;
        let dataset = Self::from_table(&table);
        info!("Dataset ready with {} companies", dataset.companies.len());
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
