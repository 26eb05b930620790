//! Tabular report rendering for downloads.
//!
//! Every report is reduced to a [`ReportTable`] first; the renderers only
//! know about headers and cells.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::ServiceError;

mod csv;
mod excel;
mod pdf;

/// One cell of a report row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Number(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Number(n) => write!(f, "{:.2}", n),
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(value.into())
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Download encodings offered by the report pages
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Excel => write!(f, "excel"),
            ExportFormat::Pdf => write!(f, "pdf"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ServiceError::NotFound(format!(
                "Unsupported export format: {}",
                other
            ))),
        }
    }
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Encodes a table in the requested format
pub fn render(table: &ReportTable, format: ExportFormat) -> Result<Vec<u8>, ServiceError> {
    match format {
        ExportFormat::Csv => csv::render(table),
        ExportFormat::Excel => excel::render(table),
        ExportFormat::Pdf => pdf::render(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    pub(super) fn sample() -> ReportTable {
        let mut table = ReportTable::new("Stationery Report", &["ID", "Item Type", "Quantity"]);
        table.push(vec![1.into(), "A4".into(), 120.into()]);
        table.push(vec![2.into(), "Card Paper, glossy".into(), 3.into()]);
        table
    }

    #[test]
    fn parses_formats() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_matches!("docx".parse::<ExportFormat>(), Err(ServiceError::NotFound(_)));
    }

    #[test]
    fn cells_display_plainly() {
        assert_eq!(Cell::from(12.5).to_string(), "12.50");
        assert_eq!(Cell::from(7).to_string(), "7");
        assert_eq!(Cell::from("Ongoing").to_string(), "Ongoing");
    }

    #[test]
    fn every_format_renders() {
        let table = sample();
        for format in [ExportFormat::Csv, ExportFormat::Excel, ExportFormat::Pdf] {
            let bytes = render(&table, format).unwrap();
            assert!(!bytes.is_empty(), "{} produced no bytes", format);
        }
        assert!(render(&table, ExportFormat::Pdf).unwrap().starts_with(b"%PDF"));
        // xlsx is a zip container
        assert!(render(&table, ExportFormat::Excel).unwrap().starts_with(b"PK"));
    }
}
