use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{Cell, ReportTable};
use crate::errors::ServiceError;

/// Excel caps sheet names at 31 characters
const MAX_SHEET_NAME: usize = 31;

pub(super) fn render(table: &ReportTable) -> Result<Vec<u8>, ServiceError> {
    build(table).map_err(|e| ServiceError::ExportError(e.to_string()))
}

fn build(table: &ReportTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(&table.title))?;

    for (col, title) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, title.as_str(), &header)?;
    }
    for (index, row) in table.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => sheet.write_string(row_num, col, text.as_str())?,
                Cell::Int(n) => sheet.write_number(row_num, col, *n as f64)?,
                Cell::Number(n) => sheet.write_number(row_num, col, *n)?,
            };
        }
    }
    sheet.autofit();

    workbook.save_to_buffer()
}

fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("Checkouts: last 7 days"), "Checkouts last 7 days");
        assert_eq!(sheet_name("[]"), "Report");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }
}
