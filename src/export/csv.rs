use super::ReportTable;
use crate::errors::ServiceError;

pub(super) fn render(table: &ReportTable) -> Result<Vec<u8>, ServiceError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers).map_err(export_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .map_err(export_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| ServiceError::ExportError(e.to_string()))
}

fn export_error(err: ::csv::Error) -> ServiceError {
    ServiceError::ExportError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_fields_with_commas() {
        let bytes = render(&crate::export::tests::sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID,Item Type,Quantity");
        assert_eq!(lines[1], "1,A4,120");
        assert_eq!(lines[2], "2,\"Card Paper, glossy\",3");
    }
}
