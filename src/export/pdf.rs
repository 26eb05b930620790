use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use super::ReportTable;
use crate::errors::ServiceError;

// A4 landscape
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const LINE_HEIGHT: f32 = 6.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 9.0;
/// Rough Helvetica advance at the body size
const CHAR_WIDTH: f32 = 1.75;

struct Cursor {
    layer: PdfLayerReference,
    y: f32,
}

pub(super) fn render(table: &ReportTable) -> Result<Vec<u8>, ServiceError> {
    let (doc, page, layer) =
        PdfDocument::new(table.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(export_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(export_error)?;

    let columns = table.headers.len().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
    let max_chars = ((column_width / CHAR_WIDTH) as usize).max(4);

    let mut cursor = Cursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN - 4.0,
    };
    cursor.layer.use_text(
        table.title.as_str(),
        TITLE_SIZE,
        Mm(MARGIN),
        Mm(cursor.y),
        &bold,
    );
    cursor.y -= LINE_HEIGHT * 2.0;
    write_row(&cursor, &table.headers, column_width, max_chars, &bold);
    cursor.y -= LINE_HEIGHT;

    for row in &table.rows {
        if cursor.y < MARGIN {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
            cursor = Cursor {
                layer: doc.get_page(page).get_layer(layer),
                y: PAGE_HEIGHT - MARGIN - 4.0,
            };
            write_row(&cursor, &table.headers, column_width, max_chars, &bold);
            cursor.y -= LINE_HEIGHT;
        }
        let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        write_row(&cursor, &cells, column_width, max_chars, &regular);
        cursor.y -= LINE_HEIGHT;
    }

    doc.save_to_bytes().map_err(export_error)
}

fn write_row(
    cursor: &Cursor,
    cells: &[String],
    column_width: f32,
    max_chars: usize,
    font: &IndirectFontRef,
) {
    for (col, text) in cells.iter().enumerate() {
        let x = MARGIN + column_width * col as f32;
        cursor
            .layer
            .use_text(clip(text, max_chars), BODY_SIZE, Mm(x), Mm(cursor.y), font);
    }
}

/// Shortens text to fit a column, marking the cut
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn export_error(err: printpdf::Error) -> ServiceError {
    ServiceError::ExportError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("Printer", 10), "Printer");
        assert_eq!(clip("Mamal Girls Lab", 8), "Mamal...");
    }

    #[test]
    fn long_tables_span_pages() {
        let mut table = ReportTable::new("Assets", &["ID", "Name"]);
        for id in 0..200 {
            table.push(vec![id.into(), format!("Asset {}", id).into()]);
        }
        let bytes = render(&table).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
