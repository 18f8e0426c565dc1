//! Spreadsheet workbook reading

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::tabular::{ParsedTable, TabularError, build_table};

/// Names of the sheets in a workbook, in workbook order
pub fn list_sheets(bytes: &[u8]) -> Result<Vec<String>, TabularError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| TabularError::Sheet(e.to_string()))?;
    Ok(workbook.sheet_names())
}

/// Parse one sheet of a workbook.
///
/// When `sheet` is `None` the first sheet is used. Every cell is read as
/// its display text.
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse_sheet(
    bytes: &[u8],
    sheet: Option<&str>,
    rows_to_skip: usize,
) -> Result<ParsedTable, TabularError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| TabularError::Sheet(e.to_string()))?;

    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| TabularError::SheetNotFound(wanted.to_string()))?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| TabularError::Sheet("workbook has no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| TabularError::Sheet(e.to_string()))?;

    // The range starts at the first used cell; restore the empty rows above
    // it so `rows_to_skip` counts from the top of the sheet.
    let leading_empty = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let raw_rows: Vec<Vec<String>> = std::iter::repeat_with(Vec::new)
        .take(leading_empty)
        .chain(range.rows().map(|row| row.iter().map(cell_text).collect()))
        .collect();

    tracing::debug!(sheet = %name, rows = raw_rows.len(), "sheet read");
    build_table(raw_rows, rows_to_skip)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "nothing here").unwrap();

        let sales = workbook.add_worksheet();
        sales.set_name("Sales").unwrap();
        sales.write_string(0, 0, "quarterly report").unwrap();
        sales.write_string(1, 0, "region").unwrap();
        sales.write_string(1, 1, "units").unwrap();
        sales.write_string(2, 0, "north").unwrap();
        sales.write_number(2, 1, 12).unwrap();
        sales.write_string(3, 0, "south").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn lists_sheets_in_order() {
        let names = list_sheets(&workbook_bytes()).unwrap();
        assert_eq!(names, vec!["Notes".to_string(), "Sales".to_string()]);
    }

    #[test]
    fn parses_named_sheet_with_skip() {
        let table = parse_sheet(&workbook_bytes(), Some("Sales"), 1).unwrap();
        assert_eq!(table.headers, vec!["region", "units"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0]["units"], Some("12".to_string()));
        assert_eq!(table.rows[1]["units"], None);
    }

    #[test]
    fn leading_empty_rows_count_toward_skip() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(1, 0, "inventory").unwrap();
        sheet.write_string(2, 0, "region").unwrap();
        sheet.write_string(3, 0, "north").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = parse_sheet(&bytes, None, 2).unwrap();
        assert_eq!(table.headers, vec!["region"]);
        assert_eq!(table.rows[0]["region"], Some("north".to_string()));
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let err = parse_sheet(&workbook_bytes(), Some("Missing"), 0).unwrap_err();
        assert!(matches!(err, TabularError::SheetNotFound(name) if name == "Missing"));
    }

    #[test]
    fn non_workbook_bytes_are_rejected() {
        assert!(matches!(
            list_sheets(b"a,b\n1,2\n"),
            Err(TabularError::Sheet(_))
        ));
    }
}
