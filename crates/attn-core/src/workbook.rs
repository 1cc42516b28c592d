//! First-worksheet decoding of spreadsheet exports
//!
//! Only the first sheet is read and its first row is taken as the header
//! row. Cells formatted as dates arrive as [`CellValue::DateTime`]; whole
//! numbers become integers so identifiers and serials stay exact.

use crate::error::{Error, Result};
use crate::parser::assemble_table;
use crate::table::{CellValue, Table};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// File extensions decoded as spreadsheets
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether `path` names a spreadsheet by extension
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Decode the first worksheet of a workbook into a Table
pub fn parse_workbook<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let spreadsheet_error = |source| Error::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        tracing::warn!(path = %path.display(), "workbook has no worksheets");
        return Ok(Table {
            source_path: Some(path.to_path_buf()),
            ..Table::default()
        });
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(spreadsheet_error)?;
    tracing::debug!(path = %path.display(), sheet = %sheet_name, "reading first worksheet");

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    let records: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(assemble_table(path.to_path_buf(), headers, records))
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => CellValue::Integer(*f as i64),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::parse(s),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        Data::Error(e) => CellValue::String(format!("#{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use std::path::PathBuf;

    fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("giris.xlsx");
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("dd.mm.yyyy hh:mm");
        let sheet = workbook.add_worksheet();

        for (col, header) in ["TC", "Tarih", "İşlem", "Süre"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        let when = ExcelDateTime::from_ymd(2024, 1, 5)
            .unwrap()
            .and_hms(8, 15, 0)
            .unwrap();
        sheet.write_number(1, 0, 12345.0).unwrap();
        sheet.write_datetime_with_format(1, 1, &when, &date_format).unwrap();
        sheet.write_string(1, 2, "Giriş").unwrap();
        sheet.write_number(1, 3, 1.5).unwrap();

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_is_spreadsheet() {
        assert!(is_spreadsheet(Path::new("ocak.xlsx")));
        assert!(is_spreadsheet(Path::new("OCAK.XLS")));
        assert!(!is_spreadsheet(Path::new("ocak.csv")));
        assert!(!is_spreadsheet(Path::new("ocak")));
    }

    #[test]
    fn test_parse_workbook_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let table = parse_workbook(&path).unwrap();

        assert_eq!(table.headers, vec!["TC", "Tarih", "İşlem", "Süre"]);
        assert_eq!(table.row_count(), 1);
        let row = &table.rows[0];
        assert_eq!(row.cells[0], CellValue::Integer(12345));
        assert_eq!(
            row.cells[1],
            CellValue::DateTime(
                NaiveDate::from_ymd_opt(2024, 1, 5)
                    .unwrap()
                    .and_hms_opt(8, 15, 0)
                    .unwrap()
            )
        );
        assert_eq!(row.cells[2], CellValue::String("Giriş".to_string()));
        assert_eq!(row.cells[3], CellValue::Float(1.5));
    }

    #[test]
    fn test_cell_value_mapping() {
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_value(&Data::Float(45678.0)), CellValue::Integer(45678));
        assert_eq!(cell_value(&Data::Int(7)), CellValue::Integer(7));
        assert_eq!(
            cell_value(&Data::String(" 007 ".to_string())),
            CellValue::String("007".to_string())
        );
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_parse_workbook_missing_file() {
        assert!(matches!(
            parse_workbook("/nonexistent/attn.xlsx"),
            Err(Error::Spreadsheet { .. })
        ));
    }
}
