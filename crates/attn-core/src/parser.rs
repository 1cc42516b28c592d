//! Decoding of one source export into a [`Table`]

use crate::error::{Error, Result};
use crate::table::{CellValue, Row, Table};
use crate::workbook::{is_spreadsheet, parse_workbook};
use std::fs;
use std::path::{Path, PathBuf};

const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Parse a CSV (or `;`/tab separated) file into a Table
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_content(&content, path.to_path_buf())
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<Table> {
    parse_content(content, PathBuf::from(source_name))
}

fn parse_content(content: &str, path: PathBuf) -> Result<Table> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let delimiter = sniff_delimiter(content);
    tracing::trace!(path = %path.display(), delimiter = ?(delimiter as char), "sniffed delimiter");

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let records = csv_reader
        .records()
        .map(|result| {
            result
                .map(|record| record.iter().map(CellValue::parse).collect())
                .map_err(|e| Error::Csv {
                    path: path.clone(),
                    source: e,
                })
        })
        .collect::<Result<Vec<Vec<CellValue>>>>()?;

    Ok(assemble_table(path, headers, records))
}

/// Parse any supported export, picking the decoder by file extension
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    if is_spreadsheet(path) {
        parse_workbook(path)
    } else {
        parse_csv(path)
    }
}

/// Shape decoded records into a table: blank rows are skipped, short rows
/// padded and long rows truncated to the header width.
pub(crate) fn assemble_table(
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<Vec<CellValue>>,
) -> Table {
    // A header row of only blanks counts as no header row
    if headers.iter().all(|h| h.is_empty()) {
        tracing::warn!(path = %path.display(), "source has no header row");
        return Table {
            source_path: Some(path),
            ..Table::default()
        };
    }

    let mut rows = Vec::with_capacity(records.len());
    for (row_idx, mut cells) in records.into_iter().enumerate() {
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }

        if cells.len() > headers.len() {
            tracing::warn!(
                path = %path.display(),
                row = row_idx + 1,
                "row has more cells than columns, truncating"
            );
            cells.truncate(headers.len());
        }
        cells.resize(headers.len(), CellValue::Empty);

        rows.push(Row::new(cells));
    }

    tracing::debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "parsed source"
    );

    Table {
        headers,
        rows,
        source_path: Some(path),
    }
}

/// Pick the candidate delimiter that occurs most often in the header line
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or_default();
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|d| first_line.bytes().filter(|b| b == d).count())
        .filter(|d| first_line.as_bytes().contains(d))
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "TC Kimlik No,Tarih,İşlem,Saat\n123,05.01.2024,Giriş,08:00\n";
        let table = parse_csv_str(csv, "test.csv").unwrap();

        assert_eq!(table.headers, vec!["TC Kimlik No", "Tarih", "İşlem", "Saat"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[0], CellValue::Integer(123));
        assert_eq!(
            table.rows[0].cells[1],
            CellValue::String("05.01.2024".to_string())
        );
    }

    #[test]
    fn test_parse_semicolon_and_bom() {
        let csv = "\u{feff}ID;Date;Action\n1;2024-01-05;entry\n";
        let table = parse_csv_str(csv, "test.csv").unwrap();

        assert_eq!(table.headers, vec!["ID", "Date", "Action"]);
        assert_eq!(table.rows[0].cells[2], CellValue::String("entry".to_string()));
    }

    #[test]
    fn test_parse_tab_delimited() {
        let csv = "ID\tDate\n1\t45678\n";
        let table = parse_csv_str(csv, "test.tsv").unwrap();
        assert_eq!(table.rows[0].cells[1], CellValue::Integer(45678));
    }

    #[test]
    fn test_short_rows_padded_long_rows_truncated() {
        let csv = "A,B,C\n1\n1,2,3,4\n";
        let table = parse_csv_str(csv, "test.csv").unwrap();

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[2], CellValue::Empty);
        assert_eq!(table.rows[1].cells.len(), 3);
        assert_eq!(table.rows[1].cells[2], CellValue::Integer(3));
    }

    #[test]
    fn test_blank_rows_skipped() {
        let csv = "A,B\n,\n1,2\n";
        let table = parse_csv_str(csv, "test.csv").unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_empty_source() {
        let table = parse_csv_str("", "empty.csv").unwrap();
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(table.source_path, Some(PathBuf::from("empty.csv")));
    }

    #[test]
    fn test_parse_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ID,Action").unwrap();
        writeln!(file, "7,Silme").unwrap();

        let table = parse_csv(file.path()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.source_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_parse_file_picks_decoder_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("export.txt");
        std::fs::write(&text, "ID;Action\n1;Giriş\n").unwrap();
        assert_eq!(parse_file(&text).unwrap().row_count(), 1);

        // Not a real workbook, so the spreadsheet decoder must reject it
        let fake = dir.path().join("export.xlsx");
        std::fs::write(&fake, "ID,Action\n1,Giriş\n").unwrap();
        assert!(matches!(parse_file(&fake), Err(Error::Spreadsheet { .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            parse_csv("/nonexistent/attn.csv"),
            Err(Error::FileRead { .. })
        ));
    }
}
