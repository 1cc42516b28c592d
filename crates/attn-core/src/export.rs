//! Writing result tables for display
//!
//! Date-time cells are shown as `dd.MM.yyyy HH:mm:ss`, or `dd.MM.yyyy` when
//! they fall exactly on midnight. Booleans are written as `true`/`false`.
//! Cells of the resolved date and time columns are normalised the same way
//! whatever encoding the source used, so a serial `45678` in the date column
//! is written as `20.01.2025`.

use crate::columns::ColumnResolver;
use crate::config::{ColumnRole, Config};
use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use crate::temporal::{self, TemporalParser};
use chrono::NaiveTime;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Header of the optional leading row-number column
pub const ROW_NUMBER_HEADER: &str = "No";

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// How a table is written
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Prepend a 1-based "No" column
    pub row_numbers: bool,
}

/// Display text of a cell
pub fn display_value(cell: &CellValue) -> String {
    match cell {
        CellValue::DateTime(dt) if dt.time() == NaiveTime::MIN => temporal::format_dmy(dt),
        other => other.to_string_value(),
    }
}

/// Column-aware display formatting for one table
#[derive(Debug, Clone, Default)]
pub struct CellFormatter {
    parser: TemporalParser,
    date_column: Option<usize>,
    time_column: Option<usize>,
}

impl CellFormatter {
    /// Resolve the date and time columns of `headers` with the configured synonyms
    pub fn new(headers: &[String], config: &Config) -> Self {
        let resolver = ColumnResolver::new(&config.columns, config.locale);
        Self {
            parser: TemporalParser::default(),
            date_column: resolver.find(headers, ColumnRole::Date),
            time_column: resolver.find(headers, ColumnRole::Time),
        }
    }

    /// Display text of the cell at column `col`
    pub fn format(&self, col: usize, cell: &CellValue) -> String {
        self.format_temporal(col, cell)
            .unwrap_or_else(|| display_value(cell))
    }

    /// Normalised text for a readable cell of the date or time column.
    /// Unreadable cells keep their own display.
    fn format_temporal(&self, col: usize, cell: &CellValue) -> Option<String> {
        if cell.is_blank() {
            return None;
        }
        if self.date_column == Some(col) {
            let dt = self.parser.parse(cell)?;
            Some(display_value(&CellValue::DateTime(dt)))
        } else if self.time_column == Some(col) {
            let time = self.parser.parse_time_of_day(cell)?;
            Some(time.format("%H:%M:%S").to_string())
        } else {
            None
        }
    }
}

/// Write `table` to a file, creating or truncating it
pub fn export_to_file<P: AsRef<Path>>(
    table: &Table,
    path: P,
    options: ExportOptions,
    config: &Config,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_table(table, &mut writer, options, config)?;
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = table.row_count(), "table exported");
    Ok(())
}

pub fn write_table<W: Write>(
    table: &Table,
    writer: W,
    options: ExportOptions,
    config: &Config,
) -> Result<()> {
    let formatter = CellFormatter::new(&table.headers, config);
    match options.format {
        ExportFormat::Csv => write_csv(table, writer, options.row_numbers, &formatter),
        ExportFormat::Json => write_json(table, writer, options.row_numbers, &formatter),
    }
}

pub fn write_csv<W: Write>(
    table: &Table,
    writer: W,
    row_numbers: bool,
    formatter: &CellFormatter,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = Vec::with_capacity(table.column_count() + 1);
    if row_numbers {
        header.push(ROW_NUMBER_HEADER);
    }
    header.extend(table.headers.iter().map(String::as_str));
    csv_writer.write_record(&header)?;

    for (idx, row) in table.rows.iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        if row_numbers {
            record.push((idx + 1).to_string());
        }
        record.extend(
            row.cells
                .iter()
                .enumerate()
                .map(|(col, cell)| formatter.format(col, cell)),
        );
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonTable<'a> {
    headers: Vec<&'a str>,
    rows: Vec<Vec<serde_json::Value>>,
}

/// Write `{ "headers": [...], "rows": [[...], ...] }`. Numbers and booleans
/// keep their JSON type, except readable date/time column cells which are
/// written as text; empty cells become `null`.
pub fn write_json<W: Write>(
    table: &Table,
    mut writer: W,
    row_numbers: bool,
    formatter: &CellFormatter,
) -> Result<()> {
    let mut headers: Vec<&str> = Vec::with_capacity(table.column_count() + 1);
    if row_numbers {
        headers.push(ROW_NUMBER_HEADER);
    }
    headers.extend(table.headers.iter().map(String::as_str));

    let rows: Vec<Vec<serde_json::Value>> = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let numbered = row_numbers.then(|| serde_json::Value::from(idx + 1));
            numbered
                .into_iter()
                .chain(row.cells.iter().enumerate().map(|(col, cell)| {
                    formatter
                        .format_temporal(col, cell)
                        .map(serde_json::Value::String)
                        .unwrap_or_else(|| json_value(cell))
                }))
                .collect()
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &JsonTable { headers, rows })?;
    writeln!(writer)?;
    Ok(())
}

fn json_value(cell: &CellValue) -> serde_json::Value {
    use serde_json::Value;

    match cell {
        CellValue::Integer(i) => Value::from(*i),
        CellValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Empty => Value::Null,
        CellValue::DateTime(_) | CellValue::String(_) => Value::String(display_value(cell)),
    }
}
