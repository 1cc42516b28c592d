//! Core table types for representing attendance exports

use crate::error::{Error, Result};
use crate::temporal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A header row plus positionally aligned data rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column labels, in order
    pub headers: Vec<String>,
    /// Row data
    pub rows: Vec<Row>,
    /// Source file path, if the table was read from disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl Table {
    /// Create a new table with no rows
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            source_path: None,
        }
    }

    /// Create a table from headers and rows
    pub fn with_rows(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            headers,
            rows,
            source_path: None,
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has neither headers nor rows
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Find a column index by exact header label
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// A short label for log messages
    pub fn label(&self) -> String {
        match &self.source_path {
            Some(path) => path.display().to_string(),
            None => "<memory>".to_string(),
        }
    }

    /// Pad every short row with empty cells up to the header width.
    ///
    /// A row wider than the headers is a caller bug and is rejected.
    pub fn pad_rows(&mut self) -> Result<()> {
        let width = self.headers.len();
        for (idx, row) in self.rows.iter_mut().enumerate() {
            if row.cells.len() > width {
                return Err(Error::RaggedRow {
                    row: idx,
                    width: row.cells.len(),
                    columns: width,
                });
            }
            row.cells.resize(width, CellValue::Empty);
        }
        Ok(())
    }
}

/// A row of data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Create a row of `width` empty cells
    pub fn empty(width: usize) -> Self {
        Self {
            cells: vec![CellValue::Empty; width],
        }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    /// Trimmed text of a cell, empty when the column is missing
    pub fn text(&self, index: usize) -> String {
        self.get(index)
            .map(|c| c.to_string_value().trim().to_string())
            .unwrap_or_default()
    }
}

impl From<Vec<CellValue>> for Row {
    fn from(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value (marker columns)
    Bool(bool),
    /// A point in time already decoded by the source layer
    DateTime(NaiveDateTime),
    /// String value
    String(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    ///
    /// Digit strings with a leading zero stay text so identifiers keep their
    /// exact spelling.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        let has_leading_zero = trimmed.len() > 1
            && trimmed.starts_with('0')
            && !trimmed.starts_with("0.");
        if has_leading_zero {
            return CellValue::String(trimmed.to_string());
        }

        // Try parsing as integer first
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        // Try parsing as float; reject inf/nan spellings
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }

        // Otherwise, keep as string
        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value, if the cell holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean value, if the cell holds one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => temporal::format_datetime(dt),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}
