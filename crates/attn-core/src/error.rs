//! Error types for attn-core
//!
//! `Error` covers I/O and caller bugs. Data-quality conditions (a missing
//! column, an unparseable date, a deletion without an entry) are never errors;
//! they surface as [`Diagnostic`] values next to a still-usable table.

use crate::config::ColumnRole;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in attn-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Spreadsheet could not be opened or read
    #[error("failed to read spreadsheet '{path}': {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// CSV writing error
    #[error("CSV write error: {0}")]
    CsvWrite(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Output format name not recognised
    #[error("unsupported format '{0}'; expected csv or json")]
    UnsupportedFormat(String),

    /// Configuration is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A row is wider than the table's header row
    #[error("row {row} has {width} cells but the table has {columns} columns")]
    RaggedRow {
        row: usize,
        width: usize,
        columns: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A non-fatal condition raised while merging or reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No header matched any synonym of a role
    ColumnNotFound {
        role: ColumnRole,
        synonyms: Vec<String>,
        headers: Vec<String>,
    },
    /// A source table's headers differed from the output schema
    SchemaRemapped {
        source: usize,
        dropped_columns: Vec<String>,
    },
    /// A source table had no header row and was skipped
    EmptySource { source: usize },
    /// Merged rows were left in concatenation order
    MissingSubjectColumn,
    /// Reconciliation could not run
    MissingRequiredColumns { roles: Vec<ColumnRole> },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ColumnNotFound {
                role,
                synonyms,
                headers,
            } => write!(
                f,
                "column for {} not found; looked for [{}] in [{}]",
                role,
                synonyms.join(", "),
                headers.join(", ")
            ),
            Diagnostic::SchemaRemapped {
                source,
                dropped_columns,
            } => {
                write!(
                    f,
                    "source #{} has a different column layout; rows remapped by header",
                    source + 1
                )?;
                if !dropped_columns.is_empty() {
                    write!(f, " (dropped: {})", dropped_columns.join(", "))?;
                }
                Ok(())
            }
            Diagnostic::EmptySource { source } => {
                write!(f, "source #{} has no header row; skipped", source + 1)
            }
            Diagnostic::MissingSubjectColumn => {
                write!(f, "subject-id column not found; rows left unsorted")
            }
            Diagnostic::MissingRequiredColumns { roles } => {
                let names: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
                write!(f, "required column(s) not found: {}", names.join(", "))
            }
        }
    }
}
