//! attn-core: Core library for merging attendance exports and reconciling
//! deletion records against entry records
//!
//! This library provides functionality to:
//! - Scan directories for exported CSV/TSV and spreadsheet files
//! - Parse delimited exports and first worksheets into structured tables
//! - Recognise column roles (subject-id, date, action, time) from arbitrary headers
//! - Parse dates and times written in many formats, including spreadsheet serials
//! - Merge exports with differing column order into one sorted table
//! - Match each deletion to the earliest unconsumed entry of the same person and day

pub mod collate;
pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod merger;
pub mod parser;
pub mod reconcile;
pub mod scanner;
pub mod table;
pub mod temporal;
pub mod workbook;

pub use columns::{ColumnResolver, ResolvedColumns};
pub use config::{ActionKeywords, ColumnRole, ColumnSynonyms, Config, Locale};
pub use error::{Diagnostic, Error, Result};
pub use export::{export_to_file, write_table, CellFormatter, ExportFormat, ExportOptions};
pub use merger::{merge_files, merge_tables, MergeOutcome};
pub use parser::{parse_csv, parse_csv_str, parse_file};
pub use reconcile::{
    reconcile, ActionKind, Reconciler, Reconciliation, ReconcileStatus, ReconcileSummary,
};
pub use scanner::{scan_directory, ScanResult};
pub use table::{CellValue, Row, Table};
pub use temporal::TemporalParser;
pub use workbook::parse_workbook;
