//! Merge engine for combining several exports into one table
//!
//! The first source with a header row fixes the output schema. Later sources
//! with the same (folded) header sequence are appended as-is; the rest are
//! remapped column by column onto the schema. The result is ordered by the
//! subject-id column when one can be found.

use crate::collate::{fold, natural_cmp};
use crate::columns::ColumnResolver;
use crate::config::{ColumnRole, Config};
use crate::error::{Diagnostic, Result};
use crate::parser::parse_file;
use crate::table::{CellValue, Row, Table};
use serde::Serialize;
use std::path::Path;

/// A merged table plus whatever went wrong along the way
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub table: Table,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse every file and merge them in the given order
pub fn merge_files<P: AsRef<Path>>(paths: &[P], config: &Config) -> Result<MergeOutcome> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        tables.push(parse_file(path)?);
    }
    Ok(merge_tables(tables, config))
}

/// Merge multiple tables into one, keyed to the first table's schema
pub fn merge_tables(tables: Vec<Table>, config: &Config) -> MergeOutcome {
    let mut diagnostics = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut folded_headers: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::new();

    for (source, table) in tables.into_iter().enumerate() {
        if table.headers.iter().all(|h| h.trim().is_empty()) {
            tracing::warn!(source = %table.label(), "source has no header row; skipped");
            diagnostics.push(Diagnostic::EmptySource { source });
            continue;
        }

        let source_folded: Vec<String> =
            table.headers.iter().map(|h| fold(h, config.locale)).collect();

        if headers.is_empty() {
            headers = table.headers.iter().map(|h| h.trim().to_string()).collect();
            folded_headers = source_folded;
            let width = headers.len();
            rows.extend(table.rows.into_iter().map(|row| fit(row, width)));
            continue;
        }

        let width = headers.len();
        if source_folded == folded_headers {
            rows.extend(table.rows.into_iter().map(|row| fit(row, width)));
            continue;
        }

        // Source column -> output column
        let mapping: Vec<Option<usize>> = source_folded
            .iter()
            .map(|h| folded_headers.iter().position(|out| out == h))
            .collect();
        let dropped_columns: Vec<String> = table
            .headers
            .iter()
            .zip(&mapping)
            .filter(|(h, target)| target.is_none() && !h.trim().is_empty())
            .map(|(h, _)| h.trim().to_string())
            .collect();

        tracing::warn!(
            source = %table.label(),
            dropped = ?dropped_columns,
            "source has a different column layout; remapping rows by header"
        );
        diagnostics.push(Diagnostic::SchemaRemapped {
            source,
            dropped_columns,
        });

        for row in table.rows {
            let mut remapped = Row::empty(width);
            for (cell, target) in row.cells.into_iter().zip(&mapping) {
                if let Some(target) = target {
                    remapped.cells[*target] = cell;
                }
            }
            rows.push(remapped);
        }
    }

    if headers.is_empty() {
        tracing::warn!("no source produced a header row");
        return MergeOutcome {
            table: Table::default(),
            diagnostics,
        };
    }

    let resolver = ColumnResolver::new(&config.columns, config.locale);
    match resolver.resolve(&headers, ColumnRole::SubjectId, &mut diagnostics) {
        Some(col) => sort_by_subject(&mut rows, col, config),
        None => {
            tracing::warn!("subject-id column not found; rows keep concatenation order");
            diagnostics.push(Diagnostic::MissingSubjectColumn);
        }
    }

    tracing::info!(
        columns = headers.len(),
        rows = rows.len(),
        diagnostics = diagnostics.len(),
        "merge complete"
    );

    MergeOutcome {
        table: Table::with_rows(headers, rows),
        diagnostics,
    }
}

/// Stable sort on the subject-id text, numeric-aware
fn sort_by_subject(rows: &mut Vec<Row>, col: usize, config: &Config) {
    let mut keyed: Vec<(String, Row)> = rows.drain(..).map(|row| (row.text(col), row)).collect();
    keyed.sort_by(|(a, _), (b, _)| natural_cmp(a, b, config.locale));
    rows.extend(keyed.into_iter().map(|(_, row)| row));
}

/// Pad or cut a row to the schema width
fn fit(mut row: Row, width: usize) -> Row {
    row.cells.resize(width, CellValue::Empty);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn merge(sources: &[&str]) -> MergeOutcome {
        let tables = sources
            .iter()
            .enumerate()
            .map(|(i, csv)| parse_csv_str(csv, &format!("source{}.csv", i)).unwrap())
            .collect();
        merge_tables(tables, &Config::default())
    }

    fn column(table: &Table, col: usize) -> Vec<String> {
        table.rows.iter().map(|r| r.text(col)).collect()
    }

    #[test]
    fn test_merge_single_table_sorted_by_subject() {
        let result = merge(&["Tarih,TC,İşlem\n05.01.2024,10,Giriş\n05.01.2024,9,Giriş\n"]);

        assert_eq!(result.table.headers, vec!["Tarih", "TC", "İşlem"]);
        assert_eq!(column(&result.table, 1), vec!["9", "10"]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_merge_same_headers_appends() {
        let result = merge(&[
            "TC,Tarih,İşlem\n2,05.01.2024,Giriş\n",
            "tc,TARİH,işlem\n1,05.01.2024,Silme\n",
        ]);

        assert_eq!(result.table.headers, vec!["TC", "Tarih", "İşlem"]);
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(column(&result.table, 0), vec!["1", "2"]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_merge_permuted_headers_remaps() {
        let result = merge(&[
            "TC,Tarih,İşlem\n1,05.01.2024,Giriş\n",
            "İşlem,TC,Tarih\nSilme,1,05.01.2024\n",
        ]);

        assert_eq!(result.table.headers, vec!["TC", "Tarih", "İşlem"]);
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(column(&result.table, 2), vec!["Giriş", "Silme"]);
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::SchemaRemapped {
                source: 1,
                dropped_columns: vec![]
            }]
        );
    }

    #[test]
    fn test_merge_drops_unknown_and_fills_missing() {
        let result = merge(&[
            "TC,Tarih,İşlem,Saat\n1,05.01.2024,Giriş,08:00\n",
            "TC,Extra,İşlem\n2,bonus,Silme\n",
        ]);

        let second = &result.table.rows[1];
        assert_eq!(second.cells[0], CellValue::Integer(2));
        assert_eq!(second.cells[1], CellValue::Empty);
        assert_eq!(second.cells[2], CellValue::String("Silme".to_string()));
        assert_eq!(second.cells[3], CellValue::Empty);
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::SchemaRemapped {
                source: 1,
                dropped_columns: vec!["Extra".to_string()]
            }]
        );
    }

    #[test]
    fn test_merge_skips_empty_sources() {
        let result = merge(&["", "TC,İşlem\n1,Giriş\n", "TC,İşlem\n"]);

        assert_eq!(result.table.headers, vec!["TC", "İşlem"]);
        assert_eq!(result.table.row_count(), 1);
        assert_eq!(result.diagnostics, vec![Diagnostic::EmptySource { source: 0 }]);
    }

    #[test]
    fn test_merge_nothing() {
        let result = merge(&[]);
        assert!(result.table.is_empty());

        let result = merge(&["", ""]);
        assert!(result.table.is_empty());
        assert_eq!(result.diagnostics.len(), 2);
    }

    #[test]
    fn test_merge_without_subject_keeps_order() {
        let result = merge(&["Name,İşlem\nb,Giriş\na,Silme\n"]);

        assert_eq!(column(&result.table, 0), vec!["b", "a"]);
        assert!(result
            .diagnostics
            .contains(&Diagnostic::MissingSubjectColumn));
        assert!(result.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ColumnNotFound {
                role: ColumnRole::SubjectId,
                ..
            }
        )));
    }

    #[test]
    fn test_sort_is_stable_for_equal_subjects() {
        let result = merge(&[
            "TC,İşlem\n5,first\n3,x\n5,second\n",
            "TC,İşlem\n5,third\n",
        ]);

        assert_eq!(column(&result.table, 0), vec!["3", "5", "5", "5"]);
        assert_eq!(column(&result.table, 1), vec!["x", "first", "second", "third"]);
    }
}
