//! Deletion-to-entry reconciliation
//!
//! Every deletion row is explained by the earliest entry row of the same
//! person on the same calendar day that no earlier deletion has claimed. The
//! work happens in two passes over an unmodified input:
//!
//! 1. index every entry row by `(subject-id, day)`, ordered by event time;
//! 2. walk the rows in their original order and let each deletion claim one
//!    unconsumed entry from its group.
//!
//! Only then is the output table built, so no row is written while it is
//! still being read. Two marker columns are appended to every row: whether
//! the row is an entry already claimed by a deletion, and whether the row was
//! processed as a deletion at all.

use crate::collate::contains_any;
use crate::columns::{ColumnResolver, ResolvedColumns};
use crate::config::{ActionKeywords, ColumnRole, Config, Locale};
use crate::error::{Diagnostic, Result};
use crate::table::{CellValue, Row, Table};
use crate::temporal::{self, TemporalParser};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;

/// Header of the marker set on entry rows claimed by a deletion
pub const CONSUMED_MARKER_HEADER: &str = "[consumed]";
/// Header of the marker set on every deletion row
pub const ANALYZED_MARKER_HEADER: &str = "[analyzed]";
/// Header of the column added when reconciliation cannot run
pub const ANALYSIS_ERROR_HEADER: &str = "Analysis Error";

/// What an action cell describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Entry,
    Exit,
    Deletion,
    Other,
}

/// Classify action text. Deletion wins over entry and exit, since a deletion
/// usually names the record it removes ("Giriş silme").
pub fn classify_action(text: &str, keywords: &ActionKeywords, locale: Locale) -> ActionKind {
    if contains_any(text, &keywords.deletion, locale) {
        ActionKind::Deletion
    } else if contains_any(text, &keywords.entry, locale) {
        ActionKind::Entry
    } else if contains_any(text, &keywords.exit, locale) {
        ActionKind::Exit
    } else {
        ActionKind::Other
    }
}

/// Scope of matching: one person on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub subject_id: String,
    pub day: NaiveDate,
}

/// An entry row together with its derived event time
#[derive(Debug, Clone, Copy)]
struct EventRecord {
    row: usize,
    timestamp: NaiveDateTime,
}

/// Counts from one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub rows: usize,
    pub entries: usize,
    pub exits: usize,
    pub deletions: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Entry or deletion rows lacking a subject-id or a readable date
    pub ungrouped: usize,
}

/// How a reconciliation pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileStatus {
    Completed(ReconcileSummary),
    /// Required columns were missing; the table carries an error column instead
    Failed { missing: Vec<ColumnRole> },
}

/// The annotated table and how it came about
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub table: Table,
    pub status: ReconcileStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl Reconciliation {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ReconcileStatus::Completed(_))
    }

    pub fn summary(&self) -> Option<&ReconcileSummary> {
        match &self.status {
            ReconcileStatus::Completed(summary) => Some(summary),
            ReconcileStatus::Failed { .. } => None,
        }
    }

    /// Consumption marker of an output row
    pub fn is_consumed(&self, row: usize) -> bool {
        self.marker(row, CONSUMED_MARKER_HEADER)
    }

    /// Analysis marker of an output row
    pub fn is_analyzed(&self, row: usize) -> bool {
        self.marker(row, ANALYZED_MARKER_HEADER)
    }

    fn marker(&self, row: usize, header: &str) -> bool {
        self.table
            .find_column(header)
            .and_then(|col| self.table.rows.get(row)?.get(col)?.as_bool())
            .unwrap_or(false)
    }
}

/// Runs the reconciliation passes with a fixed configuration
#[derive(Debug, Clone)]
pub struct Reconciler<'a> {
    config: &'a Config,
    parser: TemporalParser,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_parser(config, TemporalParser::default())
    }

    pub fn with_parser(config: &'a Config, parser: TemporalParser) -> Self {
        Self { config, parser }
    }

    /// Annotate `table`. Only a row wider than the headers is an error.
    pub fn reconcile(&self, table: &Table) -> Result<Reconciliation> {
        let mut input = table.clone();
        input.pad_rows()?;

        let mut diagnostics = Vec::new();
        let resolver = ColumnResolver::new(&self.config.columns, self.config.locale);
        let columns = resolver.resolve_all(&input.headers, &mut diagnostics);

        let missing = columns.missing_required();
        if !missing.is_empty() {
            return Ok(self.fail_closed(input, missing, diagnostics));
        }

        let plan = self.plan(&input, &columns);
        let summary = plan.summary.clone();
        let output = self.apply(input, &columns, &plan);

        tracing::info!(
            rows = summary.rows,
            deletions = summary.deletions,
            matched = summary.matched,
            unmatched = summary.unmatched,
            "reconciliation complete"
        );

        Ok(Reconciliation {
            table: output,
            status: ReconcileStatus::Completed(summary),
            diagnostics,
        })
    }

    fn fail_closed(
        &self,
        input: Table,
        missing: Vec<ColumnRole>,
        mut diagnostics: Vec<Diagnostic>,
    ) -> Reconciliation {
        let diagnostic = Diagnostic::MissingRequiredColumns {
            roles: missing.clone(),
        };
        let message = diagnostic.to_string();
        tracing::error!(missing = ?missing, "reconciliation cannot run");
        diagnostics.push(diagnostic);

        let mut headers = input.headers;
        headers.push(ANALYSIS_ERROR_HEADER.to_string());
        let rows = input
            .rows
            .into_iter()
            .map(|mut row| {
                row.cells.push(CellValue::String(message.clone()));
                row
            })
            .collect();

        Reconciliation {
            table: Table {
                headers,
                rows,
                source_path: input.source_path,
            },
            status: ReconcileStatus::Failed { missing },
            diagnostics,
        }
    }

    /// Both read-only passes: index entries, then assign deletions.
    fn plan(&self, table: &Table, columns: &ResolvedColumns) -> Plan {
        let (Some(action_col), Some(subject_col), Some(date_col)) =
            (columns.action, columns.subject_id, columns.date)
        else {
            return Plan::empty(table.row_count());
        };

        let mut plan = Plan::empty(table.row_count());
        let mut kinds = Vec::with_capacity(table.row_count());
        let mut keys = Vec::with_capacity(table.row_count());
        let mut entries: HashMap<GroupKey, Vec<EventRecord>> = HashMap::new();

        // Pass 1: classify every row and index entries per group
        for (idx, row) in table.rows.iter().enumerate() {
            let kind = classify_action(
                &row.text(action_col),
                &self.config.actions,
                self.config.locale,
            );
            let key = self.group_key(row, subject_col, date_col);

            match kind {
                ActionKind::Entry => plan.summary.entries += 1,
                ActionKind::Exit => plan.summary.exits += 1,
                ActionKind::Deletion => plan.summary.deletions += 1,
                ActionKind::Other => {}
            }
            if matches!(kind, ActionKind::Entry | ActionKind::Deletion) && key.is_none() {
                plan.summary.ungrouped += 1;
            }

            if let (ActionKind::Entry, Some(key)) = (kind, &key) {
                let timestamp = key.day.and_time(self.event_time(row, columns));
                entries
                    .entry(key.clone())
                    .or_default()
                    .push(EventRecord { row: idx, timestamp });
            }

            kinds.push(kind);
            keys.push(key);
        }

        for list in entries.values_mut() {
            list.sort_by_key(|e| (e.timestamp, e.row));
        }
        tracing::debug!(
            groups = entries.len(),
            entries = plan.summary.entries,
            "indexed entry rows"
        );

        // Pass 2: deletions claim entries in original row order
        for (idx, kind) in kinds.iter().enumerate() {
            if *kind != ActionKind::Deletion {
                continue;
            }
            plan.analyzed[idx] = true;

            let claimed = keys[idx]
                .as_ref()
                .and_then(|key| entries.get(key))
                .and_then(|list| list.iter().find(|e| !plan.consumed[e.row]))
                .copied();

            match claimed {
                Some(entry) => {
                    plan.consumed[entry.row] = true;
                    plan.matches[idx] = Some(entry);
                    plan.summary.matched += 1;
                    tracing::trace!(deletion = idx, entry = entry.row, "deletion matched");
                }
                None => plan.summary.unmatched += 1,
            }
        }

        plan
    }

    /// Build the output rows from the finished plan
    fn apply(&self, input: Table, columns: &ResolvedColumns, plan: &Plan) -> Table {
        let mut headers = input.headers;
        headers.push(CONSUMED_MARKER_HEADER.to_string());
        headers.push(ANALYZED_MARKER_HEADER.to_string());

        let action_texts: Vec<String> = match columns.action {
            Some(col) => input.rows.iter().map(|r| r.text(col)).collect(),
            None => vec![String::new(); input.rows.len()],
        };

        let rows = input
            .rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                if let (Some(entry), Some(action_col)) = (plan.matches[idx], columns.action) {
                    row.cells[action_col] = CellValue::String(format!(
                        "{} / {}",
                        action_texts[entry.row], action_texts[idx]
                    ));
                    if let Some(time_col) = columns.time {
                        row.cells[time_col] =
                            CellValue::String(temporal::format_hms(&entry.timestamp));
                    }
                }
                row.cells.push(CellValue::Bool(plan.consumed[idx]));
                row.cells.push(CellValue::Bool(plan.analyzed[idx]));
                row
            })
            .collect();

        Table {
            headers,
            rows,
            source_path: input.source_path,
        }
    }

    fn group_key(&self, row: &Row, subject_col: usize, date_col: usize) -> Option<GroupKey> {
        let subject_id = row.text(subject_col);
        if subject_id.is_empty() {
            return None;
        }
        let day = self.parser.parse(row.get(date_col)?)?.date();
        Some(GroupKey { subject_id, day })
    }

    /// Time column, else a time written in the action text, else midnight
    fn event_time(&self, row: &Row, columns: &ResolvedColumns) -> NaiveTime {
        columns
            .time
            .and_then(|col| row.get(col))
            .filter(|cell| !cell.is_blank())
            .and_then(|cell| self.parser.parse_time_of_day(cell))
            .or_else(|| {
                columns
                    .action
                    .and_then(|col| temporal::find_time_in_text(&row.text(col)))
            })
            .unwrap_or(NaiveTime::MIN)
    }
}

/// Convenience wrapper around [`Reconciler::reconcile`]
pub fn reconcile(table: &Table, config: &Config) -> Result<Reconciliation> {
    Reconciler::new(config).reconcile(table)
}

/// Outcome of the two read-only passes
#[derive(Debug)]
struct Plan {
    consumed: Vec<bool>,
    analyzed: Vec<bool>,
    /// Deletion row -> the entry it claimed
    matches: Vec<Option<EventRecord>>,
    summary: ReconcileSummary,
}

impl Plan {
    fn empty(rows: usize) -> Self {
        Self {
            consumed: vec![false; rows],
            analyzed: vec![false; rows],
            matches: vec![None; rows],
            summary: ReconcileSummary {
                rows,
                ..ReconcileSummary::default()
            },
        }
    }
}
