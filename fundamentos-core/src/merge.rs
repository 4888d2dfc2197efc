//! Merge per-period tables into one chronologically sorted dataset.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::table::drop_missing_columns;
use crate::domain::{
    ColumnKey, ConsolidatedDataset, NormalizedCell, PeriodIndex, PeriodRow, PeriodTable,
};
use crate::error::FetchError;

/// What to do when two inputs carry the same period.
///
/// "First" and "last" refer to the order of the input sequence (the
/// orchestrator passes tables in submission order), never to completion
/// order of concurrent work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    KeepLast,
    KeepFirst,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub ascending: bool,
    pub duplicates: DuplicatePolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            ascending: true,
            duplicates: DuplicatePolicy::KeepLast,
        }
    }
}

/// Concatenate `tables` along the period axis.
///
/// Columns are the union of all inputs in first-seen order. A column first
/// seen late is placed next to its group (or next to the column preceding
/// it in its own table) so super-columns stay contiguous. Periods and
/// columns that are `Missing` everywhere are dropped, duplicates are
/// resolved per `opts.duplicates`, and rows are sorted by period index.
pub fn merge(
    ticker: &str,
    tables: Vec<PeriodTable>,
    opts: &MergeOptions,
) -> Result<ConsolidatedDataset, FetchError> {
    let columns = union_columns(&tables);
    let position: HashMap<&ColumnKey, usize> =
        columns.iter().enumerate().map(|(i, c)| (c, i)).collect();

    let mut rows: Vec<PeriodRow> = Vec::new();
    let mut seen: HashMap<PeriodIndex, usize> = HashMap::new();

    for table in &tables {
        let targets: Vec<usize> = table.columns().iter().map(|c| position[c]).collect();
        for row in table.rows() {
            let mut cells = vec![NormalizedCell::Missing; columns.len()];
            for (cell, &target) in row.cells.iter().zip(&targets) {
                cells[target] = cell.clone();
            }
            let merged = PeriodRow::new(row.index.clone(), cells);

            match seen.get(&row.index) {
                None => {
                    seen.insert(row.index.clone(), rows.len());
                    rows.push(merged);
                }
                Some(&at) => match opts.duplicates {
                    DuplicatePolicy::KeepLast => rows[at] = merged,
                    DuplicatePolicy::KeepFirst => {}
                    DuplicatePolicy::Reject => {
                        return Err(FetchError::DuplicatePeriod {
                            ticker: ticker.to_string(),
                            index: row.index.to_string(),
                        })
                    }
                },
            }
        }
    }

    rows.retain(|r| !r.is_all_missing());
    let (columns, mut rows) = drop_missing_columns(columns, rows);

    rows.sort_by(|a, b| a.index.cmp(&b.index));
    if !opts.ascending {
        rows.reverse();
    }

    tracing::debug!(
        ticker,
        inputs = tables.len(),
        periods = rows.len(),
        columns = columns.len(),
        "merged period tables"
    );
    ConsolidatedDataset::new(ticker, columns, rows)
}

fn union_columns(tables: &[PeriodTable]) -> Vec<ColumnKey> {
    let mut columns: Vec<ColumnKey> = Vec::new();
    for table in tables {
        let own = table.columns();
        for (k, col) in own.iter().enumerate() {
            if columns.contains(col) {
                continue;
            }
            let predecessor = k.checked_sub(1).map(|p| &own[p]);
            let at = insertion_point(&columns, col, predecessor);
            columns.insert(at, col.clone());
        }
    }
    columns
}

/// Where a column first seen now goes: after the last member of its group,
/// else after the group of the column preceding it in its own table, else
/// at the front.
fn insertion_point(
    columns: &[ColumnKey],
    col: &ColumnKey,
    predecessor: Option<&ColumnKey>,
) -> usize {
    let after_group = |group: &String| {
        columns
            .iter()
            .rposition(|c| c.group.as_ref() == Some(group))
            .map(|i| i + 1)
    };

    if let Some(at) = col.group.as_ref().and_then(after_group) {
        return at;
    }
    let Some(pred) = predecessor else {
        return 0;
    };
    let Some(pos) = columns.iter().position(|c| c == pred) else {
        return columns.len();
    };
    pred.group.as_ref().and_then(after_group).unwrap_or(pos + 1)
}
