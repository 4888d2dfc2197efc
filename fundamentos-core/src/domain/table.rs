//! Tabular model: raw scraped tables in, period tables through, one consolidated dataset out.

use serde::{Deserialize, Serialize};

use super::cell::NormalizedCell;
use super::period::PeriodIndex;
use crate::error::FetchError;

/// One row of a raw table: a row label plus `(column label, cell text)` pairs in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub label: String,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(label: impl Into<String>, cells: Vec<(String, String)>) -> Self {
        Self {
            label: label.into(),
            cells,
        }
    }

    /// Text of the first value column, if the row has one.
    pub fn first_value(&self) -> Option<&(String, String)> {
        self.cells.first()
    }
}

/// A table exactly as the source rendered it (HTML table or spreadsheet sheet).
///
/// Immutable input to the core; all typing happens during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    /// Build a table from a header (value column labels) and rows of
    /// `(row label, cell texts)`. Short rows are padded with empty cells,
    /// extra cells beyond the header are dropped.
    pub fn from_grid(header: &[String], rows: Vec<(String, Vec<String>)>) -> Self {
        let rows = rows
            .into_iter()
            .map(|(label, values)| {
                let mut values = values.into_iter();
                let cells = header
                    .iter()
                    .map(|h| (h.clone(), values.next().unwrap_or_default()))
                    .collect();
                RawRow::new(label, cells)
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value column labels, taken from the first row.
    pub fn column_labels(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|r| r.cells.iter().map(|(c, _)| c.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Identity of a column: its label plus the super-column it belongs to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub group: Option<String>,
    pub label: String,
}

impl ColumnKey {
    pub fn flat(label: impl Into<String>) -> Self {
        Self {
            group: None,
            label: label.into(),
        }
    }

    pub fn grouped(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group {
            Some(g) => write!(f, "{g} / {}", self.label),
            None => write!(f, "{}", self.label),
        }
    }
}

/// A named category owning a contiguous run of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperColumnGroup {
    pub name: String,
    pub columns: Vec<String>,
}

impl SuperColumnGroup {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One period's values, aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub index: PeriodIndex,
    pub cells: Vec<NormalizedCell>,
}

impl PeriodRow {
    pub fn new(index: PeriodIndex, cells: Vec<NormalizedCell>) -> Self {
        Self { index, cells }
    }

    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(NormalizedCell::is_missing)
    }
}

/// Shaped output of one period fetch. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTable {
    ticker: String,
    columns: Vec<ColumnKey>,
    rows: Vec<PeriodRow>,
}

impl PeriodTable {
    /// Every row must have exactly one cell per column.
    pub fn new(
        ticker: impl Into<String>,
        columns: Vec<ColumnKey>,
        rows: Vec<PeriodRow>,
    ) -> Result<Self, FetchError> {
        check_widths(&columns, &rows)?;
        Ok(Self {
            ticker: ticker.into(),
            columns,
            rows,
        })
    }

    /// Outer-join tables with disjoint columns on their row index.
    ///
    /// Columns keep part order; rows keep first-seen order. Cells a part
    /// does not provide for a row are `Missing`.
    pub fn join_columns(
        ticker: impl Into<String>,
        parts: Vec<PeriodTable>,
    ) -> Result<Self, FetchError> {
        let total_width: usize = parts.iter().map(|p| p.columns.len()).sum();
        let mut columns = Vec::with_capacity(total_width);
        let mut rows: Vec<PeriodRow> = Vec::new();

        for part in parts {
            let offset = columns.len();
            let width = part.columns.len();
            columns.extend(part.columns);
            for row in part.rows {
                let pos = match rows.iter().position(|r| r.index == row.index) {
                    Some(pos) => pos,
                    None => {
                        rows.push(PeriodRow::new(
                            row.index.clone(),
                            vec![NormalizedCell::Missing; total_width],
                        ));
                        rows.len() - 1
                    }
                };
                for (i, cell) in row.cells.into_iter().enumerate().take(width) {
                    rows[pos].cells[offset + i] = cell;
                }
            }
        }

        Self::new(ticker, columns, rows)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[PeriodRow] {
        &self.rows
    }

    pub fn indexes(&self) -> impl Iterator<Item = &PeriodIndex> {
        self.rows.iter().map(|r| &r.index)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn get(&self, index: &PeriodIndex, column: &ColumnKey) -> Option<&NormalizedCell> {
        cell_at(&self.columns, &self.rows, index, column)
    }

    /// Super-column layout (contiguous runs of the same group).
    pub fn groups(&self) -> Vec<SuperColumnGroup> {
        groups_of(&self.columns)
    }

    /// Drop columns whose cells are `Missing` in every row.
    pub fn without_missing_columns(self) -> Self {
        let (columns, rows) = drop_missing_columns(self.columns, self.rows);
        Self {
            ticker: self.ticker,
            columns,
            rows,
        }
    }
}

/// Final merged dataset spanning every period that was fetched successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedDataset {
    ticker: String,
    columns: Vec<ColumnKey>,
    rows: Vec<PeriodRow>,
}

impl ConsolidatedDataset {
    pub fn new(
        ticker: impl Into<String>,
        columns: Vec<ColumnKey>,
        rows: Vec<PeriodRow>,
    ) -> Result<Self, FetchError> {
        check_widths(&columns, &rows)?;
        Ok(Self {
            ticker: ticker.into(),
            columns,
            rows,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[PeriodRow] {
        &self.rows
    }

    pub fn indexes(&self) -> impl Iterator<Item = &PeriodIndex> {
        self.rows.iter().map(|r| &r.index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: &PeriodIndex, column: &ColumnKey) -> Option<&NormalizedCell> {
        cell_at(&self.columns, &self.rows, index, column)
    }

    /// Super-column layout (contiguous runs of the same group).
    pub fn groups(&self) -> Vec<SuperColumnGroup> {
        groups_of(&self.columns)
    }

    /// BLAKE3 fingerprint of the dataset content.
    ///
    /// Every cell is written with a variant tag and every string with a
    /// length prefix, so distinct datasets never feed the same bytes.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hash_str(&mut hasher, &self.ticker);
        hasher.update(&(self.columns.len() as u64).to_le_bytes());
        for col in &self.columns {
            match &col.group {
                Some(group) => {
                    hasher.update(&[1]);
                    hash_str(&mut hasher, group);
                }
                None => {
                    hasher.update(&[0]);
                }
            }
            hash_str(&mut hasher, &col.label);
        }
        for row in &self.rows {
            hash_str(&mut hasher, &row.index.to_string());
            for cell in &row.cells {
                match cell {
                    NormalizedCell::Integer(v) => {
                        hasher.update(&[b'i']);
                        hasher.update(&v.to_le_bytes());
                    }
                    NormalizedCell::Float(v) => {
                        hasher.update(&[b'f']);
                        hasher.update(&v.to_le_bytes());
                    }
                    NormalizedCell::Text(s) => {
                        hasher.update(&[b't']);
                        hash_str(&mut hasher, s);
                    }
                    NormalizedCell::Missing => {
                        hasher.update(&[b'm']);
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn check_widths(columns: &[ColumnKey], rows: &[PeriodRow]) -> Result<(), FetchError> {
    if let Some(row) = rows.iter().find(|r| r.cells.len() != columns.len()) {
        return Err(FetchError::Validation(format!(
            "row {} has {} cells but the table has {} columns",
            row.index,
            row.cells.len(),
            columns.len()
        )));
    }
    Ok(())
}

fn cell_at<'a>(
    columns: &[ColumnKey],
    rows: &'a [PeriodRow],
    index: &PeriodIndex,
    column: &ColumnKey,
) -> Option<&'a NormalizedCell> {
    let col = columns.iter().position(|c| c == column)?;
    rows.iter()
        .find(|r| &r.index == index)
        .and_then(|r| r.cells.get(col))
}

fn groups_of(columns: &[ColumnKey]) -> Vec<SuperColumnGroup> {
    let mut groups: Vec<SuperColumnGroup> = Vec::new();
    for col in columns {
        let name = col.group.clone().unwrap_or_default();
        match groups.last_mut() {
            Some(last) if last.name == name => last.columns.push(col.label.clone()),
            _ => groups.push(SuperColumnGroup::new(name, vec![col.label.clone()])),
        }
    }
    groups
}

pub(crate) fn drop_missing_columns(
    columns: Vec<ColumnKey>,
    rows: Vec<PeriodRow>,
) -> (Vec<ColumnKey>, Vec<PeriodRow>) {
    let keep: Vec<bool> = (0..columns.len())
        .map(|i| rows.iter().any(|r| !r.cells[i].is_missing()))
        .collect();

    let columns = columns
        .into_iter()
        .zip(&keep)
        .filter_map(|(c, &k)| k.then_some(c))
        .collect();
    let rows = rows
        .into_iter()
        .map(|r| PeriodRow {
            index: r.index,
            cells: r
                .cells
                .into_iter()
                .zip(&keep)
                .filter_map(|(c, &k)| k.then_some(c))
                .collect(),
        })
        .collect();
    (columns, rows)
}
