//! Reader for exported Fundamentus statement sheets.
//!
//! Layout: a title row, a header row whose first cell names the line-item
//! column and whose remaining cells are quarter-end dates, then one row per
//! line item.

use std::io::Read;

use super::provider::SourceError;
use crate::domain::RawTable;

/// Text the source renders instead of a sheet when the ticker is unknown.
pub const ASSET_NOT_FOUND: &str = "Ativo nao encontrado";

pub fn read_sheet_csv<R: Read>(reader: R) -> Result<RawTable, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = rdr.records();

    let title = records
        .next()
        .ok_or_else(|| SourceError::MalformedSheet("empty sheet".into()))?
        .map_err(|e| SourceError::MalformedSheet(e.to_string()))?;
    if title.iter().any(|c| c.contains(ASSET_NOT_FOUND)) {
        return Err(SourceError::NotFound {
            key: ASSET_NOT_FOUND.to_string(),
        });
    }

    let header = records
        .next()
        .ok_or_else(|| SourceError::MalformedSheet("sheet has no header row".into()))?
        .map_err(|e| SourceError::MalformedSheet(e.to_string()))?;
    let labels: Vec<String> = header.iter().skip(1).map(String::from).collect();
    if labels.is_empty() {
        return Err(SourceError::MalformedSheet(
            "header row has no period columns".into(),
        ));
    }

    let mut rows = Vec::new();
    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| {
            SourceError::MalformedSheet(format!("line {}: {e}", line + 3))
        })?;
        let mut cells = record.iter();
        let Some(label) = cells.next() else {
            continue;
        };
        if label.is_empty() {
            continue;
        }
        rows.push((label.to_string(), cells.map(String::from).collect()));
    }

    tracing::debug!(
        items = rows.len(),
        periods = labels.len(),
        "read statement sheet"
    );
    Ok(RawTable::from_grid(&labels, rows))
}
