//! Statement sheets (balance sheet, income statement) exported by Fundamentus.
//!
//! A sheet lists line items down and quarter-end dates across. Shaping
//! turns it into a `PeriodTable` with one row per period and one integer
//! column per line item, optionally summed to calendar years and segmented
//! into balance-sheet super-columns.

use std::collections::BTreeMap;
use std::io::Read;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::data::csv_sheet::read_sheet_csv;
use crate::data::provider::SourceError;
use crate::domain::{ColumnKey, NormalizedCell, PeriodIndex, PeriodRow, PeriodTable, RawTable};
use crate::error::FetchError;
use crate::normalize::{NormalizeMode, Normalizer, NumberLocale};
use crate::segment::{Segmenter, BALANCE_SHEET_ANCHORS};

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetOptions {
    /// Keep one row per quarter instead of summing to years.
    pub quarterly: bool,
    pub ascending: bool,
    /// Group line items under the balance-sheet anchors.
    pub separated: bool,
    pub locale: NumberLocale,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            quarterly: false,
            ascending: true,
            separated: true,
            locale: NumberLocale::PLAIN,
        }
    }
}

impl SheetOptions {
    /// Income statements carry no balance-sheet anchors and are never segmented.
    pub fn income_statement() -> Self {
        Self {
            separated: false,
            ..Self::default()
        }
    }
}

/// Read a CSV export and shape it. An unknown ticker is `DataNotFound`.
pub fn load_sheet<R: Read>(
    ticker: &str,
    reader: R,
    opts: &SheetOptions,
) -> Result<PeriodTable, FetchError> {
    let raw = read_sheet_csv(reader).map_err(|e| match e {
        SourceError::NotFound { .. } => FetchError::not_found(ticker, None),
        other => FetchError::Source(other),
    })?;
    shape_sheet(ticker, &raw, opts)
}

pub fn shape_sheet(
    ticker: &str,
    raw: &RawTable,
    opts: &SheetOptions,
) -> Result<PeriodTable, FetchError> {
    let normalizer = Normalizer::new(NormalizeMode::Strict, opts.locale);

    // Period columns with a parseable date; the rest are dropped.
    let dates: Vec<(usize, NaiveDate)> = raw
        .column_labels()
        .iter()
        .enumerate()
        .filter_map(|(i, label)| {
            NaiveDate::parse_from_str(label, DATE_FORMAT)
                .ok()
                .map(|d| (i, d))
        })
        .collect();
    if dates.is_empty() {
        return Err(FetchError::Source(SourceError::MalformedSheet(
            "no dated period columns".into(),
        )));
    }

    // Line items that carry at least one value; sub-titles are all missing.
    let mut items: Vec<String> = Vec::new();
    let mut values: Vec<Vec<f64>> = Vec::new();
    for row in raw.rows() {
        let cells: Vec<NormalizedCell> = dates
            .iter()
            .map(|&(i, _)| match row.cells.get(i) {
                Some((_, text)) => normalizer.normalize(text),
                None => NormalizedCell::Missing,
            })
            .collect();
        if cells.iter().all(NormalizedCell::is_missing) {
            continue;
        }
        items.push(row.label.clone());
        values.push(cells.iter().map(|c| c.as_f64().unwrap_or(0.0)).collect());
    }

    let mut rows = if opts.quarterly {
        quarterly_rows(&dates, &values)
    } else {
        annual_rows(&dates, &values)
    };
    if rows.is_empty() || items.is_empty() {
        return Err(FetchError::not_found(ticker, None));
    }
    if !opts.ascending {
        rows.reverse();
    }

    let columns: Vec<ColumnKey> = if opts.separated {
        Segmenter::balance_sheet()
            .segment(&items, BALANCE_SHEET_ANCHORS)?
            .into_iter()
            .flat_map(|g| {
                let name = g.name;
                g.columns
                    .into_iter()
                    .map(move |label| ColumnKey::grouped(name.clone(), label))
            })
            .collect()
    } else {
        items.into_iter().map(ColumnKey::flat).collect()
    };

    tracing::debug!(
        ticker,
        periods = rows.len(),
        items = columns.len(),
        quarterly = opts.quarterly,
        "shaped statement sheet"
    );
    PeriodTable::new(ticker, columns, rows)
}

/// One row per date (first occurrence wins), in date order.
fn quarterly_rows(dates: &[(usize, NaiveDate)], values: &[Vec<f64>]) -> Vec<PeriodRow> {
    let mut by_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (pos, &(_, date)) in dates.iter().enumerate() {
        by_date.entry(date).or_insert(pos);
    }
    by_date
        .into_iter()
        .map(|(date, pos)| {
            let cells = values.iter().map(|item| truncate(item[pos])).collect();
            PeriodRow::new(PeriodIndex::Date(date), cells)
        })
        .collect()
}

/// Quarters summed per calendar year, truncated after summing; years without
/// exactly four quarters are dropped.
fn annual_rows(dates: &[(usize, NaiveDate)], values: &[Vec<f64>]) -> Vec<PeriodRow> {
    let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (pos, &(_, date)) in dates.iter().enumerate() {
        by_year.entry(date.year()).or_default().push(pos);
    }
    by_year
        .into_iter()
        .filter(|(_, quarters)| quarters.len() == 4)
        .map(|(year, quarters)| {
            let cells = values
                .iter()
                .map(|item| truncate(quarters.iter().map(|&q| item[q]).sum()))
                .collect();
            PeriodRow::new(PeriodIndex::Year(year), cells)
        })
        .collect()
}

/// Toward zero; `as` saturates out-of-range values.
fn truncate(value: f64) -> NormalizedCell {
    NormalizedCell::Integer(value.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SegmentationError;

    /// Items as `label,v1,v2,...` lines.
    fn sheet(dates: &[&str], items: &[&str]) -> RawTable {
        let header: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
        RawTable::from_grid(
            &header,
            items
                .iter()
                .map(|line| {
                    let mut fields = line.split(',').map(String::from);
                    let label = fields.next().unwrap_or_default();
                    (label, fields.collect())
                })
                .collect(),
        )
    }

    const DATES: &[&str] = &[
        "31/12/2020",
        "30/09/2020",
        "30/06/2020",
        "31/03/2020",
        "31/12/2019",
    ];

    fn balance() -> RawTable {
        sheet(
            DATES,
            &[
                "Ativo Total,10,10,10,10,9",
                "Ativo Circulante,4,4,4,4,3",
                "Caixa,1,,1,1,1",
                "Ativo Não Circulante,6,6,6,6,6",
                "Passivo Total,10,10,10,10,9",
                "Passivo Circulante,2,2,2,2,2",
                "Passivo Não Circulante,3,3,3,3,3",
                "Ajustes,,,,,",
                "Patrimônio Líquido,5,5,5,5,4.7",
            ],
        )
    }

    #[test]
    fn annual_sums_complete_years_only() {
        let t = shape_sheet("PETR4", &balance(), &SheetOptions::default()).unwrap();
        // 2019 has a single quarter and is dropped.
        assert_eq!(t.rows().len(), 1);
        assert_eq!(t.rows()[0].index, PeriodIndex::Year(2020));
        assert_eq!(
            t.get(
                &PeriodIndex::Year(2020),
                &ColumnKey::grouped("Ativo Circulante", "Caixa")
            ),
            Some(&NormalizedCell::Integer(3))
        );
    }

    #[test]
    fn quarterly_rows_are_sorted_and_fill_zero() {
        let opts = SheetOptions {
            quarterly: true,
            separated: false,
            ..Default::default()
        };
        let t = shape_sheet("PETR4", &balance(), &opts).unwrap();
        let first = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        assert_eq!(t.rows().len(), 5);
        assert_eq!(t.rows()[0].index, PeriodIndex::Date(first));
        assert_eq!(
            t.get(
                &PeriodIndex::Date(NaiveDate::from_ymd_opt(2020, 9, 30).unwrap()),
                &ColumnKey::flat("Caixa")
            ),
            Some(&NormalizedCell::Integer(0))
        );
        // Truncated to integer.
        assert_eq!(
            t.get(&PeriodIndex::Date(first), &ColumnKey::flat("Patrimônio Líquido")),
            Some(&NormalizedCell::Integer(4))
        );
    }

    #[test]
    fn all_missing_items_are_dropped() {
        let opts = SheetOptions {
            separated: false,
            ..Default::default()
        };
        let t = shape_sheet("PETR4", &balance(), &opts).unwrap();
        assert!(!t.columns().contains(&ColumnKey::flat("Ajustes")));
        assert_eq!(t.columns().len(), 8);
    }

    #[test]
    fn descending_reverses_periods() {
        let opts = SheetOptions {
            quarterly: true,
            ascending: false,
            ..Default::default()
        };
        let t = shape_sheet("PETR4", &balance(), &opts).unwrap();
        assert_eq!(
            t.rows()[0].index,
            PeriodIndex::Date(NaiveDate::from_ymd_opt(2020, 12, 31).unwrap())
        );
    }

    #[test]
    fn separated_uses_balance_groups() {
        let t = shape_sheet("PETR4", &balance(), &SheetOptions::default()).unwrap();
        let names: Vec<_> = t.groups().into_iter().map(|g| g.name).collect();
        assert_eq!(
            names,
            vec![
                "Ativo Total",
                "Ativo Circulante",
                "Ativo Não Circulante",
                "Passivo Total",
                "Passivo Circulante",
                "Passivo Não Circulante",
                "Patrimônio Líquido"
            ]
        );
    }

    #[test]
    fn income_statement_cannot_be_separated() {
        let raw = sheet(&["31/03/2020"], &["Receita Líquida,100"]);
        let opts = SheetOptions {
            quarterly: true,
            ..Default::default()
        };
        let result = shape_sheet("PETR4", &raw, &opts);
        assert!(matches!(
            result,
            Err(FetchError::Segmentation(SegmentationError::BothVariantsAbsent { .. }))
        ));
    }

    #[test]
    fn annual_sum_truncates_once_per_year() {
        let raw = sheet(&DATES[..4], &["Receita,1.5,1.5,1.5,1.5"]);
        let t = shape_sheet("PETR4", &raw, &SheetOptions::income_statement()).unwrap();
        assert_eq!(
            t.get(&PeriodIndex::Year(2020), &ColumnKey::flat("Receita")),
            Some(&NormalizedCell::Integer(6))
        );
    }

    #[test]
    fn quarterly_cells_truncate_individually() {
        let raw = sheet(&DATES[..4], &["Receita,1.5,-2.7,1.5,1.5"]);
        let opts = SheetOptions {
            quarterly: true,
            ..SheetOptions::income_statement()
        };
        let t = shape_sheet("PETR4", &raw, &opts).unwrap();
        assert_eq!(
            t.get(
                &PeriodIndex::Date(NaiveDate::from_ymd_opt(2020, 9, 30).unwrap()),
                &ColumnKey::flat("Receita")
            ),
            Some(&NormalizedCell::Integer(-2))
        );
    }

    #[test]
    fn income_statement_options_shape_flat() {
        let raw = sheet(
            &DATES[..4],
            &["Receita Líquida,100,100,100,100", "Lucro Bruto,40,,40,40"],
        );
        let t = shape_sheet("PETR4", &raw, &SheetOptions::income_statement()).unwrap();
        assert!(t.columns().iter().all(|c| c.group.is_none()));
        assert_eq!(
            t.get(&PeriodIndex::Year(2020), &ColumnKey::flat("Lucro Bruto")),
            Some(&NormalizedCell::Integer(120))
        );
    }

    #[test]
    fn unknown_asset_is_not_found() {
        let result = load_sheet(
            "XXXX3",
            "Ativo nao encontrado\n".as_bytes(),
            &SheetOptions::default(),
        );
        assert!(matches!(
            result,
            Err(FetchError::DataNotFound { year: None, .. })
        ));
    }
}
