//! HTML table extraction.
//!
//! Every `<table>` becomes one `RawTable`: the first cell of each row is the
//! row label, a leading all-`<th>` row supplies the value column labels.

use scraper::{ElementRef, Html, Selector};

use super::provider::SourceError;
use crate::domain::RawTable;

struct TableSelectors {
    table: Selector,
    row: Selector,
    cell: Selector,
    data_cell: Selector,
}

impl TableSelectors {
    fn new() -> Result<Self, SourceError> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| SourceError::Other(format!("invalid selector '{css}': {e:?}")))
        };
        Ok(Self {
            table: parse("table")?,
            row: parse("tr")?,
            cell: parse("th, td")?,
            data_cell: parse("td")?,
        })
    }
}

/// Extract every table of a document, in document order.
pub fn parse_tables(html: &str) -> Result<Vec<RawTable>, SourceError> {
    let selectors = TableSelectors::new()?;
    let document = Html::parse_document(html);

    let tables = document
        .select(&selectors.table)
        .map(|table| parse_table(table, &selectors))
        .filter(|t| !t.is_empty())
        .collect();
    Ok(tables)
}

fn parse_table(table: ElementRef<'_>, selectors: &TableSelectors) -> RawTable {
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for tr in table.select(&selectors.row) {
        let cells: Vec<String> = tr
            .select(&selectors.cell)
            .map(|c| cell_text(&c))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let header_row = tr.select(&selectors.data_cell).next().is_none();
        if header.is_none() && rows.is_empty() && header_row {
            header = Some(cells);
            continue;
        }
        rows.push(cells);
    }

    let width = rows.iter().map(|r| r.len().saturating_sub(1)).max().unwrap_or(0);
    let labels: Vec<String> = match header {
        Some(h) if h.len() > 1 => h.into_iter().skip(1).collect(),
        _ => (0..width).map(|i| i.to_string()).collect(),
    };

    let rows = rows
        .into_iter()
        .map(|mut cells| {
            let label = cells.remove(0);
            (label, cells)
        })
        .collect();
    RawTable::from_grid(&labels, rows)
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <tr><th>Indicador</th><th>2019 *</th><th>2018</th></tr>
          <tr><td>Preço / Lucro (P/L)</td><td>8,20</td><td>12,1</td></tr>
          <tr><td>Dividend Yield</td><td>4,5%</td><td>N/D</td></tr>
        </table>
        <table>
          <tr><td>EBITDA</td><td>1.000</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn extracts_tables_in_order() {
        let tables = parse_tables(PAGE).unwrap();
        assert_eq!(tables.len(), 2);

        let first = &tables[0];
        assert_eq!(first.column_labels(), vec!["2019 *", "2018"]);
        assert_eq!(first.rows()[0].label, "Preço / Lucro (P/L)");
        assert_eq!(
            first.rows()[1].cells[0],
            ("2019 *".to_string(), "4,5%".to_string())
        );
    }

    #[test]
    fn headerless_tables_get_positional_labels() {
        let tables = parse_tables(PAGE).unwrap();
        let second = &tables[1];
        assert_eq!(second.column_labels(), vec!["0"]);
        assert_eq!(second.rows()[0].label, "EBITDA");
    }

    #[test]
    fn page_without_tables_is_empty() {
        assert!(parse_tables("<html><p>Ativo nao encontrado</p></html>")
            .unwrap()
            .is_empty());
    }
}
