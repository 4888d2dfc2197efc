//! Single-period fetch: raw tables in, one shaped `PeriodTable` out.
//!
//! The fetcher owns no I/O. It asks its provider for the tables of one
//! period, keeps the requested period's value column of each table,
//! normalizes every cell, relabels every indicator through the schema and
//! (optionally) tags each column with the super-column of its table.

use crate::clock::CurrentYear;
use crate::data::provider::{RawTableProvider, SourceError, SourceProfile};
use crate::domain::{ColumnKey, PeriodIndex, PeriodKey, PeriodRow, PeriodTable, RawTable};
use crate::error::FetchError;
use crate::normalize::Normalizer;
use crate::schema::IndicatorSchema;

/// Shapes one period at a time. Shared read-only across workers.
pub struct PeriodFetcher<'a> {
    provider: &'a dyn RawTableProvider,
    clock: &'a dyn CurrentYear,
    schema: &'a IndicatorSchema,
    normalizer: Normalizer,
}

impl<'a> PeriodFetcher<'a> {
    /// Fetcher with the ADVFN indicator schema and the default (strict, pt-BR) normalizer.
    pub fn new(provider: &'a dyn RawTableProvider, clock: &'a dyn CurrentYear) -> Self {
        Self {
            provider,
            clock,
            schema: IndicatorSchema::advfn(),
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_schema(mut self, schema: &'a IndicatorSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn profile(&self) -> &SourceProfile {
        self.provider.profile()
    }

    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Reject periods the source cannot have: future years, years before
    /// the source's first year.
    pub fn validate(&self, key: &PeriodKey) -> Result<(), FetchError> {
        let current = self.clock.current_year();
        if key.year() > current {
            return Err(FetchError::Validation(format!(
                "year {} is in the future (current year is {current})",
                key.year()
            )));
        }
        let first = self.provider.profile().first_year;
        if key.year() < first {
            return Err(FetchError::Validation(format!(
                "year {} is before the first year with data ({first})",
                key.year()
            )));
        }
        Ok(())
    }

    /// Fetch and shape one period.
    ///
    /// With `separated`, every column is tagged with the super-column of the
    /// table it came from. A page with fewer tables than the source profile
    /// requires, or with no value at all, is `DataNotFound`.
    pub fn fetch_period(&self, key: &PeriodKey, separated: bool) -> Result<PeriodTable, FetchError> {
        self.validate(key)?;

        let profile = self.provider.profile();
        let tables = self.provider.fetch_tables(key).map_err(|e| match e {
            SourceError::NotFound { .. } => FetchError::not_found(key.ticker(), Some(key.year())),
            other => FetchError::Source(other),
        })?;

        if tables.len() < profile.min_tables {
            tracing::debug!(
                %key,
                found = tables.len(),
                required = profile.min_tables,
                "too few tables, treating period as missing"
            );
            return Err(FetchError::not_found(key.ticker(), Some(key.year())));
        }

        let mut parts = Vec::with_capacity(profile.min_tables);
        for (i, raw) in tables.iter().take(profile.min_tables).enumerate() {
            let group = if separated {
                profile.super_columns.get(i).map(String::as_str)
            } else {
                None
            };
            if let Some(part) = self.shape_table(key, raw, group)? {
                parts.push(part);
            }
        }

        let table = PeriodTable::join_columns(key.ticker(), parts)?;
        if table.is_empty() {
            return Err(FetchError::not_found(key.ticker(), Some(key.year())));
        }

        tracing::debug!(
            %key,
            columns = table.columns().len(),
            provider = self.provider.name(),
            "fetched period"
        );
        Ok(table)
    }

    /// One raw table becomes a one-row table: each indicator row turns into a
    /// column holding its first value. All-missing columns are dropped.
    fn shape_table(
        &self,
        key: &PeriodKey,
        raw: &RawTable,
        group: Option<&str>,
    ) -> Result<Option<PeriodTable>, FetchError> {
        let Some(period_label) = raw.column_labels().first().map(|l| l.to_string()) else {
            return Ok(None);
        };
        let index = period_index(key, &period_label)?;

        let mut columns = Vec::with_capacity(raw.len());
        let mut cells = Vec::with_capacity(raw.len());
        for row in raw.rows() {
            let short = self.schema.map_label(&row.label)?;
            columns.push(match group {
                Some(g) => ColumnKey::grouped(g, short),
                None => ColumnKey::flat(short),
            });
            cells.push(match row.first_value() {
                Some((_, text)) => self.normalizer.normalize(text),
                None => Default::default(),
            });
        }

        let table = PeriodTable::new(key.ticker(), columns, vec![PeriodRow::new(index, cells)])?;
        Ok(Some(table.without_missing_columns()))
    }
}

fn period_index(key: &PeriodKey, label: &str) -> Result<PeriodIndex, FetchError> {
    match key.quarter() {
        None => Ok(PeriodIndex::from_annual_label(label)),
        Some(q) => PeriodIndex::from_quarter_label(label, q).ok_or_else(|| {
            FetchError::Source(SourceError::ResponseFormatChanged(format!(
                "period label '{label}' of {key} has no year"
            )))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedYear;
    use crate::domain::{NormalizedCell, Quarter, RawRow};
    use chrono::NaiveDate;

    struct OnePage {
        profile: SourceProfile,
        tables: Vec<RawTable>,
    }

    impl RawTableProvider for OnePage {
        fn name(&self) -> &str {
            "one-page"
        }
        fn profile(&self) -> &SourceProfile {
            &self.profile
        }
        fn fetch_tables(&self, _key: &PeriodKey) -> Result<Vec<RawTable>, SourceError> {
            Ok(self.tables.clone())
        }
    }

    fn profile() -> SourceProfile {
        SourceProfile {
            name: "test".into(),
            first_year: 2007,
            min_tables: 2,
            super_columns: vec!["Mercado".into(), "Dividendos".into()],
        }
    }

    fn table(period: &str, rows: &[(&str, &str)]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|(label, value)| {
                    RawRow::new(*label, vec![(period.to_string(), value.to_string())])
                })
                .collect(),
        )
    }

    fn page(period: &str) -> OnePage {
        OnePage {
            profile: profile(),
            tables: vec![
                table(
                    period,
                    &[("Preço / Lucro (P/L)", "8,2"), ("Valor de Mercado", "1.000")],
                ),
                table(period, &[("Dividend Yield", "4,5%"), ("Dividend Payout", "N/D")]),
            ],
        }
    }

    #[test]
    fn annual_page_becomes_one_row() {
        let provider = page("2019 *");
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock);
        let key = PeriodKey::new("PETR4", 2019, None).unwrap();

        let t = fetcher.fetch_period(&key, true).unwrap();
        assert_eq!(t.rows().len(), 1);
        assert_eq!(t.rows()[0].index, PeriodIndex::Year(2019));
        assert_eq!(
            t.get(&PeriodIndex::Year(2019), &ColumnKey::grouped("Mercado", "P/L")),
            Some(&NormalizedCell::Float(8.2))
        );
        assert_eq!(
            t.get(&PeriodIndex::Year(2019), &ColumnKey::grouped("Dividendos", "DY")),
            Some(&NormalizedCell::Float(0.045))
        );
        // Payout is N/D everywhere and is dropped.
        assert_eq!(t.columns().len(), 3);
    }

    #[test]
    fn flat_output_has_no_groups() {
        let provider = page("2019");
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock);
        let key = PeriodKey::new("PETR4", 2019, None).unwrap();

        let t = fetcher.fetch_period(&key, false).unwrap();
        assert!(t.columns().iter().all(|c| c.group.is_none()));
        assert_eq!(t.columns()[0], ColumnKey::flat("P/L"));
    }

    #[test]
    fn quarterly_page_is_indexed_by_quarter_end() {
        let provider = page("3T19");
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock);
        let key = PeriodKey::new("PETR4", 2019, Some(Quarter::Q3)).unwrap();

        let t = fetcher.fetch_period(&key, false).unwrap();
        assert_eq!(
            t.rows()[0].index,
            PeriodIndex::Date(NaiveDate::from_ymd_opt(2019, 9, 30).unwrap())
        );
    }

    #[test]
    fn future_year_is_a_validation_error() {
        let provider = page("2021");
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock);
        let key = PeriodKey::new("PETR4", 2021, None).unwrap();
        assert!(matches!(
            fetcher.fetch_period(&key, true),
            Err(FetchError::Validation(_))
        ));
    }

    #[test]
    fn too_few_tables_is_not_found() {
        let mut provider = page("2019");
        provider.tables.truncate(1);
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock);
        let key = PeriodKey::new("PETR4", 2019, None).unwrap();
        assert!(matches!(
            fetcher.fetch_period(&key, true),
            Err(FetchError::DataNotFound { year: Some(2019), .. })
        ));
    }

    #[test]
    fn unknown_label_is_fatal() {
        let mut provider = page("2019");
        provider.tables[1] = table("2019", &[("Not A Real Label", "1")]);
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock);
        let key = PeriodKey::new("PETR4", 2019, None).unwrap();
        match fetcher.fetch_period(&key, true) {
            Err(FetchError::UnknownIndicator { label }) => assert_eq!(label, "Not A Real Label"),
            other => panic!("expected UnknownIndicator, got {other:?}"),
        }
    }

    #[test]
    fn partial_schema_can_be_injected() {
        let schema = IndicatorSchema::from_pairs([
            ("Preço / Lucro (P/L)", "PL"),
            ("Valor de Mercado", "VM"),
            ("Dividend Yield", "DY"),
            ("Dividend Payout", "PO"),
        ]);
        let provider = page("2019");
        let clock = FixedYear(2020);
        let fetcher = PeriodFetcher::new(&provider, &clock).with_schema(&schema);
        let key = PeriodKey::new("PETR4", 2019, None).unwrap();

        let t = fetcher.fetch_period(&key, false).unwrap();
        assert_eq!(t.columns()[0], ColumnKey::flat("PL"));
    }
}
