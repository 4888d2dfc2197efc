//! Config loading from disk, and a run driven by the loaded options.

use std::io::Write;

use fundamentos_core::data::{RawTableProvider, SourceError, SourceProfile};
use fundamentos_core::domain::{NormalizedCell, PeriodKey, RawRow, RawTable};
use fundamentos_core::merge::DuplicatePolicy;
use fundamentos_core::normalize::NormalizeMode;
use fundamentos_core::{FixedYear, PeriodFetcher};
use fundamentos_runner::{fetch_all, ConfigError, FundamentosConfig, NoopProgress};

const CONFIG: &str = r#"
[source]
base_url = "http://localhost:9999/bovespa"
max_retries = 1

[fetch]
first_year = 2018
max_workers = 4
parallel = false
ascending = false
duplicates = "keep_first"
normalize = "permissive"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_every_section_from_disk() {
    let file = write_config(CONFIG);
    let config = FundamentosConfig::from_file(file.path()).unwrap();

    assert_eq!(config.source.base_url, "http://localhost:9999/bovespa");
    assert_eq!(config.source.max_retries, 1);
    assert_eq!(config.source.timeout_secs, 30);
    assert_eq!(config.fetch.first_year, 2018);
    assert_eq!(config.fetch.max_workers, 4);
    assert_eq!(config.fetch.duplicates, DuplicatePolicy::KeepFirst);
    assert_eq!(config.fetch.normalize, NormalizeMode::Permissive);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FundamentosConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn invalid_first_year_is_rejected_on_load() {
    let file = write_config("[fetch]\nfirst_year = 1800\n");
    assert!(matches!(
        FundamentosConfig::from_file(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

/// Every year has the same two tables; the P/L cell is free text.
struct TextSource {
    profile: SourceProfile,
}

impl RawTableProvider for TextSource {
    fn name(&self) -> &str {
        "text"
    }

    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    fn fetch_tables(&self, key: &PeriodKey) -> Result<Vec<RawTable>, SourceError> {
        let period = key.year().to_string();
        Ok(vec![
            RawTable::new(vec![RawRow::new(
                "Preço / Lucro (P/L)",
                vec![(period.clone(), "negativo".to_string())],
            )]),
            RawTable::new(vec![RawRow::new(
                "Dividend Yield",
                vec![(period, "2%".to_string())],
            )]),
        ])
    }
}

#[test]
fn loaded_config_drives_the_run() {
    let file = write_config(CONFIG);
    let config = FundamentosConfig::from_file(file.path()).unwrap();

    let source = TextSource {
        profile: SourceProfile {
            name: "text".into(),
            first_year: 2007,
            min_tables: 2,
            super_columns: vec!["Mercado".into(), "Dividendos".into()],
        },
    };
    let clock = FixedYear(2020);
    let fetcher = PeriodFetcher::new(&source, &clock).with_normalizer(config.normalizer());

    let report = fetch_all(
        &fetcher,
        "PETR4",
        &config.fetch_options(),
        &NoopProgress,
        None,
    )
    .unwrap();

    // 2018..=2020, newest first.
    let years: Vec<_> = report
        .dataset
        .indexes()
        .filter_map(|i| i.year())
        .collect();
    assert_eq!(years, vec![2020, 2019, 2018]);

    // Permissive mode keeps the free text.
    assert_eq!(
        report.dataset.rows()[0].cells[0],
        NormalizedCell::Text("negativo".into())
    );
}
