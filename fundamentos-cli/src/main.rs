//! Fundamentos CLI — fetch, balance and schema commands.
//!
//! Commands:
//! - `fetch` — scrape ADVFN fundamentals for a ticker, one year or every year
//! - `balance` — shape a Fundamentus statement sheet exported as CSV
//! - `schema` — list the indicator short codes and their long names

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fundamentos_core::data::{AdvfnProvider, CircuitBreaker};
use fundamentos_core::domain::PeriodRow;
use fundamentos_core::{
    load_sheet, ColumnKey, IndicatorSchema, PeriodFetcher, PeriodKey, Quarter, SheetOptions,
    SystemClock,
};
use fundamentos_runner::{fetch_all, FundamentosConfig, TracingProgress};

#[derive(Parser)]
#[command(
    name = "fundamentos",
    about = "Fundamentos CLI — Brazilian equity fundamentals aggregation"
)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch fundamentals for a ticker from ADVFN.
    Fetch {
        /// Ticker symbol (e.g., PETR4).
        ticker: String,

        /// Fetch this year only instead of the full history.
        #[arg(long)]
        year: Option<i32>,

        /// Quarter 1-4. Without it, annual data is fetched.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
        quarter: Option<u8>,

        /// First year of the history (overrides the config).
        #[arg(long)]
        first_year: Option<i32>,

        /// Maximum concurrent period fetches (overrides the config).
        #[arg(long)]
        workers: Option<usize>,

        /// Fetch one year at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Flat column labels, no super-column groups.
        #[arg(long, default_value_t = false)]
        flat: bool,

        /// Newest period first.
        #[arg(long, default_value_t = false)]
        descending: bool,

        /// Print a readable table instead of JSON.
        #[arg(long, default_value_t = false)]
        table: bool,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Shape a balance sheet or income statement exported as CSV.
    Balance {
        /// CSV file exported from Fundamentus.
        #[arg(long)]
        sheet: PathBuf,

        /// Ticker the sheet belongs to.
        #[arg(long)]
        ticker: String,

        /// Kind of statement. Income statements are never grouped.
        #[arg(long, value_enum, default_value_t = Statement::Balance)]
        statement: Statement,

        /// One row per quarter instead of yearly sums.
        #[arg(long, default_value_t = false)]
        quarterly: bool,

        /// Flat column labels, no balance-sheet groups.
        #[arg(long, default_value_t = false)]
        flat: bool,

        /// Newest period first.
        #[arg(long, default_value_t = false)]
        descending: bool,

        /// Print a readable table instead of JSON.
        #[arg(long, default_value_t = false)]
        table: bool,
    },
    /// List indicator short codes.
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Statement {
    /// Balance sheet (BPA/BPP), grouped under its anchors unless `--flat`.
    Balance,
    /// Income statement (DRE).
    Income,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Fetch {
            ticker,
            year,
            quarter,
            first_year,
            workers,
            sequential,
            flat,
            descending,
            table,
            config,
        } => run_fetch(FetchArgs {
            ticker,
            year,
            quarter,
            first_year,
            workers,
            sequential,
            flat,
            descending,
            table,
            config,
        }),
        Commands::Balance {
            sheet,
            ticker,
            statement,
            quarterly,
            flat,
            descending,
            table,
        } => {
            let opts = sheet_options(statement, quarterly, flat, descending);
            run_balance(&sheet, &ticker, &opts, table)
        }
        Commands::Schema => {
            run_schema();
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays clean for JSON output.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

struct FetchArgs {
    ticker: String,
    year: Option<i32>,
    quarter: Option<u8>,
    first_year: Option<i32>,
    workers: Option<usize>,
    sequential: bool,
    flat: bool,
    descending: bool,
    table: bool,
    config: Option<PathBuf>,
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => FundamentosConfig::from_file(path)?,
        None => FundamentosConfig::default(),
    };

    let quarter = args.quarter.map(Quarter::new).transpose()?;
    let circuit_breaker = Arc::new(CircuitBreaker::default_source());
    let provider = AdvfnProvider::new(config.source.clone(), circuit_breaker)?;
    let clock = SystemClock;
    let fetcher = PeriodFetcher::new(&provider, &clock).with_normalizer(config.normalizer());
    let separated = !args.flat && config.fetch.separated;

    if let Some(year) = args.year {
        let key = PeriodKey::new(&args.ticker, year, quarter)?;
        let table = fetcher
            .fetch_period(&key, separated)
            .with_context(|| format!("fetching {key}"))?;
        if args.table {
            println!("=== {key} ===");
            print_rows(table.columns(), table.rows());
        } else {
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        return Ok(());
    }

    let mut opts = config.fetch_options();
    opts.quarter = quarter;
    opts.separated = separated;
    if args.descending {
        opts.ascending = false;
    }
    if args.sequential {
        opts.parallel = false;
    }
    if let Some(first_year) = args.first_year {
        opts.first_year = Some(first_year);
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            bail!("--workers must be at least 1");
        }
        opts.max_workers = workers;
    }

    let report = fetch_all(&fetcher, &args.ticker, &opts, &TracingProgress, None)
        .with_context(|| format!("fetching history for {}", args.ticker))?;

    let hash = report.dataset.content_hash();
    if !args.table {
        let out = serde_json::json!({
            "hash": hash,
            "summary": report.summary,
            "dataset": report.dataset,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let summary = &report.summary;
    println!();
    println!("=== {} ===", report.dataset.ticker());
    println!(
        "Periods:        {} fetched, {} skipped of {}",
        summary.succeeded,
        summary.skipped(),
        summary.total
    );
    println!("Hash:           {hash}");
    println!();
    print_rows(report.dataset.columns(), report.dataset.rows());
    Ok(())
}

fn sheet_options(
    statement: Statement,
    quarterly: bool,
    flat: bool,
    descending: bool,
) -> SheetOptions {
    let base = match statement {
        Statement::Balance => SheetOptions::default(),
        Statement::Income => SheetOptions::income_statement(),
    };
    SheetOptions {
        quarterly,
        ascending: !descending,
        separated: base.separated && !flat,
        ..base
    }
}

fn run_balance(sheet: &Path, ticker: &str, opts: &SheetOptions, table: bool) -> Result<()> {
    let file = File::open(sheet).with_context(|| format!("opening {}", sheet.display()))?;
    let shaped = load_sheet(ticker, file, opts)?;

    if table {
        println!("=== {} ({}) ===", shaped.ticker(), sheet.display());
        print_rows(shaped.columns(), shaped.rows());
    } else {
        println!("{}", serde_json::to_string_pretty(&shaped)?);
    }
    Ok(())
}

fn run_schema() {
    let schema = IndicatorSchema::advfn();
    let mut entries: Vec<(&str, &str)> = schema.entries().collect();
    entries.sort_by(|a, b| a.1.cmp(b.1));

    println!("{:<28} {}", "Code", "Indicator");
    println!("{}", "-".repeat(64));
    for (long, short) in entries {
        println!("{short:<28} {long}");
    }
}

/// One line per period, `column = value` pairs indented below it.
fn print_rows(columns: &[ColumnKey], rows: &[PeriodRow]) {
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }
    let width = columns
        .iter()
        .map(|c| c.to_string().chars().count())
        .max()
        .unwrap_or(0);
    for row in rows {
        println!("{}", row.index);
        for (col, cell) in columns.iter().zip(&row.cells) {
            if cell.is_missing() {
                continue;
            }
            println!("  {:<width$}  {cell}", col.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn quarter_outside_range_is_rejected() {
        let parsed = Cli::try_parse_from(["fundamentos", "fetch", "PETR4", "--quarter", "5"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn fetch_flags_parse() {
        let cli = Cli::try_parse_from([
            "fundamentos",
            "fetch",
            "VALE3",
            "--first-year",
            "2015",
            "--workers",
            "4",
            "--descending",
            "--flat",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch {
                ticker,
                first_year,
                workers,
                descending,
                flat,
                ..
            } => {
                assert_eq!(ticker, "VALE3");
                assert_eq!(first_year, Some(2015));
                assert_eq!(workers, Some(4));
                assert!(descending);
                assert!(flat);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn income_statement_is_never_separated() {
        let cli = Cli::try_parse_from([
            "fundamentos",
            "balance",
            "--sheet",
            "dre.csv",
            "--ticker",
            "PETR4",
            "--statement",
            "income",
        ])
        .unwrap();
        let Commands::Balance {
            statement,
            quarterly,
            flat,
            descending,
            ..
        } = cli.command
        else {
            panic!("expected balance");
        };
        assert_eq!(statement, Statement::Income);
        assert!(!sheet_options(statement, quarterly, flat, descending).separated);
    }

    #[test]
    fn balance_sheet_is_separated_unless_flat() {
        assert!(sheet_options(Statement::Balance, false, false, false).separated);
        assert!(!sheet_options(Statement::Balance, false, true, false).separated);
        let opts = sheet_options(Statement::Balance, true, false, true);
        assert!(opts.quarterly);
        assert!(!opts.ascending);
    }
}
