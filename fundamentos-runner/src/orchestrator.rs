//! Concurrent multi-period fetch.
//!
//! Fans one `fetch_period` call per year out over a private Rayon pool,
//! tags every result as success, skip or fatal, and merges the successes.
//! Results are collected in submission (year) order, so the merged dataset
//! does not depend on which worker finished first.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use fundamentos_core::domain::{
    ConsolidatedDataset, PeriodIndex, PeriodKey, PeriodTable, Quarter,
};
use fundamentos_core::merge::{merge, DuplicatePolicy, MergeOptions};
use fundamentos_core::{FetchError, PeriodFetcher};

use crate::progress::FetchProgress;

/// Default number of concurrent period fetches.
pub const DEFAULT_MAX_WORKERS: usize = 15;

/// Why a period was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source has no data for the period.
    NotFound,
    /// The period is out of contract (future year, before the source's first year).
    Invalid(String),
    /// The batch was cancelled before the period started.
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "no data"),
            SkipReason::Invalid(msg) => write!(f, "invalid period: {msg}"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one period task.
#[derive(Debug)]
pub enum PeriodOutcome {
    Success(PeriodTable),
    Skipped { key: PeriodKey, reason: SkipReason },
    Fatal(FetchError),
}

impl PeriodOutcome {
    /// `DataNotFound` and `Validation` are skips; every other error is fatal.
    pub fn classify(key: &PeriodKey, result: Result<PeriodTable, FetchError>) -> Self {
        match result {
            Ok(table) => PeriodOutcome::Success(table),
            Err(FetchError::DataNotFound { .. }) => PeriodOutcome::Skipped {
                key: key.clone(),
                reason: SkipReason::NotFound,
            },
            Err(FetchError::Validation(msg)) => PeriodOutcome::Skipped {
                key: key.clone(),
                reason: SkipReason::Invalid(msg),
            },
            Err(other) => PeriodOutcome::Fatal(other),
        }
    }

    fn cancelled(key: &PeriodKey) -> Self {
        PeriodOutcome::Skipped {
            key: key.clone(),
            reason: SkipReason::Cancelled,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, PeriodOutcome::Fatal(_))
    }
}

/// Options for [`fetch_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAllOptions {
    /// First year of the range; `None` means the source's first year.
    pub first_year: Option<i32>,
    /// Fetch this quarter of every year instead of annual data.
    pub quarter: Option<Quarter>,
    /// Tag columns with their super-column.
    pub separated: bool,
    pub ascending: bool,
    /// Fan out over a worker pool; otherwise fetch one year at a time.
    pub parallel: bool,
    pub max_workers: usize,
    pub duplicates: DuplicatePolicy,
}

impl Default for FetchAllOptions {
    fn default() -> Self {
        Self {
            first_year: None,
            quarter: None,
            separated: true,
            ascending: true,
            parallel: true,
            max_workers: DEFAULT_MAX_WORKERS,
            duplicates: DuplicatePolicy::KeepLast,
        }
    }
}

/// Per-outcome counts of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub ticker: String,
    pub total: usize,
    pub succeeded: usize,
    pub not_found: usize,
    pub invalid: usize,
    pub cancelled: usize,
    pub fatal: usize,
}

impl FetchSummary {
    fn from_outcomes(ticker: &str, outcomes: &[PeriodOutcome]) -> Self {
        let mut summary = FetchSummary {
            ticker: ticker.to_string(),
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PeriodOutcome::Success(_) => summary.succeeded += 1,
                PeriodOutcome::Skipped { reason, .. } => match reason {
                    SkipReason::NotFound => summary.not_found += 1,
                    SkipReason::Invalid(_) => summary.invalid += 1,
                    SkipReason::Cancelled => summary.cancelled += 1,
                },
                PeriodOutcome::Fatal(_) => summary.fatal += 1,
            }
        }
        summary
    }

    pub fn skipped(&self) -> usize {
        self.not_found + self.invalid + self.cancelled
    }
}

/// Merged dataset plus the batch summary.
#[derive(Debug)]
pub struct FetchReport {
    pub dataset: ConsolidatedDataset,
    pub summary: FetchSummary,
}

/// Fetch every year from the first year to the current year and merge.
///
/// Skipped periods are absent from the result. The first fatal outcome (in
/// year order) aborts the batch: periods not yet started are skipped and
/// the error is returned. Zero successes is `DataNotFound` for the ticker.
///
/// - `progress`: receives per-period and batch events.
/// - `cancel`: optional flag; periods not yet started when it is set are skipped.
pub fn fetch_all(
    fetcher: &PeriodFetcher<'_>,
    ticker: &str,
    opts: &FetchAllOptions,
    progress: &dyn FetchProgress,
    cancel: Option<&AtomicBool>,
) -> Result<FetchReport, FetchError> {
    if opts.max_workers == 0 {
        return Err(FetchError::Validation("max_workers must be at least 1".into()));
    }

    let first_year = opts.first_year.unwrap_or(fetcher.profile().first_year);
    let current_year = fetcher.current_year();
    let keys = (first_year..=current_year)
        .map(|year| PeriodKey::new(ticker, year, opts.quarter))
        .collect::<Result<Vec<_>, _>>()?;
    let ticker = keys
        .first()
        .map(|k| k.ticker().to_string())
        .unwrap_or_else(|| ticker.trim().to_uppercase());

    tracing::info!(
        %ticker,
        first_year,
        current_year,
        quarter = ?opts.quarter,
        parallel = opts.parallel,
        provider = fetcher.provider_name(),
        "fetching periods"
    );

    let total = keys.len();
    let abort = AtomicBool::new(false);
    let stop_requested =
        || abort.load(Ordering::Relaxed) || cancel.is_some_and(|f| f.load(Ordering::Relaxed));

    let run_one = |(index, key): (usize, &PeriodKey)| -> PeriodOutcome {
        if stop_requested() {
            return PeriodOutcome::cancelled(key);
        }
        progress.on_start(key, index, total);
        let outcome = PeriodOutcome::classify(key, fetcher.fetch_period(key, opts.separated));
        if outcome.is_fatal() {
            abort.store(true, Ordering::Relaxed);
        }
        progress.on_complete(key, index, total, &outcome);
        outcome
    };

    // Private pool so the worker bound holds regardless of the global pool.
    let thread_pool = if opts.parallel && opts.max_workers > 1 && total > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(opts.max_workers.min(total))
            .build()
        {
            Ok(tp) => Some(tp),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build worker pool, fetching sequentially");
                None
            }
        }
    } else {
        None
    };

    let outcomes: Vec<PeriodOutcome> = if let Some(ref tp) = thread_pool {
        tp.install(|| keys.par_iter().enumerate().map(run_one).collect())
    } else {
        keys.iter().enumerate().map(run_one).collect()
    };

    let summary = FetchSummary::from_outcomes(&ticker, &outcomes);
    progress.on_batch_complete(&summary);

    let mut tables = Vec::with_capacity(summary.succeeded);
    for outcome in outcomes {
        match outcome {
            PeriodOutcome::Success(table) => tables.push(table),
            PeriodOutcome::Skipped { .. } => {}
            PeriodOutcome::Fatal(e) => return Err(e),
        }
    }

    if tables.is_empty() {
        return Err(FetchError::not_found(ticker, None));
    }

    let merge_opts = MergeOptions {
        ascending: opts.ascending,
        duplicates: opts.duplicates,
    };
    let dataset = merge(&ticker, tables, &merge_opts)?;
    let years: Vec<i32> = dataset.indexes().filter_map(PeriodIndex::year).collect();
    tracing::info!(
        %ticker,
        periods = dataset.len(),
        first = ?years.iter().min(),
        last = ?years.iter().max(),
        "merged dataset"
    );
    Ok(FetchReport { dataset, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundamentos_core::SegmentationError;

    fn key() -> PeriodKey {
        PeriodKey::new("PETR4", 2019, None).unwrap()
    }

    #[test]
    fn not_found_and_validation_are_skips() {
        assert!(matches!(
            PeriodOutcome::classify(&key(), Err(FetchError::not_found("PETR4", Some(2019)))),
            PeriodOutcome::Skipped {
                reason: SkipReason::NotFound,
                ..
            }
        ));
        assert!(matches!(
            PeriodOutcome::classify(&key(), Err(FetchError::Validation("future".into()))),
            PeriodOutcome::Skipped {
                reason: SkipReason::Invalid(_),
                ..
            }
        ));
    }

    #[test]
    fn everything_else_is_fatal() {
        let unknown = FetchError::UnknownIndicator {
            label: "Not A Real Label".into(),
        };
        assert!(PeriodOutcome::classify(&key(), Err(unknown)).is_fatal());
        let seg = FetchError::Segmentation(SegmentationError::NoAnchors);
        assert!(PeriodOutcome::classify(&key(), Err(seg)).is_fatal());
    }

    #[test]
    fn summary_counts_each_outcome() {
        let outcomes = vec![
            PeriodOutcome::Skipped {
                key: key(),
                reason: SkipReason::NotFound,
            },
            PeriodOutcome::cancelled(&key()),
            PeriodOutcome::Fatal(FetchError::Validation("x".into())),
        ];
        let summary = FetchSummary::from_outcomes("PETR4", &outcomes);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.fatal, 1);
        assert_eq!(summary.skipped(), 2);
    }

    #[test]
    fn default_options_use_fifteen_workers() {
        let opts = FetchAllOptions::default();
        assert_eq!(opts.max_workers, 15);
        assert!(opts.parallel);
        assert_eq!(opts.duplicates, DuplicatePolicy::KeepLast);
    }
}
