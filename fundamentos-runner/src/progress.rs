//! Progress callbacks for multi-period fetches.

use fundamentos_core::domain::PeriodKey;

use crate::orchestrator::{FetchSummary, PeriodOutcome};

/// Progress callback for multi-period operations.
///
/// Called from worker threads, so implementations must be `Sync`; calls for
/// different periods may interleave.
pub trait FetchProgress: Send + Sync {
    /// Called when a period fetch starts.
    fn on_start(&self, key: &PeriodKey, index: usize, total: usize);

    /// Called when a period fetch finishes, whatever the outcome.
    fn on_complete(&self, key: &PeriodKey, index: usize, total: usize, outcome: &PeriodOutcome);

    /// Called once, after every period has an outcome.
    fn on_batch_complete(&self, summary: &FetchSummary);
}

/// Reports through `tracing`: debug per period, warn per skipped period, info per batch.
pub struct TracingProgress;

impl FetchProgress for TracingProgress {
    fn on_start(&self, key: &PeriodKey, index: usize, total: usize) {
        tracing::debug!(%key, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(&self, key: &PeriodKey, index: usize, total: usize, outcome: &PeriodOutcome) {
        match outcome {
            PeriodOutcome::Success(table) => {
                tracing::debug!(
                    %key,
                    columns = table.columns().len(),
                    "[{}/{}] ok",
                    index + 1,
                    total
                );
            }
            PeriodOutcome::Skipped { reason, .. } => {
                tracing::warn!(%key, %reason, "[{}/{}] skipped", index + 1, total);
            }
            PeriodOutcome::Fatal(e) => {
                tracing::error!(%key, error = %e, "[{}/{}] failed", index + 1, total);
            }
        }
    }

    fn on_batch_complete(&self, summary: &FetchSummary) {
        tracing::info!(
            ticker = %summary.ticker,
            succeeded = summary.succeeded,
            not_found = summary.not_found,
            invalid = summary.invalid,
            cancelled = summary.cancelled,
            total = summary.total,
            "fetch complete"
        );
    }
}

/// Discards every event.
pub struct NoopProgress;

impl FetchProgress for NoopProgress {
    fn on_start(&self, _key: &PeriodKey, _index: usize, _total: usize) {}

    fn on_complete(&self, _key: &PeriodKey, _index: usize, _total: usize, _outcome: &PeriodOutcome) {}

    fn on_batch_complete(&self, _summary: &FetchSummary) {}
}
