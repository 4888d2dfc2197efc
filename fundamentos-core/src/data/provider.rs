//! Raw-table provider trait and source error types.
//!
//! The provider trait abstracts over fundamentals sources (ADVFN pages,
//! stubbed tables in tests) so the period fetcher never touches the
//! network itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PeriodKey, RawTable};

/// Failures reported by a source.
///
/// `NotFound` means "no data for this period" and is recoverable by the
/// orchestrator; every other variant means the source is unreachable or
/// its output is malformed.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data at source for {key}")]
    NotFound { key: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("hard stop: source has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("malformed sheet: {0}")]
    MalformedSheet(String),

    #[error("source error: {0}")]
    Other(String),
}

impl SourceError {
    pub fn not_found(key: &PeriodKey) -> Self {
        SourceError::NotFound {
            key: key.to_string(),
        }
    }
}

/// Static description of how a source lays out one period's tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub name: String,
    /// First year the source publishes data for.
    pub first_year: i32,
    /// Fewer tables than this means "no data for the period".
    pub min_tables: usize,
    /// Super-column name of table *i*; also caps how many tables are used.
    pub super_columns: Vec<String>,
}

impl SourceProfile {
    /// ADVFN fundamentals pages: nine tables, one per indicator family.
    pub fn advfn() -> Self {
        Self {
            name: "advfn".into(),
            first_year: 2007,
            min_tables: 9,
            super_columns: [
                "Mercado",
                "Resultados",
                "Patrimônio",
                "Caixa",
                "Dívida",
                "Liquidez e Solvência",
                "Fluxo de Caixa",
                "Investimentos",
                "Dividendos",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Trait for raw-table sources.
///
/// Implementations return the tables of one period exactly as rendered;
/// normalization and relabeling happen in the period fetcher.
pub trait RawTableProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Layout of the tables this provider returns.
    fn profile(&self) -> &SourceProfile;

    /// Fetch every table of one period, in page order.
    fn fetch_tables(&self, key: &PeriodKey) -> Result<Vec<RawTable>, SourceError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}
