//! Error taxonomy for period fetching, shaping, and merging.
//!
//! These are designed to be displayable in CLI output and to be matched on
//! by the orchestrator, which decides per variant whether a failed period is
//! skipped or aborts the whole batch.

use thiserror::Error;

use crate::data::provider::SourceError;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Caller-supplied argument out of contract (future year, bad quarter, empty ticker).
    #[error("validation error: {0}")]
    Validation(String),

    /// The source has no data for this exact ticker/period.
    #[error("{}", not_found_message(.ticker, .year))]
    DataNotFound { ticker: String, year: Option<i32> },

    /// The indicator schema has no entry for a scraped label.
    #[error("unknown indicator label '{label}' (extend the indicator schema)")]
    UnknownIndicator { label: String },

    #[error("segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Two inputs to a merge share a period and the duplicate policy rejects that.
    #[error("duplicate period '{index}' for '{ticker}'")]
    DuplicatePeriod { ticker: String, index: String },

    /// Source unreachable or malformed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

fn not_found_message(ticker: &str, year: &Option<i32>) -> String {
    match year {
        Some(y) => format!("couldn't find any data for '{ticker}' on {y}"),
        None => format!("couldn't find any data for '{ticker}'"),
    }
}

impl FetchError {
    pub fn not_found(ticker: impl Into<String>, year: Option<i32>) -> Self {
        FetchError::DataNotFound {
            ticker: ticker.into(),
            year,
        }
    }
}

/// Anchor ordering/coverage violations while splitting columns into super-columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentationError {
    #[error("no anchors given")]
    NoAnchors,

    #[error("anchor '{0}' is not present in the column list")]
    AnchorMissing(String),

    #[error("neither '{canonical}' nor '{legacy}' is present in the column list")]
    BothVariantsAbsent { canonical: String, legacy: String },

    #[error("anchors '{first}' and '{second}' resolve to the same column position {position}")]
    DuplicateAnchorPosition {
        first: String,
        second: String,
        position: usize,
    },

    #[error("anchor '{anchor}' (position {position}) appears before the preceding anchor '{previous}'")]
    AnchorsOutOfOrder {
        anchor: String,
        previous: String,
        position: usize,
    },

    #[error("{count} column(s) precede the first anchor '{first_anchor}'")]
    UncoveredLeadingColumns { first_anchor: String, count: usize },
}
