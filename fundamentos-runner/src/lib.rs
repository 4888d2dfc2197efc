//! Fundamentos Runner — multi-period orchestration, progress reporting, configuration.
//!
//! This crate builds on `fundamentos-core` to provide:
//! - Concurrent multi-period fetch over a bounded worker pool
//! - Per-period outcome tagging (success / skipped / fatal)
//! - Progress callbacks (tracing-backed and no-op)
//! - TOML configuration for the source and the fetch run

pub mod config;
pub mod orchestrator;
pub mod progress;

pub use config::{ConfigError, FetchSettings, FundamentosConfig};
pub use orchestrator::{
    fetch_all, FetchAllOptions, FetchReport, FetchSummary, PeriodOutcome, SkipReason,
    DEFAULT_MAX_WORKERS,
};
pub use progress::{FetchProgress, NoopProgress, TracingProgress};
