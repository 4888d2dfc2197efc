//! Fundamentos Core — domain types, normalization, schema, segmentation, fetch and merge.
//!
//! This crate contains the aggregation engine for Brazilian equity fundamentals:
//! - Domain types (raw tables, normalized cells, period keys, period tables, datasets)
//! - Value normalizer with pt-BR number handling and "no data" sentinels
//! - Indicator schema mapping long Portuguese names to short codes
//! - Super-column segmenter with anchor variant resolution
//! - Period fetcher shaping one period from a raw-table provider
//! - Merge/sort of per-period tables into one consolidated dataset
//! - ADVFN HTTP provider and Fundamentus statement sheet shaping

pub mod clock;
pub mod data;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod merge;
pub mod normalize;
pub mod schema;
pub mod segment;
pub mod sheet;

pub use clock::{CurrentYear, FixedYear, SystemClock};
pub use domain::{
    ColumnKey, ConsolidatedDataset, NormalizedCell, PeriodIndex, PeriodKey, PeriodTable, Quarter,
};
pub use error::{FetchError, SegmentationError};
pub use fetcher::PeriodFetcher;
pub use merge::{merge, DuplicatePolicy, MergeOptions};
pub use normalize::{normalize, NormalizeMode, Normalizer, NumberLocale};
pub use schema::{map_label, IndicatorSchema};
pub use segment::{segment, Segmenter, VariantPair};
pub use sheet::{load_sheet, SheetOptions};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across fetch workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::RawTable>();
        require_sync::<domain::RawTable>();
        require_send::<domain::PeriodKey>();
        require_sync::<domain::PeriodKey>();
        require_send::<domain::PeriodTable>();
        require_sync::<domain::PeriodTable>();
        require_send::<domain::ConsolidatedDataset>();
        require_sync::<domain::ConsolidatedDataset>();

        require_send::<FetchError>();
        require_sync::<FetchError>();
        require_send::<IndicatorSchema>();
        require_sync::<IndicatorSchema>();
        require_send::<Normalizer>();
        require_sync::<Normalizer>();
        require_send::<Segmenter>();
        require_sync::<Segmenter>();

        require_send::<PeriodFetcher<'static>>();
        require_sync::<PeriodFetcher<'static>>();
        require_send::<data::AdvfnProvider>();
        require_sync::<data::AdvfnProvider>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
    }

    /// The provider trait is object safe; the fetcher only ever sees `&dyn`.
    #[test]
    fn provider_trait_is_object_safe() {
        fn _check(provider: &dyn data::RawTableProvider) -> &str {
            provider.name()
        }
    }
}
