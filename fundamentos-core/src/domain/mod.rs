//! Domain types for fundamentals aggregation

pub mod cell;
pub mod period;
pub mod table;

pub use cell::NormalizedCell;
pub use period::{PeriodIndex, PeriodKey, Quarter};
pub use table::{
    ColumnKey, ConsolidatedDataset, PeriodRow, PeriodTable, RawRow, RawTable, SuperColumnGroup,
};
