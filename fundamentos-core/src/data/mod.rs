pub mod advfn;
pub mod circuit_breaker;
pub mod csv_sheet;
pub mod html;
pub mod provider;

pub use advfn::{AdvfnProvider, AdvfnSettings};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_sheet::read_sheet_csv;
pub use html::parse_tables;
pub use provider::{RawTableProvider, SourceError, SourceProfile};
