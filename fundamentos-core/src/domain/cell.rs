//! NormalizedCell — one typed value scraped from a fundamentals table.

use serde::{Deserialize, Serialize};

/// A cell value after normalization.
///
/// `Text` is only ever produced by a permissive normalizer; the default
/// (strict) normalizer maps anything it cannot parse to `Missing`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedCell {
    Integer(i64),
    Float(f64),
    Text(String),
    #[default]
    Missing,
}

impl NormalizedCell {
    pub fn is_missing(&self) -> bool {
        matches!(self, NormalizedCell::Missing)
    }

    /// Numeric view of the cell. `Text` and `Missing` have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NormalizedCell::Integer(v) => Some(*v as f64),
            NormalizedCell::Float(v) => Some(*v),
            NormalizedCell::Text(_) | NormalizedCell::Missing => None,
        }
    }

    /// Integer view, truncating floats toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NormalizedCell::Integer(v) => Some(*v),
            NormalizedCell::Float(v) => Some(v.trunc() as i64),
            NormalizedCell::Text(_) | NormalizedCell::Missing => None,
        }
    }
}

impl std::fmt::Display for NormalizedCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizedCell::Integer(v) => write!(f, "{v}"),
            NormalizedCell::Float(v) => write!(f, "{v}"),
            NormalizedCell::Text(s) => write!(f, "{s}"),
            NormalizedCell::Missing => write!(f, "NaN"),
        }
    }
}
