//! Current-year provider used to reject future periods.

use chrono::Datelike;

pub trait CurrentYear: Send + Sync {
    fn current_year(&self) -> i32;
}

/// Local wall-clock year.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl CurrentYear for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// A pinned year, for tests and reproducible runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedYear(pub i32);

impl CurrentYear for FixedYear {
    fn current_year(&self) -> i32 {
        self.0
    }
}
