//! Period identifiers: the fetch unit (`PeriodKey`) and the row index of a table (`PeriodIndex`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Fiscal quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Build a quarter from its number (1–4).
    pub fn new(n: u8) -> Result<Self, FetchError> {
        match n {
            1 => Ok(Quarter::Q1),
            2 => Ok(Quarter::Q2),
            3 => Ok(Quarter::Q3),
            4 => Ok(Quarter::Q4),
            other => Err(FetchError::Validation(format!(
                "quarter must be between 1 and 4, got {other}"
            ))),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// Calendar month the quarter closes on (3, 6, 9 or 12).
    pub fn end_month(self) -> u32 {
        u32::from(self.number()) * 3
    }

    /// Last calendar day of the quarter in `year`.
    pub fn end_date(self, year: i32) -> Option<NaiveDate> {
        last_day_of_month(year, self.end_month())
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// One fetch unit: a ticker and a reporting period (a quarter, or the whole year).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    ticker: String,
    year: i32,
    quarter: Option<Quarter>,
}

impl PeriodKey {
    /// The ticker is trimmed and upper-cased; an empty ticker is rejected.
    pub fn new(ticker: &str, year: i32, quarter: Option<Quarter>) -> Result<Self, FetchError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(FetchError::Validation("ticker must not be empty".into()));
        }
        Ok(Self {
            ticker,
            year,
            quarter,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// `None` means annual data.
    pub fn quarter(&self) -> Option<Quarter> {
        self.quarter
    }

    pub fn is_annual(&self) -> bool {
        self.quarter.is_none()
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.quarter {
            Some(q) => write!(f, "{} {} {q}", self.ticker, self.year),
            None => write!(f, "{} {}", self.ticker, self.year),
        }
    }
}

/// Row index of a period table.
///
/// Annual tables are indexed by year (or by the raw label when it is not a
/// plain year); quarterly tables by the last day of the quarter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeriodIndex {
    Year(i32),
    Date(NaiveDate),
    Label(String),
}

impl PeriodIndex {
    /// Annual label: footnote markers (`"2019 *"`, `"2019*"`) are stripped.
    pub fn from_annual_label(label: &str) -> Self {
        let bare = match label.find('*') {
            Some(pos) => &label[..pos],
            None => label,
        }
        .trim();

        if bare.len() == 4 && bare.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(year) = bare.parse() {
                return PeriodIndex::Year(year);
            }
        }
        PeriodIndex::Label(bare.to_string())
    }

    /// Quarterly label: the trailing digit run is the year (two digits mean 20xx),
    /// the index is the last day of the quarter in that year.
    pub fn from_quarter_label(label: &str, quarter: Quarter) -> Option<Self> {
        let trimmed = label.trim_end_matches(|c: char| c == '*' || c.is_whitespace());
        let digits: String = trimmed
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let year: i32 = match digits.len() {
            4 => digits.parse().ok()?,
            2 => 2000 + digits.parse::<i32>().ok()?,
            _ => return None,
        };
        quarter.end_date(year).map(PeriodIndex::Date)
    }

    /// Calendar year of the index, when it has one.
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        match self {
            PeriodIndex::Year(y) => Some(*y),
            PeriodIndex::Date(d) => Some(d.year()),
            PeriodIndex::Label(_) => None,
        }
    }
}

impl std::fmt::Display for PeriodIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodIndex::Year(y) => write!(f, "{y}"),
            PeriodIndex::Date(d) => write!(f, "{d}"),
            PeriodIndex::Label(l) => write!(f, "{l}"),
        }
    }
}
