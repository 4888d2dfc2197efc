//! Value normalization — scraped cell text to typed numbers.
//!
//! Brazilian sources format numbers as `1.234.567,89` and percentages as
//! `12,5%`. The normalizer translates the separators, divides percentages
//! by 100, keeps integral values as integers, and maps "no data" sentinels
//! to `Missing`.

use serde::{Deserialize, Serialize};

use crate::domain::NormalizedCell;

/// Texts the sources use for "value not disclosed".
pub const SENTINELS: &[&str] = &["", "-", "--", "N/D", "n/d"];

/// What to do with text that is neither numeric nor a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Unparseable text becomes `Missing`.
    #[default]
    Strict,
    /// Unparseable text is passed through unchanged as `Text`.
    Permissive,
}

/// Thousands/decimal separators of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberLocale {
    pub thousands: Option<char>,
    pub decimal: char,
}

impl NumberLocale {
    /// `1.234,5`
    pub const PT_BR: NumberLocale = NumberLocale {
        thousands: Some('.'),
        decimal: ',',
    };

    /// `1234.5` (machine-formatted exports)
    pub const PLAIN: NumberLocale = NumberLocale {
        thousands: None,
        decimal: '.',
    };

    /// Rewrite `text` into the form `str::parse::<f64>` accepts.
    fn delocalize(&self, text: &str) -> String {
        text.chars()
            .filter(|&c| Some(c) != self.thousands)
            .map(|c| if c == self.decimal { '.' } else { c })
            .collect()
    }
}

impl Default for NumberLocale {
    fn default() -> Self {
        NumberLocale::PT_BR
    }
}

/// Pure, deterministic cell normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Normalizer {
    pub mode: NormalizeMode,
    pub locale: NumberLocale,
}

impl Normalizer {
    pub fn new(mode: NormalizeMode, locale: NumberLocale) -> Self {
        Self { mode, locale }
    }

    pub fn strict() -> Self {
        Self::new(NormalizeMode::Strict, NumberLocale::PT_BR)
    }

    pub fn permissive() -> Self {
        Self::new(NormalizeMode::Permissive, NumberLocale::PT_BR)
    }

    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn normalize(&self, text: &str) -> NormalizedCell {
        let trimmed = text.trim();

        if let Some(magnitude) = trimmed.strip_suffix('%') {
            if let Some(v) = self.parse_number(magnitude.trim_end()) {
                return NormalizedCell::Float(v / 100.0);
            }
        } else if let Some(v) = self.parse_number(trimmed) {
            return if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                NormalizedCell::Integer(v as i64)
            } else {
                NormalizedCell::Float(v)
            };
        }

        if is_sentinel(trimmed) {
            return NormalizedCell::Missing;
        }

        match self.mode {
            NormalizeMode::Strict => NormalizedCell::Missing,
            NormalizeMode::Permissive => NormalizedCell::Text(text.to_string()),
        }
    }

    fn parse_number(&self, text: &str) -> Option<f64> {
        if text.is_empty() {
            return None;
        }
        self.locale
            .delocalize(text)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

/// Normalize with the default (strict, pt-BR) normalizer.
pub fn normalize(text: &str) -> NormalizedCell {
    Normalizer::default().normalize(text)
}

pub fn is_sentinel(text: &str) -> bool {
    SENTINELS.contains(&text.trim())
}
