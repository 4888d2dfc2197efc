//! TOML configuration for fetch runs.
//!
//! ```toml
//! [source]
//! base_url = "https://br.advfn.com/bolsa-de-valores/bovespa"
//! timeout_secs = 30
//!
//! [fetch]
//! first_year = 2010
//! max_workers = 8
//! duplicates = "keep_first"
//! normalize = "permissive"
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundamentos_core::data::AdvfnSettings;
use fundamentos_core::merge::DuplicatePolicy;
use fundamentos_core::normalize::{NormalizeMode, Normalizer, NumberLocale};

use crate::orchestrator::{FetchAllOptions, DEFAULT_MAX_WORKERS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub first_year: i32,
    pub max_workers: usize,
    pub parallel: bool,
    pub ascending: bool,
    pub separated: bool,
    pub duplicates: DuplicatePolicy,
    pub normalize: NormalizeMode,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            first_year: 2007,
            max_workers: DEFAULT_MAX_WORKERS,
            parallel: true,
            ascending: true,
            separated: true,
            duplicates: DuplicatePolicy::KeepLast,
            normalize: NormalizeMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentosConfig {
    pub source: AdvfnSettings,
    pub fetch: FetchSettings,
}

impl FundamentosConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_workers must be at least 1".into(),
            ));
        }
        if self.fetch.first_year < 1900 {
            return Err(ConfigError::Invalid(format!(
                "fetch.first_year must be 1900 or later, got {}",
                self.fetch.first_year
            )));
        }
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Orchestrator options for annual data; callers set `quarter` themselves.
    pub fn fetch_options(&self) -> FetchAllOptions {
        FetchAllOptions {
            first_year: Some(self.fetch.first_year),
            quarter: None,
            separated: self.fetch.separated,
            ascending: self.fetch.ascending,
            parallel: self.fetch.parallel,
            max_workers: self.fetch.max_workers,
            duplicates: self.fetch.duplicates,
        }
    }

    /// Normalizer for scraped pages (pt-BR numbers).
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.fetch.normalize, NumberLocale::PT_BR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = FundamentosConfig::from_toml("").unwrap();
        assert_eq!(config, FundamentosConfig::default());
        assert_eq!(config.fetch.max_workers, 15);
        assert_eq!(config.source.timeout_secs, 30);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = FundamentosConfig::from_toml(
            r#"
            [fetch]
            first_year = 2012
            duplicates = "reject"
            normalize = "permissive"
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.first_year, 2012);
        assert_eq!(config.fetch.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.fetch.normalize, NormalizeMode::Permissive);
        assert!(config.fetch.parallel);
        assert!(config.source.random_user_agent);
    }

    #[test]
    fn zero_workers_is_invalid() {
        let err = FundamentosConfig::from_toml("[fetch]\nmax_workers = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let err = FundamentosConfig::from_toml("[fetch]\nduplicates = \"newest\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn options_follow_settings() {
        let mut config = FundamentosConfig::default();
        config.fetch.parallel = false;
        config.fetch.first_year = 2015;
        let opts = config.fetch_options();
        assert!(!opts.parallel);
        assert_eq!(opts.first_year, Some(2015));
        assert_eq!(opts.quarter, None);
    }
}
