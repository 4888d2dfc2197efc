//! ADVFN fundamentals provider.
//!
//! Fetches the "fundamentos individualizado" page of one ticker and period
//! and returns its HTML tables. Handles retries with exponential backoff,
//! rate limiting, and the shared circuit breaker.
//!
//! ADVFN rejects some generic client user agents, so by default every
//! request carries a random ten-letter user agent.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::circuit_breaker::CircuitBreaker;
use super::html::parse_tables;
use super::provider::{RawTableProvider, SourceError, SourceProfile};
use crate::domain::{PeriodKey, Quarter, RawTable};

pub const DEFAULT_BASE_URL: &str = "https://br.advfn.com/bolsa-de-valores/bovespa";

/// HTTP settings for the ADVFN provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvfnSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub random_user_agent: bool,
}

impl Default for AdvfnSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            random_user_agent: true,
        }
    }
}

pub struct AdvfnProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    settings: AdvfnSettings,
    profile: SourceProfile,
}

impl AdvfnProvider {
    pub fn new(
        settings: AdvfnSettings,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SourceError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            settings,
            profile: SourceProfile::advfn(),
        })
    }

    /// Page URL for one period. Annual pages have no quarter segment.
    pub fn page_url(base_url: &str, key: &PeriodKey) -> String {
        let base = base_url.trim_end_matches('/');
        match key.quarter() {
            Some(q) => format!(
                "{base}/{}/fundamentos/individualizado/{}/{}",
                key.ticker(),
                key.year(),
                quarter_slug(q)
            ),
            None => format!(
                "{base}/{}/fundamentos/individualizado/{}",
                key.ticker(),
                key.year()
            ),
        }
    }

    fn user_agent(&self) -> String {
        if self.settings.random_user_agent {
            random_user_agent()
        } else {
            concat!("fundamentos/", env!("CARGO_PKG_VERSION")).to_string()
        }
    }

    fn fetch_with_retry(&self, key: &PeriodKey) -> Result<String, SourceError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(SourceError::CircuitBreakerTripped);
        }

        let url = Self::page_url(&self.settings.base_url, key);
        let base_delay = Duration::from_millis(self.settings.base_delay_ms);
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(%key, attempt, ?delay, "retrying ADVFN request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(SourceError::CircuitBreakerTripped);
            }

            let response = match self
                .client
                .get(&url)
                .header(reqwest::header::USER_AGENT, self.user_agent())
                .send()
            {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(SourceError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(SourceError::NetworkUnreachable(e.to_string())),
            };

            let status = response.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(SourceError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(SourceError::not_found(key));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(SourceError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(SourceError::Other(format!("HTTP {status} for {key}")));
                continue;
            }

            let body = response.text().map_err(|e| {
                SourceError::ResponseFormatChanged(format!("unreadable body for {key}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| SourceError::Other("max retries exceeded".into())))
    }
}

impl RawTableProvider for AdvfnProvider {
    fn name(&self) -> &str {
        "advfn"
    }

    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    fn fetch_tables(&self, key: &PeriodKey) -> Result<Vec<RawTable>, SourceError> {
        let html = self.fetch_with_retry(key)?;
        let tables = parse_tables(&html)?;
        tracing::debug!(%key, tables = tables.len(), "parsed ADVFN page");
        Ok(tables)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

fn quarter_slug(quarter: Quarter) -> &'static str {
    match quarter {
        Quarter::Q1 => "primeiro-trimestre",
        Quarter::Q2 => "segundo-trimestre",
        Quarter::Q3 => "terceiro-trimestre",
        Quarter::Q4 => "quarto-trimestre",
    }
}

fn random_user_agent() -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    (0..10)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}
