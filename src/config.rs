//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls which providers are paginated, request timeouts,
//! retry policy, relevance threshold and scraping politeness. The defaults
//! are tuned for reliable, polite scraping. Configurations can also be loaded
//! from TOML; any field left out keeps its default.

use crate::error::SearchError;
use crate::providers::DuckDuckGoStrategy;
use crate::relevance::DEFAULT_FUZZY_THRESHOLD;
use crate::types::Provider;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for an investigation run.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers to paginate, queried in this order on every page index.
    pub providers: Vec<Provider>,
    /// Which DuckDuckGo endpoint to scrape.
    pub duckduckgo_strategy: DuckDuckGoStrategy,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Retries after the first attempt on transient failures.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on every further retry.
    pub retry_base_delay_ms: u64,
    /// Minimum partial-ratio score (0-100) for a fuzzy link match.
    pub fuzzy_threshold: f64,
    /// Highest zero-based provider page index that will be requested.
    pub max_page_index: usize,
    /// Random delay range in milliseconds `(min, max)` between provider
    /// page requests.
    pub request_delay_ms: (u64, u64),
    /// Fixed User-Agent. If `None`, rotates through a built-in list of
    /// realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: Provider::all().to_vec(),
            duckduckgo_strategy: DuckDuckGoStrategy::Html,
            timeout_seconds: 10,
            max_retries: 3,
            retry_base_delay_ms: 500,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            max_page_index: 10,
            request_delay_ms: (100, 400),
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - `providers` must not be empty
    /// - `fuzzy_threshold` must lie within `[0, 100]`
    /// - `request_delay_ms.0` must be <= `request_delay_ms.1`
    /// - `user_agent`, when set, must not be blank
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.providers.is_empty() {
            return Err(SearchError::Config(
                "at least one provider must be enabled".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(SearchError::Config(
                "fuzzy_threshold must be between 0 and 100".into(),
            ));
        }
        if self.request_delay_ms.0 > self.request_delay_ms.1 {
            return Err(SearchError::Config(
                "request_delay_ms min must be <= max".into(),
            ));
        }
        if self
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.trim().is_empty())
        {
            return Err(SearchError::Config("user_agent must not be blank".into()));
        }
        Ok(())
    }

    /// Parse a configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the TOML is malformed or the
    /// resulting configuration is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, SearchError> {
        let config: Self =
            toml::from_str(content).map_err(|e| SearchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Io`] if the file cannot be read, or
    /// [`SearchError::Config`] if its contents are invalid.
    pub fn from_file(path: &Path) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
