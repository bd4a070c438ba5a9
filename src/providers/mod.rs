//! Search provider adapters.
//!
//! Each provider knows how to build the URL of a zero-based results page
//! and how to parse that page into ordered [`CandidateUrl`]s. Fetching is
//! left to the aggregator so every provider request goes through the same
//! retrying [`crate::http::Fetcher`].
//!
//! Parsing is tolerant: a page without the expected result containers
//! yields an empty list (exhaustion), and only an empty body is reported
//! as [`ErrorKind::ParseFailure`].

pub mod bing;
pub mod duckduckgo;

pub use bing::BingEngine;
pub use duckduckgo::{DuckDuckGoEngine, DuckDuckGoStrategy};

use scraper::Selector;
use url::Url;

use crate::config::SearchConfig;
use crate::error::{ErrorKind, SearchError};
use crate::orchestrator::url_normalize::normalize_url;
use crate::types::{CandidateUrl, Provider};

/// A paginated search provider.
///
/// All implementations must be `Send + Sync` so one adapter set can be
/// shared across the run.
pub trait SearchProvider: Send + Sync {
    /// Which [`Provider`] this adapter scrapes.
    fn provider(&self) -> Provider;

    /// URL of results page `page_index` (zero-based) for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the adapter's endpoint is not a
    /// valid absolute URL.
    fn build_page_url(&self, query: &str, page_index: usize) -> Result<Url, SearchError>;

    /// Parse a results page into candidates in page order.
    ///
    /// An empty list signals that the provider has no further pages.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ParseFailure`] for an empty body.
    fn parse_results(
        &self,
        body: &str,
        page_index: usize,
    ) -> Result<Vec<CandidateUrl>, ErrorKind>;
}

/// Provider adapters as tagged variants, dispatched statically.
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    /// DuckDuckGo, HTML or Lite endpoint.
    DuckDuckGo(DuckDuckGoEngine),
    /// Bing web search.
    Bing(BingEngine),
}

impl ProviderAdapter {
    /// Default adapter for `provider`, honouring the configured strategy.
    pub fn for_provider(provider: Provider, config: &SearchConfig) -> Self {
        match provider {
            Provider::DuckDuckGo => {
                Self::DuckDuckGo(DuckDuckGoEngine::new(config.duckduckgo_strategy))
            }
            Provider::Bing => Self::Bing(BingEngine::new()),
        }
    }

    /// Adapters for every provider enabled in `config`, in order.
    pub fn from_config(config: &SearchConfig) -> Vec<Self> {
        config
            .providers
            .iter()
            .map(|provider| Self::for_provider(*provider, config))
            .collect()
    }
}

impl SearchProvider for ProviderAdapter {
    fn provider(&self) -> Provider {
        match self {
            Self::DuckDuckGo(engine) => engine.provider(),
            Self::Bing(engine) => engine.provider(),
        }
    }

    fn build_page_url(&self, query: &str, page_index: usize) -> Result<Url, SearchError> {
        match self {
            Self::DuckDuckGo(engine) => engine.build_page_url(query, page_index),
            Self::Bing(engine) => engine.build_page_url(query, page_index),
        }
    }

    fn parse_results(
        &self,
        body: &str,
        page_index: usize,
    ) -> Result<Vec<CandidateUrl>, ErrorKind> {
        match self {
            Self::DuckDuckGo(engine) => engine.parse_results(body, page_index),
            Self::Bing(engine) => engine.parse_results(body, page_index),
        }
    }
}

/// Parse a static CSS selector, reporting a broken one as a parse failure.
pub(crate) fn selector(css: &str) -> Result<Selector, ErrorKind> {
    Selector::parse(css).map_err(|e| {
        tracing::warn!(css, error = ?e, "invalid selector");
        ErrorKind::ParseFailure
    })
}

/// Reject bodies that cannot be a results page at all.
pub(crate) fn ensure_body(provider: Provider, body: &str) -> Result<(), ErrorKind> {
    if body.trim().is_empty() {
        tracing::warn!(%provider, "empty results page");
        return Err(ErrorKind::ParseFailure);
    }
    Ok(())
}

/// Append `endpoint`'s query parameters.
pub(crate) fn page_url(endpoint: &str, params: &[(&str, String)]) -> Result<Url, SearchError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| SearchError::Config(format!("invalid provider endpoint '{endpoint}': {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Build a candidate from a raw result URL, keeping only web links.
pub(crate) fn make_candidate(
    provider: Provider,
    raw_url: &str,
    page_index: usize,
    title: Option<String>,
    snippet: Option<String>,
) -> Option<CandidateUrl> {
    let parsed = Url::parse(raw_url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(CandidateUrl {
        url: normalize_url(parsed.as_str()),
        source_provider: provider,
        discovered_at_page: page_index,
        title: title.filter(|t| !t.is_empty()),
        snippet: snippet.filter(|s| !s.is_empty()),
    })
}

/// Collapse runs of whitespace in extracted text.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
